//! Centralized id generation.
//!
//! Vendor ids and detail-lookup correlation ids both come from one injected
//! source so tests can swap in a deterministic implementation.

use uuid::Uuid;

pub trait IdSource: Send + Sync {
    /// Produce a new globally unique id.
    fn generate(&self) -> String;
}

/// Production id source backed by random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
