pub mod batch;
pub mod enhance;
pub mod feed;
pub mod run;
pub mod schedule;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub use run::{ImportError, ImportSummary, Importer};
