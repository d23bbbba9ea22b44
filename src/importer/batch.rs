//! Batch accumulation between the row transform and the bulk upsert.

use crate::catalog::model::Product;

/// Products per bulk upsert when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Buffers transformed products in arrival order and hands back a full batch
/// every time the threshold is reached. No dedup happens here; the store's
/// keyed upsert owns that.
pub struct BatchAccumulator {
    buf: Vec<Product>,
    capacity: usize,
}

impl BatchAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Add one product; returns the full batch when the threshold is hit.
    pub fn push(&mut self, product: Product) -> Option<Vec<Product>> {
        self.buf.push(product);
        if self.buf.len() >= self.capacity {
            Some(std::mem::replace(
                &mut self.buf,
                Vec::with_capacity(self.capacity),
            ))
        } else {
            None
        }
    }

    /// Take whatever is buffered at end of stream; may be empty.
    pub fn drain(&mut self) -> Vec<Product> {
        std::mem::take(&mut self.buf)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
