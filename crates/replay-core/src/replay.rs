//! Historical Replay Engine
//!
//! Feeds the held-out tail back into the seen partition, one batch per tick.

use std::num::NonZeroUsize;

use tracing::{debug, info};

use crate::partition::Partition;

/// Engine for advancing a partition boundary
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayEngine;

impl ReplayEngine {
    pub fn new() -> Self {
        Self
    }

    /// Move up to `rate` rows from pending to seen, preserving order.
    ///
    /// Returns the number of rows moved. Once pending is empty this is a
    /// no-op returning 0.
    pub fn advance(&self, partition: &mut Partition, rate: NonZeroUsize) -> usize {
        if partition.is_exhausted() {
            debug!("Replay exhausted, advance is a no-op");
            return 0;
        }

        let moved = partition.shift(rate.get());
        let boundary = partition.boundary();
        debug!(
            moved,
            seen = boundary.seen_len,
            pending = boundary.pending_len,
            "Advanced replay"
        );

        if partition.is_exhausted() {
            info!("Replay tail fully consumed ({} rows seen)", boundary.seen_len);
        }

        moved
    }
}
