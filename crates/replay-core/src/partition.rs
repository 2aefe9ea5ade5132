//! Seen/Pending Partitioning
//!
//! Splits a dataset once into the already-replayed prefix and the held-out
//! tail that the replay engine feeds back in.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ReplayError, Result};
use crate::types::{AssetId, Dataset, Row};

/// Sizes of both sides of the partition boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    pub seen_len: usize,
    pub pending_len: usize,
}

impl Boundary {
    pub fn total(&self) -> usize {
        self.seen_len + self.pending_len
    }

    /// Share of the replay tail already consumed, in percent
    pub fn progress_pct(&self, tail_len: usize) -> f64 {
        if tail_len == 0 {
            return 100.0;
        }
        let consumed = tail_len.saturating_sub(self.pending_len);
        (consumed as f64 / tail_len as f64) * 100.0
    }
}

/// A dataset split into `seen ++ pending`.
///
/// `seen.len() + pending.len()` never changes after construction.
#[derive(Debug, Clone)]
pub struct Partition {
    assets: Vec<AssetId>,
    seen: Vec<Row>,
    pending: VecDeque<Row>,
    original_len: usize,
    tail_len: usize,
}

impl Partition {
    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn seen(&self) -> &[Row] {
        &self.seen
    }

    pub fn pending(&self) -> &VecDeque<Row> {
        &self.pending
    }

    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Tail size the partition was created with
    pub fn tail_len(&self) -> usize {
        self.tail_len
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn boundary(&self) -> Boundary {
        Boundary {
            seen_len: self.seen.len(),
            pending_len: self.pending.len(),
        }
    }

    /// Iterate `seen ++ pending` in original row order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.seen.iter().chain(self.pending.iter())
    }

    /// Move up to `count` rows from the front of pending to the end of seen.
    pub(crate) fn shift(&mut self, count: usize) -> usize {
        let moved = count.min(self.pending.len());
        self.seen.extend(self.pending.drain(..moved));
        debug_assert_eq!(self.seen.len() + self.pending.len(), self.original_len);
        moved
    }
}

/// One-time partitioning of the full historical dataset
pub struct DataSource;

impl DataSource {
    /// Hold out the last `tail` rows of `dataset` as pending.
    ///
    /// Fails with `InsufficientData` when `tail` exceeds the dataset length.
    pub fn partition(dataset: Dataset, tail: usize) -> Result<Partition> {
        let available = dataset.len();
        if tail > available {
            return Err(ReplayError::InsufficientData {
                requested: tail,
                available,
            });
        }

        let (assets, mut seen) = dataset.into_parts();
        let pending: VecDeque<Row> = seen.split_off(available - tail).into();

        info!(
            "Partitioned {} rows: {} seen, {} pending",
            available,
            seen.len(),
            pending.len()
        );

        Ok(Partition {
            assets,
            seen,
            pending,
            original_len: available,
            tail_len: tail,
        })
    }
}
