//! Replay Sessions
//!
//! A session owns everything one viewer's replay needs: the partition, the
//! playback state and the per-tick rate. Independent sessions never share
//! mutable state.

use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ReplayError, Result};
use crate::partition::{Boundary, Partition};
use crate::playback::{PlaybackAction, PlaybackController, PlaybackState};
use crate::ranking::{Ranking, RankingEngine};
use crate::replay::ReplayEngine;
use crate::types::{AssetId, AssetSeries};

/// Point-in-time view of a session, safe to hand to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub state: PlaybackState,
    /// Rows consumed per admitted tick
    pub rate: NonZeroUsize,
    pub boundary: Boundary,
    pub tail_len: usize,
    pub progress_pct: f64,
    pub exhausted: bool,
    pub ticks_received: u64,
    pub ticks_admitted: u64,
    /// Timestamp of the last seen row
    pub last_timestamp: Option<String>,
    pub ranking: Ranking,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of delivering one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Whether playback let the tick reach the replay engine
    pub admitted: bool,
    /// Rows moved from pending to seen
    pub moved: usize,
    pub snapshot: SessionSnapshot,
}

/// Session-scoped replay state
#[derive(Debug)]
pub struct ReplaySession {
    id: String,
    partition: Partition,
    playback: PlaybackController,
    rate: NonZeroUsize,
    engine: ReplayEngine,
    ranker: RankingEngine,
    /// Last ranking, keyed by the seen length it was computed for
    ranking_cache: Option<(usize, Ranking)>,
    ticks_received: u64,
    ticks_admitted: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReplaySession {
    pub fn new(partition: Partition, rate: NonZeroUsize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            partition,
            playback: PlaybackController::new(),
            rate,
            engine: ReplayEngine::new(),
            ranker: RankingEngine::new(),
            ranking_cache: None,
            ticks_received: 0,
            ticks_admitted: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn rate(&self) -> NonZeroUsize {
        self.rate
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn start(&mut self) -> PlaybackState {
        self.apply(PlaybackAction::Start)
    }

    pub fn pause(&mut self) -> PlaybackState {
        self.apply(PlaybackAction::Pause)
    }

    pub fn apply(&mut self, action: PlaybackAction) -> PlaybackState {
        self.updated_at = Utc::now();
        self.playback.apply(action)
    }

    /// Apply a textual trigger such as `start` or `pause`.
    pub fn apply_trigger(&mut self, trigger: &str) -> PlaybackState {
        self.updated_at = Utc::now();
        self.playback.apply_trigger(trigger)
    }

    /// Change rows-per-tick; takes effect on the next admitted tick.
    pub fn set_rate(&mut self, rate: NonZeroUsize) {
        self.rate = rate;
        self.updated_at = Utc::now();
    }

    /// Deliver one tick: advance if running, then re-rank.
    pub fn tick(&mut self) -> TickReport {
        self.ticks_received += 1;

        let admitted = self.playback.admits_tick();
        let moved = if admitted {
            self.ticks_admitted += 1;
            self.engine.advance(&mut self.partition, self.rate)
        } else {
            0
        };

        if moved > 0 {
            self.updated_at = Utc::now();
        }
        debug!(session = %self.id, admitted, moved, "Tick processed");

        TickReport {
            admitted,
            moved,
            snapshot: self.snapshot(),
        }
    }

    /// Ranking over the current seen partition.
    pub fn ranking(&mut self) -> Ranking {
        let seen_len = self.partition.seen().len();
        if let Some((cached_len, ranking)) = &self.ranking_cache {
            if *cached_len == seen_len {
                return ranking.clone();
            }
        }

        let ranking = self
            .ranker
            .rank(self.partition.assets(), self.partition.seen());
        self.ranking_cache = Some((seen_len, ranking.clone()));
        ranking
    }

    pub fn snapshot(&mut self) -> SessionSnapshot {
        let ranking = self.ranking();
        let boundary = self.partition.boundary();
        let tail_len = self.partition.tail_len();

        SessionSnapshot {
            id: self.id.clone(),
            state: self.playback.state(),
            rate: self.rate,
            boundary,
            tail_len,
            progress_pct: boundary.progress_pct(tail_len),
            exhausted: self.partition.is_exhausted(),
            ticks_received: self.ticks_received,
            ticks_admitted: self.ticks_admitted,
            last_timestamp: self.partition.seen().last().map(|r| r.timestamp.clone()),
            ranking,
            updated_at: self.updated_at,
        }
    }

    /// Close/volume series of one asset over the seen partition.
    pub fn series(&self, asset: &AssetId) -> Result<AssetSeries> {
        if !self.partition.assets().contains(asset) {
            return Err(ReplayError::UnknownAsset(asset.to_string()));
        }
        Ok(AssetSeries::from_rows(asset, self.partition.seen()))
    }

    /// Series for every tracked asset, in enumeration order.
    pub fn all_series(&self) -> Vec<AssetSeries> {
        self.partition
            .assets()
            .iter()
            .map(|asset| AssetSeries::from_rows(asset, self.partition.seen()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::DataSource;
    use crate::types::{Dataset, Row};

    fn session(n: usize, tail: usize, rate: usize) -> ReplaySession {
        let btc = AssetId::new("BTC");
        let rows = (0..n)
            .map(|i| Row::new(format!("t{i}")).with_quote(btc.clone(), 100.0 + i as f64, 1.0))
            .collect();
        let partition = DataSource::partition(Dataset::new(vec![btc], rows).unwrap(), tail).unwrap();
        ReplaySession::new(partition, NonZeroUsize::new(rate).unwrap())
    }

    #[test]
    fn test_ticks_suppressed_while_stopped() {
        let mut s = session(10, 5, 2);

        let report = s.tick();
        assert!(!report.admitted);
        assert_eq!(report.moved, 0);
        assert_eq!(report.snapshot.boundary.seen_len, 5);
        // Ranking is still produced from the unchanged seen rows
        assert_eq!(report.snapshot.ranking.len(), 1);
        assert_eq!(report.snapshot.ticks_received, 1);
        assert_eq!(report.snapshot.ticks_admitted, 0);
    }

    #[test]
    fn test_running_ticks_advance_and_rerank() {
        let mut s = session(10, 5, 2);
        s.start();

        let before = s.snapshot().ranking.entries[0].end_price;
        let report = s.tick();
        assert!(report.admitted);
        assert_eq!(report.moved, 2);
        assert_eq!(report.snapshot.boundary.seen_len, 7);
        assert_eq!(report.snapshot.last_timestamp.as_deref(), Some("t6"));
        assert!(report.snapshot.ranking.entries[0].end_price > before);
    }

    #[test]
    fn test_pause_suppresses_next_tick() {
        let mut s = session(10, 5, 1);
        s.start();
        s.tick();
        s.pause();
        let report = s.tick();
        assert!(!report.admitted);
        assert_eq!(report.snapshot.boundary.seen_len, 6);
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let mut s = session(10, 3, 5);
        s.start();

        let report = s.tick();
        assert_eq!(report.moved, 3);
        assert!(report.snapshot.exhausted);
        assert!((report.snapshot.progress_pct - 100.0).abs() < 1e-9);

        let again = s.tick();
        assert!(again.admitted);
        assert_eq!(again.moved, 0);
        assert_eq!(again.snapshot.ranking, report.snapshot.ranking);
    }

    #[test]
    fn test_rate_change_applies_to_next_tick() {
        let mut s = session(20, 10, 1);
        s.start();
        s.tick();
        s.set_rate(NonZeroUsize::new(4).unwrap());
        assert_eq!(s.tick().moved, 4);
        assert_eq!(s.snapshot().boundary.seen_len, 15);
    }

    #[test]
    fn test_series_for_unknown_asset() {
        let s = session(4, 2, 1);
        assert!(matches!(
            s.series(&AssetId::new("DOGE")),
            Err(ReplayError::UnknownAsset(_))
        ));
        assert_eq!(s.series(&AssetId::new("BTC")).unwrap().len(), 2);
        assert_eq!(s.all_series().len(), 1);
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut a = session(10, 5, 1);
        let mut b = session(10, 5, 1);
        assert_ne!(a.id(), b.id());

        a.start();
        a.tick();
        b.tick();
        assert_eq!(a.snapshot().boundary.seen_len, 6);
        assert_eq!(b.snapshot().boundary.seen_len, 5);
    }
}
