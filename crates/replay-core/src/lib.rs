//! Replay Core
//!
//! Replays a held-out tail of a multi-asset price/volume dataset back into a
//! live view, re-ranking assets by growth after every step. Playback is gated
//! by an explicit start/pause state machine and each viewer owns an
//! independent session.

pub mod driver;
pub mod error;
pub mod loader;
pub mod partition;
pub mod playback;
pub mod ranking;
pub mod replay;
pub mod session;
pub mod types;


pub use driver::SessionHandle;
pub use error::{ReplayError, Result};
pub use loader::{load_csv, load_csv_path, write_csv, write_csv_path};
pub use partition::{Boundary, DataSource, Partition};
pub use playback::{PlaybackAction, PlaybackController, PlaybackState};
pub use ranking::{growth_pct, Ranking, RankingEngine, RankingEntry};
pub use replay::ReplayEngine;
pub use session::{ReplaySession, SessionSnapshot, TickReport};
pub use types::{AssetId, AssetQuote, AssetSeries, Dataset, Row, REFERENCE_ASSETS};
