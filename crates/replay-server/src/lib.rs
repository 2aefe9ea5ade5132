//! Replay Server
//!
//! Command-line and HTTP front end for the replay core: splits a price
//! dataset into seen/pending CSV files, ranks a full dataset, and serves
//! live replay sessions.

pub mod api;
pub mod commands;
pub mod config;
pub mod routes;

pub use api::{ApiResponse, AppError};
pub use config::ReplayConfig;
pub use routes::{replay_routes, AppState};
