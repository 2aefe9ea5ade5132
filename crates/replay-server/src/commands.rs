//! Batch commands: split the dataset, rank it, or serve live replay sessions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use replay_core::{
    load_csv_path, write_csv_path, DataSource, Dataset, Ranking, RankingEngine, Row,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ReplayConfig;
use crate::routes::{replay_routes, AppState};

/// Files written by `split`
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutput {
    pub seen_path: PathBuf,
    pub pending_path: PathBuf,
    pub seen_rows: usize,
    pub pending_rows: usize,
}

/// Ranking persisted by `rank`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub rows: usize,
    pub ranking: Ranking,
}

pub fn load_dataset(config: &ReplayConfig) -> Result<Dataset> {
    load_csv_path(&config.data_path, &config.assets)
        .with_context(|| format!("Failed to load dataset from {:?}", config.data_path))
}

/// Write the seen prefix and the held-out tail to two CSV files.
pub fn split(dataset: Dataset, tail: usize, out_dir: &Path) -> Result<SplitOutput> {
    let assets = dataset.assets().to_vec();
    let partition = DataSource::partition(dataset, tail)?;

    let seen_path = out_dir.join(format!("data_without_last_{}.csv", tail));
    let pending_path = out_dir.join(format!("last_{}.csv", tail));
    let pending: Vec<Row> = partition.pending().iter().cloned().collect();

    write_csv_path(&seen_path, &assets, partition.seen())?;
    write_csv_path(&pending_path, &assets, &pending)?;

    Ok(SplitOutput {
        seen_path,
        pending_path,
        seen_rows: partition.seen().len(),
        pending_rows: pending.len(),
    })
}

/// Rank the whole dataset and persist the result as JSON.
pub fn rank(dataset: &Dataset, source: &str, output: Option<&Path>) -> Result<RankingSnapshot> {
    let ranking = RankingEngine::new().rank(dataset.assets(), dataset.rows());
    let snapshot = RankingSnapshot {
        generated_at: Utc::now(),
        source: source.to_string(),
        rows: dataset.len(),
        ranking,
    };

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write ranking snapshot to {:?}", path))?;
        tracing::info!("Saved ranking snapshot to {:?}", path);
    }

    Ok(snapshot)
}

/// Serve replay sessions over HTTP until SIGINT.
pub async fn serve(config: ReplayConfig, print_table: bool) -> Result<()> {
    let dataset = load_dataset(&config)?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(dataset, config);

    let default_session = state
        .open_session(None, None)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open default session: {:?}", e))?;
    tracing::info!("Default session: {}", default_session.id());

    if print_table {
        let mut updates = default_session.subscribe();
        tokio::spawn(async move {
            let mut last_seen = None;
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                if last_seen == Some(snapshot.boundary.seen_len) {
                    continue;
                }
                last_seen = Some(snapshot.boundary.seen_len);
                println!(
                    "[{}] {} rows seen, {} pending ({})\n{}",
                    snapshot.last_timestamp.as_deref().unwrap_or("-"),
                    snapshot.boundary.seen_len,
                    snapshot.boundary.pending_len,
                    snapshot.state,
                    snapshot.ranking.render_table()
                );
            }
        });
    }

    let app = replay_routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Replay server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received SIGINT, shutting down");
        })
        .await?;

    Ok(())
}
