//! Replay API Routes
//!
//! Control and read endpoints for live replay sessions. Each session runs in
//! its own task with its own ticker; handlers only talk to it through its
//! `SessionHandle`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use replay_core::{
    AssetId, AssetSeries, DataSource, Dataset, Ranking, ReplaySession, SessionHandle,
    SessionSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::api::{ApiResponse, AppError};
use crate::config::ReplayConfig;

/// A running session plus the ticker feeding it
pub struct SessionEntry {
    pub handle: SessionHandle,
    ticker: JoinHandle<()>,
}

pub type SessionRegistry = Arc<RwLock<HashMap<String, SessionEntry>>>;

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub config: Arc<ReplayConfig>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(dataset: Dataset, config: ReplayConfig) -> Self {
        Self {
            dataset: Arc::new(dataset),
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Partition a fresh copy of the dataset and start a session on it.
    pub async fn open_session(
        &self,
        tail_size: Option<usize>,
        rate: Option<NonZeroUsize>,
    ) -> Result<SessionHandle, AppError> {
        let tail = tail_size.unwrap_or(self.config.tail_size);
        let partition = DataSource::partition(self.dataset.as_ref().clone(), tail)?;
        let session = ReplaySession::new(partition, rate.unwrap_or(self.config.rate));

        let handle = SessionHandle::spawn(session);
        let ticker = handle.spawn_ticker(self.config.tick_interval());

        tracing::info!(session = %handle.id(), tail, "Opened replay session");
        self.sessions.write().await.insert(
            handle.id().to_string(),
            SessionEntry {
                handle: handle.clone(),
                ticker,
            },
        );
        Ok(handle)
    }

    async fn handle(&self, id: &str) -> Result<SessionHandle, AppError> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|entry| entry.handle.clone())
            .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", id)))
    }
}

/// Request to open a new session
#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    pub tail_size: Option<usize>,
    pub rate: Option<NonZeroUsize>,
    #[serde(default)]
    pub autostart: bool,
}

/// Request to change rows-per-tick
#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rate: NonZeroUsize,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub state: String,
    pub seen_len: usize,
    pub pending_len: usize,
}

impl From<&SessionSnapshot> for SessionSummary {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            state: snapshot.state.to_string(),
            seen_len: snapshot.boundary.seen_len,
            pending_len: snapshot.boundary.pending_len,
        }
    }
}

pub fn replay_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/replay/sessions",
            get(list_sessions).post(open_session),
        )
        .route(
            "/api/replay/sessions/:id",
            get(get_session).delete(close_session),
        )
        .route("/api/replay/sessions/:id/start", post(start_session))
        .route("/api/replay/sessions/:id/pause", post(pause_session))
        .route(
            "/api/replay/sessions/:id/trigger/:trigger",
            post(trigger_session),
        )
        .route("/api/replay/sessions/:id/rate", post(set_rate).put(set_rate))
        .route("/api/replay/sessions/:id/ranking", get(get_ranking))
        .route("/api/replay/sessions/:id/series", get(get_all_series))
        .route("/api/replay/sessions/:id/series/:asset", get(get_series))
}

/// List open sessions
async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SessionSummary>>>, AppError> {
    let sessions = state.sessions.read().await;
    let mut summaries: Vec<SessionSummary> = sessions
        .values()
        .map(|entry| SessionSummary::from(&entry.handle.latest()))
        .collect();
    summaries.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(Json(ApiResponse::success(summaries)))
}

/// Open an independent session over the shared dataset.
///
/// An empty body opens a session with the configured defaults.
async fn open_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<SessionSnapshot>>, AppError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        OpenSessionRequest::default()
    } else {
        serde_json::from_slice::<OpenSessionRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid session request: {}", e)))?
    };
    let handle = state.open_session(request.tail_size, request.rate).await?;

    let snapshot = if request.autostart {
        handle.start().await?
    } else {
        handle.snapshot().await?
    };
    Ok(Json(ApiResponse::success(snapshot)))
}

/// Current state, boundary and ranking
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionSnapshot>>, AppError> {
    let handle = state.handle(&id).await?;
    Ok(Json(ApiResponse::success(handle.snapshot().await?)))
}

/// Stop a session and its ticker
async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionSnapshot>>, AppError> {
    let entry = state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", id)))?;

    let snapshot = entry.handle.snapshot().await?;
    entry.handle.shutdown().await?;
    entry.ticker.abort();
    tracing::info!(session = %id, "Closed replay session");

    Ok(Json(ApiResponse::success(snapshot)))
}

async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionSnapshot>>, AppError> {
    let handle = state.handle(&id).await?;
    Ok(Json(ApiResponse::success(handle.start().await?)))
}

async fn pause_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionSnapshot>>, AppError> {
    let handle = state.handle(&id).await?;
    Ok(Json(ApiResponse::success(handle.pause().await?)))
}

/// Apply a named trigger; unrecognized names leave playback unchanged
async fn trigger_session(
    State(state): State<AppState>,
    Path((id, trigger)): Path<(String, String)>,
) -> Result<Json<ApiResponse<SessionSnapshot>>, AppError> {
    let handle = state.handle(&id).await?;
    Ok(Json(ApiResponse::success(handle.trigger(&trigger).await?)))
}

async fn set_rate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RateRequest>,
) -> Result<Json<ApiResponse<SessionSnapshot>>, AppError> {
    let handle = state.handle(&id).await?;
    Ok(Json(ApiResponse::success(handle.set_rate(request.rate).await?)))
}

async fn get_ranking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Ranking>>, AppError> {
    let handle = state.handle(&id).await?;
    Ok(Json(ApiResponse::success(handle.snapshot().await?.ranking)))
}

async fn get_series(
    State(state): State<AppState>,
    Path((id, asset)): Path<(String, String)>,
) -> Result<Json<ApiResponse<AssetSeries>>, AppError> {
    let handle = state.handle(&id).await?;
    let asset: AssetId = asset.parse()?;
    Ok(Json(ApiResponse::success(handle.series(asset).await?)))
}

/// Close and volume series for every tracked asset
async fn get_all_series(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<AssetSeries>>>, AppError> {
    let handle = state.handle(&id).await?;
    Ok(Json(ApiResponse::success(handle.all_series().await?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use replay_core::Row;
    use tower::ServiceExt;

    fn state() -> AppState {
        let btc = AssetId::new("BTC");
        let eth = AssetId::new("ETH");
        let rows = (0..10)
            .map(|i| {
                Row::new(format!("d{i}"))
                    .with_quote(btc.clone(), 100.0 + i as f64, 1.0)
                    .with_quote(eth.clone(), 10.0 + 2.0 * i as f64, 1.0)
            })
            .collect();
        let dataset = Dataset::new(vec![btc.clone(), eth.clone()], rows).unwrap();
        let config = ReplayConfig {
            assets: vec![btc, eth],
            tail_size: 4,
            // Long enough that no tick fires during a test
            tick_interval_ms: 3_600_000,
            ..ReplayConfig::default()
        };
        AppState::new(dataset, config)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_and_get_session() {
        let state = state();
        let app = replay_routes().with_state(state.clone());

        let response = app
            .clone()
            .oneshot(request("POST", "/api/replay/sessions"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["state"], "stopped");
        assert_eq!(body["data"]["boundary"]["seen_len"], 6);
        assert_eq!(body["data"]["boundary"]["pending_len"], 4);
        assert_eq!(body["data"]["ranking"]["entries"][0]["asset_id"], "ETH");

        let response = app
            .clone()
            .oneshot(request("POST", &format!("/api/replay/sessions/{id}/start")))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["data"]["state"], "running");

        let response = app
            .oneshot(request("POST", &format!("/api/replay/sessions/{id}/trigger/rewind")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["state"], "running");
    }

    #[tokio::test]
    async fn test_series_and_unknown_asset() {
        let state = state();
        let handle = state.open_session(None, None).await.unwrap();
        let app = replay_routes().with_state(state);
        let id = handle.id().to_string();

        let response = app
            .clone()
            .oneshot(request("GET", &format!("/api/replay/sessions/{id}/series/BTC")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["closes"].as_array().unwrap().len(), 6);

        let response = app
            .oneshot(request("GET", &format!("/api/replay/sessions/{id}/series/DOGE")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_session_and_oversized_tail() {
        let state = state();
        let app = replay_routes().with_state(state.clone());

        let response = app
            .oneshot(request("GET", "/api/replay/sessions/nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let err = state.open_session(Some(11), None).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_open_session_rejects_zero_rate() {
        let state = state();
        let app = replay_routes().with_state(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/replay/sessions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"rate": 0, "tail_size": 2}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
        assert!(state.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_session_honours_body() {
        let state = state();
        let app = replay_routes().with_state(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/replay/sessions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"rate": 2, "tail_size": 2}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["rate"], 2);
        assert_eq!(body["data"]["state"], "stopped");
        assert_eq!(body["data"]["boundary"]["pending_len"], 2);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(request("GET", &format!("/api/replay/sessions/{id}/series")))
            .await
            .unwrap();
        let body = body_json(response).await;
        let series = body["data"].as_array().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0]["closes"].as_array().unwrap().len(), 8);
        assert_eq!(series[1]["closes"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_rate_update_and_close() {
        let state = state();
        let handle = state.open_session(None, None).await.unwrap();
        let app = replay_routes().with_state(state.clone());
        let id = handle.id().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/replay/sessions/{id}/rate"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"rate": 3}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["data"]["rate"], 3);

        let response = app
            .oneshot(request("DELETE", &format!("/api/replay/sessions/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.sessions.read().await.is_empty());
    }
}
