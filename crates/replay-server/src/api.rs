use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use replay_core::ReplayError;
use serde::Serialize;
use serde_json::json;

/// Envelope for every successful JSON response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<ReplayError> for AppError {
    fn from(err: ReplayError) -> Self {
        match err {
            ReplayError::UnknownAsset(_) | ReplayError::SessionClosed => {
                AppError::NotFound(err.to_string())
            }
            ReplayError::InvalidConfig(_)
            | ReplayError::InsufficientData { .. }
            | ReplayError::DataIntegrity { .. } => AppError::BadRequest(err.to_string()),
            ReplayError::Csv(_) | ReplayError::Io(_) => AppError::Internal(err.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "data": null,
            "error": message,
        }));

        (status, body).into_response()
    }
}
