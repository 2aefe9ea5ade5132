use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    #[error("Insufficient data: tail of {requested} rows requested, dataset has {available}")]
    InsufficientData { requested: usize, available: usize },

    #[error("Data integrity error at row {row}: {detail}")]
    DataIntegrity { row: usize, detail: String },

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Session closed")]
    SessionClosed,
}

impl ReplayError {
    pub(crate) fn integrity(row: usize, detail: impl Into<String>) -> Self {
        ReplayError::DataIntegrity {
            row,
            detail: detail.into(),
        }
    }
}

impl From<csv::Error> for ReplayError {
    fn from(err: csv::Error) -> Self {
        ReplayError::Csv(err.to_string())
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(err: std::io::Error) -> Self {
        ReplayError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReplayError>;
