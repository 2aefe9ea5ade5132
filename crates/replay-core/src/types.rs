use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{ReplayError, Result};

/// Tickers tracked by the reference dataset, in enumeration order.
pub const REFERENCE_ASSETS: &[&str] = &["BTC", "ETH", "USDT", "BNB"];

/// Asset identifier (ticker)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self(ticker.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the close-price column for this asset, e.g. `Close (BTC)`
    pub fn close_column(&self) -> String {
        format!("Close ({})", self.0)
    }

    /// Name of the volume column for this asset, e.g. `Volume (BTC)`
    pub fn volume_column(&self) -> String {
        format!("Volume ({})", self.0)
    }

    /// The four-asset universe of the reference dataset
    pub fn reference_universe() -> Vec<AssetId> {
        REFERENCE_ASSETS.iter().map(|t| AssetId::new(*t)).collect()
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AssetId {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ReplayError::InvalidConfig("empty asset ticker".to_string()));
        }
        Ok(AssetId::new(trimmed))
    }
}

/// Close price and volume of one asset on one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    pub close: f64,
    pub volume: f64,
}

/// One timestamped row of the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Timestamp as it appears in the source
    pub timestamp: String,
    pub quotes: HashMap<AssetId, AssetQuote>,
}

impl Row {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            quotes: HashMap::new(),
        }
    }

    pub fn with_quote(mut self, asset: AssetId, close: f64, volume: f64) -> Self {
        self.quotes.insert(asset, AssetQuote { close, volume });
        self
    }

    pub fn quote(&self, asset: &AssetId) -> Option<&AssetQuote> {
        self.quotes.get(asset)
    }

    pub fn close(&self, asset: &AssetId) -> Option<f64> {
        self.quote(asset).map(|q| q.close)
    }
}

/// Full ordered dataset over a fixed asset universe.
///
/// Every row is guaranteed to carry a finite quote for every tracked asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    assets: Vec<AssetId>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset, rejecting rows that miss a tracked asset.
    pub fn new(assets: Vec<AssetId>, rows: Vec<Row>) -> Result<Self> {
        validate_universe(&assets)?;

        for (idx, row) in rows.iter().enumerate() {
            for asset in &assets {
                let quote = row
                    .quote(asset)
                    .ok_or_else(|| ReplayError::integrity(idx, format!("missing asset {}", asset)))?;
                if !quote.close.is_finite() {
                    return Err(ReplayError::integrity(
                        idx,
                        format!("non-finite close for {}", asset),
                    ));
                }
                if !quote.volume.is_finite() {
                    return Err(ReplayError::integrity(
                        idx,
                        format!("non-finite volume for {}", asset),
                    ));
                }
            }
        }

        Ok(Self { assets, rows })
    }

    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_parts(self) -> (Vec<AssetId>, Vec<Row>) {
        (self.assets, self.rows)
    }
}

fn validate_universe(assets: &[AssetId]) -> Result<()> {
    if assets.is_empty() {
        return Err(ReplayError::InvalidConfig(
            "asset universe must not be empty".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for asset in assets {
        if !seen.insert(asset) {
            return Err(ReplayError::InvalidConfig(format!(
                "duplicate asset in universe: {}",
                asset
            )));
        }
    }
    Ok(())
}

/// Per-asset projection of a row slice, for charting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    pub asset: AssetId,
    pub timestamps: Vec<String>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl AssetSeries {
    pub fn from_rows(asset: &AssetId, rows: &[Row]) -> Self {
        let mut timestamps = Vec::with_capacity(rows.len());
        let mut closes = Vec::with_capacity(rows.len());
        let mut volumes = Vec::with_capacity(rows.len());

        for row in rows {
            if let Some(quote) = row.quote(asset) {
                timestamps.push(row.timestamp.clone());
                closes.push(quote.close);
                volumes.push(quote.volume);
            }
        }

        Self {
            asset: asset.clone(),
            timestamps,
            closes,
            volumes,
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}
