use anyhow::{Context, Result};
use replay_core::{AssetId, REFERENCE_ASSETS};
use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    // Dataset
    pub data_path: PathBuf,              // crypto_data.csv
    pub assets: Vec<AssetId>,            // BTC,ETH,USDT,BNB
    pub tail_size: usize,                // 300 rows held out for replay

    // Playback knobs (independent of each other)
    pub rate: NonZeroUsize,              // rows per tick
    pub tick_interval_ms: u64,           // 1000

    // Server
    pub bind_addr: String,               // 0.0.0.0:3000
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("crypto_data.csv"),
            assets: AssetId::reference_universe(),
            tail_size: 300,
            rate: NonZeroUsize::MIN,
            tick_interval_ms: 1000,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl ReplayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let rate: usize = lookup("REPLAY_RATE")
            .unwrap_or_else(|| defaults.rate.to_string())
            .parse()
            .context("REPLAY_RATE must be a positive integer")?;

        let assets = lookup("REPLAY_ASSETS")
            .unwrap_or_else(|| REFERENCE_ASSETS.join(","))
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<AssetId>())
            .collect::<Result<Vec<_>, _>>()?;

        let config = Self {
            data_path: lookup("REPLAY_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            assets,
            tail_size: lookup("REPLAY_TAIL_SIZE")
                .unwrap_or_else(|| defaults.tail_size.to_string())
                .parse()
                .context("REPLAY_TAIL_SIZE must be a non-negative integer")?,
            rate: NonZeroUsize::new(rate)
                .ok_or_else(|| anyhow::anyhow!("REPLAY_RATE must be greater than zero"))?,
            tick_interval_ms: lookup("REPLAY_INTERVAL_MS")
                .unwrap_or_else(|| defaults.tick_interval_ms.to_string())
                .parse()
                .context("REPLAY_INTERVAL_MS must be an integer")?,
            bind_addr: lookup("REPLAY_BIND_ADDR").unwrap_or(defaults.bind_addr),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            anyhow::bail!("REPLAY_ASSETS must name at least one asset");
        }
        if self.tick_interval_ms == 0 {
            anyhow::bail!("REPLAY_INTERVAL_MS must be greater than zero");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
