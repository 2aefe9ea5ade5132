//! Growth Ranking
//!
//! Ranks tracked assets by the percentage change between the first and last
//! close price of the seen partition.

use serde::{Deserialize, Serialize};

use crate::types::{AssetId, Row};

/// Growth of one asset over the seen window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub asset_id: AssetId,
    pub start_price: f64,
    pub end_price: f64,
    pub growth_pct: f64,
}

impl RankingEntry {
    pub fn is_growth(&self) -> bool {
        self.growth_pct > 0.0
    }

    /// `Growth` for a positive change, `Loss` otherwise
    pub fn status_label(&self) -> &'static str {
        if self.is_growth() {
            "Growth"
        } else {
            "Loss"
        }
    }
}

/// Percentage change from `start` to `end`; zero when `start` is zero.
///
/// The result is always finite: a subnormal `start` would otherwise overflow
/// to infinity, which JSON cannot carry.
pub fn growth_pct(start: f64, end: f64) -> f64 {
    if start == 0.0 {
        return 0.0;
    }
    (((end - start) / start) * 100.0).clamp(f64::MIN, f64::MAX)
}

/// Assets ordered by descending growth
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub entries: Vec<RankingEntry>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn leader(&self) -> Option<&RankingEntry> {
        self.entries.first()
    }

    /// Fixed-width table: rank, asset, growth, start and end price.
    pub fn render_table(&self) -> String {
        let mut out = format!(
            "{:<5} {:<8} {:>12} {:>14} {:>14}\n",
            "Rank", "Crypto", "Growth (%)", "Start Price", "End Price"
        );
        for (i, e) in self.entries.iter().enumerate() {
            out.push_str(&format!(
                "{:<5} {:<8} {:>12.2} {:>14.2} {:>14.2}\n",
                i + 1,
                e.asset_id.as_str(),
                e.growth_pct,
                e.start_price,
                e.end_price
            ));
        }
        out
    }
}

impl std::fmt::Display for Ranking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.entries.iter().enumerate() {
            writeln!(
                f,
                "{}. {}: {:.2}% ({})",
                i + 1,
                e.asset_id,
                e.growth_pct,
                e.status_label()
            )?;
        }
        Ok(())
    }
}

/// Stateless ranking over a row window
#[derive(Debug, Default, Clone, Copy)]
pub struct RankingEngine;

impl RankingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rank `assets` over `seen`.
    ///
    /// An empty window yields an empty ranking. Ties keep the order of
    /// `assets`.
    pub fn rank(&self, assets: &[AssetId], seen: &[Row]) -> Ranking {
        let (first, last) = match (seen.first(), seen.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ranking::default(),
        };

        let mut entries: Vec<RankingEntry> = assets
            .iter()
            .filter_map(|asset| {
                let start_price = first.close(asset)?;
                let end_price = last.close(asset)?;
                Some(RankingEntry {
                    asset_id: asset.clone(),
                    start_price,
                    end_price,
                    growth_pct: growth_pct(start_price, end_price),
                })
            })
            .collect();

        // Vec::sort_by is stable
        entries.sort_by(|a, b| {
            b.growth_pct
                .partial_cmp(&a.growth_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ranking { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rows(closes: &[(&str, &[f64])]) -> (Vec<AssetId>, Vec<Row>) {
        let assets: Vec<AssetId> = closes.iter().map(|(a, _)| AssetId::new(*a)).collect();
        let n = closes[0].1.len();
        let rows = (0..n)
            .map(|i| {
                closes
                    .iter()
                    .fold(Row::new(format!("t{i}")), |row, (a, series)| {
                        row.with_quote(AssetId::new(*a), series[i], 1.0)
                    })
            })
            .collect();
        (assets, rows)
    }

    #[test]
    fn test_fifty_percent_growth() {
        let (assets, seen) = rows(&[("A", &[100.0, 150.0])]);
        let ranking = RankingEngine::new().rank(&assets, &seen);

        assert_eq!(ranking.len(), 1);
        let entry = &ranking.entries[0];
        assert_eq!(entry.start_price, 100.0);
        assert_eq!(entry.end_price, 150.0);
        assert_relative_eq!(entry.growth_pct, 50.0);
    }

    #[test]
    fn test_zero_start_price() {
        let (assets, seen) = rows(&[("A", &[0.0, 12.0]), ("B", &[10.0, 5.0])]);
        let ranking = RankingEngine::new().rank(&assets, &seen);

        let a = ranking.entries.iter().find(|e| e.asset_id.as_str() == "A").unwrap();
        assert_eq!(a.growth_pct, 0.0);
        assert_eq!(ranking.entries[0].asset_id.as_str(), "A");
        assert_relative_eq!(ranking.entries[1].growth_pct, -50.0);
    }

    #[test]
    fn test_subnormal_start_stays_finite() {
        assert_eq!(growth_pct(5e-324, 1.0), f64::MAX);
        assert_eq!(growth_pct(-5e-324, 1.0), f64::MIN);

        let (assets, seen) = rows(&[("A", &[5e-324, 1.0]), ("B", &[10.0, 11.0])]);
        let ranking = RankingEngine::new().rank(&assets, &seen);
        assert_eq!(ranking.entries[0].asset_id.as_str(), "A");
        assert!(ranking.entries.iter().all(|e| e.growth_pct.is_finite()));

        let json = serde_json::to_string(&ranking).unwrap();
        let back: Ranking = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ranking);
    }

    #[test]
    fn test_sorted_descending() {
        let (assets, seen) = rows(&[
            ("BTC", &[100.0, 120.0]),
            ("ETH", &[10.0, 15.0]),
            ("USDT", &[1.0, 1.0]),
            ("BNB", &[50.0, 40.0]),
        ]);
        let ranking = RankingEngine::new().rank(&assets, &seen);

        let order: Vec<&str> = ranking.entries.iter().map(|e| e.asset_id.as_str()).collect();
        assert_eq!(order, vec!["ETH", "BTC", "USDT", "BNB"]);
        assert!(ranking
            .entries
            .windows(2)
            .all(|w| w[0].growth_pct >= w[1].growth_pct));
    }

    #[test]
    fn test_ties_keep_enumeration_order() {
        // X, Y and Z all grow 10%; W grows more and must lead
        let (assets, seen) = rows(&[
            ("X", &[10.0, 11.0]),
            ("Y", &[100.0, 110.0]),
            ("W", &[10.0, 20.0]),
            ("Z", &[1000.0, 1100.0]),
        ]);
        let ranking = RankingEngine::new().rank(&assets, &seen);

        let order: Vec<&str> = ranking.entries.iter().map(|e| e.asset_id.as_str()).collect();
        assert_eq!(order, vec!["W", "X", "Y", "Z"]);
    }

    #[test]
    fn test_empty_window_omits_all_assets() {
        let assets = AssetId::reference_universe();
        let ranking = RankingEngine::new().rank(&assets, &[]);
        assert!(ranking.is_empty());
        assert!(ranking.leader().is_none());
    }

    #[test]
    fn test_single_row_window_is_flat() {
        let (assets, seen) = rows(&[("A", &[42.0])]);
        let ranking = RankingEngine::new().rank(&assets, &seen);
        assert_eq!(ranking.entries[0].growth_pct, 0.0);
    }

    #[test]
    fn test_display_lines() {
        let (assets, seen) = rows(&[("BTC", &[100.0, 150.0]), ("ETH", &[10.0, 9.0])]);
        let ranking = RankingEngine::new().rank(&assets, &seen);

        assert_eq!(ranking.to_string(), "1. BTC: 50.00% (Growth)\n2. ETH: -10.00% (Loss)\n");
    }

    #[test]
    fn test_render_table_has_row_per_entry() {
        let (assets, seen) = rows(&[("BTC", &[100.0, 150.0]), ("ETH", &[10.0, 9.0])]);
        let table = RankingEngine::new().rank(&assets, &seen).render_table();

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("BTC") && lines[1].contains("50.00"));
        assert!(lines[2].contains("-10.00"));
    }
}
