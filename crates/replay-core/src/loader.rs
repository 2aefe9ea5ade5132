//! CSV Dataset Loader
//!
//! Reads and writes the wide price/volume layout: one `Date` column followed
//! by `Close (<TICKER>)` and `Volume (<TICKER>)` columns per asset. Columns
//! belonging to untracked assets are ignored.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ReplayError, Result};
use crate::types::{AssetId, Dataset, Row};

/// Header of the timestamp column
pub const TIMESTAMP_COLUMN: &str = "Date";

/// Column positions for one tracked asset
struct AssetColumns {
    asset: AssetId,
    close: usize,
    volume: usize,
}

/// Load a dataset from a CSV file on disk.
pub fn load_csv_path(path: impl AsRef<Path>, assets: &[AssetId]) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ReplayError::Io(format!("failed to open {:?}: {}", path, e)))?;
    let dataset = load_csv(file, assets)?;
    info!("Loaded {} rows from {:?}", dataset.len(), path);
    Ok(dataset)
}

/// Load a dataset from any CSV source.
///
/// A row with a missing or unparseable asset field fails the whole load with
/// `DataIntegrity` carrying the zero-based data-row index.
pub fn load_csv<R: Read>(source: R, assets: &[AssetId]) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReplayError::Csv(format!("missing column: {}", name)))
    };

    let timestamp_idx = column(TIMESTAMP_COLUMN)?;
    let layout = assets
        .iter()
        .map(|asset| {
            Ok(AssetColumns {
                asset: asset.clone(),
                close: column(&asset.close_column())?,
                volume: column(&asset.volume_column())?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReplayError::integrity(idx, e.to_string()))?;

        let timestamp = record
            .get(timestamp_idx)
            .ok_or_else(|| ReplayError::integrity(idx, "missing timestamp"))?;
        let mut row = Row::new(timestamp);

        for cols in &layout {
            let close = parse_field(&record, cols.close, idx, &cols.asset.close_column())?;
            let volume = parse_field(&record, cols.volume, idx, &cols.asset.volume_column())?;
            row = row.with_quote(cols.asset.clone(), close, volume);
        }

        rows.push(row);
    }

    debug!("Parsed {} CSV rows for {} assets", rows.len(), assets.len());
    Dataset::new(assets.to_vec(), rows)
}

fn parse_field(record: &csv::StringRecord, col: usize, row: usize, name: &str) -> Result<f64> {
    let raw = record
        .get(col)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ReplayError::integrity(row, format!("missing field {}", name)))?;

    raw.parse::<f64>()
        .map_err(|_| ReplayError::integrity(row, format!("invalid {} value {:?}", name, raw)))
}

/// Write rows in the same layout `load_csv` reads.
pub fn write_csv<W: Write>(sink: W, assets: &[AssetId], rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);

    let mut header = vec![TIMESTAMP_COLUMN.to_string()];
    for asset in assets {
        header.push(asset.close_column());
        header.push(asset.volume_column());
    }
    writer.write_record(&header)?;

    for (idx, row) in rows.iter().enumerate() {
        let mut record = vec![row.timestamp.clone()];
        for asset in assets {
            let quote = row
                .quote(asset)
                .ok_or_else(|| ReplayError::integrity(idx, format!("missing asset {}", asset)))?;
            record.push(quote.close.to_string());
            record.push(quote.volume.to_string());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write rows to a CSV file on disk, replacing any existing file.
pub fn write_csv_path(path: impl AsRef<Path>, assets: &[AssetId], rows: &[Row]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| ReplayError::Io(format!("failed to create {:?}: {}", path, e)))?;
    write_csv(file, assets, rows)?;
    info!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}
