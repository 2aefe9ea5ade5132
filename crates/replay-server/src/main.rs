//! replay-server: split, rank, or live-replay a multi-asset price dataset.
//!
//! Usage:
//!   replay-server split [--tail N] [--out-dir DIR]
//!   replay-server rank [--output FILE]
//!   replay-server serve [--rate N] [--interval-ms MS] [--print]
//!
//! Every command reads `REPLAY_*` settings from the environment (or `.env`);
//! `--data PATH` overrides `REPLAY_DATA_PATH`.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use replay_server::commands;
use replay_server::ReplayConfig;

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  replay-server split [--tail N] [--out-dir DIR]   Write seen/pending CSV files");
    eprintln!("  replay-server rank [--output FILE]               Rank the full dataset");
    eprintln!("  replay-server serve [--rate N] [--interval-ms MS] [--print]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --data PATH        Dataset CSV (default: REPLAY_DATA_PATH or crypto_data.csv)");
    std::process::exit(1);
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1).map(|s| s.as_str()) else {
        usage();
    };

    let mut config = ReplayConfig::from_env()?;
    if let Some(path) = flag_value(&args, "--data") {
        config.data_path = PathBuf::from(path);
    }

    match command {
        "split" => {
            if let Some(tail) = flag_value(&args, "--tail") {
                config.tail_size = tail.parse().context("--tail must be an integer")?;
            }
            let out_dir = PathBuf::from(flag_value(&args, "--out-dir").unwrap_or("."));

            let dataset = commands::load_dataset(&config)?;
            let out = commands::split(dataset, config.tail_size, &out_dir)?;
            tracing::info!(
                "Split complete: {} rows -> {:?}, {} rows -> {:?}",
                out.seen_rows,
                out.seen_path,
                out.pending_rows,
                out.pending_path
            );
        }
        "rank" => {
            let output = PathBuf::from(flag_value(&args, "--output").unwrap_or("crm_ranking.json"));
            let dataset = commands::load_dataset(&config)?;
            let source = config.data_path.display().to_string();
            let snapshot = commands::rank(&dataset, &source, Some(&output))?;

            println!("Crypto Ranking by Growth/Loss Percentage:");
            print!("{}", snapshot.ranking);
        }
        "serve" => {
            if let Some(rate) = flag_value(&args, "--rate") {
                let rate: usize = rate.parse().context("--rate must be an integer")?;
                config.rate = NonZeroUsize::new(rate)
                    .ok_or_else(|| anyhow::anyhow!("--rate must be greater than zero"))?;
            }
            if let Some(ms) = flag_value(&args, "--interval-ms") {
                config.tick_interval_ms = ms.parse().context("--interval-ms must be an integer")?;
            }
            config.validate()?;

            let print_table = args.iter().any(|a| a == "--print");
            tracing::info!(
                "Serving {:?}: tail={}, rate={}, interval={}ms",
                config.data_path,
                config.tail_size,
                config.rate,
                config.tick_interval_ms
            );
            commands::serve(config, print_table).await?;
        }
        _ => usage(),
    }

    Ok(())
}
