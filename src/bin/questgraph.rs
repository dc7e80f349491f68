//! questgraph: run the pipeline over a JSON snapshot and print the
//! metrics report.
//!
//! ```text
//! questgraph <records.json> [config.toml]
//! ```
//!
//! The snapshot is either a `SourceSet` object (`{"quests": [...], ...}`)
//! or a flat array of raw records. Logging follows `RUST_LOG`.

use std::process::ExitCode;

use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use questgraph::{Pipeline, PipelineConfig, RawRecord, SourceSet};

#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Flat(Vec<RawRecord>),
    Grouped(SourceSet),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(records_path) = args.next() else {
        eprintln!("usage: questgraph <records.json> [config.toml]");
        return ExitCode::from(2);
    };
    let config_path = args.next();

    match run(&records_path, config_path.as_deref()) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(records_path: &str, config_path: Option<&str>) -> questgraph::Result<String> {
    let config = match config_path {
        Some(path) => PipelineConfig::load(path)?,
        None => {
            let mut config = PipelineConfig::default();
            config.apply_env()?;
            config
        }
    };

    let text = std::fs::read_to_string(records_path)?;
    let snapshot: Snapshot = serde_json::from_str(&text)?;
    let sources = match snapshot {
        Snapshot::Flat(records) => SourceSet::from_records(records),
        Snapshot::Grouped(set) => set,
    };
    info!(path = records_path, "snapshot loaded");

    let top_n = config.analysis.top_n;
    let output = Pipeline::new(config)?.run(&sources)?;
    output.report(top_n).to_json()
}
