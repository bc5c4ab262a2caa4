use std::{fs::OpenOptions, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{cli::Args, stats::Summary};

/// One CSV row per bench invocation. Times are in milliseconds; `mean` is
/// what the evaluator compares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub strategy: String,
    pub signals: usize,
    pub sources: usize,
    pub producers: usize,
    pub emits: usize,
    pub runs: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Record {
    pub fn new(args: &Args, summary: &Summary) -> Self {
        let ms = |d: std::time::Duration| d.as_secs_f64() * 1000.0;
        Self {
            strategy: args.strategy.to_string(),
            signals: args.signals.get(),
            sources: args.sources.get(),
            producers: args.producers.get(),
            emits: args.emits.get(),
            runs: summary.runs,
            mean: ms(summary.mean),
            median: ms(summary.median),
            min: ms(summary.min),
            max: ms(summary.max),
        }
    }
}

/// Appends `record`, writing the header only into a new or empty file.
pub fn append(path: &Path, record: &Record) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Opening {} failed", path.display()))?;
    let fresh = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(fresh)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}
