use crate::run::RunConfig;
use clap::Parser;
use std::{ffi::OsString, path::PathBuf, time::Duration};

/// Per-key min/mean/max over a large file of `key;value` lines.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input file, one `key;value` record per line
    #[arg(default_value = "measurements.txt")]
    pub path: PathBuf,

    /// Number of chunks, each processed by its own thread [default: available parallelism]
    #[arg(short = 'n', long)]
    pub chunks: Option<usize>,

    /// Only report this key, as key=min/mean/max/count. Matched byte for byte
    #[arg(short, long)]
    pub key: Option<OsString>,

    /// Seconds between progress log lines, 0 disables them
    #[arg(long, default_value_t = 5)]
    pub progress_interval: u64,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fail unless the report is identical to this file
    #[arg(long)]
    pub expected: Option<PathBuf>,
}

impl Args {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            path: self.path.clone(),
            chunks: self.chunks.unwrap_or_else(default_chunks),
            progress_interval: (self.progress_interval > 0)
                .then(|| Duration::from_secs(self.progress_interval)),
        }
    }
}

pub fn default_chunks() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
