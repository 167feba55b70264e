pub mod compute;
pub mod config;
pub mod error;
pub mod parse;
pub mod plan;
pub mod progress;
pub mod report;
pub mod run;
pub mod worker;

use anyhow::Context;
use clap::Parser;
use log::info;
use std::io::Write;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = config::Args::parse();
    let begin = std::time::Instant::now();

    let run_config = args.run_config();
    info!(
        "starting with {} chunks on {} threads",
        run_config.chunks,
        config::default_chunks()
    );
    let summary = run::run(&run_config)?;

    let key = args.key.as_deref().map(|k| k.as_encoded_bytes());
    let mut out = Vec::with_capacity(summary.table.len() * 35);
    report::write_report(&mut out, &summary.table, key)?;
    match &args.output {
        Some(path) => std::fs::write(path, &out)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&out)?;
            stdout.flush()?;
        }
    }

    info!(
        "{} records ({} invalid) from {} bytes in {} chunks, elapsed: {}ms",
        summary.records,
        summary.invalid,
        summary.size,
        summary.chunks,
        begin.elapsed().as_millis()
    );

    if let Some(expected) = &args.expected {
        report::compare_expected(&out, expected)?;
    }
    Ok(())
}
