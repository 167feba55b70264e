use crate::{
    compute::{merge_tables, AggTable},
    error::Error,
    plan::plan_file,
    progress::report_progress,
    worker::{process_range, ChunkOutput, Signals},
};
use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub path: PathBuf,
    pub chunks: usize,
    /// `None` turns progress logging off.
    pub progress_interval: Option<Duration>,
}

#[derive(Debug)]
pub struct Summary {
    pub table: AggTable,
    pub size: u64,
    pub chunks: usize,
    pub records: u64,
    pub invalid: u64,
}

/// Plans the input, aggregates every chunk on its own thread, then merges the results.
///
/// The first chunk to fail raises a shared cancel flag, which the others check between
/// records. If anything failed, no table is returned.
pub fn run(config: &RunConfig) -> anyhow::Result<Summary> {
    let (size, ranges) = plan_file(&config.path, config.chunks)
        .with_context(|| format!("failed to plan chunks for {}", config.path.display()))?;
    info!("processing {size} bytes in {} chunks", ranges.len());
    for (i, range) in ranges.iter().enumerate() {
        debug!("chunk {i}: {}..{}", range.start, range.end);
    }

    let cancel = AtomicBool::new(false);
    let progress = ranges.iter().map(|_| AtomicU64::new(0)).collect::<Vec<_>>();

    // spin up a thread for each chunk, plus the progress logger if there is one.
    let results = std::thread::scope(|scope| {
        let (done_tx, done_rx) = crossbeam::channel::bounded::<()>(0);
        if let Some(interval) = config.progress_interval {
            let progress = &progress;
            scope.spawn(move || report_progress(progress, size, interval, done_rx));
        }

        let results = ranges
            .iter()
            .zip(&progress)
            .map(|(range, counter)| {
                let cancel = &cancel;
                scope.spawn(move || {
                    let signals = Signals {
                        cancel,
                        progress: counter,
                    };
                    let result = process_range(&config.path, *range, signals);
                    if matches!(result, Err(ref e) if !matches!(e, Error::Cancelled)) {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    result
                })
            })
            .collect::<Vec<_>>() // collect here to eagerly spin up the threads
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>();

        // all workers are joined, let the progress logger go
        drop(done_tx);
        results
    });

    let mut outputs: Vec<ChunkOutput> = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    let mut cancelled = 0;
    for (i, (result, range)) in results.into_iter().zip(&ranges).enumerate() {
        match result {
            Ok(Ok(out)) => {
                debug!("chunk {i}: {} records, {} keys", out.records, out.table.len());
                outputs.push(out);
            }
            Ok(Err(Error::Cancelled)) => cancelled += 1,
            Ok(Err(e)) => failures.push(
                anyhow::Error::new(e)
                    .context(format!("chunk {i} ({}..{}) failed", range.start, range.end)),
            ),
            Err(_) => failures.push(anyhow!("chunk {i} worker panicked")),
        }
    }
    let failed = failures.len();
    if let Some(first) = failures.into_iter().next() {
        return Err(first.context(format!(
            "{failed} of {} chunks failed, {cancelled} cancelled",
            ranges.len()
        )));
    }

    let records: u64 = outputs.iter().map(|o| o.records).sum();
    let invalid: u64 = outputs.iter().map(|o| o.invalid).sum();
    if invalid > 0 {
        warn!("skipped {invalid} records with invalid values");
    }
    let table = merge_tables(outputs.into_iter().map(|o| o.table));
    info!("aggregated {records} records into {} keys", table.len());

    Ok(Summary {
        table,
        size,
        chunks: ranges.len(),
        records,
        invalid,
    })
}
