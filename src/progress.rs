use crossbeam::channel::{select, tick, Receiver};
use log::info;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Logs how much of the input has been consumed every `interval`, until `done` disconnects.
///
/// Each counter belongs to one worker; this only ever reads them.
pub fn report_progress(counters: &[AtomicU64], total: u64, interval: Duration, done: Receiver<()>) {
    let begin = Instant::now();
    let ticker = tick(interval);
    loop {
        select! {
            recv(ticker) -> _ => {
                let processed = bytes_processed(counters);
                info!(
                    "progress: {:.1}% ({processed}/{total} bytes) after {:.1?}",
                    percent(processed, total),
                    begin.elapsed()
                );
            }
            recv(done) -> _ => break,
        }
    }
}

pub fn bytes_processed(counters: &[AtomicU64]) -> u64 {
    counters.iter().map(|c| c.load(Ordering::Relaxed)).sum()
}

fn percent(processed: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.;
    }
    processed as f64 / total as f64 * 100.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_processed() {
        let counters = [AtomicU64::new(10), AtomicU64::new(0), AtomicU64::new(32)];
        assert_eq!(bytes_processed(&counters), 42);
        assert_eq!(percent(42, 84), 50.);
        assert_eq!(percent(0, 0), 100.);
    }

    #[test]
    fn test_report_progress_stops_when_done_disconnects() {
        let counters = [AtomicU64::new(1)];
        let (done_tx, done_rx) = crossbeam::channel::bounded::<()>(0);
        std::thread::scope(|scope| {
            let handle = scope.spawn(|| {
                report_progress(&counters, 2, Duration::from_millis(1), done_rx)
            });
            std::thread::sleep(Duration::from_millis(20));
            drop(done_tx);
            handle.join().unwrap();
        });
    }
}
