use crate::{
    compute::AggTable,
    error::Error,
    parse::{read_value, split_record, strip_terminator},
    plan::ChunkRange,
};
use log::debug;
use std::{
    fs::File,
    io::{BufRead, BufReader, Seek, SeekFrom},
    path::Path,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

// read buffer per worker. anything decently big but not too big seems to be reasonably fast.
pub const BUF_SIZE: usize = 1 << 21;

// how many records go by between progress counter updates
const PROGRESS_EVERY: u64 = 1 << 14;

#[derive(Debug, Default)]
pub struct ChunkOutput {
    pub table: AggTable,
    pub records: u64,
    pub invalid: u64,
}

/// Handles shared between a worker and the rest of the run. The worker only reads `cancel`,
/// and it is the only writer of `progress` (bytes of its range consumed so far).
#[derive(Clone, Copy)]
pub struct Signals<'a> {
    pub cancel: &'a AtomicBool,
    pub progress: &'a AtomicU64,
}

/// Aggregates one range of the file at `path` through its own file handle.
pub fn process_range(path: &Path, range: ChunkRange, signals: Signals) -> Result<ChunkOutput, Error> {
    let mut input = File::open(path).map_err(|source| Error::Open {
        path: path.to_owned(),
        source,
    })?;
    input
        .seek(SeekFrom::Start(range.start))
        .map_err(|source| Error::Read {
            offset: range.start,
            source,
        })?;
    process_chunk(BufReader::with_capacity(BUF_SIZE, input), range, signals)
}

/// Reads records from `reader`, which must be positioned at `range.start`, until `range.end`.
///
/// A record without a `;` or with an empty key aborts the chunk. A record whose value doesn't
/// parse is counted in `invalid` and skipped. Blank lines are ignored.
pub fn process_chunk<R: BufRead>(
    mut reader: R,
    range: ChunkRange,
    signals: Signals,
) -> Result<ChunkOutput, Error> {
    let mut out = ChunkOutput::default();
    let mut line = Vec::with_capacity(128);
    let mut pos = range.start;
    let mut seen = 0u64;

    while pos < range.end {
        if signals.cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|source| Error::Read {
                offset: pos,
                source,
            })?;
        if read == 0 {
            break;
        }
        let offset = pos;
        pos += read as u64;

        let record = strip_terminator(&line);
        if record.is_empty() {
            continue;
        }
        let malformed = |reason| Error::MalformedRecord {
            offset,
            reason,
            line: String::from_utf8_lossy(record).into_owned(),
        };
        let Some((key, value)) = split_record(record) else {
            return Err(malformed("no ';' delimiter"));
        };
        if key.is_empty() {
            return Err(malformed("empty key"));
        }
        match read_value(value) {
            Ok(value) => {
                out.table.insert(key, value);
                out.records += 1;
            }
            Err(e) => {
                debug!("skipping record at byte {offset}: {e}");
                out.invalid += 1;
            }
        }

        seen += 1;
        if seen % PROGRESS_EVERY == 0 {
            signals.progress.store(pos - range.start, Ordering::Relaxed);
        }
    }

    signals.progress.store(pos - range.start, Ordering::Relaxed);
    Ok(out)
}
