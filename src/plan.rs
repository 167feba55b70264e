use crate::error::Error;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

/// A half-open byte range `[start, end)` of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits `[0, size)` into at most `chunks` ranges that all end right after a `\n` (except
/// possibly the last, which ends at `size`).
///
/// Each boundary is found by seeking to `start + size / chunks` and reading up to and including
/// the next terminator. Ranges that would come out empty are dropped, so a small file can
/// produce fewer ranges than asked for. An empty file produces none.
pub fn plan_chunks<R: Read + Seek>(
    input: &mut R,
    size: u64,
    chunks: usize,
) -> Result<Vec<ChunkRange>, Error> {
    if size == 0 {
        return Ok(Vec::new());
    }
    let chunks = chunks.max(1) as u64;
    let approx_chunk_len = size / chunks;

    let mut ranges = Vec::with_capacity(chunks as usize);
    let mut skipped = Vec::new();
    let mut start = 0;
    for i in 0..chunks {
        if start >= size {
            break;
        }
        let nominal = start + approx_chunk_len;
        let end = if i == chunks - 1 || nominal >= size {
            size
        } else {
            let read_err = |source| Error::Read {
                offset: nominal,
                source,
            };
            input.seek(SeekFrom::Start(nominal)).map_err(read_err)?;
            skipped.clear();
            let read = BufReader::new(&mut *input)
                .read_until(b'\n', &mut skipped)
                .map_err(read_err)?;
            nominal + read as u64
        };
        if end > start {
            ranges.push(ChunkRange { start, end });
        }
        start = end;
    }
    Ok(ranges)
}

/// Opens `path` and plans its chunks. Returns the file size along with the ranges.
pub fn plan_file(path: &Path, chunks: usize) -> Result<(u64, Vec<ChunkRange>), Error> {
    let open_err = |source| Error::Open {
        path: path.to_owned(),
        source,
    };
    let mut input = File::open(path).map_err(open_err)?;
    let size = input.metadata().map_err(open_err)?.len();
    let ranges = plan_chunks(&mut input, size, chunks)?;
    Ok((size, ranges))
}
