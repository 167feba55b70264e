use std::path::PathBuf;

/// Errors that stop a chunk (or the whole run, when raised while planning).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("read failed at byte {offset}")]
    Read {
        offset: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record at byte {offset}: {reason} in {line:?}")]
    MalformedRecord {
        offset: u64,
        reason: &'static str,
        line: String,
    },
    #[error("cancelled after another chunk failed")]
    Cancelled,
}

/// Why a value span was rejected. The record is dropped and counted, the chunk goes on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("empty value")]
    Empty,
    #[error("unexpected byte {byte:#04x} at position {pos}")]
    InvalidByte { byte: u8, pos: usize },
    #[error("too many digits")]
    Overflow,
}
