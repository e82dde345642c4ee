//! Library-facing error type.
//!
//! Recoverable conditions (`NotDetected`, `NoSections`, `TooManySections`)
//! are constructed by `attribution::attribute` and caught at the
//! orchestration layer (`analyzer::analyze`), which converts them to an
//! empty result plus a log line rather than propagating them — callers
//! invoking `attribution`/`reducer` directly, bypassing `analyze`, see
//! them as ordinary `Err` values instead.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("scanner did not detect the unmodified input")]
    NotDetected,

    #[error("section attribution produced no candidates")]
    NoSections,

    #[error("{0} sections independently trigger detection; retry with isolate strategy")]
    TooManySections(usize),

    #[error("scanner transport failed: {0}")]
    ScannerTransportFailure(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("unsupported container format: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
