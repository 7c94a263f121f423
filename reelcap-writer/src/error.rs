//! Writer error taxonomy.
//!
//! Lifecycle ordering violations (write before start, double teardown,
//! unknown stream) are programming errors on the caller's side, but they
//! surface as inspectable `Err` values rather than panics so the pipeline
//! and its tests can assert on them.

use thiserror::Error;

/// Errors returned by [`ContainerWriter`](crate::ContainerWriter).
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("video codec not selected")]
    VideoCodecNotSelected,

    #[error("audio codec not selected")]
    AudioCodecNotSelected,

    #[error("output file not open")]
    OutputNotOpen,

    #[error("output file already open")]
    OutputAlreadyOpen,

    #[error("stream {0} already registered")]
    StreamAlreadyRegistered(usize),

    #[error("unknown stream {0}")]
    UnknownStream(usize),

    #[error("stream {index} is a {actual} stream, expected {expected}")]
    WrongStreamKind {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("stream {0} is not open")]
    StreamNotOpen(usize),

    #[error("stream {0} already open")]
    StreamAlreadyOpen(usize),

    #[error("stream {0} already finished")]
    StreamAlreadyFinished(usize),

    #[error("stream {0} not finished")]
    StreamNotFinished(usize),

    #[error("stream {0} already closed")]
    StreamAlreadyClosed(usize),

    #[error("output not started")]
    OutputNotStarted,

    #[error("output already started")]
    OutputAlreadyStarted,

    #[error("output already finished")]
    OutputAlreadyFinished,

    #[error("output not finished")]
    OutputNotFinished,

    #[error("output already closed")]
    OutputAlreadyClosed,

    #[error("stream {stream}: output pts went backwards ({prev} -> {got})")]
    PtsWentBackwards { stream: usize, prev: i64, got: i64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
