//! Pipeline error taxonomy.
//!
//! Two classes matter to callers: fatal configuration errors (a mismatch
//! that would corrupt every subsequent sample, so the session must stop)
//! and per-sample conditions the router skips internally with a log line
//! and a metric. Only the former surface as `Err` from the router.

use thiserror::Error;

use crate::sample::SampleKind;

/// Errors surfaced by the capture pipeline.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The source delivers audio at a rate the destination stream was
    /// not configured for. Persistent for the whole session, so fatal.
    #[error("{kind:?} sample rate {got} Hz does not match configured {want} Hz")]
    SampleRateMismatch {
        kind: SampleKind,
        got: u32,
        want: u32,
    },

    #[error("unsupported channel count {0}")]
    UnsupportedChannels(u16),

    #[error("luma plane too small: need {need} bytes, have {have}")]
    LumaPlaneTooSmall { need: usize, have: usize },

    #[error("chroma plane too small: need {need} bytes, have {have}")]
    ChromaPlaneTooSmall { need: usize, have: usize },

    #[error("capture already finalized")]
    AlreadyFinished,

    #[error(transparent)]
    Writer(#[from] reelcap_writer::WriterError),
}
