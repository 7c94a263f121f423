//! Container writer for screen recordings.
//!
//! Owns the output file, per-stream descriptors, and per-stream frame
//! buffers, behind a strictly ordered lifecycle: select codecs, open the
//! output, add and open streams, start output, write interleaved frames,
//! then finish and close everything exactly once.
//!
//! The concrete encoder/muxer backend is pluggable through [`FrameSink`];
//! [`SegmentSink`] writes the raw framed capture segment that the
//! preview/encode layer consumes later.

pub mod error;
pub mod format;
pub mod sink;
pub mod stream;
pub mod testing;
pub mod writer;

pub use error::WriterError;
pub use sink::{FrameSink, SegmentSink};
pub use stream::{
    AudioStreamParams, StreamParams, VideoStreamParams, AUDIO_CHANNELS, AUDIO_FRAME_SAMPLES,
};
pub use writer::{ContainerWriter, FrameGuard};
