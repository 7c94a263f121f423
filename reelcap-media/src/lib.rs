//! Real-time capture-to-container pipeline.
//!
//! Screen video, system audio, and microphone audio arrive as three
//! independent tagged sample streams; the [`router::SampleRouter`]
//! rebases them onto one monotonic timeline anchored at the first video
//! frame and muxes them through a
//! [`ContainerWriter`](reelcap_writer::ContainerWriter).

pub mod error;
pub mod pixel;
pub mod resample;
pub mod router;
pub mod sample;
pub mod time;

pub use error::MediaError;
pub use router::{RecordingSpec, RouterMetrics, SampleRouter};
pub use sample::{CapturedSample, RawAudioSample, RawVideoSample, SampleKind};
pub use time::{MediaTime, StreamClock};
