//! Container writer lifecycle and scoped per-stream write guards.
//!
//! Ordering contract: `open_video_codec`/`open_audio_codec`, then
//! `open_output`, then `add_*_stream` and `open_video`/`open_audio` per
//! stream, then `start_output` (header barrier), then per-frame
//! `make_frame_writable` → fill → `write_video`/`write_audio`, and finally
//! `finish_stream`* → `finish_output` → `close_stream`* → `close_output`.
//! Every out-of-order call returns a [`WriterError`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::WriterError;
use crate::format::StreamInfo;
use crate::sink::FrameSink;
use crate::stream::{
    AudioFrame, AudioStreamParams, FrameBuffer, StreamParams, StreamPhase, StreamSlot,
    VideoFrame, VideoStreamParams,
};

/// Multi-stream container writer over a pluggable [`FrameSink`].
///
/// Each stream slot sits behind its own mutex so concurrent write paths
/// for different streams only contend on the sink itself; a given
/// stream's fill-and-flush is serialized by the [`FrameGuard`] returned
/// from [`make_frame_writable`](Self::make_frame_writable).
pub struct ContainerWriter<S: FrameSink> {
    sink: Mutex<S>,
    video_codec: Option<String>,
    audio_codec: Option<String>,
    output_open: bool,
    started: bool,
    finished: bool,
    closed: bool,
    streams: BTreeMap<usize, Mutex<StreamSlot>>,
}

impl<S: FrameSink> ContainerWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Mutex::new(sink),
            video_codec: None,
            audio_codec: None,
            output_open: false,
            started: false,
            finished: false,
            closed: false,
            streams: BTreeMap::new(),
        }
    }

    /// Select the coded video format. Must precede `open_output`.
    pub fn open_video_codec(&mut self, name: &str) -> Result<(), WriterError> {
        if self.output_open {
            return Err(WriterError::OutputAlreadyOpen);
        }
        self.video_codec = Some(name.to_string());
        Ok(())
    }

    /// Select the coded audio format. Must precede `open_output`.
    pub fn open_audio_codec(&mut self, name: &str) -> Result<(), WriterError> {
        if self.output_open {
            return Err(WriterError::OutputAlreadyOpen);
        }
        self.audio_codec = Some(name.to_string());
        Ok(())
    }

    /// Create the container file. Requires both codecs to be selected.
    pub fn open_output(&mut self, path: &Path) -> Result<(), WriterError> {
        if self.output_open {
            return Err(WriterError::OutputAlreadyOpen);
        }
        if self.video_codec.is_none() {
            return Err(WriterError::VideoCodecNotSelected);
        }
        if self.audio_codec.is_none() {
            return Err(WriterError::AudioCodecNotSelected);
        }
        self.sink.lock().unwrap().open(path)?;
        self.output_open = true;
        tracing::debug!(path = %path.display(), "output opened");
        Ok(())
    }

    /// Register a video stream under a caller-assigned index.
    pub fn add_video_stream(
        &mut self,
        index: usize,
        params: VideoStreamParams,
    ) -> Result<(), WriterError> {
        self.add_stream(index, StreamParams::Video(params))
    }

    /// Register an audio stream under a caller-assigned index.
    pub fn add_audio_stream(
        &mut self,
        index: usize,
        params: AudioStreamParams,
    ) -> Result<(), WriterError> {
        self.add_stream(index, StreamParams::Audio(params))
    }

    fn add_stream(&mut self, index: usize, params: StreamParams) -> Result<(), WriterError> {
        if !self.output_open {
            return Err(WriterError::OutputNotOpen);
        }
        if self.started {
            return Err(WriterError::OutputAlreadyStarted);
        }
        if self.streams.contains_key(&index) {
            return Err(WriterError::StreamAlreadyRegistered(index));
        }
        tracing::debug!(index, kind = params.kind_name(), "stream registered");
        self.streams.insert(index, Mutex::new(StreamSlot::new(params)));
        Ok(())
    }

    /// Allocate encoder-side state (the scratch frame) for a video stream.
    pub fn open_video(&mut self, index: usize) -> Result<(), WriterError> {
        let slot = self.slot_mut(index)?;
        if slot.phase != StreamPhase::Registered {
            return Err(WriterError::StreamAlreadyOpen(index));
        }
        let StreamParams::Video(params) = slot.params else {
            return Err(WriterError::WrongStreamKind {
                index,
                expected: "video",
                actual: slot.params.kind_name(),
            });
        };
        slot.frame = FrameBuffer::Video(VideoFrame::new(
            params.width as usize,
            params.height as usize,
        ));
        slot.phase = StreamPhase::Opened;
        Ok(())
    }

    /// Allocate encoder-side state (the scratch frame) for an audio stream.
    pub fn open_audio(&mut self, index: usize) -> Result<(), WriterError> {
        let slot = self.slot_mut(index)?;
        if slot.phase != StreamPhase::Registered {
            return Err(WriterError::StreamAlreadyOpen(index));
        }
        let StreamParams::Audio(_) = slot.params else {
            return Err(WriterError::WrongStreamKind {
                index,
                expected: "audio",
                actual: slot.params.kind_name(),
            });
        };
        slot.frame = FrameBuffer::Audio(AudioFrame::new());
        slot.phase = StreamPhase::Opened;
        Ok(())
    }

    /// One-time barrier: writes the container header. All registered
    /// streams must be open, and no frame may be written before this.
    pub fn start_output(&mut self) -> Result<(), WriterError> {
        if !self.output_open {
            return Err(WriterError::OutputNotOpen);
        }
        if self.started {
            return Err(WriterError::OutputAlreadyStarted);
        }
        let mut table = Vec::with_capacity(self.streams.len());
        for (&index, slot) in &self.streams {
            let slot = slot.lock().unwrap();
            if slot.phase != StreamPhase::Opened {
                return Err(WriterError::StreamNotOpen(index));
            }
            let codec = match slot.params {
                StreamParams::Video(_) => self.video_codec.clone().unwrap_or_default(),
                StreamParams::Audio(_) => self.audio_codec.clone().unwrap_or_default(),
            };
            table.push(StreamInfo {
                index: index as u32,
                codec,
                params: slot.params,
            });
        }
        self.sink.lock().unwrap().write_header(&table)?;
        self.started = true;
        tracing::info!(streams = table.len(), "output started");
        Ok(())
    }

    /// Row strides of a video stream's scratch frame, `(luma, chroma)`.
    pub fn video_strides(&self, index: usize) -> Result<(usize, usize), WriterError> {
        let slot = self.slot(index)?;
        match &slot.frame {
            FrameBuffer::Video(frame) => Ok((frame.bytes_per_row(), frame.bytes_per_row())),
            _ => Err(WriterError::WrongStreamKind {
                index,
                expected: "video",
                actual: slot.params.kind_name(),
            }),
        }
    }

    /// Sample-frames per coded frame for an audio stream.
    pub fn audio_frame_samples(&self, index: usize) -> Result<usize, WriterError> {
        let slot = self.slot(index)?;
        match &slot.frame {
            FrameBuffer::Audio(frame) => Ok(frame.num_samples()),
            _ => Err(WriterError::WrongStreamKind {
                index,
                expected: "audio",
                actual: slot.params.kind_name(),
            }),
        }
    }

    /// Claim exclusive write access to a stream's scratch frame.
    ///
    /// The returned guard holds the stream's lock until it is either
    /// consumed by `write_video`/`write_audio` or dropped (skip paths),
    /// so no two samples of the same stream can interleave their
    /// buffer-fill and flush.
    pub fn make_frame_writable(&self, index: usize) -> Result<FrameGuard<'_, S>, WriterError> {
        if !self.started {
            return Err(WriterError::OutputNotStarted);
        }
        if self.finished {
            return Err(WriterError::OutputAlreadyFinished);
        }
        let slot = self
            .streams
            .get(&index)
            .ok_or(WriterError::UnknownStream(index))?
            .lock()
            .unwrap();
        match slot.phase {
            StreamPhase::Opened => Ok(FrameGuard {
                index,
                slot,
                sink: &self.sink,
            }),
            StreamPhase::Registered => Err(WriterError::StreamNotOpen(index)),
            StreamPhase::Finished | StreamPhase::Closed => {
                Err(WriterError::StreamAlreadyFinished(index))
            }
        }
    }

    /// Mark a stream finished; no further writes are accepted on it.
    pub fn finish_stream(&mut self, index: usize) -> Result<(), WriterError> {
        let slot = self.slot_mut(index)?;
        match slot.phase {
            StreamPhase::Opened => {
                slot.phase = StreamPhase::Finished;
                Ok(())
            }
            StreamPhase::Registered => Err(WriterError::StreamNotOpen(index)),
            StreamPhase::Finished | StreamPhase::Closed => {
                Err(WriterError::StreamAlreadyFinished(index))
            }
        }
    }

    /// Write the container trailer. All streams must be finished.
    pub fn finish_output(&mut self) -> Result<(), WriterError> {
        if !self.started {
            return Err(WriterError::OutputNotStarted);
        }
        if self.finished {
            return Err(WriterError::OutputAlreadyFinished);
        }
        for (&index, slot) in &self.streams {
            if slot.lock().unwrap().phase != StreamPhase::Finished {
                return Err(WriterError::StreamNotFinished(index));
            }
        }
        self.sink.lock().unwrap().write_trailer()?;
        self.finished = true;
        tracing::info!("output finished");
        Ok(())
    }

    /// Release a finished stream's buffers.
    pub fn close_stream(&mut self, index: usize) -> Result<(), WriterError> {
        let slot = self.slot_mut(index)?;
        match slot.phase {
            StreamPhase::Finished => {
                slot.frame = FrameBuffer::None;
                slot.phase = StreamPhase::Closed;
                Ok(())
            }
            StreamPhase::Closed => Err(WriterError::StreamAlreadyClosed(index)),
            _ => Err(WriterError::StreamNotFinished(index)),
        }
    }

    /// Close the container file. Requires `finish_output` and all
    /// streams closed; a second call is an error (double teardown).
    pub fn close_output(&mut self) -> Result<(), WriterError> {
        if self.closed {
            return Err(WriterError::OutputAlreadyClosed);
        }
        if !self.finished {
            return Err(WriterError::OutputNotFinished);
        }
        for (&index, slot) in &self.streams {
            if slot.lock().unwrap().phase != StreamPhase::Closed {
                return Err(WriterError::StreamNotFinished(index));
            }
        }
        self.sink.lock().unwrap().close()?;
        self.closed = true;
        Ok(())
    }

    /// Tear down an output that never reached `start_output` (capture
    /// ended before the first video frame revealed the geometry).
    pub fn abort(&mut self) -> Result<(), WriterError> {
        if self.closed {
            return Err(WriterError::OutputAlreadyClosed);
        }
        if self.started {
            return Err(WriterError::OutputAlreadyStarted);
        }
        if self.output_open {
            self.sink.lock().unwrap().close()?;
        }
        self.closed = true;
        tracing::warn!("output aborted before start");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    fn slot(&self, index: usize) -> Result<MutexGuard<'_, StreamSlot>, WriterError> {
        Ok(self
            .streams
            .get(&index)
            .ok_or(WriterError::UnknownStream(index))?
            .lock()
            .unwrap())
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut StreamSlot, WriterError> {
        Ok(self
            .streams
            .get_mut(&index)
            .ok_or(WriterError::UnknownStream(index))?
            .get_mut()
            .unwrap())
    }
}

/// Scoped claim on one stream's scratch frame.
///
/// Fill the frame through the mutable accessors, then consume the guard
/// with [`write_video`](Self::write_video) or
/// [`write_audio`](Self::write_audio). Dropping the guard without
/// writing releases the claim — that is the skip path for rejected
/// samples.
pub struct FrameGuard<'w, S: FrameSink> {
    index: usize,
    slot: MutexGuard<'w, StreamSlot>,
    sink: &'w Mutex<S>,
}

impl<S: FrameSink> FrameGuard<'_, S> {
    pub fn frame_width(&self) -> Result<usize, WriterError> {
        self.video().map(VideoFrame::width)
    }

    pub fn frame_height(&self) -> Result<usize, WriterError> {
        self.video().map(VideoFrame::height)
    }

    /// Row stride of a video plane (both planes share one stride).
    pub fn bytes_per_row(&self, _plane: usize) -> Result<usize, WriterError> {
        self.video().map(VideoFrame::bytes_per_row)
    }

    pub fn plane_mut(&mut self, plane: usize) -> Result<&mut [u8], WriterError> {
        let index = self.index;
        match &mut self.slot.frame {
            FrameBuffer::Video(frame) => Ok(frame.plane_mut(plane)),
            _ => Err(WriterError::WrongStreamKind {
                index,
                expected: "video",
                actual: "audio",
            }),
        }
    }

    pub fn num_samples(&self) -> Result<usize, WriterError> {
        self.audio().map(AudioFrame::num_samples)
    }

    pub fn samples_mut(&mut self) -> Result<&mut [i16], WriterError> {
        let index = self.index;
        match &mut self.slot.frame {
            FrameBuffer::Audio(frame) => Ok(frame.samples_mut()),
            _ => Err(WriterError::WrongStreamKind {
                index,
                expected: "audio",
                actual: "video",
            }),
        }
    }

    /// Encode and mux the filled video frame at `pts`, releasing the claim.
    pub fn write_video(mut self, pts: i64) -> Result<(), WriterError> {
        self.check_pts(pts)?;
        let index = self.index;
        let FrameBuffer::Video(frame) = &self.slot.frame else {
            return Err(WriterError::WrongStreamKind {
                index,
                expected: "video",
                actual: "audio",
            });
        };
        self.sink
            .lock()
            .unwrap()
            .write_video(index as u32, frame, pts)?;
        self.slot.last_pts = Some(pts);
        tracing::trace!(stream = index, pts, "video frame written");
        Ok(())
    }

    /// Encode and mux the filled audio frame at `pts`, releasing the claim.
    pub fn write_audio(mut self, pts: i64) -> Result<(), WriterError> {
        self.check_pts(pts)?;
        let index = self.index;
        let FrameBuffer::Audio(frame) = &self.slot.frame else {
            return Err(WriterError::WrongStreamKind {
                index,
                expected: "audio",
                actual: "video",
            });
        };
        self.sink
            .lock()
            .unwrap()
            .write_audio(index as u32, frame, pts)?;
        self.slot.last_pts = Some(pts);
        tracing::trace!(stream = index, pts, "audio frame written");
        Ok(())
    }

    fn check_pts(&self, pts: i64) -> Result<(), WriterError> {
        if let Some(prev) = self.slot.last_pts {
            if pts < prev {
                return Err(WriterError::PtsWentBackwards {
                    stream: self.index,
                    prev,
                    got: pts,
                });
            }
        }
        Ok(())
    }

    fn video(&self) -> Result<&VideoFrame, WriterError> {
        match &self.slot.frame {
            FrameBuffer::Video(frame) => Ok(frame),
            _ => Err(WriterError::WrongStreamKind {
                index: self.index,
                expected: "video",
                actual: "audio",
            }),
        }
    }

    fn audio(&self) -> Result<&AudioFrame, WriterError> {
        match &self.slot.frame {
            FrameBuffer::Audio(frame) => Ok(frame),
            _ => Err(WriterError::WrongStreamKind {
                index: self.index,
                expected: "audio",
                actual: "video",
            }),
        }
    }
}
