//! Recording library boundary.
//!
//! Post-capture conveniences over finished segments: listing, remux to
//! a playable preview, thumbnail generation, preset encodes, publish.
//! All of these call out to an external encoder/muxer and may fail for
//! reasons outside this process; they report failure as an absent or
//! false result, never as an error, so callers treat "no result" as a
//! normal outcome.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Shareable-output encode presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingPreset {
    /// Quarter-duration timelapse at reduced quality.
    FourTimeSpeedLowQuality,
    /// Source speed, reduced bitrate.
    LowQuality,
    /// Source speed and quality.
    Original,
}

impl EncodingPreset {
    /// Filename tag appended to encoded outputs.
    pub fn tag(&self) -> &'static str {
        match self {
            EncodingPreset::FourTimeSpeedLowQuality => "4xLow",
            EncodingPreset::LowQuality => "low",
            EncodingPreset::Original => "orig",
        }
    }
}

/// One finished capture segment on disk.
#[derive(Debug, Clone)]
pub struct RecordingEntry {
    pub path: PathBuf,
    pub size: u64,
    pub created: SystemTime,
}

/// Boundary to the post-capture tooling.
pub trait RecordingLibrary {
    /// Finished segments, newest path last.
    fn list_recordings(&self) -> Vec<RecordingEntry>;

    /// Remux a segment into a playable preview file.
    fn remux(&self, recording: &Path) -> Option<PathBuf>;

    /// Produce (or refresh) the segment's thumbnail. Best effort.
    fn generate_thumbnail(&self, recording: &Path);

    /// Encode a segment with the given preset, reporting
    /// `(current, total)` progress as the encode advances.
    fn encode(
        &self,
        preset: EncodingPreset,
        recording: &Path,
        on_progress: &dyn Fn(f64, f64),
    ) -> Option<PathBuf>;

    /// Export a segment to the shared media store.
    fn publish(&self, recording: &Path) -> bool;
}

/// Library over a directory of `.cap` segments.
///
/// Listing is native; the remux/thumbnail/encode/publish operations
/// need an encoder backend this build does not link, so they report
/// the absent result their contract allows.
#[derive(Debug, Clone)]
pub struct SegmentLibrary {
    records_dir: PathBuf,
}

impl SegmentLibrary {
    pub fn new(records_dir: PathBuf) -> Self {
        Self { records_dir }
    }
}

impl RecordingLibrary for SegmentLibrary {
    fn list_recordings(&self) -> Vec<RecordingEntry> {
        let entries = match std::fs::read_dir(&self.records_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    dir = %self.records_dir.display(),
                    error = %e,
                    "could not read records directory"
                );
                return Vec::new();
            }
        };

        let mut recordings: Vec<RecordingEntry> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("cap") {
                    return None;
                }
                let meta = entry.metadata().ok()?;
                Some(RecordingEntry {
                    size: meta.len(),
                    created: meta.created().or_else(|_| meta.modified()).ok()?,
                    path,
                })
            })
            .collect();
        recordings.sort_by(|a, b| a.path.cmp(&b.path));
        recordings
    }

    fn remux(&self, recording: &Path) -> Option<PathBuf> {
        tracing::warn!(
            recording = %recording.display(),
            "remux unavailable: no encoder backend linked"
        );
        None
    }

    fn generate_thumbnail(&self, recording: &Path) {
        tracing::warn!(
            recording = %recording.display(),
            "thumbnail generation unavailable: no encoder backend linked"
        );
    }

    fn encode(
        &self,
        preset: EncodingPreset,
        recording: &Path,
        _on_progress: &dyn Fn(f64, f64),
    ) -> Option<PathBuf> {
        tracing::warn!(
            recording = %recording.display(),
            preset = preset.tag(),
            "encode unavailable: no encoder backend linked"
        );
        None
    }

    fn publish(&self, recording: &Path) -> bool {
        tracing::warn!(
            recording = %recording.display(),
            "publish unavailable: no encoder backend linked"
        );
        false
    }
}
