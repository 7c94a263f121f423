//! Recorder settings persistence via TOML.
//!
//! Settings are stored at `<config_dir>/reelcap/settings.toml`.
//! Missing or corrupted config files return sensible defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use reelcap_media::RecordingSpec;
use serde::{Deserialize, Serialize};

/// User-configurable recorder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory capture segments are written to.
    pub output_dir: PathBuf,
    /// Video output frame rate.
    pub frame_rate: u32,
    /// Video target bit rate in bits per second.
    pub video_bit_rate: u32,
    /// Screen (system) audio sample rate in Hz.
    pub screen_audio_sample_rate: u32,
    pub screen_audio_bit_rate: u32,
    /// Microphone sample rate in Hz.
    pub mic_audio_sample_rate: u32,
    pub mic_audio_bit_rate: u32,
    /// Coded video format name handed to the writer backend.
    pub video_codec: String,
    /// Coded audio format name handed to the writer backend.
    pub audio_codec: String,
}

impl Default for Settings {
    fn default() -> Self {
        let output_dir = directories::ProjectDirs::from("", "", "reelcap")
            .map(|d| d.data_dir().join("records"))
            .unwrap_or_else(|| PathBuf::from("reelcap-records"));
        let spec = RecordingSpec::default();

        Self {
            output_dir,
            frame_rate: spec.frame_rate,
            video_bit_rate: spec.video_bit_rate,
            screen_audio_sample_rate: spec.screen_audio_sample_rate,
            screen_audio_bit_rate: spec.screen_audio_bit_rate,
            mic_audio_sample_rate: spec.mic_audio_sample_rate,
            mic_audio_bit_rate: spec.mic_audio_bit_rate,
            video_codec: spec.video_codec,
            audio_codec: spec.audio_codec,
        }
    }
}

impl Settings {
    /// Load settings from the default config path.
    ///
    /// Returns defaults if the file doesn't exist or is corrupted.
    pub fn load() -> Self {
        Self::load_from_dir(Self::config_dir())
    }

    /// Save settings to the default config path.
    pub fn save(&self) -> Result<()> {
        self.save_to_dir(Self::config_dir())
    }

    /// Load settings from a specific config directory.
    pub fn load_from_dir(config_dir: PathBuf) -> Self {
        let path = config_dir.join("settings.toml");
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    tracing::info!(path = %path.display(), "settings loaded");
                    settings
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "corrupted settings file, using defaults"
                    );
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %path.display(),
                    "settings file not found, using defaults"
                );
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "could not read settings file, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save settings to a specific config directory.
    pub fn save_to_dir(&self, config_dir: PathBuf) -> Result<()> {
        std::fs::create_dir_all(&config_dir).with_context(|| {
            format!("failed to create config directory: {}", config_dir.display())
        })?;
        let path = config_dir.join("settings.toml");
        let contents = toml::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// The recording configuration these settings describe.
    pub fn recording_spec(&self) -> RecordingSpec {
        RecordingSpec {
            frame_rate: self.frame_rate,
            video_bit_rate: self.video_bit_rate,
            screen_audio_sample_rate: self.screen_audio_sample_rate,
            screen_audio_bit_rate: self.screen_audio_bit_rate,
            mic_audio_sample_rate: self.mic_audio_sample_rate,
            mic_audio_bit_rate: self.mic_audio_bit_rate,
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
        }
    }

    fn config_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "reelcap")
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("reelcap-config"))
    }
}
