use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::audio::{CaptureConfig, PREFERRED_MIME_TYPE};
use crate::language::Language;
use crate::session::SessionConfig;
use crate::synthesis::SynthesisSettings;
use crate::ui::Theme;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub speech: SpeechConfig,
    pub capture: CaptureSection,
    pub synthesis: SynthesisConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub language: Language,
    pub confidence_threshold: f32,
    pub restart_delay_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: Language::EnglishUs,
            confidence_threshold: 0.5,
            restart_delay_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureSection {
    pub sample_rate: u32,
    pub channels: u16,
    pub timeslice_ms: u64,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub preferred_mime_type: String,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            timeslice_ms: 100,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            preferred_mime_type: PREFERRED_MIME_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Voice language; any BCP-47 tag, not limited to dictation languages
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        let settings = SynthesisSettings::default();
        Self {
            language: Language::EnglishUs.tag().to_string(),
            rate: settings.rate,
            pitch: settings.pitch,
            volume: settings.volume,
        }
    }
}

impl SynthesisConfig {
    pub fn settings(&self) -> SynthesisSettings {
        SynthesisSettings {
            rate: self.rate,
            pitch: self.pitch,
            volume: self.volume,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Theme used until the user saves a choice
    pub theme: Theme,
    pub notification_duration_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            notification_duration_ms: 5000,
        }
    }
}

impl UiConfig {
    /// Default notification duration; zero keeps notifications until dismissed
    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Load `path` when it exists, defaults otherwise
    pub fn load_or_default(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            language: self.speech.language,
            confidence_threshold: self.speech.confidence_threshold,
            restart_delay: Duration::from_millis(self.speech.restart_delay_ms),
            capture: CaptureConfig {
                echo_cancellation: self.capture.echo_cancellation,
                noise_suppression: self.capture.noise_suppression,
                auto_gain_control: self.capture.auto_gain_control,
                sample_rate: self.capture.sample_rate,
                channels: self.capture.channels,
                timeslice_ms: self.capture.timeslice_ms,
                preferred_mime_type: self.capture.preferred_mime_type.clone(),
            },
        }
    }
}
