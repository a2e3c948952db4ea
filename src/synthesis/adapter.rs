use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backend::{BoundaryEvent, SpeechSynthesizer, Utterance, UtteranceEvent, Voice};
use super::voice::select_best_voice;
use crate::error::{SpeechError, SpeechResult};
use crate::language::Language;

/// Code reported for an utterance cut off by `stop` or a newer `speak`
pub const INTERRUPTED: &str = "interrupted";

/// Default prosody for every utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Partial update of the stored settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SettingsPatch {
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
}

impl SynthesisSettings {
    pub fn patched(&self, patch: &SettingsPatch) -> Self {
        Self {
            rate: patch.rate.unwrap_or(self.rate),
            pitch: patch.pitch.unwrap_or(self.pitch),
            volume: patch.volume.unwrap_or(self.volume),
        }
    }
}

/// Per-call overrides for `speak`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeakOptions {
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub voice: Option<Voice>,
}

/// Caller-side notifications for UI sync (e.g. word highlighting)
pub trait SpeechEvents: Send + Sync {
    fn on_speech_start(&self, text: &str) {
        info!("Speech started: {}", text);
    }

    fn on_speech_boundary(&self, event: &BoundaryEvent) {
        debug!("Speech boundary: {:?}", event);
    }
}

/// Observer that keeps the logging defaults
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSpeechEvents;

impl SpeechEvents for LoggingSpeechEvents {}

/// Text-to-speech over a platform synthesizer
pub struct SpeechSynthesisAdapter {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    events: Arc<dyn SpeechEvents>,
    supported: bool,
    voices: RwLock<Vec<Voice>>,
    current_voice: RwLock<Option<Voice>>,
    /// Language the current voice was selected for
    language: RwLock<String>,
    settings: RwLock<SynthesisSettings>,
}

impl SpeechSynthesisAdapter {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, events: Arc<dyn SpeechEvents>) -> Self {
        let supported = synthesizer.is_available();
        if !supported {
            warn!("Speech synthesis not supported by {}", synthesizer.name());
        }

        let adapter = Self {
            synthesizer,
            events,
            supported,
            voices: RwLock::new(Vec::new()),
            current_voice: RwLock::new(None),
            language: RwLock::new(Language::EnglishUs.tag().to_string()),
            settings: RwLock::new(SynthesisSettings::default()),
        };

        if adapter.supported {
            adapter.load_voices();
        }

        adapter
    }

    /// Refresh the voice list and reselect for the configured language
    pub fn load_voices(&self) {
        if !self.supported {
            return;
        }

        let voices = self.synthesizer.voices();
        debug!("Loaded {} voices from {}", voices.len(), self.synthesizer.name());
        *self.voices.write().unwrap_or_else(PoisonError::into_inner) = voices;

        let language = self.language.read().unwrap_or_else(PoisonError::into_inner).clone();
        self.select_voice(&language);
    }

    /// Reload voices every time the platform reports a change
    ///
    /// Platforms load voices lazily, so the list is often empty at construction.
    pub fn spawn_voice_listener(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut changes = self.synthesizer.voices_changed()?;
        let adapter = Arc::clone(self);

        Some(tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => adapter.load_voices(),
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Voice listener stopped");
        }))
    }

    /// Select the best voice for a language tag and remember the tag
    pub fn set_voice(&self, tag: &str) {
        *self.language.write().unwrap_or_else(PoisonError::into_inner) = tag.to_string();
        self.select_voice(tag);
    }

    fn select_voice(&self, tag: &str) {
        let selected = {
            let voices = self.voices.read().unwrap_or_else(PoisonError::into_inner);
            select_best_voice(&voices, tag)
        };

        match &selected {
            Some(voice) => info!("Selected voice {} ({}) for {}", voice.name, voice.lang, tag),
            None => debug!("No voice available for {}", tag),
        }

        *self.current_voice.write().unwrap_or_else(PoisonError::into_inner) = selected;
    }

    /// Speak `text`, cancelling anything already playing
    ///
    /// Resolves once playback completes.
    pub async fn speak(&self, text: &str, options: SpeakOptions) -> SpeechResult<()> {
        if !self.supported || text.trim().is_empty() {
            return Err(SpeechError::Unsupported(
                "text-to-speech not supported or empty text".to_string(),
            ));
        }

        // At most one utterance plays at a time
        self.synthesizer.cancel();

        let settings = self.settings();
        let utterance = Utterance {
            text: text.to_string(),
            rate: options.rate.unwrap_or(settings.rate),
            pitch: options.pitch.unwrap_or(settings.pitch),
            volume: options.volume.unwrap_or(settings.volume),
            voice: options.voice.or_else(|| self.current_voice()),
        };

        let mut playback = self.synthesizer.speak(utterance).map_err(|e| {
            error!("Failed to queue utterance: {:#}", e);
            SpeechError::Synthesis {
                code: "synthesis-failed".to_string(),
            }
        })?;

        while let Some(event) = playback.recv().await {
            match event {
                UtteranceEvent::Start => self.events.on_speech_start(text),
                UtteranceEvent::Boundary(boundary) => self.events.on_speech_boundary(&boundary),
                UtteranceEvent::End => return Ok(()),
                UtteranceEvent::Error { code } => {
                    error!("Speech synthesis error: {}", code);
                    return Err(SpeechError::Synthesis { code });
                }
            }
        }

        Err(SpeechError::Synthesis {
            code: INTERRUPTED.to_string(),
        })
    }

    pub fn stop(&self) {
        if self.supported {
            self.synthesizer.cancel();
        }
    }

    pub fn pause(&self) {
        if self.supported {
            self.synthesizer.pause();
        }
    }

    pub fn resume(&self) {
        if self.supported {
            self.synthesizer.resume();
        }
    }

    pub fn set_settings(&self, patch: SettingsPatch) {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let next = settings.patched(&patch);
        *settings = next;
    }

    pub fn settings(&self) -> SynthesisSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn voices(&self) -> Vec<Voice> {
        self.voices.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn current_voice(&self) -> Option<Voice> {
        self.current_voice.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_speaking(&self) -> bool {
        self.supported && self.synthesizer.is_speaking()
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_to_unity() {
        let settings = SynthesisSettings::default();
        assert_eq!(settings.rate, 1.0);
        assert_eq!(settings.pitch, 1.0);
        assert_eq!(settings.volume, 1.0);
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let patched = SynthesisSettings::default().patched(&SettingsPatch {
            rate: Some(1.5),
            volume: Some(0.0),
            ..SettingsPatch::default()
        });

        assert_eq!(patched.rate, 1.5);
        assert_eq!(patched.pitch, 1.0);
        assert_eq!(patched.volume, 0.0, "Zero volume is a real value, not unset");
    }
}
