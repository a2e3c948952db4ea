use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::errors::RecognitionErrorCode;
use crate::language::Language;

/// Settings applied to each recognition stream
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionSettings {
    pub language: Language,
    /// Keep listening across pauses instead of stopping after one phrase
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
}

impl RecognitionSettings {
    pub fn dictation(language: Language) -> Self {
        Self {
            language,
            continuous: true,
            interim_results: true,
            max_alternatives: 1,
        }
    }
}

/// Single recognized phrase (best alternative only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub is_final: bool,
}

/// Results delivered by one recognition event
///
/// `results` holds the stream's result list; only entries from `result_index`
/// onward changed in this event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognitionBatch {
    #[serde(default)]
    pub result_index: usize,
    pub results: Vec<RecognitionResult>,
}

/// Events emitted by a recognition stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecognitionEvent {
    Start,
    Result(RecognitionBatch),
    Error { code: RecognitionErrorCode },
    /// The stream terminated; platforms may end streams on their own
    End,
}

/// Speech-to-text backend trait
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Whether speech recognition exists on this platform
    fn is_available(&self) -> bool;

    /// Start a recognition stream
    ///
    /// Returns a channel receiver for the stream's events. The stream is over
    /// after `End` or when the channel closes.
    async fn start(
        &mut self,
        settings: &RecognitionSettings,
    ) -> anyhow::Result<mpsc::Receiver<RecognitionEvent>>;

    /// Stop the active stream; must be harmless when no stream is running
    async fn stop(&mut self) -> anyhow::Result<()>;

    /// Update the language of the active stream, if the platform allows it
    fn set_language(&mut self, language: Language);

    /// Get backend name for logging
    fn name(&self) -> &str;
}
