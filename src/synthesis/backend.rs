use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

/// A platform voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP-47 tag the voice speaks
    pub lang: String,
    /// Installed locally rather than streamed from a network service
    #[serde(default)]
    pub local_service: bool,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>, local_service: bool) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            local_service,
        }
    }
}

/// One playback request
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Word,
    Sentence,
}

/// Playback reached a word or sentence boundary
///
/// Granularity depends on the platform; some only report sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryEvent {
    pub kind: BoundaryKind,
    /// Character offset into the utterance text
    pub char_index: usize,
    pub char_length: usize,
    /// Milliseconds since playback started
    pub elapsed_ms: u64,
}

/// Events emitted while an utterance plays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEvent {
    Start,
    Boundary(BoundaryEvent),
    End,
    Error { code: String },
}

/// Text-to-speech backend trait
///
/// Mirrors a browser-style global synthesizer: one queue, controlled through
/// synchronous calls, reporting progress per utterance through a channel.
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether speech synthesis exists on this platform
    fn is_available(&self) -> bool;

    /// Voices currently known to the platform (may be empty until loaded)
    fn voices(&self) -> Vec<Voice>;

    /// Notifications fired whenever the voice list changes
    fn voices_changed(&self) -> Option<broadcast::Receiver<()>>;

    /// Queue an utterance and return its event stream
    ///
    /// The channel closes after `End` or `Error`, or without either when the
    /// utterance is cancelled.
    fn speak(&self, utterance: Utterance) -> anyhow::Result<mpsc::UnboundedReceiver<UtteranceEvent>>;

    /// Drop the playing utterance and everything queued
    fn cancel(&self);

    fn pause(&self);

    fn resume(&self);

    fn is_speaking(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
