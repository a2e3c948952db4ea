//! Text-to-speech playback
//!
//! `SpeechSynthesisAdapter` picks a voice per language and plays one utterance
//! at a time over a platform `SpeechSynthesizer`.

pub mod adapter;
pub mod backend;
pub mod voice;

pub use adapter::{
    LoggingSpeechEvents, SettingsPatch, SpeakOptions, SpeechEvents, SpeechSynthesisAdapter,
    SynthesisSettings, INTERRUPTED,
};
pub use backend::{BoundaryEvent, BoundaryKind, SpeechSynthesizer, Utterance, UtteranceEvent, Voice};
pub use voice::{primary_subtag, select_best_voice};
