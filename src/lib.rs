pub mod audio;
pub mod config;
pub mod error;
pub mod language;
pub mod platform;
pub mod recognition;
pub mod session;
pub mod synthesis;
pub mod ui;

pub use audio::{AudioBlob, AudioCapture, AudioFragment, CaptureConfig, ProcessedAudio};
pub use config::Config;
pub use error::{DeviceError, SpeechError, SpeechResult};
pub use language::Language;
pub use recognition::{
    RecognitionBatch, RecognitionErrorCode, RecognitionEvent, RecognitionResult,
    SpeechRecognizer, TranscriptionUpdate,
};
pub use session::{
    Capabilities, LoggingEvents, RecordingEvents, RecordingSession, SessionConfig, SessionStats,
};
pub use synthesis::{
    SettingsPatch, SpeakOptions, SpeechEvents, SpeechSynthesisAdapter, SpeechSynthesizer,
    SynthesisSettings, Voice,
};
