pub mod backend;
pub mod errors;
pub mod transcript;

pub use backend::{
    RecognitionBatch, RecognitionEvent, RecognitionResult, RecognitionSettings, SpeechRecognizer,
};
pub use errors::RecognitionErrorCode;
pub use transcript::TranscriptionUpdate;
