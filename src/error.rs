use thiserror::Error;

use crate::recognition::RecognitionErrorCode;

/// Errors surfaced by the recording session and the synthesis adapter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpeechError {
    /// A required platform capability is missing. Never retried.
    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Recognition error ({code}): {message}")]
    Recognition {
        code: RecognitionErrorCode,
        message: String,
    },

    #[error("Speech synthesis error: {code}")]
    Synthesis { code: String },

    #[error("Unsupported language: {0}")]
    InvalidLanguage(String),

    #[error("Confidence threshold must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f32),

    #[error("Failed to finalize recorded audio: {0}")]
    Finalization(String),
}

/// Microphone acquisition and capture failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Microphone access denied")]
    PermissionDenied,

    #[error("No matching audio input device")]
    NotFound,

    #[error("Audio input device was lost: {0}")]
    Lost(String),

    #[error("{0}")]
    Other(String),
}

impl SpeechError {
    pub fn recognition(code: RecognitionErrorCode) -> Self {
        let message = code.user_message().to_string();
        Self::Recognition { code, message }
    }
}

pub type SpeechResult<T> = std::result::Result<T, SpeechError>;
