use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform recognition error codes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecognitionErrorCode {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    Aborted,
    LanguageNotSupported,
    /// Any code without a dedicated message
    Other(String),
}

const GENERIC_FAILURE: &str = "Speech recognition failed. Please try again.";

impl RecognitionErrorCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" => Self::NotAllowed,
            "network" => Self::Network,
            "aborted" => Self::Aborted,
            "language-not-supported" => Self::LanguageNotSupported,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::AudioCapture => "audio-capture",
            Self::NotAllowed => "not-allowed",
            Self::Network => "network",
            Self::Aborted => "aborted",
            Self::LanguageNotSupported => "language-not-supported",
            Self::Other(code) => code,
        }
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoSpeech => "No speech was detected. Please try again.",
            Self::AudioCapture => "Audio capture failed. Please check your microphone.",
            Self::NotAllowed => "Microphone access denied. Please allow microphone access.",
            Self::Network => "Network error occurred. Please check your connection.",
            Self::Aborted => "Speech recognition was aborted.",
            Self::LanguageNotSupported => "The selected language is not supported.",
            Self::Other(_) => GENERIC_FAILURE,
        }
    }

    /// Errors after which the microphone is unusable for the rest of the run
    pub fn ends_recording(&self) -> bool {
        matches!(self, Self::AudioCapture | Self::NotAllowed)
    }
}

impl From<String> for RecognitionErrorCode {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<RecognitionErrorCode> for String {
    fn from(code: RecognitionErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for RecognitionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
