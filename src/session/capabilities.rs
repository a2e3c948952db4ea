use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audio::AudioCapture;
use crate::recognition::SpeechRecognizer;

/// Platform features a recording session depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub recognition: bool,
    pub recorder: bool,
    pub microphone: bool,
}

impl Capabilities {
    pub fn detect(capture: &dyn AudioCapture, recognizer: &dyn SpeechRecognizer) -> Self {
        Self {
            recognition: recognizer.is_available(),
            recorder: capture.supports_recording(),
            microphone: capture.supports_microphone(),
        }
    }

    /// All three features are present
    pub fn full(&self) -> bool {
        self.recognition && self.recorder && self.microphone
    }

    /// Names of the features that are absent
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.recognition {
            missing.push("speech recognition");
        }
        if !self.recorder {
            missing.push("audio recording");
        }
        if !self.microphone {
            missing.push("microphone access");
        }
        missing
    }

    /// Log a warning per missing feature and return the user-facing notice, if any
    pub fn compatibility_notice(&self) -> Option<String> {
        let missing = self.missing();
        if missing.is_empty() {
            return None;
        }

        for feature in &missing {
            warn!("{} not supported - voice features may be limited", feature);
        }

        Some(format!(
            "Your browser may not support all voice features (missing: {}). Please consider updating to a modern browser.",
            missing.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_requires_all_three() {
        let all = Capabilities {
            recognition: true,
            recorder: true,
            microphone: true,
        };
        assert!(all.full());
        assert!(all.missing().is_empty());
        assert!(all.compatibility_notice().is_none());

        let no_mic = Capabilities {
            microphone: false,
            ..all
        };
        assert!(!no_mic.full());
        assert_eq!(no_mic.missing(), vec!["microphone access"]);
    }

    #[test]
    fn test_notice_lists_missing_features() {
        let notice = Capabilities::default().compatibility_notice().unwrap();
        assert!(notice.contains("speech recognition, audio recording, microphone access"));
    }
}
