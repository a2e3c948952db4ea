use std::time::Duration;

use crate::audio::CaptureConfig;
use crate::language::Language;

/// Configuration for a recording session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Initial dictation language
    pub language: Language,

    /// Minimum confidence for final results to be kept (0.0 to 1.0)
    pub confidence_threshold: f32,

    /// Delay before restarting a recognition stream that ended on its own
    /// Default: 100ms
    pub restart_delay: Duration,

    /// Microphone constraints and recorder cadence
    pub capture: CaptureConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: Language::EnglishUs,
            confidence_threshold: 0.5,
            restart_delay: Duration::from_millis(100),
            capture: CaptureConfig::default(),
        }
    }
}
