use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether recording is currently active
    pub is_recording: bool,

    /// Active dictation language
    pub language: Language,

    /// When the latest run started, if any
    pub started_at: Option<DateTime<Utc>>,

    /// Duration of the latest run in seconds (up to now while recording)
    pub duration_secs: f64,

    /// Non-empty fragments captured in the latest run
    pub fragments_captured: usize,

    /// Bytes captured in the latest run
    pub bytes_captured: usize,

    /// Transcription updates delivered across all runs
    pub transcript_updates: usize,

    /// Recognition streams restarted after ending on their own
    pub recognition_restarts: usize,
}
