// Observer surface of a recording session
//
// Every method has a logging default so consumers only override what they
// render. Implementations are called from the session's tasks and must not block.

use tracing::{error, info};

use crate::audio::ProcessedAudio;
use crate::error::SpeechError;
use crate::recognition::{RecognitionErrorCode, TranscriptionUpdate};

pub trait RecordingEvents: Send + Sync {
    fn on_recording_start(&self) {
        info!("Recording started");
    }

    fn on_recording_stop(&self) {
        info!("Recording stopped");
    }

    fn on_recording_error(&self, error: &SpeechError) {
        error!("Recording error: {}", error);
    }

    fn on_recognition_start(&self) {
        info!("Speech recognition started");
    }

    fn on_transcription_update(&self, update: &TranscriptionUpdate) {
        info!(
            "Transcription update: final={:?} interim={:?} confidence={:.2}",
            update.final_text, update.interim_text, update.confidence
        );
    }

    fn on_recognition_error_occurred(&self, code: &RecognitionErrorCode, message: &str) {
        info!("Recognition error: {} ({})", code, message);
    }

    fn on_audio_processed(&self, audio: &ProcessedAudio) {
        info!(
            "Audio processed: {} bytes of {} as {} ({} base64 chars)",
            audio.blob.len(),
            audio.blob.mime_type,
            audio.handle,
            audio.payload.len()
        );
    }
}

/// Observer that keeps the logging defaults
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEvents;

impl RecordingEvents for LoggingEvents {}
