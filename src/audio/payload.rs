// Finalization of a capture run into a single transmittable payload
//
// Fragments are concatenated in arrival order into one blob, then encoded as
// base64 text for the upload/transcription collaborator.

use base64::Engine;
use serde::Serialize;
use uuid::Uuid;

use super::backend::AudioFragment;
use crate::error::SpeechError;

/// Concatenated recording in a single container format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioBlob {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AudioBlob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Assemble fragments into one blob
    ///
    /// Returns `Ok(None)` when nothing was captured. Fragments recorded in
    /// different containers cannot be concatenated.
    pub fn assemble(fragments: &[AudioFragment]) -> Result<Option<Self>, SpeechError> {
        let Some(first) = fragments.first() else {
            return Ok(None);
        };

        if let Some(odd) = fragments.iter().find(|f| f.mime_type != first.mime_type) {
            return Err(SpeechError::Finalization(format!(
                "mixed container formats in one recording ({} and {})",
                first.mime_type, odd.mime_type
            )));
        }

        let total: usize = fragments.iter().map(|f| f.data.len()).sum();
        let mut bytes = Vec::with_capacity(total);
        for fragment in fragments {
            bytes.extend_from_slice(&fragment.data);
        }

        Ok(Some(Self {
            bytes,
            mime_type: first.mime_type.clone(),
        }))
    }
}

/// Audio delivered to `RecordingEvents::on_audio_processed`
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedAudio {
    /// Base64 text of the blob, ready for transmission
    pub payload: String,
    pub blob: AudioBlob,
    /// Opaque handle referring to this blob (`blob:<uuid>`)
    pub handle: String,
}

impl ProcessedAudio {
    pub fn from_blob(blob: AudioBlob) -> Self {
        let payload = base64::engine::general_purpose::STANDARD.encode(&blob.bytes);
        Self {
            payload,
            blob,
            handle: format!("blob:{}", Uuid::new_v4()),
        }
    }

    /// Assemble and encode a run's fragments; `None` when nothing was captured
    pub fn finalize(fragments: &[AudioFragment]) -> Result<Option<Self>, SpeechError> {
        Ok(AudioBlob::assemble(fragments)?.map(Self::from_blob))
    }
}
