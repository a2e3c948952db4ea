use serde::{Deserialize, Serialize};

use super::backend::RecognitionBatch;

/// Transcript state produced from one recognition event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranscriptionUpdate {
    /// Final results above the confidence threshold, space-joined
    pub final_text: String,
    /// Provisional text, replaced on every update
    pub interim_text: String,
    /// Confidence of the batch's last result (0 when absent)
    pub confidence: f32,
}

impl TranscriptionUpdate {
    /// Fold the changed part of a batch into an update
    ///
    /// Final results below `threshold` are dropped. Interim results are
    /// concatenated as delivered since platforms carry their own spacing.
    pub fn from_batch(batch: &RecognitionBatch, threshold: f32) -> Self {
        let mut final_parts: Vec<&str> = Vec::new();
        let mut interim_text = String::new();

        for result in batch.results.iter().skip(batch.result_index) {
            if result.is_final {
                if result.confidence >= threshold {
                    final_parts.push(&result.transcript);
                }
            } else {
                interim_text.push_str(&result.transcript);
            }
        }

        let confidence = batch
            .results
            .last()
            .map(|r| r.confidence)
            .filter(|c| c.is_finite())
            .unwrap_or(0.0);

        Self {
            final_text: final_parts.join(" ").trim().to_string(),
            interim_text,
            confidence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.final_text.is_empty() && self.interim_text.is_empty()
    }
}
