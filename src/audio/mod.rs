pub mod backend;
pub mod payload;

pub use backend::{AudioCapture, AudioFragment, CaptureConfig, PREFERRED_MIME_TYPE};
pub use payload::{AudioBlob, ProcessedAudio};
