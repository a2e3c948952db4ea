pub mod memory;
pub mod wav;

pub use memory::{
    sample_voices, word_boundaries, CaptureHandle, MemoryCapture, MemorySynthesizer,
    RecognizerHandle, ScriptedRecognizer, SynthesizerHandle,
};
pub use wav::WavFileCapture;
