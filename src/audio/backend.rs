use tokio::sync::mpsc;

use crate::error::DeviceError;

/// Preferred recorder container; platforms fall back to their default when unsupported
pub const PREFERRED_MIME_TYPE: &str = "audio/webm;codecs=opus";

/// One chunk of recorded audio, delivered once per capture timeslice
#[derive(Debug, Clone)]
pub struct AudioFragment {
    /// Encoded audio bytes in the recorder's container format
    pub data: Vec<u8>,
    /// Container format of `data`
    pub mime_type: String,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFragment {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Microphone constraints and recorder settings for a capture run
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    /// Requested sample rate in Hz
    pub sample_rate: u32,
    /// Requested channel count (1 = mono)
    pub channels: u16,
    /// Fragment cadence in milliseconds
    pub timeslice_ms: u64,
    /// Container to request from the recorder
    pub preferred_mime_type: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            sample_rate: 16000, // 16kHz for transcription
            channels: 1,        // Mono
            timeslice_ms: 100,  // 100ms fragments
            preferred_mime_type: PREFERRED_MIME_TYPE.to_string(),
        }
    }
}

/// Microphone capture backend trait
///
/// Covers both halves of browser-style capture: acquiring the microphone stream
/// and running a buffered recorder over it. Implementations:
/// - `platform::memory::MemoryCapture`: in-memory fragments (tests, headless runs)
/// - `platform::wav::WavFileCapture`: replays a WAV file as PCM fragments
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Whether a recorder is available on this platform
    fn supports_recording(&self) -> bool;

    /// Whether microphone access can be requested on this platform
    fn supports_microphone(&self) -> bool;

    /// Acquire the microphone and start buffered capture
    ///
    /// Returns a channel receiver that yields one fragment per timeslice. The
    /// channel closes once the recorder has halted and flushed its last fragment.
    async fn start(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<AudioFragment>, DeviceError>;

    /// Halt the recorder; buffered fragments are still delivered before the channel closes
    async fn halt(&mut self) -> anyhow::Result<()>;

    /// Release the microphone stream (stop all tracks)
    async fn release(&mut self) -> anyhow::Result<()>;

    /// Check if backend currently holds a microphone stream
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
