// File-backed capture: replays a WAV file as if it were the microphone
//
// The recorder cannot produce WEBM/Opus, so fragments carry raw little-endian
// 16-bit PCM (`audio/L16`) and the payload is the concatenated sample data.

use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{AudioCapture, AudioFragment, CaptureConfig};
use crate::error::DeviceError;

pub struct WavFileCapture {
    path: String,
    sample_rate: u32,
    channels: u16,
    samples: Vec<i16>,
    /// Deliver fragments at the capture cadence instead of as fast as possible
    realtime: bool,
    halt_tx: Option<oneshot::Sender<()>>,
    feeder: Option<JoinHandle<()>>,
    capturing: bool,
}

impl WavFileCapture {
    pub fn open(path: impl AsRef<Path>, realtime: bool) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64),
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
            realtime,
            halt_tx: None,
            feeder: None,
            capturing: false,
        })
    }

    pub fn mime_type(&self) -> String {
        format!("audio/L16;rate={};channels={}", self.sample_rate, self.channels)
    }

    /// Interleaved samples per fragment for the given cadence
    fn samples_per_fragment(&self, timeslice_ms: u64) -> usize {
        let per_second = self.sample_rate as u64 * self.channels as u64;
        ((per_second * timeslice_ms / 1000) as usize).max(self.channels as usize)
    }
}

#[async_trait::async_trait]
impl AudioCapture for WavFileCapture {
    fn supports_recording(&self) -> bool {
        true
    }

    fn supports_microphone(&self) -> bool {
        true
    }

    async fn start(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<AudioFragment>, DeviceError> {
        if self.capturing {
            return Err(DeviceError::Other("file capture already running".to_string()));
        }

        if self.sample_rate != config.sample_rate || self.channels != config.channels {
            warn!(
                "{} is {}Hz/{}ch, requested {}Hz/{}ch; delivering as recorded",
                self.path, self.sample_rate, self.channels, config.sample_rate, config.channels
            );
        }

        let mime_type = self.mime_type();
        debug!(
            "Recorder cannot produce {}, using {}",
            config.preferred_mime_type, mime_type
        );

        let fragments: Vec<Vec<u8>> = self
            .samples
            .chunks(self.samples_per_fragment(config.timeslice_ms))
            .map(|chunk| chunk.iter().flat_map(|s| s.to_le_bytes()).collect())
            .collect();

        let pace = if self.realtime {
            Duration::from_millis(config.timeslice_ms)
        } else {
            Duration::ZERO
        };
        let timeslice_ms = config.timeslice_ms;

        let (tx, rx) = mpsc::channel(16);
        let (halt_tx, mut halt_rx) = oneshot::channel::<()>();

        let feeder = tokio::spawn(async move {
            for (index, data) in fragments.into_iter().enumerate() {
                tokio::select! {
                    _ = &mut halt_rx => return,
                    _ = tokio::time::sleep(pace) => {}
                }

                let fragment = AudioFragment {
                    data,
                    mime_type: mime_type.clone(),
                    timestamp_ms: index as u64 * timeslice_ms,
                };

                if tx.send(fragment).await.is_err() {
                    return;
                }
            }

            debug!("End of file reached, holding stream open until halted");
            // Either a halt or the sender being dropped ends the run
            let _ = halt_rx.await;
        });

        self.halt_tx = Some(halt_tx);
        self.feeder = Some(feeder);
        self.capturing = true;

        Ok(rx)
    }

    async fn halt(&mut self) -> Result<()> {
        if let Some(halt_tx) = self.halt_tx.take() {
            // The feeder may already be gone
            let _ = halt_tx.send(());
        }
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        self.halt_tx = None;
        if let Some(feeder) = self.feeder.take() {
            feeder.await.context("File feeder task panicked")?;
        }
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "WAV file capture"
    }
}
