use super::capabilities::Capabilities;
use super::config::SessionConfig;
use super::events::RecordingEvents;
use super::stats::SessionStats;
use crate::audio::{AudioCapture, AudioFragment, ProcessedAudio};
use crate::error::{DeviceError, SpeechError, SpeechResult};
use crate::language::Language;
use crate::recognition::{
    RecognitionErrorCode, RecognitionEvent, RecognitionSettings, SpeechRecognizer,
    TranscriptionUpdate,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A dictation session: microphone capture plus continuous speech recognition
///
/// Cheap to share behind an `Arc`; all methods take `&self`. Start and stop are
/// serialized, so concurrent callers never open a second microphone stream.
pub struct RecordingSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    /// Session configuration
    config: SessionConfig,

    /// Platform features detected at construction
    capabilities: Capabilities,

    /// Whether a run is active (a microphone stream is held)
    is_recording: AtomicBool,

    /// Index into `Language::ALL`
    language: AtomicUsize,

    /// Confidence threshold stored as `f32` bits
    threshold_bits: AtomicU32,

    /// Incremented per run so tasks of a finished run never act on a newer one
    run_id: AtomicU64,

    /// Serializes start calls, held while the previous run finalizes
    start_gate: Mutex<()>,

    /// Serializes start/stop/abort transitions
    transition: Mutex<()>,

    capture: Mutex<Box<dyn AudioCapture>>,
    recognizer: Mutex<Box<dyn SpeechRecognizer>>,
    events: Arc<dyn RecordingEvents>,

    /// Start and end of the latest run
    run_times: Mutex<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)>,

    fragments_captured: AtomicUsize,
    bytes_captured: AtomicUsize,
    transcript_updates: AtomicUsize,
    recognition_restarts: AtomicUsize,

    /// Handle for the capture/finalization task
    capture_task: Mutex<Option<JoinHandle<()>>>,

    /// Handle for the recognition event task
    recognition_task: Mutex<Option<JoinHandle<()>>>,
}

impl RecordingSession {
    /// Create a session over the given platform backends
    pub fn new(
        config: SessionConfig,
        capture: Box<dyn AudioCapture>,
        recognizer: Box<dyn SpeechRecognizer>,
        events: Arc<dyn RecordingEvents>,
    ) -> SpeechResult<Self> {
        validate_threshold(config.confidence_threshold)?;

        let capabilities = Capabilities::detect(capture.as_ref(), recognizer.as_ref());
        if let Some(notice) = capabilities.compatibility_notice() {
            warn!("{} ({} / {})", notice, capture.name(), recognizer.name());
        }

        info!(
            "Creating recording session ({} / {}, language {}, threshold {:.2})",
            capture.name(),
            recognizer.name(),
            config.language,
            config.confidence_threshold
        );

        let inner = SessionInner {
            capabilities,
            is_recording: AtomicBool::new(false),
            language: AtomicUsize::new(language_index(config.language)),
            threshold_bits: AtomicU32::new(config.confidence_threshold.to_bits()),
            run_id: AtomicU64::new(0),
            start_gate: Mutex::new(()),
            transition: Mutex::new(()),
            capture: Mutex::new(capture),
            recognizer: Mutex::new(recognizer),
            events,
            run_times: Mutex::new((None, None)),
            fragments_captured: AtomicUsize::new(0),
            bytes_captured: AtomicUsize::new(0),
            transcript_updates: AtomicUsize::new(0),
            recognition_restarts: AtomicUsize::new(0),
            capture_task: Mutex::new(None),
            recognition_task: Mutex::new(None),
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Start recording
    ///
    /// Requests the microphone, then starts buffered capture and continuous
    /// recognition in the active language. Calling it while recording is a no-op.
    pub async fn start(&self) -> SpeechResult<()> {
        let inner = &self.inner;

        if !inner.capabilities.full() {
            return Err(SpeechError::Unsupported(format!(
                "speech recording not fully supported (missing: {})",
                inner.capabilities.missing().join(", ")
            )));
        }

        let _gate = inner.start_gate.lock().await;

        if inner.is_recording.load(Ordering::SeqCst) {
            warn!("Already recording");
            return Ok(());
        }

        // The previous run must have released its stream before a new one is
        // requested. Awaited without `transition`, which its abort path may need.
        let previous = inner.capture_task.lock().await.take();
        if let Some(task) = previous {
            if let Err(e) = task.await {
                error!("Capture task panicked: {}", e);
            }
        }

        let _transition = inner.transition.lock().await;

        let fragment_rx = {
            let mut capture = inner.capture.lock().await;
            info!("Requesting microphone from {}", capture.name());

            match capture.start(&inner.config.capture).await {
                Ok(rx) => rx,
                Err(e) => {
                    error!("Failed to start recording: {}", e);
                    let err = SpeechError::Device(e);
                    inner.events.on_recording_error(&err);
                    return Err(err);
                }
            }
        };

        let settings = RecognitionSettings::dictation(inner.language());
        let start_result = inner.recognizer.lock().await.start(&settings).await;
        let recognition_rx = match start_result {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to start speech recognition: {:#}", e);
                drop(fragment_rx);
                inner.halt_capture().await;
                inner.release_capture().await;

                let err = SpeechError::Recognition {
                    code: RecognitionErrorCode::Other("start-failed".to_string()),
                    message: format!("Failed to start speech recognition: {}", e),
                };
                inner.events.on_recording_error(&err);
                return Err(err);
            }
        };

        let run = inner.run_id.fetch_add(1, Ordering::SeqCst) + 1;
        inner.fragments_captured.store(0, Ordering::SeqCst);
        inner.bytes_captured.store(0, Ordering::SeqCst);
        *inner.run_times.lock().await = (Some(Utc::now()), None);

        // Mark as recording before the tasks can observe the run
        inner.is_recording.store(true, Ordering::SeqCst);

        let capture_task = tokio::spawn(Arc::clone(inner).run_capture(run, fragment_rx));
        *inner.capture_task.lock().await = Some(capture_task);

        let recognition_task =
            tokio::spawn(Arc::clone(inner).run_recognition(run, recognition_rx));
        *inner.recognition_task.lock().await = Some(recognition_task);

        info!("Recording started (run {}, language {})", run, settings.language);
        inner.events.on_recording_start();

        Ok(())
    }

    /// Stop recording
    ///
    /// Halts recognition and capture and returns without waiting for the audio
    /// payload; finalization continues in the background (see
    /// [`wait_for_finalization`](Self::wait_for_finalization)). No-op when idle.
    pub async fn stop(&self) {
        let inner = &self.inner;
        let _transition = inner.transition.lock().await;

        if !inner.end_run() {
            debug!("Recording not active");
            return;
        }

        info!("Stopping recording");
        inner.halt_streams().await;
        inner.events.on_recording_stop();
    }

    /// Wait until the latest run has delivered its audio and released the microphone
    ///
    /// Starts issued meanwhile wait for it to return.
    pub async fn wait_for_finalization(&self) {
        let _gate = self.inner.start_gate.lock().await;

        let capture_task = self.inner.capture_task.lock().await.take();
        if let Some(task) = capture_task {
            if let Err(e) = task.await {
                error!("Capture task panicked: {}", e);
            }
        }

        let recognition_task = self.inner.recognition_task.lock().await.take();
        if let Some(task) = recognition_task {
            if task.is_finished() {
                if let Err(e) = task.await {
                    error!("Recognition task panicked: {}", e);
                }
            } else {
                // Still listening for the stream's end; keep it for the next wait
                *self.inner.recognition_task.lock().await = Some(task);
            }
        }
    }

    /// Switch the dictation language
    ///
    /// Only the supported tags are accepted. An active recognition stream is
    /// updated live where the platform allows it, and restarts use the new language.
    pub async fn set_language(&self, tag: &str) -> SpeechResult<()> {
        let language: Language = tag.parse()?;

        self.inner
            .language
            .store(language_index(language), Ordering::SeqCst);
        self.inner.recognizer.lock().await.set_language(language);

        info!("Language set to {} ({})", language, language.display_name());
        Ok(())
    }

    pub fn set_confidence_threshold(&self, threshold: f32) -> SpeechResult<()> {
        validate_threshold(threshold)?;
        self.inner
            .threshold_bits
            .store(threshold.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.inner.threshold()
    }

    pub fn current_language(&self) -> Language {
        self.inner.language()
    }

    pub fn supported_languages(&self) -> &'static [Language] {
        &Language::ALL
    }

    pub fn is_recording(&self) -> bool {
        self.inner.is_recording.load(Ordering::SeqCst)
    }

    pub fn is_fully_supported(&self) -> bool {
        self.inner.capabilities.full()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let inner = &self.inner;
        let (started_at, stopped_at) = *inner.run_times.lock().await;

        let duration_secs = started_at
            .map(|start| {
                let end = stopped_at.unwrap_or_else(Utc::now);
                end.signed_duration_since(start).num_milliseconds() as f64 / 1000.0
            })
            .unwrap_or(0.0);

        SessionStats {
            is_recording: self.is_recording(),
            language: inner.language(),
            started_at,
            duration_secs,
            fragments_captured: inner.fragments_captured.load(Ordering::SeqCst),
            bytes_captured: inner.bytes_captured.load(Ordering::SeqCst),
            transcript_updates: inner.transcript_updates.load(Ordering::SeqCst),
            recognition_restarts: inner.recognition_restarts.load(Ordering::SeqCst),
        }
    }
}

impl SessionInner {
    fn language(&self) -> Language {
        Language::ALL
            .get(self.language.load(Ordering::SeqCst))
            .copied()
            .unwrap_or_default()
    }

    fn threshold(&self) -> f32 {
        f32::from_bits(self.threshold_bits.load(Ordering::SeqCst))
    }

    /// The given run is the latest one and still recording
    fn is_active(&self, run: u64) -> bool {
        self.run_id.load(Ordering::SeqCst) == run && self.is_recording.load(Ordering::SeqCst)
    }

    /// Clear the recording flag; false if it was already clear
    fn end_run(&self) -> bool {
        self.is_recording
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Halt recognition and capture after the recording flag was cleared
    async fn halt_streams(&self) {
        self.run_times.lock().await.1 = Some(Utc::now());

        {
            let mut recognizer = self.recognizer.lock().await;
            if let Err(e) = recognizer.stop().await {
                // Recognition may already have ended; the microphone still has to go
                warn!("Failed to stop speech recognition: {:#}", e);
            }
        }

        if !self.halt_capture().await {
            // Without a halted recorder the fragment channel never closes
            self.release_capture().await;
            self.events.on_recording_error(&SpeechError::Device(DeviceError::Other(
                "recorder failed to halt; microphone released".to_string(),
            )));
        }
    }

    async fn halt_capture(&self) -> bool {
        let mut capture = self.capture.lock().await;
        match capture.halt().await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to halt {}: {:#}", capture.name(), e);
                false
            }
        }
    }

    async fn release_capture(&self) {
        let mut capture = self.capture.lock().await;
        if let Err(e) = capture.release().await {
            error!("Failed to release microphone stream: {:#}", e);
            self.events.on_recording_error(&SpeechError::Device(DeviceError::Other(
                format!("failed to release microphone stream: {}", e),
            )));
        } else {
            debug!("Microphone stream released");
        }
    }

    /// End the run because the device or permission became unusable
    async fn abort_run(&self, run: u64, reason: SpeechError) {
        let _transition = self.transition.lock().await;

        if self.run_id.load(Ordering::SeqCst) != run || !self.end_run() {
            return;
        }

        error!("Recording aborted: {}", reason);
        self.halt_streams().await;
        self.events.on_recording_error(&reason);
        self.events.on_recording_stop();
    }

    /// Collect fragments until the recorder halts, then finalize and release
    async fn run_capture(self: Arc<Self>, run: u64, mut fragment_rx: mpsc::Receiver<AudioFragment>) {
        debug!("Capture task started (run {})", run);

        let mut fragments: Vec<AudioFragment> = Vec::new();

        while let Some(fragment) = fragment_rx.recv().await {
            if fragment.is_empty() {
                continue;
            }

            self.fragments_captured.fetch_add(1, Ordering::SeqCst);
            self.bytes_captured
                .fetch_add(fragment.data.len(), Ordering::SeqCst);
            fragments.push(fragment);
        }

        // The channel also closes when the device goes away mid-run
        if self.is_active(run) {
            warn!("Capture stream ended while still recording");
            self.abort_run(
                run,
                SpeechError::Device(DeviceError::Lost(
                    "capture stream ended unexpectedly".to_string(),
                )),
            )
            .await;
        }

        info!("Capture halted after {} fragments, finalizing", fragments.len());

        let outcome = ProcessedAudio::finalize(&fragments);

        // Released on every path, whatever finalization produced
        self.release_capture().await;

        match outcome {
            Ok(Some(audio)) => self.events.on_audio_processed(&audio),
            Ok(None) => debug!("No audio captured, nothing to deliver"),
            Err(e) => {
                error!("Failed to finalize recording: {}", e);
                self.events.on_recording_error(&e);
            }
        }

        debug!("Capture task stopped (run {})", run);
    }

    /// Deliver recognition events, restarting streams that end on their own
    async fn run_recognition(
        self: Arc<Self>,
        run: u64,
        mut event_rx: mpsc::Receiver<RecognitionEvent>,
    ) {
        loop {
            let mut errored = false;

            while let Some(event) = event_rx.recv().await {
                match event {
                    RecognitionEvent::Start => self.events.on_recognition_start(),
                    RecognitionEvent::Result(batch) => {
                        let update = TranscriptionUpdate::from_batch(&batch, self.threshold());
                        self.transcript_updates.fetch_add(1, Ordering::SeqCst);
                        self.events.on_transcription_update(&update);
                    }
                    RecognitionEvent::Error { code } => {
                        errored = true;
                        let message = code.user_message();
                        error!("Speech recognition error: {}", code);
                        self.events.on_recognition_error_occurred(&code, message);

                        if code.ends_recording() {
                            self.abort_run(run, SpeechError::recognition(code)).await;
                        }
                    }
                    RecognitionEvent::End => break,
                }
            }

            info!("Speech recognition ended");

            if !self.is_active(run) {
                break;
            }

            if errored {
                warn!("Recognition stream ended after an error, not restarting");
                break;
            }

            tokio::time::sleep(self.config.restart_delay).await;

            let mut recognizer = self.recognizer.lock().await;

            // Checked under the lock so a concurrent stop cannot miss this stream
            if !self.is_active(run) {
                break;
            }

            let settings = RecognitionSettings::dictation(self.language());
            match recognizer.start(&settings).await {
                Ok(rx) => {
                    event_rx = rx;
                    self.recognition_restarts.fetch_add(1, Ordering::SeqCst);
                    info!("Speech recognition restarted ({})", settings.language);
                }
                Err(e) => {
                    error!("Failed to restart speech recognition: {:#}", e);
                    drop(recognizer);
                    self.events.on_recording_error(&SpeechError::Recognition {
                        code: RecognitionErrorCode::Other("restart-failed".to_string()),
                        message: format!("Failed to restart speech recognition: {}", e),
                    });
                    break;
                }
            }
        }

        debug!("Recognition task stopped (run {})", run);
    }
}

fn validate_threshold(threshold: f32) -> SpeechResult<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(SpeechError::InvalidThreshold(threshold))
    }
}

fn language_index(language: Language) -> usize {
    Language::ALL
        .iter()
        .position(|l| *l == language)
        .unwrap_or_default()
}
