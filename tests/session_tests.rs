// Integration tests for the recording session lifecycle
//
// These tests drive a session over the in-memory platform and verify the
// start/stop contract, transcript filtering, recognition restarts and the
// finalized audio payload.

use anyhow::Result;
use base64::Engine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use vidyalaya_voice::platform::{CaptureHandle, MemoryCapture, RecognizerHandle, ScriptedRecognizer};
use vidyalaya_voice::{
    AudioCapture, AudioFragment, CaptureConfig, DeviceError, Language, ProcessedAudio,
    RecognitionBatch, RecognitionErrorCode, RecognitionResult, RecordingEvents, RecordingSession,
    SessionConfig, SpeechError, TranscriptionUpdate,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Start,
    Stop,
    Error(SpeechError),
    RecognitionStart,
    Update(TranscriptionUpdate),
    RecognitionError(RecognitionErrorCode, String),
    Audio { payload: String, mime_type: String },
}

struct EventLog {
    tx: mpsc::UnboundedSender<Event>,
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event.clone());
        let _ = self.tx.send(event);
    }

    fn all(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl RecordingEvents for EventLog {
    fn on_recording_start(&self) {
        self.record(Event::Start);
    }

    fn on_recording_stop(&self) {
        self.record(Event::Stop);
    }

    fn on_recording_error(&self, error: &SpeechError) {
        self.record(Event::Error(error.clone()));
    }

    fn on_recognition_start(&self) {
        self.record(Event::RecognitionStart);
    }

    fn on_transcription_update(&self, update: &TranscriptionUpdate) {
        self.record(Event::Update(update.clone()));
    }

    fn on_recognition_error_occurred(&self, code: &RecognitionErrorCode, message: &str) {
        self.record(Event::RecognitionError(code.clone(), message.to_string()));
    }

    fn on_audio_processed(&self, audio: &ProcessedAudio) {
        self.record(Event::Audio {
            payload: audio.payload.clone(),
            mime_type: audio.blob.mime_type.clone(),
        });
    }
}

struct Harness {
    session: RecordingSession,
    capture: CaptureHandle,
    recognizer: RecognizerHandle,
    log: Arc<EventLog>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Harness {
    fn new(capture: MemoryCapture, capture_handle: CaptureHandle) -> Self {
        let (recognizer, recognizer_handle) = ScriptedRecognizer::new();
        Self::with_recognizer(capture, capture_handle, recognizer, recognizer_handle)
    }

    fn with_recognizer(
        capture: MemoryCapture,
        capture_handle: CaptureHandle,
        recognizer: ScriptedRecognizer,
        recognizer_handle: RecognizerHandle,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let log = Arc::new(EventLog {
            tx,
            events: Mutex::new(Vec::new()),
        });

        let config = SessionConfig {
            restart_delay: Duration::from_millis(20),
            ..SessionConfig::default()
        };

        let session = RecordingSession::new(
            config,
            Box::new(capture),
            Box::new(recognizer),
            log.clone(),
        )
        .unwrap();

        Self {
            session,
            capture: capture_handle,
            recognizer: recognizer_handle,
            log,
            rx,
        }
    }

    fn in_memory() -> Self {
        let (capture, handle) = MemoryCapture::new();
        Self::new(capture, handle)
    }

    /// Wait for the first event matching `pred`, skipping others
    async fn expect<F: Fn(&Event) -> bool>(&mut self, pred: F) -> Event {
        loop {
            let event = timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .expect("timed out waiting for event")
                .expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    }
}

fn result(text: &str, confidence: f32, is_final: bool) -> RecognitionResult {
    RecognitionResult {
        transcript: text.to_string(),
        confidence,
        is_final,
    }
}

#[tokio::test]
async fn test_start_and_stop_toggle_recording() -> Result<()> {
    let mut h = Harness::in_memory();

    assert!(!h.session.is_recording());
    h.session.start().await?;
    assert!(h.session.is_recording(), "Recording right after start");
    assert!(h.capture.is_held());
    assert!(h.recognizer.is_listening());

    h.session.stop().await;
    assert!(!h.session.is_recording(), "Not recording right after stop");

    h.session.wait_for_finalization().await;
    assert!(!h.capture.is_held(), "Stream released after finalization");
    assert_eq!(h.capture.releases(), 1);

    h.expect(|e| *e == Event::Stop).await;
    let events = h.log.all();
    assert!(events.contains(&Event::Start));
    assert!(events.contains(&Event::RecognitionStart));

    Ok(())
}

#[tokio::test]
async fn test_start_requests_dictation_constraints() -> Result<()> {
    let h = Harness::in_memory();
    h.session.start().await?;

    let config = h.capture.last_config().unwrap();
    assert!(config.echo_cancellation);
    assert!(config.noise_suppression);
    assert!(config.auto_gain_control);
    assert_eq!(config.sample_rate, 16000);
    assert_eq!(config.channels, 1);
    assert_eq!(config.timeslice_ms, 100);
    assert_eq!(h.recognizer.language(), Some(Language::EnglishUs));

    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_second_start_is_noop() -> Result<()> {
    let h = Harness::in_memory();

    h.session.start().await?;
    h.session.start().await?;

    assert!(h.session.is_recording());
    assert_eq!(h.capture.requests(), 1, "No second microphone request");
    assert_eq!(h.recognizer.starts(), 1);

    let starts = h.log.all().iter().filter(|e| **e == Event::Start).count();
    assert_eq!(starts, 1);

    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_starts_share_one_stream() -> Result<()> {
    let h = Harness::in_memory();

    let (a, b) = tokio::join!(h.session.start(), h.session.start());
    a?;
    b?;

    assert_eq!(h.capture.requests(), 1);
    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_stop_when_idle_fires_nothing() -> Result<()> {
    let h = Harness::in_memory();

    h.session.stop().await;
    h.session.wait_for_finalization().await;

    assert!(h.log.all().is_empty());
    assert_eq!(h.recognizer.stops(), 0);
    Ok(())
}

#[tokio::test]
async fn test_stop_twice_fires_once() -> Result<()> {
    let h = Harness::in_memory();

    h.session.start().await?;
    h.session.stop().await;
    h.session.stop().await;
    h.session.wait_for_finalization().await;

    let stops = h.log.all().iter().filter(|e| **e == Event::Stop).count();
    assert_eq!(stops, 1);
    Ok(())
}

#[tokio::test]
async fn test_low_confidence_finals_filtered() -> Result<()> {
    let mut h = Harness::in_memory();
    h.session.start().await?;

    h.recognizer.result(RecognitionBatch {
        result_index: 0,
        results: vec![result("open an account", 0.9, true), result("um", 0.3, true)],
    });

    let event = h.expect(|e| matches!(e, Event::Update(_))).await;
    let Event::Update(update) = event else {
        unreachable!()
    };
    assert_eq!(update.final_text, "open an account");
    assert!(update.interim_text.is_empty());

    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_threshold_change_applies_to_next_batch() -> Result<()> {
    let mut h = Harness::in_memory();
    h.session.start().await?;

    h.session.set_confidence_threshold(0.2)?;
    h.recognizer.result(RecognitionBatch {
        result_index: 0,
        results: vec![result("um", 0.3, true), result("what is", 0.6, false)],
    });

    let Event::Update(update) = h.expect(|e| matches!(e, Event::Update(_))).await else {
        unreachable!()
    };
    assert_eq!(update.final_text, "um");
    assert_eq!(update.interim_text, "what is");
    assert_eq!(update.confidence, 0.6);

    assert_eq!(h.session.stats().await.transcript_updates, 1);
    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_invalid_threshold_rejected() {
    let h = Harness::in_memory();

    assert_eq!(
        h.session.set_confidence_threshold(1.5),
        Err(SpeechError::InvalidThreshold(1.5))
    );
    assert!(h.session.set_confidence_threshold(-0.1).is_err());
    assert_eq!(h.session.confidence_threshold(), 0.5);

    h.session.set_confidence_threshold(0.75).unwrap();
    assert_eq!(h.session.confidence_threshold(), 0.75);
}

#[tokio::test]
async fn test_set_language() -> Result<()> {
    let h = Harness::in_memory();

    assert!(h.session.set_language("xx-XX").await.is_err());
    assert_eq!(h.session.current_language(), Language::EnglishUs);

    h.session.set_language("hi-IN").await?;
    assert_eq!(h.session.current_language(), Language::Hindi);
    assert_eq!(h.session.supported_languages().len(), 10);

    h.session.start().await?;
    assert_eq!(h.recognizer.language(), Some(Language::Hindi));

    h.session.set_language("ta-IN").await?;
    assert_eq!(h.recognizer.live_language_updates(), 1, "Active stream updated live");
    assert_eq!(h.recognizer.language(), Some(Language::Tamil));

    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_unsupported_platform_rejected_up_front() {
    let (capture, capture_handle) = MemoryCapture::new();
    let (recognizer, recognizer_handle) = ScriptedRecognizer::new();
    let h = Harness::with_recognizer(
        capture,
        capture_handle,
        recognizer.unavailable(),
        recognizer_handle,
    );

    assert!(!h.session.is_fully_supported());
    assert!(!h.session.capabilities().recognition);

    let err = h.session.start().await.unwrap_err();
    assert!(matches!(err, SpeechError::Unsupported(_)));
    assert_eq!(h.capture.requests(), 0, "Microphone never requested");
    assert!(!h.session.is_recording());
}

#[tokio::test]
async fn test_missing_recorder_rejected() {
    let (capture, handle) = MemoryCapture::new();
    let h = Harness::new(capture.without_recorder(), handle);

    assert!(matches!(
        h.session.start().await,
        Err(SpeechError::Unsupported(_))
    ));
}

#[tokio::test]
async fn test_permission_denied() {
    let (capture, handle) = MemoryCapture::new();
    let mut h = Harness::new(capture.deny(DeviceError::PermissionDenied), handle);

    let err = h.session.start().await.unwrap_err();
    assert_eq!(err, SpeechError::Device(DeviceError::PermissionDenied));
    assert!(!h.session.is_recording());
    assert_eq!(h.recognizer.starts(), 0);

    let event = h.expect(|e| matches!(e, Event::Error(_))).await;
    assert_eq!(event, Event::Error(SpeechError::Device(DeviceError::PermissionDenied)));
    assert!(!h.log.all().contains(&Event::Start));
}

#[tokio::test]
async fn test_recognition_start_failure_releases_microphone() {
    let h = Harness::in_memory();
    h.recognizer.fail_next_start();

    let err = h.session.start().await.unwrap_err();
    assert!(matches!(err, SpeechError::Recognition { .. }));
    assert!(!h.session.is_recording());
    assert!(!h.capture.is_held());
    assert_eq!(h.capture.releases(), 1);
}

#[tokio::test]
async fn test_audio_payload_delivered_after_stop() -> Result<()> {
    let mut h = Harness::in_memory();
    h.session.start().await?;

    assert!(h.capture.push(b"abc".to_vec()));
    assert!(h.capture.push(Vec::new()));
    assert!(h.capture.push(b"def".to_vec()));

    h.session.stop().await;
    h.session.wait_for_finalization().await;

    let event = h.expect(|e| matches!(e, Event::Audio { .. })).await;
    let expected = base64::engine::general_purpose::STANDARD.encode(b"abcdef");
    assert_eq!(
        event,
        Event::Audio {
            payload: expected,
            mime_type: "audio/webm;codecs=opus".to_string(),
        }
    );

    let stats = h.session.stats().await;
    assert_eq!(stats.fragments_captured, 2, "Empty fragments are dropped");
    assert_eq!(stats.bytes_captured, 6);
    assert!(!stats.is_recording);
    assert!(!h.capture.is_held());
    Ok(())
}

#[tokio::test]
async fn test_recorder_default_container_used_as_fallback() -> Result<()> {
    let (capture, handle) = MemoryCapture::new();
    let mut h = Harness::new(
        capture
            .with_default_container("audio/mp4")
            .with_fragments(vec![vec![1, 2, 3]]),
        handle,
    );

    h.session.start().await?;
    h.session.stop().await;

    let Event::Audio { mime_type, .. } = h.expect(|e| matches!(e, Event::Audio { .. })).await else {
        unreachable!()
    };
    assert_eq!(mime_type, "audio/mp4");
    Ok(())
}

#[tokio::test]
async fn test_no_audio_callback_without_fragments() -> Result<()> {
    let h = Harness::in_memory();

    h.session.start().await?;
    h.session.stop().await;
    h.session.wait_for_finalization().await;

    assert!(!h.log.all().iter().any(|e| matches!(e, Event::Audio { .. })));
    assert_eq!(h.capture.releases(), 1, "Released even with nothing to deliver");
    Ok(())
}

#[tokio::test]
async fn test_recognition_restarts_after_natural_end() -> Result<()> {
    let mut h = Harness::in_memory();
    h.session.start().await?;

    h.recognizer.end_stream();

    // Second RecognitionStart comes from the restarted stream
    h.expect(|e| *e == Event::RecognitionStart).await;
    h.expect(|e| *e == Event::RecognitionStart).await;

    assert_eq!(h.recognizer.starts(), 2);
    assert!(h.recognizer.is_listening());
    assert_eq!(h.session.stats().await.recognition_restarts, 1);
    assert!(h.session.is_recording());

    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_restart_uses_current_language() -> Result<()> {
    let h = Harness::in_memory();
    h.session.start().await?;

    h.session.set_language("mr-IN").await?;
    h.recognizer.end_stream();
    sleep(Duration::from_millis(200)).await;

    assert_eq!(h.recognizer.starts(), 2);
    assert_eq!(h.recognizer.language(), Some(Language::Marathi));

    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_no_restart_after_stop() -> Result<()> {
    let h = Harness::in_memory();
    h.session.start().await?;

    h.session.stop().await;
    sleep(Duration::from_millis(200)).await;

    assert_eq!(h.recognizer.starts(), 1);
    assert!(!h.recognizer.is_listening());
    Ok(())
}

#[tokio::test]
async fn test_no_restart_after_error_end() -> Result<()> {
    let mut h = Harness::in_memory();
    h.session.start().await?;

    h.recognizer.fail(RecognitionErrorCode::NoSpeech);

    let event = h.expect(|e| matches!(e, Event::RecognitionError(..))).await;
    assert_eq!(
        event,
        Event::RecognitionError(
            RecognitionErrorCode::NoSpeech,
            "No speech was detected. Please try again.".to_string()
        )
    );

    sleep(Duration::from_millis(200)).await;
    assert_eq!(h.recognizer.starts(), 1, "Error-terminated stream not restarted");
    assert!(h.session.is_recording(), "Capture keeps running");

    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_unmapped_error_code_gets_generic_message() -> Result<()> {
    let mut h = Harness::in_memory();
    h.session.start().await?;

    h.recognizer.fail(RecognitionErrorCode::from_code("bad-grammar"));

    let event = h.expect(|e| matches!(e, Event::RecognitionError(..))).await;
    assert_eq!(
        event,
        Event::RecognitionError(
            RecognitionErrorCode::Other("bad-grammar".to_string()),
            "Speech recognition failed. Please try again.".to_string()
        )
    );

    h.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_permission_revoked_mid_run_ends_recording() -> Result<()> {
    let mut h = Harness::in_memory();
    h.session.start().await?;
    h.capture.push(b"partial".to_vec());

    h.recognizer.fail(RecognitionErrorCode::NotAllowed);

    let event = h.expect(|e| matches!(e, Event::Error(_))).await;
    assert!(matches!(
        event,
        Event::Error(SpeechError::Recognition {
            code: RecognitionErrorCode::NotAllowed,
            ..
        })
    ));
    h.expect(|e| *e == Event::Stop).await;
    assert!(!h.session.is_recording());

    // What was captured before the failure is still delivered
    h.session.wait_for_finalization().await;
    assert!(h.log.all().iter().any(|e| matches!(e, Event::Audio { .. })));
    assert!(!h.capture.is_held());
    Ok(())
}

#[tokio::test]
async fn test_device_loss_finalizes_and_reports() -> Result<()> {
    let mut h = Harness::in_memory();
    h.session.start().await?;
    h.capture.push(b"abc".to_vec());

    h.capture.disconnect();

    let event = h.expect(|e| matches!(e, Event::Error(_))).await;
    assert!(matches!(
        event,
        Event::Error(SpeechError::Device(DeviceError::Lost(_)))
    ));
    h.expect(|e| *e == Event::Stop).await;

    h.session.wait_for_finalization().await;
    assert!(h.log.all().iter().any(|e| matches!(e, Event::Audio { .. })));
    assert!(!h.session.is_recording());
    assert!(!h.capture.is_held());
    assert!(!h.recognizer.is_listening(), "Recognition halted with the device");
    Ok(())
}

#[tokio::test]
async fn test_session_can_record_again() -> Result<()> {
    let mut h = Harness::in_memory();

    h.session.start().await?;
    h.capture.push(b"one".to_vec());
    h.session.stop().await;

    h.session.start().await?;
    assert!(h.session.is_recording());
    assert_eq!(h.capture.requests(), 2);
    assert_eq!(h.capture.releases(), 1, "First stream released before the second");

    h.capture.push(b"two".to_vec());
    h.session.stop().await;
    h.session.wait_for_finalization().await;

    let first = h.expect(|e| matches!(e, Event::Audio { .. })).await;
    let second = h.expect(|e| matches!(e, Event::Audio { .. })).await;
    let encode = |b: &[u8]| base64::engine::general_purpose::STANDARD.encode(b);

    assert!(matches!(first, Event::Audio { ref payload, .. } if *payload == encode(b"one")));
    assert!(matches!(second, Event::Audio { ref payload, .. } if *payload == encode(b"two")));
    assert_eq!(h.capture.releases(), 2);
    Ok(())
}

/// Recorder that switches container mid-run, so finalization cannot assemble a blob
#[derive(Default)]
struct MixedContainerCapture {
    sender: Option<mpsc::Sender<AudioFragment>>,
    releases: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl AudioCapture for MixedContainerCapture {
    fn supports_recording(&self) -> bool {
        true
    }

    fn supports_microphone(&self) -> bool {
        true
    }

    async fn start(
        &mut self,
        _config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<AudioFragment>, DeviceError> {
        let (tx, rx) = mpsc::channel(8);
        for (index, mime_type) in ["audio/webm", "audio/ogg"].into_iter().enumerate() {
            tx.try_send(AudioFragment {
                data: vec![index as u8; 4],
                mime_type: mime_type.to_string(),
                timestamp_ms: index as u64 * 100,
            })
            .map_err(|e| DeviceError::Other(e.to_string()))?;
        }
        self.sender = Some(tx);
        Ok(rx)
    }

    async fn halt(&mut self) -> Result<()> {
        self.sender = None;
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.sender.is_some()
    }

    fn name(&self) -> &str {
        "mixed container capture"
    }
}

#[tokio::test]
async fn test_failed_finalization_still_releases_stream() -> Result<()> {
    let capture = MixedContainerCapture::default();
    let releases = Arc::clone(&capture.releases);
    let (recognizer, _handle) = ScriptedRecognizer::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let log = Arc::new(EventLog {
        tx,
        events: Mutex::new(Vec::new()),
    });

    let session = RecordingSession::new(
        SessionConfig::default(),
        Box::new(capture),
        Box::new(recognizer),
        log.clone(),
    )?;

    session.start().await?;
    session.stop().await;
    session.wait_for_finalization().await;

    assert_eq!(releases.load(Ordering::SeqCst), 1, "Released exactly once");

    let events = log.all();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Error(SpeechError::Finalization(_)))));
    assert!(!events.iter().any(|e| matches!(e, Event::Audio { .. })));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_stop_start_and_device_loss_never_hang() -> Result<()> {
    let h = Harness::in_memory();

    timeout(Duration::from_secs(20), async {
        for _ in 0..300 {
            h.session.start().await?;

            let disconnect = async { h.capture.disconnect() };
            // The start may land before or after the old run is torn down
            let _ = tokio::join!(disconnect, h.session.stop(), h.session.start());

            h.session.stop().await;
            h.session.wait_for_finalization().await;
            assert!(!h.session.is_recording());
            assert!(!h.capture.is_held(), "Every run releases its stream");
        }
        anyhow::Ok(())
    })
    .await??;

    assert_eq!(h.capture.requests(), h.capture.releases());
    Ok(())
}
