// In-memory platform backends
//
// Stand-ins for the browser's microphone, recorder, recognizer and synthesizer.
// Each backend comes with a cloneable handle that drives it from the outside:
// pushing fragments, emitting recognition events, finishing utterances. Used by
// the CLI for scripted runs and by the integration tests.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::audio::{AudioCapture, AudioFragment, CaptureConfig};
use crate::error::DeviceError;
use crate::language::Language;
use crate::recognition::{
    RecognitionBatch, RecognitionErrorCode, RecognitionEvent, RecognitionSettings,
    SpeechRecognizer,
};
use crate::synthesis::{BoundaryEvent, BoundaryKind, SpeechSynthesizer, Utterance, UtteranceEvent, Voice};

const CHANNEL_CAPACITY: usize = 256;

fn locked<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// MARK: - Capture

#[derive(Debug)]
struct CaptureState {
    recorder: bool,
    microphone: bool,
    denial: Option<DeviceError>,
    /// Recorder can produce the requested container, not just its default
    supports_preferred: bool,
    default_mime_type: String,
    /// Fragments emitted as soon as a run starts
    preloaded: Vec<Vec<u8>>,
    sender: Option<mpsc::Sender<AudioFragment>>,
    mime_type: String,
    timeslice_ms: u64,
    sent: u64,
    held: bool,
    requests: usize,
    releases: usize,
    last_config: Option<CaptureConfig>,
}

impl CaptureState {
    fn send(&mut self, data: Vec<u8>) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        let fragment = AudioFragment {
            data,
            mime_type: self.mime_type.clone(),
            timestamp_ms: self.sent * self.timeslice_ms,
        };

        if sender.try_send(fragment).is_ok() {
            self.sent += 1;
            true
        } else {
            false
        }
    }
}

/// Microphone and recorder kept entirely in memory
pub struct MemoryCapture {
    state: Arc<Mutex<CaptureState>>,
}

/// Drives a `MemoryCapture` from outside the session
#[derive(Clone)]
pub struct CaptureHandle {
    state: Arc<Mutex<CaptureState>>,
}

impl MemoryCapture {
    pub fn new() -> (Self, CaptureHandle) {
        let state = Arc::new(Mutex::new(CaptureState {
            recorder: true,
            microphone: true,
            denial: None,
            supports_preferred: true,
            default_mime_type: "audio/ogg;codecs=opus".to_string(),
            preloaded: Vec::new(),
            sender: None,
            mime_type: String::new(),
            timeslice_ms: 100,
            sent: 0,
            held: false,
            requests: 0,
            releases: 0,
            last_config: None,
        }));

        (
            Self {
                state: Arc::clone(&state),
            },
            CaptureHandle { state },
        )
    }

    /// Every microphone request fails with `error`
    pub fn deny(self, error: DeviceError) -> Self {
        locked(&self.state).denial = Some(error);
        self
    }

    pub fn without_recorder(self) -> Self {
        locked(&self.state).recorder = false;
        self
    }

    pub fn without_microphone(self) -> Self {
        locked(&self.state).microphone = false;
        self
    }

    /// Recorder that only produces `mime_type`
    pub fn with_default_container(self, mime_type: &str) -> Self {
        {
            let mut state = locked(&self.state);
            state.supports_preferred = false;
            state.default_mime_type = mime_type.to_string();
        }
        self
    }

    /// Fragments delivered right after each run starts
    pub fn with_fragments(self, fragments: Vec<Vec<u8>>) -> Self {
        locked(&self.state).preloaded = fragments;
        self
    }
}

#[async_trait::async_trait]
impl AudioCapture for MemoryCapture {
    fn supports_recording(&self) -> bool {
        locked(&self.state).recorder
    }

    fn supports_microphone(&self) -> bool {
        locked(&self.state).microphone
    }

    async fn start(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<AudioFragment>, DeviceError> {
        let mut state = locked(&self.state);
        state.requests += 1;
        state.last_config = Some(config.clone());

        if let Some(denial) = &state.denial {
            return Err(denial.clone());
        }

        if state.held {
            return Err(DeviceError::Other("microphone already in use".to_string()));
        }

        state.mime_type = if state.supports_preferred {
            config.preferred_mime_type.clone()
        } else {
            debug!(
                "Recorder cannot produce {}, using {}",
                config.preferred_mime_type, state.default_mime_type
            );
            state.default_mime_type.clone()
        };

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        state.sender = Some(tx);
        state.timeslice_ms = config.timeslice_ms;
        state.sent = 0;
        state.held = true;

        for data in state.preloaded.clone() {
            state.send(data);
        }

        Ok(rx)
    }

    async fn halt(&mut self) -> Result<()> {
        locked(&self.state).sender = None;
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        let mut state = locked(&self.state);
        state.sender = None;
        if state.held {
            state.held = false;
            state.releases += 1;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        locked(&self.state).held
    }

    fn name(&self) -> &str {
        "in-memory capture"
    }
}

impl CaptureHandle {
    /// Deliver one fragment to the running recorder; false when not recording
    pub fn push(&self, data: impl Into<Vec<u8>>) -> bool {
        locked(&self.state).send(data.into())
    }

    /// Simulate the device going away mid-run
    pub fn disconnect(&self) {
        locked(&self.state).sender = None;
    }

    /// Microphone requests made so far
    pub fn requests(&self) -> usize {
        locked(&self.state).requests
    }

    /// Streams released so far
    pub fn releases(&self) -> usize {
        locked(&self.state).releases
    }

    /// Whether a microphone stream is currently held
    pub fn is_held(&self) -> bool {
        locked(&self.state).held
    }

    pub fn last_config(&self) -> Option<CaptureConfig> {
        locked(&self.state).last_config.clone()
    }
}

// MARK: - Recognition

#[derive(Debug)]
struct RecognizerState {
    available: bool,
    sender: Option<mpsc::Sender<RecognitionEvent>>,
    /// Events replayed into successive streams, one entry per stream
    scripts: VecDeque<Vec<RecognitionEvent>>,
    fail_next_start: bool,
    starts: usize,
    stops: usize,
    language: Option<Language>,
    live_language_updates: usize,
}

impl RecognizerState {
    fn emit(&mut self, event: RecognitionEvent) -> bool {
        match &self.sender {
            Some(sender) => sender.try_send(event).is_ok(),
            None => false,
        }
    }

    fn end(&mut self) {
        self.emit(RecognitionEvent::End);
        self.sender = None;
    }
}

/// Recognizer whose events are scripted or pushed through a handle
pub struct ScriptedRecognizer {
    state: Arc<Mutex<RecognizerState>>,
}

/// Drives a `ScriptedRecognizer` from outside the session
#[derive(Clone)]
pub struct RecognizerHandle {
    state: Arc<Mutex<RecognizerState>>,
}

impl ScriptedRecognizer {
    pub fn new() -> (Self, RecognizerHandle) {
        let state = Arc::new(Mutex::new(RecognizerState {
            available: true,
            sender: None,
            scripts: VecDeque::new(),
            fail_next_start: false,
            starts: 0,
            stops: 0,
            language: None,
            live_language_updates: 0,
        }));

        (
            Self {
                state: Arc::clone(&state),
            },
            RecognizerHandle { state },
        )
    }

    pub fn unavailable(self) -> Self {
        locked(&self.state).available = false;
        self
    }

    /// Events replayed into the next stream that starts
    pub fn with_script(self, events: Vec<RecognitionEvent>) -> Self {
        locked(&self.state).scripts.push_back(events);
        self
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        locked(&self.state).available
    }

    async fn start(
        &mut self,
        settings: &RecognitionSettings,
    ) -> Result<mpsc::Receiver<RecognitionEvent>> {
        let mut state = locked(&self.state);

        if std::mem::take(&mut state.fail_next_start) {
            return Err(anyhow!("recognition service unavailable"));
        }

        if state.sender.is_some() {
            return Err(anyhow!("recognition has already started"));
        }

        state.starts += 1;
        state.language = Some(settings.language);

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        state.sender = Some(tx);
        state.emit(RecognitionEvent::Start);

        if let Some(script) = state.scripts.pop_front() {
            for event in script {
                let ends = matches!(event, RecognitionEvent::End);
                state.emit(event);
                if ends {
                    state.sender = None;
                    break;
                }
            }
        }

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let mut state = locked(&self.state);
        if state.sender.is_some() {
            state.stops += 1;
            state.end();
        }
        Ok(())
    }

    fn set_language(&mut self, language: Language) {
        let mut state = locked(&self.state);
        if state.sender.is_some() {
            state.live_language_updates += 1;
        }
        state.language = Some(language);
    }

    fn name(&self) -> &str {
        "scripted recognizer"
    }
}

impl RecognizerHandle {
    /// Deliver an event to the active stream; false when no stream is running
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        locked(&self.state).emit(event)
    }

    pub fn result(&self, batch: RecognitionBatch) -> bool {
        self.emit(RecognitionEvent::Result(batch))
    }

    /// Report an error and end the stream, as platforms do
    pub fn fail(&self, code: RecognitionErrorCode) {
        let mut state = locked(&self.state);
        state.emit(RecognitionEvent::Error { code });
        state.end();
    }

    /// End the active stream on the platform's initiative
    pub fn end_stream(&self) {
        locked(&self.state).end();
    }

    /// The next start attempt fails
    pub fn fail_next_start(&self) {
        locked(&self.state).fail_next_start = true;
    }

    pub fn is_listening(&self) -> bool {
        locked(&self.state).sender.is_some()
    }

    pub fn starts(&self) -> usize {
        locked(&self.state).starts
    }

    pub fn stops(&self) -> usize {
        locked(&self.state).stops
    }

    pub fn language(&self) -> Option<Language> {
        locked(&self.state).language
    }

    pub fn live_language_updates(&self) -> usize {
        locked(&self.state).live_language_updates
    }
}

// MARK: - Synthesis

#[derive(Debug)]
struct SynthState {
    available: bool,
    voices: Vec<Voice>,
    /// Finish utterances immediately instead of waiting for the handle
    auto_complete: bool,
    fail_with: Option<String>,
    current: Option<mpsc::UnboundedSender<UtteranceEvent>>,
    spoken: Vec<Utterance>,
    paused: bool,
    cancels: usize,
}

/// Synthesizer that "plays" utterances by emitting their events
pub struct MemorySynthesizer {
    state: Arc<Mutex<SynthState>>,
    voices_changed: broadcast::Sender<()>,
}

/// Drives a `MemorySynthesizer` from outside the adapter
#[derive(Clone)]
pub struct SynthesizerHandle {
    state: Arc<Mutex<SynthState>>,
    voices_changed: broadcast::Sender<()>,
}

impl MemorySynthesizer {
    pub fn new(voices: Vec<Voice>) -> (Self, SynthesizerHandle) {
        let state = Arc::new(Mutex::new(SynthState {
            available: true,
            voices,
            auto_complete: true,
            fail_with: None,
            current: None,
            spoken: Vec::new(),
            paused: false,
            cancels: 0,
        }));
        let (voices_changed, _) = broadcast::channel(16);

        (
            Self {
                state: Arc::clone(&state),
                voices_changed: voices_changed.clone(),
            },
            SynthesizerHandle {
                state,
                voices_changed,
            },
        )
    }

    pub fn unavailable(self) -> Self {
        locked(&self.state).available = false;
        self
    }

    /// Utterances keep playing until the handle finishes or fails them
    pub fn manual(self) -> Self {
        locked(&self.state).auto_complete = false;
        self
    }

    /// Every utterance fails with `code` right after starting
    pub fn failing(self, code: &str) -> Self {
        locked(&self.state).fail_with = Some(code.to_string());
        self
    }
}

/// Word boundaries of `text` as character offsets
pub fn word_boundaries(text: &str) -> Vec<BoundaryEvent> {
    let mut boundaries = Vec::new();
    let mut word: Option<(usize, usize)> = None;

    fn flush(word: (usize, usize), boundaries: &mut Vec<BoundaryEvent>) {
        // Nominal speaking pace of 250ms per word
        let elapsed_ms = boundaries.len() as u64 * 250;
        boundaries.push(BoundaryEvent {
            kind: BoundaryKind::Word,
            char_index: word.0,
            char_length: word.1,
            elapsed_ms,
        });
    }

    for (index, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            if let Some(done) = word.take() {
                flush(done, &mut boundaries);
            }
        } else if let Some((_, length)) = word.as_mut() {
            *length += 1;
        } else {
            word = Some((index, 1));
        }
    }

    if let Some(done) = word {
        flush(done, &mut boundaries);
    }

    boundaries
}

impl SpeechSynthesizer for MemorySynthesizer {
    fn is_available(&self) -> bool {
        locked(&self.state).available
    }

    fn voices(&self) -> Vec<Voice> {
        locked(&self.state).voices.clone()
    }

    fn voices_changed(&self) -> Option<broadcast::Receiver<()>> {
        Some(self.voices_changed.subscribe())
    }

    fn speak(&self, utterance: Utterance) -> Result<mpsc::UnboundedReceiver<UtteranceEvent>> {
        let mut state = locked(&self.state);
        if !state.available {
            return Err(anyhow!("speech synthesis unavailable"));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        // Send failures mean the caller dropped the stream, nothing left to notify
        let _ = tx.send(UtteranceEvent::Start);

        if let Some(code) = state.fail_with.clone() {
            let _ = tx.send(UtteranceEvent::Error { code });
        } else if state.auto_complete {
            for boundary in word_boundaries(&utterance.text) {
                let _ = tx.send(UtteranceEvent::Boundary(boundary));
            }
            let _ = tx.send(UtteranceEvent::End);
        } else {
            state.current = Some(tx);
        }

        info!("Speaking {} characters", utterance.text.chars().count());
        state.spoken.push(utterance);
        Ok(rx)
    }

    fn cancel(&self) {
        let mut state = locked(&self.state);
        state.cancels += 1;
        state.paused = false;
        state.current = None;
    }

    fn pause(&self) {
        locked(&self.state).paused = true;
    }

    fn resume(&self) {
        locked(&self.state).paused = false;
    }

    fn is_speaking(&self) -> bool {
        locked(&self.state).current.is_some()
    }

    fn name(&self) -> &str {
        "in-memory synthesizer"
    }
}

impl SynthesizerHandle {
    /// Replace the voice list and announce the change
    pub fn set_voices(&self, voices: Vec<Voice>) {
        locked(&self.state).voices = voices;
        // No receivers just means nobody listens for changes yet
        let _ = self.voices_changed.send(());
    }

    /// Complete the playing utterance
    pub fn finish(&self) -> bool {
        match locked(&self.state).current.take() {
            Some(tx) => tx.send(UtteranceEvent::End).is_ok(),
            None => false,
        }
    }

    /// Fail the playing utterance with a platform error code
    pub fn fail(&self, code: &str) -> bool {
        match locked(&self.state).current.take() {
            Some(tx) => tx
                .send(UtteranceEvent::Error {
                    code: code.to_string(),
                })
                .is_ok(),
            None => false,
        }
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        locked(&self.state).spoken.clone()
    }

    pub fn cancels(&self) -> usize {
        locked(&self.state).cancels
    }

    pub fn is_paused(&self) -> bool {
        locked(&self.state).paused
    }
}

/// Voices commonly shipped by desktop browsers, for demos
pub fn sample_voices() -> Vec<Voice> {
    vec![
        Voice::new("Google US English", "en-US", false),
        Voice::new("Samantha", "en-US", true),
        Voice::new("Lekha", "hi-IN", true),
        Voice::new("Google हिन्दी", "hi-IN", false),
        Voice::new("Google বাংলা", "bn-IN", false),
    ]
}
