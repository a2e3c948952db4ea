use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;
use vidyalaya_voice::audio::AudioCapture;
use vidyalaya_voice::platform::{
    sample_voices, MemoryCapture, MemorySynthesizer, ScriptedRecognizer, WavFileCapture,
};
use vidyalaya_voice::synthesis::LoggingSpeechEvents;
use vidyalaya_voice::ui::{
    format_bytes, Announcer, LiveRegion, Notification, NotificationKind, NotificationSink,
    Notifier, PreferenceStore, Theme, ThemeController, ThemeTarget,
};
use vidyalaya_voice::{
    Config, Language, LoggingEvents, ProcessedAudio, RecognitionErrorCode, RecognitionEvent,
    RecordingEvents, RecordingSession, SettingsPatch, SpeakOptions, SpeechError, SpeechSynthesisAdapter,
    TranscriptionUpdate,
};

#[derive(Parser)]
#[command(name = "vidyalaya-voice", about = "Dictation and read-aloud helpers")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/vidyalaya-voice")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the supported dictation languages
    Languages,

    /// Show the configured session and platform support
    Status,

    /// Show or toggle the saved theme
    Theme {
        /// Preference file (JSON object of saved settings)
        #[arg(long, default_value = "vidyalaya-prefs.json")]
        prefs: PathBuf,
        #[arg(long)]
        toggle: bool,
    },

    /// Show a notification on the console
    Notify {
        message: String,
        /// success, error, warning or info
        #[arg(long, default_value = "info")]
        kind: String,
    },

    /// List available voices and the one picked for a language
    Voices {
        #[arg(long)]
        language: Option<String>,
    },

    /// Read text aloud through the in-memory synthesizer
    Speak {
        text: String,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        rate: Option<f32>,
        #[arg(long)]
        pitch: Option<f32>,
        #[arg(long)]
        volume: Option<f32>,
    },

    /// Replay a recognition script (JSON list of streams, each a list of events)
    Dictate {
        #[arg(long)]
        script: PathBuf,
        /// WAV file standing in for the microphone
        #[arg(long)]
        wav: Option<PathBuf>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        threshold: Option<f32>,
        /// How long to record before stopping
        #[arg(long, default_value_t = 2000)]
        duration_ms: u64,
        /// Where to write the base64 audio payload
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Prints transcript progress and forwards the finished payload
struct ConsoleEvents {
    audio_tx: mpsc::UnboundedSender<ProcessedAudio>,
}

impl RecordingEvents for ConsoleEvents {
    fn on_transcription_update(&self, update: &TranscriptionUpdate) {
        if !update.final_text.is_empty() {
            println!("{}", update.final_text);
        } else if !update.interim_text.is_empty() {
            println!("... {}", update.interim_text);
        }
    }

    fn on_recognition_error_occurred(&self, code: &RecognitionErrorCode, message: &str) {
        eprintln!("[{}] {}", code, message);
    }

    fn on_recording_error(&self, error: &SpeechError) {
        eprintln!("Recording error: {}", error);
    }

    fn on_audio_processed(&self, audio: &ProcessedAudio) {
        // The receiver lives until main exits
        let _ = self.audio_tx.send(audio.clone());
    }
}

/// Saved settings kept in a flat JSON object on disk
struct JsonPreferences {
    path: PathBuf,
}

impl JsonPreferences {
    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&raw).context("Invalid preference file")
    }
}

impl PreferenceStore for JsonPreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        std::fs::write(&self.path, serde_json::to_string_pretty(&values)?)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

struct ConsoleTheme;

impl ThemeTarget for ConsoleTheme {
    fn apply(&self, theme: Theme) {
        info!("Applying {} theme", theme);
    }
}

struct ConsoleToasts;

impl NotificationSink for ConsoleToasts {
    fn show(&self, notification: &Notification) {
        println!(
            "[{}] {} ({})",
            notification.kind.alert_class(),
            notification.message,
            notification.kind.icon()
        );
    }

    fn dismiss(&self, id: Uuid) {
        info!("Dismissed notification {}", id);
    }
}

impl LiveRegion for ConsoleToasts {
    fn set_text(&self, text: &str) {
        if !text.is_empty() {
            info!("Announced: {}", text);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;

    info!("Vidyalaya Voice v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Languages => {
            for language in Language::ALL {
                println!("{}\t{}", language.tag(), language.display_name());
            }
        }

        Command::Status => {
            let session = RecordingSession::new(
                cfg.session_config(),
                Box::new(MemoryCapture::new().0),
                Box::new(ScriptedRecognizer::new().0),
                Arc::new(LoggingEvents),
            )?;

            let capabilities = session.capabilities();
            println!("{}", serde_json::to_string_pretty(&capabilities)?);
            if let Some(notice) = capabilities.compatibility_notice() {
                println!("{}", notice);
            }
            println!(
                "Language: {} ({}), threshold {:.2}",
                session.current_language(),
                session.current_language().display_name(),
                session.confidence_threshold()
            );
        }

        Command::Theme { prefs, toggle } => {
            let controller =
                ThemeController::load(JsonPreferences { path: prefs }, ConsoleTheme, cfg.ui.theme);
            if toggle {
                controller.toggle();
            }
            println!("{}", controller.current());
        }

        Command::Notify { message, kind } => {
            let console = Arc::new(ConsoleToasts);
            let notifier = Notifier::new(console.clone(), Announcer::new(console))
                .with_default_duration(cfg.ui.notification_duration());

            let shown = notifier.show(&message, NotificationKind::from_name(&kind));
            if !shown.is_sticky() {
                // Let the dismissal fire before exiting
                tokio::time::sleep(shown.duration + Duration::from_millis(50)).await;
            }
        }

        Command::Voices { language } => {
            let tag = language.unwrap_or_else(|| cfg.synthesis.language.clone());
            let adapter = synthesis_adapter(&cfg, &tag);

            for voice in adapter.voices() {
                let local = if voice.local_service { "local" } else { "network" };
                println!("{}\t{}\t{}", voice.lang, voice.name, local);
            }
            match adapter.current_voice() {
                Some(voice) => println!("Selected for {}: {}", tag, voice.name),
                None => println!("No voice available for {}", tag),
            }
        }

        Command::Speak {
            text,
            language,
            rate,
            pitch,
            volume,
        } => {
            let tag = language.unwrap_or_else(|| cfg.synthesis.language.clone());
            let adapter = synthesis_adapter(&cfg, &tag);

            let options = SpeakOptions {
                rate,
                pitch,
                volume,
                voice: None,
            };
            adapter.speak(&text, options).await?;
            println!("Spoke {} characters", text.chars().count());
        }

        Command::Dictate {
            script,
            wav,
            language,
            threshold,
            duration_ms,
            output,
        } => {
            let raw = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script {}", script.display()))?;
            let streams: Vec<Vec<RecognitionEvent>> =
                serde_json::from_str(&raw).context("Invalid recognition script")?;

            let mut recognizer = ScriptedRecognizer::new().0;
            for events in streams {
                recognizer = recognizer.with_script(events);
            }

            let capture: Box<dyn AudioCapture> = match wav {
                Some(path) => Box::new(WavFileCapture::open(path, true)?),
                None => Box::new(MemoryCapture::new().0),
            };

            let (audio_tx, mut audio_rx) = mpsc::unbounded_channel();
            let session = RecordingSession::new(
                cfg.session_config(),
                capture,
                Box::new(recognizer),
                Arc::new(ConsoleEvents { audio_tx }),
            )?;

            if let Some(tag) = language {
                session.set_language(&tag).await?;
            }
            if let Some(threshold) = threshold {
                session.set_confidence_threshold(threshold)?;
            }

            session.start().await?;

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(duration_ms)) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }

            session.stop().await;
            session.wait_for_finalization().await;

            if let Ok(audio) = audio_rx.try_recv() {
                println!(
                    "Captured {} ({})",
                    format_bytes(audio.blob.len() as u64, 2),
                    audio.blob.mime_type
                );
                if let Some(path) = output {
                    std::fs::write(&path, &audio.payload)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Payload written to {}", path.display());
                }
            }

            let stats = session.stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

fn synthesis_adapter(cfg: &Config, tag: &str) -> SpeechSynthesisAdapter {
    let (synthesizer, _) = MemorySynthesizer::new(sample_voices());
    let adapter = SpeechSynthesisAdapter::new(Arc::new(synthesizer), Arc::new(LoggingSpeechEvents));

    let defaults = cfg.synthesis.settings();
    adapter.set_settings(SettingsPatch {
        rate: Some(defaults.rate),
        pitch: Some(defaults.pitch),
        volume: Some(defaults.volume),
    });
    adapter.set_voice(tag);
    adapter
}
