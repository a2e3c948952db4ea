// Integration tests for configuration loading

use anyhow::Result;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use vidyalaya_voice::ui::{
    Announcer, LiveRegion, Notification, NotificationKind, NotificationSink, Notifier,
    PreferenceStore, Theme, ThemeController, ThemeTarget,
};
use vidyalaya_voice::{Config, Language};

#[test]
fn test_load_full_config() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("voice.toml");
    fs::write(
        &path,
        r#"
[speech]
language = "hi-IN"
confidence_threshold = 0.7
restart_delay_ms = 250

[capture]
sample_rate = 48000
timeslice_ms = 250

[synthesis]
language = "ta-IN"
rate = 0.9

[ui]
theme = "dark"
notification_duration_ms = 0
"#,
    )?;

    let config = Config::load(path.to_str().unwrap())?;

    assert_eq!(config.speech.language, Language::Hindi);
    assert_eq!(config.ui.theme, Theme::Dark);
    assert_eq!(config.ui.notification_duration_ms, 0);
    assert_eq!(config.synthesis.language, "ta-IN");

    let settings = config.synthesis.settings();
    assert_eq!(settings.rate, 0.9);
    assert_eq!(settings.volume, 1.0, "Unset fields keep their defaults");

    let session = config.session_config();
    assert_eq!(session.language, Language::Hindi);
    assert_eq!(session.confidence_threshold, 0.7);
    assert_eq!(session.restart_delay, Duration::from_millis(250));
    assert_eq!(session.capture.sample_rate, 48000);
    assert_eq!(session.capture.timeslice_ms, 250);
    assert_eq!(session.capture.channels, 1);
    assert!(session.capture.echo_cancellation);
    Ok(())
}

#[test]
fn test_unsupported_language_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("voice.toml");
    fs::write(&path, "[speech]\nlanguage = \"xx-XX\"\n")?;

    assert!(Config::load(path.to_str().unwrap()).is_err());
    Ok(())
}

#[test]
fn test_missing_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("absent");
    let path = path.to_str().unwrap();

    assert!(Config::load(path).is_err());

    let config = Config::load_or_default(path)?;
    assert_eq!(config.speech.language, Language::EnglishUs);
    assert_eq!(config.speech.confidence_threshold, 0.5);
    assert_eq!(config.ui.theme, Theme::Light);
    assert_eq!(config.capture.preferred_mime_type, "audio/webm;codecs=opus");
    Ok(())
}

#[test]
fn test_shipped_config_loads() -> Result<()> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/vidyalaya-voice");
    let config = Config::load(path)?;

    assert_eq!(config.session_config().restart_delay, Duration::from_millis(100));
    assert_eq!(config.ui.notification_duration_ms, 5000);
    Ok(())
}

#[derive(Default)]
struct Toasts {
    dismissed: Mutex<Vec<Uuid>>,
}

impl NotificationSink for Toasts {
    fn show(&self, _notification: &Notification) {}

    fn dismiss(&self, id: Uuid) {
        self.dismissed.lock().unwrap().push(id);
    }
}

impl LiveRegion for Toasts {
    fn set_text(&self, _text: &str) {}
}

#[derive(Default)]
struct EmptyStore;

impl PreferenceStore for EmptyStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }
}

struct NoTarget;

impl ThemeTarget for NoTarget {
    fn apply(&self, _theme: Theme) {}
}

#[tokio::test]
async fn test_ui_section_drives_notifier_and_theme() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("voice.toml");
    fs::write(&path, "[ui]\ntheme = \"dark\"\nnotification_duration_ms = 40\n")?;

    let config = Config::load(path.to_str().unwrap())?;
    assert_eq!(config.ui.notification_duration(), Duration::from_millis(40));

    let toasts = Arc::new(Toasts::default());
    let notifier = Notifier::new(toasts.clone(), Announcer::new(toasts.clone()))
        .with_default_duration(config.ui.notification_duration());

    let shown = notifier.show("Saved", NotificationKind::Success);
    assert_eq!(shown.duration, Duration::from_millis(40));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(*toasts.dismissed.lock().unwrap(), vec![shown.id]);

    let controller = ThemeController::load(EmptyStore, NoTarget, config.ui.theme);
    assert_eq!(controller.current(), Theme::Dark);
    Ok(())
}

#[tokio::test]
async fn test_zero_notification_duration_is_sticky() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("voice.toml");
    fs::write(&path, "[ui]\nnotification_duration_ms = 0\n")?;

    let config = Config::load(path.to_str().unwrap())?;
    let toasts = Arc::new(Toasts::default());
    let notifier = Notifier::new(toasts.clone(), Announcer::new(toasts.clone()))
        .with_default_duration(config.ui.notification_duration());

    assert!(notifier.show("Offline", NotificationKind::Warning).is_sticky());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(toasts.dismissed.lock().unwrap().is_empty());
    Ok(())
}
