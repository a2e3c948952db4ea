// Toast notifications and screen-reader announcements
//
// Rendering belongs to the UI layer; this module decides what is shown, for
// how long, and what assistive technology hears.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// How long a notification stays up unless told otherwise
pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);

/// How long an announcement stays in the live region
pub const ANNOUNCEMENT_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

impl NotificationKind {
    /// Parse a kind name; unknown names are treated as info
    pub fn from_name(name: &str) -> Self {
        match name {
            "success" => Self::Success,
            "error" => Self::Error,
            "warning" => Self::Warning,
            _ => Self::Info,
        }
    }

    /// Alert style class for the kind
    pub fn alert_class(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "danger",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Success => "check-circle",
            Self::Error => "exclamation-circle",
            Self::Warning => "exclamation-triangle",
            Self::Info => "info-circle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    /// Zero keeps the notification until the user dismisses it
    pub duration: Duration,
}

impl Notification {
    pub fn new(message: impl Into<String>, kind: NotificationKind, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            kind,
            duration,
        }
    }

    pub fn is_sticky(&self) -> bool {
        self.duration.is_zero()
    }
}

/// Renders and removes toasts
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: &Notification);
    fn dismiss(&self, id: Uuid);
}

/// Polite live region read by screen readers
pub trait LiveRegion: Send + Sync {
    fn set_text(&self, text: &str);
}

/// Writes announcements to a live region and clears them shortly after
pub struct Announcer {
    region: Arc<dyn LiveRegion>,
    generation: Arc<AtomicU64>,
    ttl: Duration,
}

impl Announcer {
    pub fn new(region: Arc<dyn LiveRegion>) -> Self {
        Self::with_ttl(region, ANNOUNCEMENT_TTL)
    }

    pub fn with_ttl(region: Arc<dyn LiveRegion>, ttl: Duration) -> Self {
        Self {
            region,
            generation: Arc::new(AtomicU64::new(0)),
            ttl,
        }
    }

    /// Announce `message`; must be called from within a Tokio runtime
    pub fn announce(&self, message: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.region.set_text(message);

        let region = Arc::clone(&self.region);
        let latest = Arc::clone(&self.generation);
        let ttl = self.ttl;

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            // A newer announcement owns the region now
            if latest.load(Ordering::SeqCst) == generation {
                region.set_text("");
            }
        });
    }
}

/// Shows notifications and mirrors them to the screen reader
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    announcer: Announcer,
    default_duration: Duration,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, announcer: Announcer) -> Self {
        Self {
            sink,
            announcer,
            default_duration: DEFAULT_DURATION,
        }
    }

    /// Duration used by [`show`](Self::show); zero makes those notifications sticky
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    /// Show a notification for the default duration
    pub fn show(&self, message: &str, kind: NotificationKind) -> Notification {
        self.notify(message, kind, self.default_duration)
    }

    /// Show a notification; non-sticky ones are dismissed after their duration
    pub fn notify(
        &self,
        message: &str,
        kind: NotificationKind,
        duration: Duration,
    ) -> Notification {
        let notification = Notification::new(message, kind, duration);
        debug!("Showing {:?} notification: {}", kind, message);
        self.sink.show(&notification);

        if !notification.is_sticky() {
            let sink = Arc::clone(&self.sink);
            let id = notification.id;
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                sink.dismiss(id);
            });
        }

        self.announcer.announce(message);
        notification
    }

    pub fn announce(&self, message: &str) {
        self.announcer.announce(message);
    }
}
