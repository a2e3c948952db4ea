//! UI support that does not need a DOM: theme state, notifications,
//! screen-reader announcements and connectivity banners.

pub mod format;
pub mod network;
pub mod notify;
pub mod theme;

pub use format::format_bytes;
pub use network::{NetworkMonitor, NetworkStatus};
pub use notify::{
    Announcer, LiveRegion, Notification, NotificationKind, NotificationSink, Notifier,
    ANNOUNCEMENT_TTL, DEFAULT_DURATION,
};
pub use theme::{PreferenceStore, Theme, ThemeController, ThemeTarget, THEME_KEY};
