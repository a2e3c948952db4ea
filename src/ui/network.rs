use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::notify::{NotificationKind, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Online,
    Offline,
}

/// Turns connectivity transitions into banners and announcements
pub struct NetworkMonitor {
    notifier: Arc<Notifier>,
    last: NetworkStatus,
}

impl NetworkMonitor {
    pub fn new(notifier: Arc<Notifier>, initial: NetworkStatus) -> Self {
        Self {
            notifier,
            last: initial,
        }
    }

    pub fn status(&self) -> NetworkStatus {
        self.last
    }

    /// Handle one reported status; repeats of the current status are ignored
    pub fn observe(&mut self, status: NetworkStatus) {
        if status == self.last {
            return;
        }
        self.last = status;

        match status {
            NetworkStatus::Online => {
                info!("Network connection restored");
                self.notifier.notify(
                    "Connection restored",
                    NotificationKind::Success,
                    Duration::from_secs(3),
                );
                self.notifier.announce("Internet connection restored");
            }
            NetworkStatus::Offline => {
                info!("Network connection lost");
                self.notifier
                    .notify("No internet connection", NotificationKind::Warning, Duration::ZERO);
                self.notifier.announce("Internet connection lost");
            }
        }
    }

    /// Consume status reports until the stream ends
    pub async fn run<S>(&mut self, mut statuses: S)
    where
        S: Stream<Item = NetworkStatus> + Unpin,
    {
        while let Some(status) = statuses.next().await {
            self.observe(status);
        }
    }
}
