use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Key the theme is saved under
pub const THEME_KEY: &str = "vidyalaya-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => anyhow::bail!("Unknown theme: {}", other),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value preference storage (browser local storage or similar)
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Applies the active theme to the document
pub trait ThemeTarget: Send + Sync {
    fn apply(&self, theme: Theme);
}

/// Light/dark theme state backed by a preference store
pub struct ThemeController<S, T> {
    store: S,
    target: T,
    current: Mutex<Theme>,
}

impl<S: PreferenceStore, T: ThemeTarget> ThemeController<S, T> {
    /// Restore the saved theme and apply it
    ///
    /// `fallback` is used when nothing usable was saved.
    pub fn load(store: S, target: T, fallback: Theme) -> Self {
        let saved = match store.get(THEME_KEY) {
            Ok(Some(value)) => value.parse().unwrap_or_else(|e| {
                warn!("Ignoring saved theme: {}", e);
                fallback
            }),
            Ok(None) => fallback,
            Err(e) => {
                warn!("Failed to read saved theme: {:#}", e);
                fallback
            }
        };

        let controller = Self {
            store,
            target,
            current: Mutex::new(saved),
        };
        controller.set_theme(saved);
        controller
    }

    pub fn current(&self) -> Theme {
        *self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Apply and persist a theme; a failing store does not block the change
    pub fn set_theme(&self, theme: Theme) {
        *self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = theme;
        self.target.apply(theme);

        if let Err(e) = self.store.set(THEME_KEY, theme.as_str()) {
            warn!("Failed to save theme: {:#}", e);
        }
        debug!("Theme set to {}", theme);
    }

    pub fn toggle(&self) -> Theme {
        let next = self.current().toggled();
        self.set_theme(next);
        next
    }
}
