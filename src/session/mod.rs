//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - Microphone capture through an `AudioCapture` backend
//! - Continuous speech recognition with automatic stream restart
//! - Confidence filtering of recognition results
//! - Finalization of captured fragments into a base64 payload
//! - Session statistics and state management

mod capabilities;
mod config;
mod events;
mod session;
mod stats;

pub use capabilities::Capabilities;
pub use config::SessionConfig;
pub use events::{LoggingEvents, RecordingEvents};
pub use session::RecordingSession;
pub use stats::SessionStats;
