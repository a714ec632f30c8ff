//! Control loop state definitions

use serde::{Deserialize, Serialize};

/// The lifecycle states of a monitoring session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorState {
    /// Worker started, no frame source yet
    Idle,
    /// Source acquired, polling frames
    Monitoring,
    /// Read failed, source released
    Disconnected,
    /// Polling for a replacement source
    Reconnecting,
    /// Loop finished (stop signal, win, or exhaustion)
    Stopped,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MonitorState::Idle => "IDLE",
            MonitorState::Monitoring => "MONITORING",
            MonitorState::Disconnected => "DISCONNECTED",
            MonitorState::Reconnecting => "RECONNECTING",
            MonitorState::Stopped => "STOPPED",
        };
        write!(f, "{}", name)
    }
}
