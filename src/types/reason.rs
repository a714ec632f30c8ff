//! Status codes attached to every status event

use serde::{Deserialize, Serialize};

/// Reason codes for status events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum StatusCode {
    // =========================================================================
    // S100: Monitoring
    // =========================================================================
    /// Frame source acquired, polling started
    S100_MONITORING_STARTED,
    /// Confirmed state change on at least one side
    S101_STATE_CHANGE,
    /// Confirmed hit on the opponent
    S102_SCORE_HIT,
    /// Confirmed self-hit
    S103_SCORE_SELF_HIT,

    // =========================================================================
    // S200: Frame source
    // =========================================================================
    /// No scoring box could be opened
    S200_SOURCE_NOT_FOUND,
    /// Read failed, attempting to reconnect
    S201_SOURCE_READ_ERROR,
    /// Source reacquired, tracker baseline reset
    S202_SOURCE_RECONNECTED,
    /// Reconnect attempts used up
    S203_RECONNECT_FAILED,
    /// Source has no more frames
    S204_SOURCE_EXHAUSTED,

    // =========================================================================
    // S300: Game
    // =========================================================================
    /// A side reached 0 HP
    S300_GAME_OVER,
    /// Settings accepted, fresh session started
    S301_SETTINGS_APPLIED,
    /// Settings rejected, running session untouched
    S302_SETTINGS_INVALID,
    /// New game under unchanged settings
    S303_NEW_GAME,

    // =========================================================================
    // S400: Faults
    // =========================================================================
    /// Unexpected fault inside the control loop
    S400_INTERNAL_FAULT,

    // =========================================================================
    // S500: Shutdown
    // =========================================================================
    /// Control loop exited, source released
    S500_MONITORING_STOPPED,
}

impl StatusCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::S100_MONITORING_STARTED => "S100_MONITORING_STARTED",
            Self::S101_STATE_CHANGE => "S101_STATE_CHANGE",
            Self::S102_SCORE_HIT => "S102_SCORE_HIT",
            Self::S103_SCORE_SELF_HIT => "S103_SCORE_SELF_HIT",
            Self::S200_SOURCE_NOT_FOUND => "S200_SOURCE_NOT_FOUND",
            Self::S201_SOURCE_READ_ERROR => "S201_SOURCE_READ_ERROR",
            Self::S202_SOURCE_RECONNECTED => "S202_SOURCE_RECONNECTED",
            Self::S203_RECONNECT_FAILED => "S203_RECONNECT_FAILED",
            Self::S204_SOURCE_EXHAUSTED => "S204_SOURCE_EXHAUSTED",
            Self::S300_GAME_OVER => "S300_GAME_OVER",
            Self::S301_SETTINGS_APPLIED => "S301_SETTINGS_APPLIED",
            Self::S302_SETTINGS_INVALID => "S302_SETTINGS_INVALID",
            Self::S303_NEW_GAME => "S303_NEW_GAME",
            Self::S400_INTERNAL_FAULT => "S400_INTERNAL_FAULT",
            Self::S500_MONITORING_STOPPED => "S500_MONITORING_STOPPED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::S100_MONITORING_STARTED => "Monitoring fencing hits...",
            Self::S101_STATE_CHANGE => "State changed",
            Self::S102_SCORE_HIT => "Hit scored",
            Self::S103_SCORE_SELF_HIT => "Self-hit scored",
            Self::S200_SOURCE_NOT_FOUND => "Scoring box not found. Retrying...",
            Self::S201_SOURCE_READ_ERROR => "Read error, reconnecting",
            Self::S202_SOURCE_RECONNECTED => "Device reconnected. Resuming monitoring...",
            Self::S203_RECONNECT_FAILED => "Failed to reconnect. Stopping monitoring.",
            Self::S204_SOURCE_EXHAUSTED => "Frame source exhausted",
            Self::S300_GAME_OVER => "Game over",
            Self::S301_SETTINGS_APPLIED => "Game reset with new settings!",
            Self::S302_SETTINGS_INVALID => "Error: Invalid input values.",
            Self::S303_NEW_GAME => "New game started.",
            Self::S400_INTERNAL_FAULT => "Internal fault",
            Self::S500_MONITORING_STOPPED => "Device monitoring stopped.",
        }
    }

    /// Codes that end a monitoring session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::S500_MONITORING_STOPPED)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
