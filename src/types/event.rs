//! Events published by the control loop to its consumer

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::StatusCode;

/// Outcome of a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Left,
    Right,
    /// Both sides reached 0 HP on the same tick
    Draw,
}

impl Winner {
    /// Winner given which sides are at 0 HP, if any
    pub fn from_knockouts(left_out: bool, right_out: bool) -> Option<Self> {
        match (left_out, right_out) {
            (true, true) => Some(Winner::Draw),
            (true, false) => Some(Winner::Right),
            (false, true) => Some(Winner::Left),
            (false, false) => None,
        }
    }

    /// Status-line announcement
    pub fn announcement(&self) -> &'static str {
        match self {
            Winner::Left => "*** PLAYER 1: LEFT WINS ***",
            Winner::Right => "*** PLAYER 2: RIGHT WINS ***",
            Winner::Draw => "*** DOUBLE KNOCKOUT: DRAW ***",
        }
    }
}

/// Tagged record on the event queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Event {
    /// Human-readable status line
    Status { code: StatusCode, text: String },
    /// Current HP of both sides
    Health { left: f64, right: f64 },
    /// Which sides are currently taking continuous damage
    ContinuousDamageStatus { left: bool, right: bool },
    /// A side reached 0 HP
    GameOver { winner: Winner },
}

impl Event {
    pub fn status(code: StatusCode, text: impl Into<String>) -> Self {
        Event::Status {
            code,
            text: text.into(),
        }
    }

    /// Status carrying the code's own description as text
    pub fn status_code(code: StatusCode) -> Self {
        Event::status(code, code.description())
    }

    /// True for the last event a monitoring session emits
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Status { code, .. } if code.is_terminal())
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        match self {
            Event::Status { code, text } => match code {
                StatusCode::S102_SCORE_HIT | StatusCode::S300_GAME_OVER => {
                    text.bold().green().to_string()
                }
                StatusCode::S103_SCORE_SELF_HIT => text.bold().yellow().to_string(),
                StatusCode::S200_SOURCE_NOT_FOUND
                | StatusCode::S201_SOURCE_READ_ERROR
                | StatusCode::S203_RECONNECT_FAILED
                | StatusCode::S302_SETTINGS_INVALID
                | StatusCode::S400_INTERNAL_FAULT => text.red().to_string(),
                _ => text.normal().to_string(),
            },
            Event::Health { left, right } => format!(
                "{} {} | {} {}",
                "LEFT".green().bold(),
                format!("{:.1}", left).green(),
                format!("{:.1}", right).red(),
                "RIGHT".red().bold(),
            ),
            Event::ContinuousDamageStatus { left, right } => format!(
                "{}",
                format!("continuous damage: left={} right={}", left, right).bright_black()
            ),
            Event::GameOver { winner } => winner.announcement().bold().reversed().to_string(),
        }
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        match self {
            Event::Status { code, text } => format!("status | code={} | {}", code.code(), text),
            Event::Health { left, right } => format!("health | left={:.3} | right={:.3}", left, right),
            Event::ContinuousDamageStatus { left, right } => {
                format!("continuous | left={} | right={}", left, right)
            }
            Event::GameOver { winner } => format!(
                "game_over | winner={}",
                serde_json::to_value(winner)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_of_each_kind() {
        let status = serde_json::to_value(Event::status(StatusCode::S101_STATE_CHANGE, "x")).unwrap();
        assert_eq!(status["kind"], "status");
        assert_eq!(status["text"], "x");
        assert_eq!(status["code"], "S101_STATE_CHANGE");

        let health = serde_json::to_value(Event::Health { left: 1.5, right: 2.0 }).unwrap();
        assert_eq!(health["kind"], "health");
        assert_eq!(health["left"], 1.5);

        let cont = serde_json::to_value(Event::ContinuousDamageStatus { left: true, right: false }).unwrap();
        assert_eq!(cont["kind"], "continuousDamageStatus");
        assert_eq!(cont["left"], true);

        let over = serde_json::to_value(Event::GameOver { winner: Winner::Draw }).unwrap();
        assert_eq!(over["kind"], "gameOver");
        assert_eq!(over["winner"], "draw");
    }

    #[test]
    fn test_winner_from_knockouts() {
        assert_eq!(Winner::from_knockouts(false, false), None);
        assert_eq!(Winner::from_knockouts(true, false), Some(Winner::Right));
        assert_eq!(Winner::from_knockouts(false, true), Some(Winner::Left));
        assert_eq!(Winner::from_knockouts(true, true), Some(Winner::Draw));
    }

    #[test]
    fn test_parseable_strings() {
        let e = Event::GameOver { winner: Winner::Left };
        assert_eq!(e.to_parseable_string(), "game_over | winner=left");
        let h = Event::Health { left: 240.0, right: 250.0 };
        assert_eq!(h.to_parseable_string(), "health | left=240.000 | right=250.000");
    }

    #[test]
    fn test_terminal_marker() {
        assert!(Event::status_code(StatusCode::S500_MONITORING_STOPPED).is_terminal());
        assert!(!Event::status_code(StatusCode::S300_GAME_OVER).is_terminal());
    }
}
