//! Consumer-side view folded from the event stream

use std::collections::VecDeque;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{Event, PerSide, Settings, StatusCode, Winner};
use crate::STATUS_HISTORY;

/// What a scoreboard display shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    /// Current HP per side
    pub hp: PerSide<f64>,
    /// Max HP of the running session
    pub max_hp: f64,
    /// Sides currently taking continuous damage
    pub taking_damage: PerSide<bool>,
    /// Most recent status lines, oldest first
    pub recent: VecDeque<String>,
    /// Set once a game-over event arrives
    pub winner: Option<Winner>,
    /// Events folded so far
    pub event_count: u64,
    /// A session just started; its first health event carries max HP
    #[serde(skip)]
    awaiting_start: bool,
}

impl Scoreboard {
    /// Create a full-HP view for the given settings
    pub fn new(settings: &Settings) -> Self {
        Self {
            hp: PerSide::splat(settings.max_hp),
            max_hp: settings.max_hp,
            taking_damage: PerSide::default(),
            recent: VecDeque::with_capacity(STATUS_HISTORY),
            winner: None,
            event_count: 0,
            awaiting_start: false,
        }
    }

    /// Fold one event into the view
    pub fn apply(&mut self, event: &Event) {
        self.event_count += 1;
        match event {
            Event::Status { code, text } => {
                if *code == StatusCode::S100_MONITORING_STARTED {
                    self.winner = None;
                    self.taking_damage = PerSide::default();
                    self.awaiting_start = true;
                }
                if self.recent.len() == STATUS_HISTORY {
                    self.recent.pop_front();
                }
                self.recent.push_back(text.clone());
            }
            Event::Health { left, right } => {
                if std::mem::take(&mut self.awaiting_start) {
                    self.max_hp = left.max(*right);
                }
                self.hp = PerSide::new(*left, *right);
            }
            Event::ContinuousDamageStatus { left, right } => {
                self.taking_damage = PerSide::new(*left, *right);
            }
            Event::GameOver { winner } => {
                self.winner = Some(*winner);
            }
        }
    }

    /// HP as a 0.0-1.0 fraction of max
    pub fn fraction(&self) -> PerSide<f64> {
        PerSide::new(self.hp.left / self.max_hp, self.hp.right / self.max_hp)
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let fraction = self.fraction();
        let left = bar(fraction.left).green();
        let right = bar(fraction.right).red();
        let mut line = format!(
            "{} {:>6.1} {} || {} {:<6.1} {}",
            "L".green().bold(),
            self.hp.left,
            left,
            right,
            self.hp.right,
            "R".red().bold(),
        );
        if let Some(winner) = self.winner {
            line.push_str(&format!("  {}", winner.announcement().bold()));
        }
        line
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "left={:.3} | right={:.3} | max={:.1} | cont_left={} | cont_right={} | over={}",
            self.hp.left,
            self.hp.right,
            self.max_hp,
            self.taking_damage.left,
            self.taking_damage.right,
            self.winner.is_some(),
        )
    }
}

fn bar(fraction: f64) -> String {
    const WIDTH: usize = 20;
    let filled = (fraction.clamp(0.0, 1.0) * WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(WIDTH - filled))
}
