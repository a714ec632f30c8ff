//! Per-side symbolic states

use serde::{Deserialize, Serialize};

/// One of the two fencers, tracked independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// The other fencer
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Short label used in status lines ("L" / "R")
    pub fn initial(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
        };
        write!(f, "{}", name)
    }
}

/// Symbolic state of one side, decoded from its signature byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SideState {
    /// Idle, connected, no contact
    Normal,
    /// Point landed on the opponent
    HittingOpponent,
    /// Point landed on own guard or lamé
    HittingSelf,
    /// Body wire or reel disconnected
    Disconnected,
    /// Blades touching each other
    #[serde(rename = "WEAPONS_HIT")]
    WeaponsContact,
    /// Signature byte not in the table, or frame too short
    Unknown,
}

impl SideState {
    /// States that deal continuous damage to the opponent while held
    pub fn is_sustained_hit(self) -> bool {
        matches!(self, SideState::HittingOpponent | SideState::WeaponsContact)
    }
}

impl std::fmt::Display for SideState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SideState::Normal => "NORMAL",
            SideState::HittingOpponent => "HITTING_OPPONENT",
            SideState::HittingSelf => "HITTING_SELF",
            SideState::Disconnected => "DISCONNECTED",
            SideState::WeaponsContact => "WEAPONS_HIT",
            SideState::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// A value held once per side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub left: T,
    pub right: T,
}

impl<T> PerSide<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

impl<T: Clone> PerSide<T> {
    /// Same value on both sides
    pub fn splat(value: T) -> Self {
        Self {
            left: value.clone(),
            right: value,
        }
    }
}

/// Classified states of both sides for one frame
pub type StatePair = PerSide<SideState>;

impl StatePair {
    /// Both sides unknown (short or missing frame)
    pub fn unknown() -> Self {
        Self::splat(SideState::Unknown)
    }

    /// Status-line form: "L: NORMAL, R: HITTING_OPPONENT"
    pub fn describe(&self) -> String {
        format!("L: {}, R: {}", self.left, self.right)
    }
}
