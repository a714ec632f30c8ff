//! State classifier: frame bytes → per-side symbolic states
//!
//! Each side's state depends only on its own signature byte:
//! - byte 2 → left fencer
//! - byte 3 → right fencer
//!
//! Values outside the tables map to UNKNOWN. Frames too short to carry
//! both bytes classify as (UNKNOWN, UNKNOWN).

use crate::types::{SideState, StatePair};
use crate::{LEFT_SIGNATURE_OFFSET, MIN_FRAME_LEN, RIGHT_SIGNATURE_OFFSET};

/// Classify one frame. Pure and total.
pub fn classify(frame: &[u8]) -> StatePair {
    if frame.len() < MIN_FRAME_LEN {
        return StatePair::unknown();
    }
    StatePair::new(
        left_state(frame[LEFT_SIGNATURE_OFFSET]),
        right_state(frame[RIGHT_SIGNATURE_OFFSET]),
    )
}

/// Left signature byte table
pub fn left_state(byte: u8) -> SideState {
    match byte {
        4 => SideState::Normal,
        44 => SideState::HittingOpponent,
        38 => SideState::HittingSelf,
        // 40 / 34: hitting opponent / self while the reel is unplugged
        0 | 40 | 34 => SideState::Disconnected,
        20 => SideState::WeaponsContact,
        _ => SideState::Unknown,
    }
}

/// Right signature byte table
pub fn right_state(byte: u8) -> SideState {
    match byte {
        80 => SideState::Normal,
        114 => SideState::HittingOpponent,
        120 => SideState::HittingSelf,
        // 98 / 104: hitting opponent / self while the reel is unplugged
        64 | 98 | 104 => SideState::Disconnected,
        84 => SideState::WeaponsContact,
        _ => SideState::Unknown,
    }
}

/// Signature byte that classifies to `state` on the left, if one exists
pub fn left_signature(state: SideState) -> Option<u8> {
    match state {
        SideState::Normal => Some(4),
        SideState::HittingOpponent => Some(44),
        SideState::HittingSelf => Some(38),
        SideState::Disconnected => Some(0),
        SideState::WeaponsContact => Some(20),
        SideState::Unknown => None,
    }
}

/// Signature byte that classifies to `state` on the right, if one exists
pub fn right_signature(state: SideState) -> Option<u8> {
    match state {
        SideState::Normal => Some(80),
        SideState::HittingOpponent => Some(114),
        SideState::HittingSelf => Some(120),
        SideState::Disconnected => Some(64),
        SideState::WeaponsContact => Some(84),
        SideState::Unknown => None,
    }
}

/// Build a full-length frame whose signature bytes encode `pair`.
/// Unknown sides get byte 0xFF, which is in neither table.
pub fn encode_frame(pair: StatePair, len: usize) -> Vec<u8> {
    let mut frame = vec![0u8; len.max(MIN_FRAME_LEN)];
    frame[LEFT_SIGNATURE_OFFSET] = left_signature(pair.left).unwrap_or(0xFF);
    frame[RIGHT_SIGNATURE_OFFSET] = right_signature(pair.right).unwrap_or(0xFF);
    frame
}

// =============================================================================
// TESTS
// =============================================================================
