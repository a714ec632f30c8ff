//! fencehp: HP scoring for a two-channel fencing scoring box
//!
//! Pipeline: frame source → classifier → debounce tracker → scoring engine → event queue

pub mod core;
pub mod types;

// =============================================================================
// FRAME GEOMETRY [C] - Scoring box HID report
// =============================================================================

/// Bytes requested per poll
pub const FRAME_LEN: usize = 42;

/// Offset of the left fencer's signature byte
pub const LEFT_SIGNATURE_OFFSET: usize = 2;

/// Offset of the right fencer's signature byte
pub const RIGHT_SIGNATURE_OFFSET: usize = 3;

/// Shortest frame that carries both signature bytes
pub const MIN_FRAME_LEN: usize = RIGHT_SIGNATURE_OFFSET + 1;

// =============================================================================
// DEFAULT SETTINGS [C]
// =============================================================================

/// One-time damage dealt to the opponent on a confirmed hit
pub const DEFAULT_HIT_DAMAGE: f64 = 10.0;

/// One-time damage dealt to yourself on a confirmed self-hit
pub const DEFAULT_SELF_HIT_DAMAGE: f64 = 10.0;

/// Continuous damage rate while a hit is held (HP per millisecond)
pub const DEFAULT_DAMAGE_PER_MS: f64 = 0.075;

/// Starting and maximum HP for both sides
pub const DEFAULT_MAX_HP: f64 = 250.0;

/// Debounce window (seconds)
pub const DEFAULT_DEBOUNCE_SECS: f64 = 0.3;

/// Hold time before continuous damage starts (seconds)
pub const DEFAULT_GRACE_DELAY_SECS: f64 = 0.03;

// =============================================================================
// CONTROL LOOP TIMING [C]
// =============================================================================

/// Blocking read timeout per poll (milliseconds)
/// Short enough that a stop signal is seen promptly
pub const READ_TIMEOUT_MS: u64 = 50;

/// Delay between reconnect attempts (milliseconds)
pub const RECONNECT_INTERVAL_MS: u64 = 1000;

/// Status lines kept by the scoreboard view
pub const STATUS_HISTORY: usize = 5;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
