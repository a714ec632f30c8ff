//! Debounce & transition tracker
//!
//! Per side, independently:
//! - raw change: incoming state differs from the previous *raw* state →
//!   record the change time (drives the continuous-damage grace clock)
//! - confirmation: raw state differs from the last *confirmed* state AND
//!   more than the debounce window has passed since that side's last
//!   confirmation → confirm and report it
//! - the first observation after construction or reset always confirms

use std::time::{Duration, Instant};

use log::debug;

use crate::types::{PerSide, Side, SideState, StatePair};

/// Transition history of one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionRecord {
    /// Last confirmed state (None until the first observation)
    pub last_confirmed: Option<SideState>,
    /// Previous raw observation
    pub last_raw: Option<SideState>,
    /// When the raw state last changed value
    pub last_change: Option<Instant>,
    /// When the last confirmation happened
    pub last_confirmed_at: Option<Instant>,
}

/// What one `observe` call found for one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SideObservation {
    /// Raw state differs from the previous raw state
    pub changed: bool,
    /// Newly confirmed state, if a transition was confirmed this call
    pub confirmed: Option<SideState>,
}

/// Result of one `observe` call for both sides
pub type ConfirmedTransitions = PerSide<SideObservation>;

impl ConfirmedTransitions {
    /// Any side confirmed a transition
    pub fn any_confirmed(&self) -> bool {
        self.left.confirmed.is_some() || self.right.confirmed.is_some()
    }

    /// Sides with a confirmed transition, left first
    pub fn confirmed(&self) -> impl Iterator<Item = (Side, SideState)> + '_ {
        Side::BOTH
            .into_iter()
            .filter_map(move |side| self.get(side).confirmed.map(|state| (side, state)))
    }
}

/// Debounce tracker for both sides
#[derive(Debug, Clone)]
pub struct DebounceTracker {
    /// Debounce window
    window: Duration,
    /// Per-side history
    records: PerSide<TransitionRecord>,
}

impl DebounceTracker {
    /// Create new tracker with the given debounce window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            records: PerSide::default(),
        }
    }

    /// Feed one classified pair observed at `now`
    pub fn observe(&mut self, pair: StatePair, now: Instant) -> ConfirmedTransitions {
        let mut result = ConfirmedTransitions::default();
        for side in Side::BOTH {
            *result.get_mut(side) = self.observe_side(side, *pair.get(side), now);
        }
        result
    }

    fn observe_side(&mut self, side: Side, raw: SideState, now: Instant) -> SideObservation {
        let window = self.window;
        let record = self.records.get_mut(side);

        // Track raw changes
        let changed = record.last_raw != Some(raw);
        if changed {
            record.last_change = Some(now);
        }
        record.last_raw = Some(raw);

        // Literal repeat of the confirmed value: nothing to confirm
        if record.last_confirmed == Some(raw) {
            return SideObservation { changed, confirmed: None };
        }

        let outside_window = match record.last_confirmed_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) > window,
        };
        if !outside_window {
            debug!("{} {} suppressed inside debounce window", side, raw);
            return SideObservation { changed, confirmed: None };
        }

        debug!(
            "{} confirmed {} (was {:?})",
            side,
            raw,
            record.last_confirmed
        );
        record.last_confirmed = Some(raw);
        record.last_confirmed_at = Some(now);
        SideObservation {
            changed,
            confirmed: Some(raw),
        }
    }

    /// Last confirmed state of a side
    pub fn confirmed(&self, side: Side) -> Option<SideState> {
        self.records.get(side).last_confirmed
    }

    /// Last confirmed states of both sides
    pub fn confirmed_pair(&self) -> PerSide<Option<SideState>> {
        PerSide::new(self.confirmed(Side::Left), self.confirmed(Side::Right))
    }

    /// How long the side's raw signal has held its current value
    pub fn time_since_change(&self, side: Side, now: Instant) -> Duration {
        self.records
            .get(side)
            .last_change
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default()
    }

    /// History of one side
    pub fn record(&self, side: Side) -> &TransitionRecord {
        self.records.get(side)
    }

    /// Forget all history; the next observation confirms immediately
    pub fn reset(&mut self) {
        *self = Self::new(self.window);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use SideState::*;

    const WINDOW: Duration = Duration::from_millis(300);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn pair(left: SideState, right: SideState) -> StatePair {
        StatePair::new(left, right)
    }

    #[test]
    fn test_first_observation_confirms_immediately() {
        let t0 = Instant::now();
        let mut tracker = DebounceTracker::new(WINDOW);
        let result = tracker.observe(pair(HittingOpponent, Normal), t0);
        assert_eq!(result.left.confirmed, Some(HittingOpponent));
        assert_eq!(result.right.confirmed, Some(Normal));
        assert!(result.left.changed && result.right.changed);
    }

    #[test]
    fn test_repeat_of_confirmed_state_is_silent() {
        let t0 = Instant::now();
        let mut tracker = DebounceTracker::new(WINDOW);
        tracker.observe(pair(Normal, Normal), t0);
        let result = tracker.observe(pair(Normal, Normal), t0 + ms(1000));
        assert!(!result.any_confirmed());
        assert!(!result.left.changed);
    }

    #[test]
    fn test_chatter_inside_window_is_suppressed() {
        let t0 = Instant::now();
        let mut tracker = DebounceTracker::new(WINDOW);
        tracker.observe(pair(Normal, Normal), t0);

        let mut confirmed = 0;
        for i in 1..=6u64 {
            let state = if i % 2 == 1 { HittingOpponent } else { Normal };
            let result = tracker.observe(pair(state, Normal), t0 + ms(i * 8));
            confirmed += result.confirmed().count();
            assert!(result.left.changed);
        }
        assert_eq!(confirmed, 0);
        assert_eq!(tracker.confirmed(Side::Left), Some(Normal));
    }

    #[test]
    fn test_stable_value_confirms_after_window() {
        let t0 = Instant::now();
        let mut tracker = DebounceTracker::new(WINDOW);
        tracker.observe(pair(Normal, Normal), t0);

        // Hit arrives inside the window and holds
        assert!(!tracker.observe(pair(HittingOpponent, Normal), t0 + ms(100)).any_confirmed());
        assert!(!tracker.observe(pair(HittingOpponent, Normal), t0 + ms(300)).any_confirmed());
        let result = tracker.observe(pair(HittingOpponent, Normal), t0 + ms(301));
        assert_eq!(result.left.confirmed, Some(HittingOpponent));
        assert!(!result.left.changed);
    }

    #[test]
    fn test_sides_debounce_independently() {
        let t0 = Instant::now();
        let mut tracker = DebounceTracker::new(WINDOW);
        tracker.observe(pair(Normal, Normal), t0);

        // Left confirms at 400ms, then bounces
        tracker.observe(pair(HittingOpponent, Normal), t0 + ms(400));
        tracker.observe(pair(Normal, Normal), t0 + ms(410));

        // Right confirms despite the left bounce
        let result = tracker.observe(pair(HittingOpponent, HittingOpponent), t0 + ms(420));
        assert_eq!(result.right.confirmed, Some(HittingOpponent));
        assert_eq!(result.left.confirmed, None);
    }

    #[test]
    fn test_reentry_confirms_again() {
        let t0 = Instant::now();
        let mut tracker = DebounceTracker::new(WINDOW);
        tracker.observe(pair(Normal, Normal), t0);

        let a = tracker.observe(pair(HittingOpponent, Normal), t0 + ms(400));
        let b = tracker.observe(pair(Normal, Normal), t0 + ms(800));
        let c = tracker.observe(pair(HittingOpponent, Normal), t0 + ms(1200));
        assert_eq!(a.left.confirmed, Some(HittingOpponent));
        assert_eq!(b.left.confirmed, Some(Normal));
        assert_eq!(c.left.confirmed, Some(HittingOpponent));
    }

    #[test]
    fn test_unknown_is_confirmed_like_any_state() {
        let t0 = Instant::now();
        let mut tracker = DebounceTracker::new(WINDOW);
        tracker.observe(pair(Normal, Normal), t0);
        let result = tracker.observe(StatePair::unknown(), t0 + ms(500));
        assert_eq!(result.left.confirmed, Some(Unknown));
        assert_eq!(result.right.confirmed, Some(Unknown));
    }

    #[test]
    fn test_time_since_change_follows_raw_signal() {
        let t0 = Instant::now();
        let mut tracker = DebounceTracker::new(WINDOW);
        tracker.observe(pair(Normal, Normal), t0);
        tracker.observe(pair(HittingOpponent, Normal), t0 + ms(100));
        // Not confirmed yet, but the raw clock restarted
        assert_eq!(tracker.time_since_change(Side::Left, t0 + ms(150)), ms(50));
        assert_eq!(tracker.time_since_change(Side::Right, t0 + ms(150)), ms(150));
    }

    #[test]
    fn test_reset_restores_first_observation() {
        let t0 = Instant::now();
        let mut tracker = DebounceTracker::new(WINDOW);
        tracker.observe(pair(HittingOpponent, Normal), t0);
        tracker.reset();
        assert_eq!(tracker.confirmed(Side::Left), None);
        assert_eq!(tracker.record(Side::Left), &TransitionRecord::default());

        // Within what would have been the window, still confirms
        let result = tracker.observe(pair(Normal, Normal), t0 + ms(10));
        assert_eq!(result.left.confirmed, Some(Normal));
    }
}
