//! Match session: one poll in, ordered events out
//!
//! Per tick:
//! 1. continuous damage for the interval since the last tick, from the
//!    states confirmed during that interval
//! 2. classify + debounce the new frame (if any)
//! 3. one-time damage for each confirmed transition
//! 4. events: state line, score lines, health, continuous-damage flags, win

use std::time::Instant;

use log::{debug, info};

use crate::core::classifier::classify;
use crate::core::debounce::DebounceTracker;
use crate::core::scoring::ScoringEngine;
use crate::types::{Event, PerSide, Settings, Side, SideState, StatePair, StatusCode, Winner};

/// All mutable state of one monitoring session
#[derive(Debug, Clone)]
pub struct MatchSession {
    settings: Settings,
    tracker: DebounceTracker,
    engine: ScoringEngine,
    /// Session start (for the elapsed-time prefix of state lines)
    started_at: Instant,
    /// Time of the previous tick; None right after start or reconnect
    last_tick: Option<Instant>,
    /// Last published continuous-damage flags (per receiving side)
    taking_damage: PerSide<bool>,
    /// Win already published
    finished: bool,
    tick_count: u64,
}

impl MatchSession {
    /// Create new session at full HP
    pub fn new(settings: Settings, now: Instant) -> Self {
        Self {
            tracker: DebounceTracker::new(settings.debounce_window()),
            engine: ScoringEngine::new(settings),
            settings,
            started_at: now,
            last_tick: None,
            taking_damage: PerSide::default(),
            finished: false,
            tick_count: 0,
        }
    }

    /// Events announcing a fresh session
    pub fn start_events(&self) -> Vec<Event> {
        let (left, right) = self.engine.hp();
        vec![
            Event::status_code(StatusCode::S100_MONITORING_STARTED),
            Event::Health { left, right },
        ]
    }

    /// Process one poll. `frame` is None when the read timed out.
    pub fn tick(&mut self, frame: Option<&[u8]>, now: Instant) -> Vec<Event> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        self.tick_count += 1;

        let elapsed = self
            .last_tick
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default();
        self.last_tick = Some(now);
        let hp_before = self.engine.hp();

        // Continuous damage for the interval just ended
        let grace = self.settings.grace_delay();
        let mut taking_damage = PerSide::<bool>::default();
        for side in Side::BOTH {
            let record = self.tracker.record(side);
            let Some(state) = record.last_confirmed else {
                continue;
            };
            // Released but not yet debounced back: no longer held
            if record.last_raw != Some(state) {
                continue;
            }
            let since_change = self.tracker.time_since_change(side, now);
            if state.is_sustained_hit() && since_change >= grace {
                *taking_damage.get_mut(side.opponent()) = true;
            }
            self.engine
                .apply_continuous_damage(side, state, elapsed, since_change);
        }

        // New frame
        if let Some(frame) = frame {
            let observed = self.tracker.observe(classify(frame), now);
            if observed.any_confirmed() {
                let confirmed = self.confirmed_pair();
                let secs = now.saturating_duration_since(self.started_at).as_secs_f64();
                events.push(Event::status(
                    StatusCode::S101_STATE_CHANGE,
                    format!("[{:.2}s] {}", secs, confirmed.describe()),
                ));
                for (side, state) in observed.confirmed() {
                    self.score_transition(side, state, &mut events);
                }
            }
        }

        let hp_after = self.engine.hp();
        if hp_after != hp_before {
            events.push(Event::Health {
                left: hp_after.0,
                right: hp_after.1,
            });
        }

        if taking_damage != self.taking_damage {
            debug!(
                "continuous damage flags: left={} right={}",
                taking_damage.left, taking_damage.right
            );
            self.taking_damage = taking_damage;
            events.push(Event::ContinuousDamageStatus {
                left: taking_damage.left,
                right: taking_damage.right,
            });
        }

        self.engine.settle();
        if let Some(winner) = self.engine.winner() {
            self.finished = true;
            info!("game over after {} ticks: {:?}", self.tick_count, winner);
            events.push(Event::status(StatusCode::S300_GAME_OVER, winner.announcement()));
            events.push(Event::GameOver { winner });
        }

        events
    }

    fn score_transition(&mut self, side: Side, state: SideState, events: &mut Vec<Event>) {
        let (code, label) = match state {
            SideState::HittingOpponent => (StatusCode::S102_SCORE_HIT, "PLAYER HIT"),
            SideState::HittingSelf => (StatusCode::S103_SCORE_SELF_HIT, "SELF-HIT"),
            _ => return,
        };
        self.engine.apply_one_time_damage(side, state);
        events.push(Event::status(
            code,
            format!("*** SCORE: {} {} ***", side, label),
        ));
    }

    /// The source was reacquired: fresh debounce baseline, HP kept
    pub fn on_reconnect(&mut self) {
        info!(
            "reconnected; keeping HP {:?}, resetting transition history",
            self.engine.hp()
        );
        self.tracker.reset();
        self.last_tick = None;
    }

    /// Confirmed states, Unknown for sides not yet observed
    pub fn confirmed_pair(&self) -> StatePair {
        let pair = self.tracker.confirmed_pair();
        StatePair::new(
            pair.left.unwrap_or(SideState::Unknown),
            pair.right.unwrap_or(SideState::Unknown),
        )
    }

    /// Current HP (left, right)
    pub fn hp(&self) -> (f64, f64) {
        self.engine.hp()
    }

    pub fn is_over(&self) -> bool {
        self.engine.is_over()
    }

    pub fn winner(&self) -> Option<Winner> {
        self.engine.winner()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tracker(&self) -> &DebounceTracker {
        &self.tracker
    }

    /// Sides currently taking continuous damage
    pub fn taking_damage(&self) -> PerSide<bool> {
        self.taking_damage
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::encode_frame;
    use crate::FRAME_LEN;
    use std::time::Duration;
    use SideState::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn frame(left: SideState, right: SideState) -> Vec<u8> {
        encode_frame(StatePair::new(left, right), FRAME_LEN)
    }

    fn health_events(events: &[Event]) -> Vec<(f64, f64)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Health { left, right } => Some((*left, *right)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_events() {
        let session = MatchSession::new(Settings::default(), Instant::now());
        let events = session.start_events();
        assert_eq!(
            events[0],
            Event::status(StatusCode::S100_MONITORING_STARTED, "Monitoring fencing hits...")
        );
        assert_eq!(events[1], Event::Health { left: 250.0, right: 250.0 });
    }

    #[test]
    fn test_first_frame_reports_state_line() {
        let t0 = Instant::now();
        let mut session = MatchSession::new(Settings::default(), t0);
        let events = session.tick(Some(&frame(Normal, Normal)), t0 + ms(10));
        assert_eq!(
            events,
            vec![Event::status(StatusCode::S101_STATE_CHANGE, "[0.01s] L: NORMAL, R: NORMAL")]
        );
    }

    #[test]
    fn test_hit_event_order() {
        let t0 = Instant::now();
        let mut session = MatchSession::new(Settings::default(), t0);
        session.tick(Some(&frame(Normal, Normal)), t0);
        let events = session.tick(Some(&frame(HittingOpponent, Normal)), t0 + ms(400));
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], Event::Status { code: StatusCode::S101_STATE_CHANGE, text } if text.contains("L: HITTING_OPPONENT")));
        assert_eq!(
            events[1],
            Event::status(StatusCode::S102_SCORE_HIT, "*** SCORE: LEFT PLAYER HIT ***")
        );
        assert_eq!(events[2], Event::Health { left: 250.0, right: 240.0 });
    }

    #[test]
    fn test_self_hit_line() {
        let t0 = Instant::now();
        let mut session = MatchSession::new(Settings::default(), t0);
        let events = session.tick(Some(&frame(Normal, HittingSelf)), t0);
        assert!(events.contains(&Event::status(
            StatusCode::S103_SCORE_SELF_HIT,
            "*** SCORE: RIGHT SELF-HIT ***"
        )));
        assert_eq!(session.hp(), (250.0, 240.0));
    }

    #[test]
    fn test_continuous_flags_toggle_once() {
        let t0 = Instant::now();
        let mut session = MatchSession::new(Settings::default(), t0);
        session.tick(Some(&frame(Normal, HittingOpponent)), t0);

        let mut flag_events = Vec::new();
        for i in 1..=20u64 {
            let events = session.tick(Some(&frame(Normal, HittingOpponent)), t0 + ms(i * 10));
            flag_events.extend(
                events
                    .into_iter()
                    .filter(|e| matches!(e, Event::ContinuousDamageStatus { .. })),
            );
        }
        assert_eq!(
            flag_events,
            vec![Event::ContinuousDamageStatus { left: true, right: false }]
        );
        assert_eq!(session.taking_damage(), PerSide::new(true, false));
    }

    #[test]
    fn test_timeout_tick_still_accrues() {
        let t0 = Instant::now();
        let mut session = MatchSession::new(Settings::default(), t0);
        session.tick(Some(&frame(HittingOpponent, Normal)), t0);
        session.tick(None, t0 + ms(100));
        session.tick(None, t0 + ms(200));
        let (_, right) = session.hp();
        // 10 one-time + 170ms past grace at 0.075
        assert!((250.0 - right - (10.0 + 12.75)).abs() < 1e-9, "got {}", right);
    }

    #[test]
    fn test_release_stops_continuous_damage_before_debounce() {
        let t0 = Instant::now();
        let mut session = MatchSession::new(Settings::default(), t0);
        session.tick(Some(&frame(HittingOpponent, Normal)), t0);
        session.tick(Some(&frame(HittingOpponent, Normal)), t0 + ms(100));
        let held = session.hp().1;

        // Released at 110ms; Normal is not confirmed until the window passes
        session.tick(Some(&frame(Normal, Normal)), t0 + ms(110));
        let events = session.tick(Some(&frame(Normal, Normal)), t0 + ms(200));
        assert_eq!(session.tracker().confirmed(Side::Left), Some(HittingOpponent));
        assert!(health_events(&events).is_empty());
        assert!((session.hp().1 - (held - 0.75)).abs() < 1e-9);
        assert_eq!(session.taking_damage(), PerSide::new(false, false));
    }

    #[test]
    fn test_knockout_emits_win_and_goes_quiet() {
        let t0 = Instant::now();
        let settings = Settings { max_hp: 10.0, ..Settings::default() };
        let mut session = MatchSession::new(settings, t0);
        let events = session.tick(Some(&frame(Normal, HittingOpponent)), t0);

        assert_eq!(health_events(&events), vec![(0.0, 10.0)]);
        let tail = &events[events.len() - 2..];
        assert_eq!(
            tail[0],
            Event::status(StatusCode::S300_GAME_OVER, "*** PLAYER 2: RIGHT WINS ***")
        );
        assert_eq!(tail[1], Event::GameOver { winner: Winner::Right });
        assert!(session.is_over());

        assert!(session.tick(Some(&frame(HittingOpponent, Normal)), t0 + ms(500)).is_empty());
        assert_eq!(session.hp(), (0.0, 10.0));
    }

    #[test]
    fn test_double_knockout_is_draw() {
        let t0 = Instant::now();
        let settings = Settings { max_hp: 10.0, ..Settings::default() };
        let mut session = MatchSession::new(settings, t0);
        let events = session.tick(Some(&frame(HittingSelf, HittingSelf)), t0);
        assert_eq!(events.last(), Some(&Event::GameOver { winner: Winner::Draw }));
    }

    #[test]
    fn test_reconnect_keeps_hp_and_resets_baseline() {
        let t0 = Instant::now();
        let mut session = MatchSession::new(Settings::default(), t0);
        session.tick(Some(&frame(HittingOpponent, Normal)), t0);
        assert_eq!(session.hp(), (250.0, 240.0));

        session.on_reconnect();
        assert_eq!(session.tracker().confirmed(Side::Left), None);

        // 50ms later is inside the old window but confirms as a first observation
        let events = session.tick(Some(&frame(Normal, Normal)), t0 + ms(50));
        assert!(matches!(&events[0], Event::Status { code: StatusCode::S101_STATE_CHANGE, .. }));
        assert_eq!(session.hp(), (250.0, 240.0));
    }
}
