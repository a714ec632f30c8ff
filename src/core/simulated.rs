//! Simulated scoring box driven by shared press flags
//!
//! Stand-in for the hardware: frames carry the real signature bytes, so
//! everything downstream of the source runs unchanged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::core::classifier::encode_frame;
use crate::core::clock::Clock;
use crate::core::source::{FrameSource, SourceConnector, SourceError};
use crate::types::{SideState, StatePair};
use crate::FRAME_LEN;

/// Spacing between simulated reports
pub const SIMULATED_POLL: Duration = Duration::from_millis(10);

/// Buttons of the simulated box, shared with whoever presses them
#[derive(Debug, Default)]
pub struct SimulatedInputs {
    left: AtomicBool,
    right: AtomicBool,
    contact: AtomicBool,
    unplugged: AtomicBool,
}

impl SimulatedInputs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_left(&self, pressed: bool) {
        self.left.store(pressed, Ordering::SeqCst);
    }

    pub fn set_right(&self, pressed: bool) {
        self.right.store(pressed, Ordering::SeqCst);
    }

    /// Blades touching: both sides show weapons contact
    pub fn set_contact(&self, touching: bool) {
        self.contact.store(touching, Ordering::SeqCst);
    }

    /// Unplugged boxes fail reads and cannot be opened
    pub fn set_unplugged(&self, unplugged: bool) {
        self.unplugged.store(unplugged, Ordering::SeqCst);
    }

    /// Flip a flag and return its new value
    pub fn toggle_left(&self) -> bool {
        !self.left.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn toggle_right(&self) -> bool {
        !self.right.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn toggle_contact(&self) -> bool {
        !self.contact.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn toggle_unplugged(&self) -> bool {
        !self.unplugged.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_unplugged(&self) -> bool {
        self.unplugged.load(Ordering::SeqCst)
    }

    /// States the box currently reports
    pub fn current(&self) -> StatePair {
        if self.contact.load(Ordering::SeqCst) {
            return StatePair::splat(SideState::WeaponsContact);
        }
        let side = |pressed: &AtomicBool| {
            if pressed.load(Ordering::SeqCst) {
                SideState::HittingOpponent
            } else {
                SideState::Normal
            }
        };
        StatePair::new(side(&self.left), side(&self.right))
    }
}

/// Open simulated box
pub struct SimulatedSource {
    inputs: Arc<SimulatedInputs>,
    clock: Arc<dyn Clock>,
    poll: Duration,
    closed: bool,
}

impl FrameSource for SimulatedSource {
    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, SourceError> {
        if self.closed {
            return Err(SourceError::Disconnected("simulated box closed".to_string()));
        }
        self.clock.sleep(self.poll.min(timeout));
        if self.inputs.is_unplugged() {
            return Err(SourceError::Disconnected("simulated box unplugged".to_string()));
        }
        let mut frame = encode_frame(self.inputs.current(), FRAME_LEN);
        frame.truncate(max_len);
        Ok(frame)
    }

    fn close(&mut self) {
        if !self.closed {
            debug!("simulated box closed");
        }
        self.closed = true;
    }

    fn describe(&self) -> String {
        "simulated box".to_string()
    }
}

/// Opens the simulated box whenever it is plugged in
pub struct SimulatedConnector {
    inputs: Arc<SimulatedInputs>,
    clock: Arc<dyn Clock>,
    poll: Duration,
}

impl SimulatedConnector {
    pub fn new(inputs: Arc<SimulatedInputs>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inputs,
            clock,
            poll: SIMULATED_POLL,
        }
    }
}

impl SourceConnector for SimulatedConnector {
    fn open(&self) -> Result<Box<dyn FrameSource>, SourceError> {
        if self.inputs.is_unplugged() {
            return Err(SourceError::NotFound);
        }
        Ok(Box::new(SimulatedSource {
            inputs: Arc::clone(&self.inputs),
            clock: Arc::clone(&self.clock),
            poll: self.poll,
            closed: false,
        }))
    }
}
