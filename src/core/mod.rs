//! Core modules for fencehp

pub mod classifier;
pub mod debounce;
pub mod scoring;
pub mod session;
pub mod source;
pub mod clock;
pub mod replay;
pub mod simulated;
pub mod monitor;
pub mod controller;
pub mod api;

pub use classifier::{classify, encode_frame};
pub use debounce::{ConfirmedTransitions, DebounceTracker, SideObservation, TransitionRecord};
pub use scoring::{GameState, ScoringEngine};
pub use session::MatchSession;
pub use source::{FrameSource, SourceConnector, SourceError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use replay::{parse_capture, CaptureFrame, ReplayConnector, ReplaySource};
pub use simulated::{SimulatedConnector, SimulatedInputs, SimulatedSource};
pub use monitor::{event_channel, EventReceiver, EventSender, Monitor, MonitorConfig, MonitorHandle, StopSignal};
pub use controller::{ControlError, Controller};
pub use api::{create_router, run_server, AppState};
