//! Core types for fencehp

mod side;
mod state;
mod settings;
mod event;
mod reason;
mod output;

pub use side::{Side, SideState, StatePair, PerSide};
pub use state::MonitorState;
pub use settings::{Settings, SettingsInput, SettingsError};
pub use event::{Event, Winner};
pub use reason::StatusCode;
pub use output::Scoreboard;
