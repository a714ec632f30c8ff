//! Session lifecycle: start, apply settings, reset, shutdown
//!
//! Settings are never changed under a running loop. Applying new settings
//! validates first, then stops and joins the running monitor, then starts a
//! fresh one.

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;

use crate::core::clock::Clock;
use crate::core::monitor::{EventSender, Monitor, MonitorConfig, MonitorHandle};
use crate::core::source::SourceConnector;
use crate::types::{Event, Settings, SettingsError, SettingsInput, StatusCode};

/// Errors from controller operations
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("failed to start monitor thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Owns the running monitor of one scoring box
pub struct Controller {
    settings: Settings,
    config: MonitorConfig,
    connector: Arc<dyn SourceConnector>,
    clock: Arc<dyn Clock>,
    events: EventSender,
    handle: Option<MonitorHandle>,
    sessions_started: u64,
}

impl Controller {
    pub fn new(
        settings: Settings,
        connector: Arc<dyn SourceConnector>,
        clock: Arc<dyn Clock>,
        events: EventSender,
    ) -> Self {
        Self {
            settings,
            config: MonitorConfig::default(),
            connector,
            clock,
            events,
            handle: None,
            sessions_started: 0,
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Start monitoring with the current settings (restarts if running)
    pub fn start(&mut self) -> Result<(), ControlError> {
        self.shutdown();
        let monitor = Monitor::new(
            self.settings,
            Arc::clone(&self.connector),
            Arc::clone(&self.clock),
            self.events.clone(),
        )
        .with_config(self.config);
        self.handle = Some(monitor.spawn()?);
        self.sessions_started += 1;
        info!("session {} started", self.sessions_started);
        Ok(())
    }

    /// Parse form input and restart under it. Invalid input leaves the
    /// running session untouched.
    pub fn apply_settings(&mut self, input: &SettingsInput) -> Result<Settings, ControlError> {
        let settings = match input.parse() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("settings rejected: {}", e);
                self.emit(Event::status(
                    StatusCode::S302_SETTINGS_INVALID,
                    format!("{} ({})", StatusCode::S302_SETTINGS_INVALID.description(), e),
                ));
                return Err(e.into());
            }
        };
        self.restart_with(settings)?;
        Ok(settings)
    }

    /// Restart under already-parsed settings
    pub fn apply(&mut self, settings: Settings) -> Result<(), ControlError> {
        if let Err(e) = settings.validate() {
            warn!("settings rejected: {}", e);
            self.emit(Event::status(
                StatusCode::S302_SETTINGS_INVALID,
                format!("{} ({})", StatusCode::S302_SETTINGS_INVALID.description(), e),
            ));
            return Err(e.into());
        }
        self.restart_with(settings)
    }

    /// New game under the current settings
    pub fn reset(&mut self) -> Result<(), ControlError> {
        self.shutdown();
        info!("new game");
        self.emit(Event::status_code(StatusCode::S303_NEW_GAME));
        self.start()
    }

    fn restart_with(&mut self, settings: Settings) -> Result<(), ControlError> {
        self.shutdown();
        self.settings = settings;
        info!("applying settings {:?}", settings);
        self.emit(Event::status_code(StatusCode::S301_SETTINGS_APPLIED));
        self.start()
    }

    /// Stop and join the running monitor, if any
    pub fn shutdown(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.shutdown();
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// A monitor thread exists and has not exited
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Get number of sessions started
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// TESTS
// =============================================================================
