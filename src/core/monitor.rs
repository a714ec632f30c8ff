//! Control loop
//!
//! One worker thread per session. States:
//!
//! ```text
//! Idle → Monitoring → (Disconnected ⇄ Reconnecting) → Stopped
//! ```
//!
//! - stop signal checked at loop top and right after every read
//! - the source is closed on every exit path, panics included
//! - `S500_MONITORING_STOPPED` is always the last event of a session

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::core::clock::Clock;
use crate::core::session::MatchSession;
use crate::core::source::{FrameSource, SourceConnector, SourceError};
use crate::types::{Event, MonitorState, Settings, StatusCode};
use crate::{FRAME_LEN, READ_TIMEOUT_MS, RECONNECT_INTERVAL_MS};

pub type EventSender = UnboundedSender<Event>;
pub type EventReceiver = UnboundedReceiver<Event>;

/// Create the session event queue
pub fn event_channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Loop timing and limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Bytes requested per read
    pub frame_len: usize,
    /// Upper bound on one blocking read
    pub read_timeout: Duration,
    /// Delay between reconnect attempts
    pub retry_interval: Duration,
    /// Give up after this many failed attempts (None: retry until stopped)
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            frame_len: FRAME_LEN,
            read_timeout: Duration::from_millis(READ_TIMEOUT_MS),
            retry_interval: Duration::from_millis(RECONNECT_INTERVAL_MS),
            max_reconnect_attempts: None,
        }
    }
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Closes whatever source it holds when replaced or dropped
struct SourceGuard(Option<Box<dyn FrameSource>>);

impl SourceGuard {
    fn replace(&mut self, source: Box<dyn FrameSource>) {
        self.close();
        info!("acquired {}", source.describe());
        self.0 = Some(source);
    }

    fn close(&mut self) {
        if let Some(mut source) = self.0.take() {
            debug!("closing {}", source.describe());
            source.close();
        }
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.close();
    }
}

/// How an attempt to (re)acquire the source ended
enum Acquire {
    Acquired,
    Stopped,
    GaveUp,
}

/// One monitoring session, ready to run
pub struct Monitor {
    settings: Settings,
    config: MonitorConfig,
    connector: Arc<dyn SourceConnector>,
    clock: Arc<dyn Clock>,
    events: EventSender,
    stop: StopSignal,
    state: MonitorState,
}

impl Monitor {
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
            stop: StopSignal::new(),
            state: MonitorState::Idle,
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Flag that ends this session when set
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run on a dedicated worker thread
    pub fn spawn(self) -> std::io::Result<MonitorHandle> {
        let stop = self.stop_signal();
        let thread = std::thread::Builder::new()
            .name("fencehp-monitor".to_string())
            .spawn(move || self.run())?;
        Ok(MonitorHandle {
            stop,
            thread: Some(thread),
        })
    }

    /// Run to completion on the current thread
    pub fn run(mut self) {
        let mut source = SourceGuard(None);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_loop(&mut source)));
        source.close();

        if let Err(payload) = outcome {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("control loop fault: {}", reason);
            self.emit(Event::status(
                StatusCode::S400_INTERNAL_FAULT,
                format!("Error in device loop: {}", reason),
            ));
        }

        self.set_state(MonitorState::Stopped);
        self.emit(Event::status_code(StatusCode::S500_MONITORING_STOPPED));
    }

    fn run_loop(&mut self, source: &mut SourceGuard) {
        let mut session = MatchSession::new(self.settings, self.clock.now());

        match self.connector.open() {
            Ok(opened) => source.replace(opened),
            Err(e) if e.is_exhausted() => {
                self.emit_exhausted();
                return;
            }
            Err(e) => {
                warn!("initial open failed: {}", e);
                self.emit(Event::status_code(StatusCode::S200_SOURCE_NOT_FOUND));
                self.set_state(MonitorState::Disconnected);
                match self.reacquire(source) {
                    Acquire::Acquired => {}
                    Acquire::Stopped | Acquire::GaveUp => return,
                }
            }
        }

        self.set_state(MonitorState::Monitoring);
        for event in session.start_events() {
            self.emit(event);
        }

        loop {
            if self.stop.is_stopped() {
                info!("stop requested");
                return;
            }
            let read = match source.0.as_mut() {
                Some(s) => s.read(self.config.frame_len, self.config.read_timeout),
                None => Err(SourceError::Disconnected("no source".to_string())),
            };
            if self.stop.is_stopped() {
                info!("stop requested");
                return;
            }

            match read {
                Ok(frame) => {
                    let now = self.clock.now();
                    let frame = if frame.is_empty() { None } else { Some(frame.as_slice()) };
                    for event in session.tick(frame, now) {
                        self.emit(event);
                    }
                    if session.is_over() {
                        return;
                    }
                }
                Err(e) if e.is_exhausted() => {
                    self.emit_exhausted();
                    return;
                }
                Err(e) => {
                    warn!("read failed: {}", e);
                    self.emit(Event::status(
                        StatusCode::S201_SOURCE_READ_ERROR,
                        format!("Error in device loop: {}", e),
                    ));
                    self.set_state(MonitorState::Disconnected);
                    source.close();

                    match self.reacquire(source) {
                        Acquire::Acquired => {}
                        Acquire::Stopped | Acquire::GaveUp => return,
                    }
                    session.on_reconnect();
                    self.emit(Event::status_code(StatusCode::S202_SOURCE_RECONNECTED));
                    self.set_state(MonitorState::Monitoring);
                }
            }
        }
    }

    /// Poll the connector at the retry interval until it yields a source
    fn reacquire(&mut self, source: &mut SourceGuard) -> Acquire {
        self.set_state(MonitorState::Reconnecting);
        let mut attempts: u32 = 0;
        loop {
            if self.stop.is_stopped() {
                return Acquire::Stopped;
            }
            attempts += 1;
            match self.connector.open() {
                Ok(opened) => {
                    info!("reconnected after {} attempt(s)", attempts);
                    source.replace(opened);
                    return Acquire::Acquired;
                }
                Err(e) if e.is_exhausted() => {
                    self.emit_exhausted();
                    return Acquire::GaveUp;
                }
                Err(e) => {
                    debug!("reconnect attempt {} failed: {}", attempts, e);
                    if self
                        .config
                        .max_reconnect_attempts
                        .is_some_and(|max| attempts >= max)
                    {
                        warn!("giving up after {} reconnect attempts", attempts);
                        self.emit(Event::status_code(StatusCode::S203_RECONNECT_FAILED));
                        return Acquire::GaveUp;
                    }
                }
            }
            if !self.wait(self.config.retry_interval) {
                return Acquire::Stopped;
            }
        }
    }

    /// Sleep in read-timeout slices; false if stopped meanwhile
    fn wait(&self, total: Duration) -> bool {
        let slice = self.config.read_timeout.max(Duration::from_millis(1));
        let mut waited = Duration::ZERO;
        while waited < total {
            if self.stop.is_stopped() {
                return false;
            }
            let step = slice.min(total - waited);
            self.clock.sleep(step);
            waited += step;
        }
        !self.stop.is_stopped()
    }

    fn emit_exhausted(&self) {
        info!("frame source exhausted");
        self.emit(Event::status_code(StatusCode::S204_SOURCE_EXHAUSTED));
    }

    fn set_state(&mut self, next: MonitorState) {
        if self.state != next {
            info!("monitor {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn emit(&self, event: Event) {
        if let Event::Status { code, text } = &event {
            debug!("[{}] {}", code.code(), text);
        }
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}

/// A running monitor thread
pub struct MonitorHandle {
    stop: StopSignal,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the worker to exit
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("monitor thread panicked outside the loop");
            }
        }
    }

    /// Signal stop, then wait
    pub fn shutdown(&mut self) {
        self.stop();
        self.join();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// TESTS
// =============================================================================
