//! Frame source boundary
//!
//! The control loop only sees `open` / `read` / `close`. An empty read is a
//! timeout: no frame arrived this poll.

use std::time::Duration;

use thiserror::Error;

/// Failures at the frame source boundary
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no scoring box found")]
    NotFound,
    #[error("scoring box disconnected: {0}")]
    Disconnected(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture line {line}: {reason}")]
    Capture { line: usize, reason: String },
    /// No more frames will ever arrive
    #[error("frame source exhausted")]
    Exhausted,
}

impl SourceError {
    /// Reconnecting cannot help
    pub fn is_exhausted(&self) -> bool {
        matches!(self, SourceError::Exhausted)
    }
}

/// An open producer of frames
pub trait FrameSource: Send {
    /// Read one frame of at most `max_len` bytes, blocking up to `timeout`.
    /// Returns an empty vector if nothing arrived in time.
    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, SourceError>;

    /// Release the underlying resource. Safe to call more than once.
    fn close(&mut self);

    /// Short label for logs
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

/// Opens (and reopens after a failure) a frame source
pub trait SourceConnector: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameSource>, SourceError>;
}

impl<F> SourceConnector for F
where
    F: Fn() -> Result<Box<dyn FrameSource>, SourceError> + Send + Sync,
{
    fn open(&self) -> Result<Box<dyn FrameSource>, SourceError> {
        self()
    }
}
