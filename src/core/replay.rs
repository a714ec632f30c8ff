//! Capture replay
//!
//! Accepted line formats:
//! - `2024-05-01 18:22:03.125000 Raw data: [0, 0, 44, 80, ...]` (raw dump)
//! - `@1250 [0, 0, 44, 80]` (offset in milliseconds)
//!
//! Blank lines, `#` comments and lines in neither format are skipped.
//! Each frame is held until the next frame's offset; after the last one
//! plus the hold period the source reports `Exhausted`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::core::clock::Clock;
use crate::core::source::{FrameSource, SourceConnector, SourceError};

lazy_static! {
    static ref RE_RAW_DUMP: Regex = Regex::new(
        r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)?)\s+Raw data:\s*\[([^\]]*)\]"
    ).unwrap();

    static ref RE_OFFSET: Regex = Regex::new(
        r"^@(\d+)\s*\[([^\]]*)\]"
    ).unwrap();
}

/// Default spacing between polls during replay
pub const REPLAY_POLL: Duration = Duration::from_millis(10);

/// Default time the last frame stays visible
pub const REPLAY_HOLD: Duration = Duration::from_millis(500);

/// One frame of a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFrame {
    /// Time since the first frame
    pub offset: Duration,
    pub bytes: Vec<u8>,
}

/// Parse a capture log
pub fn parse_capture(text: &str) -> Result<Vec<CaptureFrame>, SourceError> {
    let mut frames: Vec<CaptureFrame> = Vec::new();
    let mut base: Option<NaiveDateTime> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (offset, list) = if let Some(caps) = RE_RAW_DUMP.captures(line) {
            let stamp = NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|e| capture_error(line_no, format!("bad timestamp: {}", e)))?;
            let base = *base.get_or_insert(stamp);
            let offset = (stamp - base)
                .to_std()
                .map_err(|_| capture_error(line_no, "timestamp before first frame"))?;
            (offset, caps[2].to_string())
        } else if let Some(caps) = RE_OFFSET.captures(line) {
            let ms: u64 = caps[1]
                .parse()
                .map_err(|_| capture_error(line_no, "offset out of range"))?;
            (Duration::from_millis(ms), caps[2].to_string())
        } else {
            debug!("capture line {} skipped", line_no);
            continue;
        };

        if let Some(prev) = frames.last() {
            if offset < prev.offset {
                return Err(capture_error(line_no, "frames out of order"));
            }
        }
        frames.push(CaptureFrame {
            offset,
            bytes: parse_bytes(&list).map_err(|reason| capture_error(line_no, reason))?,
        });
    }

    Ok(frames)
}

fn parse_bytes(list: &str) -> Result<Vec<u8>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u8>().map_err(|_| format!("'{}' is not a byte", s)))
        .collect()
}

fn capture_error(line: usize, reason: impl Into<String>) -> SourceError {
    SourceError::Capture {
        line,
        reason: reason.into(),
    }
}

/// Replays a parsed capture against a clock
pub struct ReplaySource {
    frames: Arc<Vec<CaptureFrame>>,
    clock: Arc<dyn Clock>,
    poll: Duration,
    hold: Duration,
    started: Option<Instant>,
    cursor: usize,
    closed: bool,
}

impl FrameSource for ReplaySource {
    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, SourceError> {
        if self.closed {
            return Err(SourceError::Disconnected("replay closed".to_string()));
        }
        let last = match self.frames.last() {
            Some(frame) => frame.offset,
            None => return Err(SourceError::Exhausted),
        };
        let started = *self.started.get_or_insert_with(|| self.clock.now());

        self.clock.sleep(self.poll.min(timeout));
        let position = self.clock.now().saturating_duration_since(started);
        if position > last + self.hold {
            return Err(SourceError::Exhausted);
        }

        while self.cursor + 1 < self.frames.len() && self.frames[self.cursor + 1].offset <= position {
            self.cursor += 1;
        }
        let frame = &self.frames[self.cursor];
        if frame.offset > position {
            return Ok(Vec::new());
        }
        Ok(frame.bytes[..frame.bytes.len().min(max_len)].to_vec())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn describe(&self) -> String {
        format!("replay ({} frames)", self.frames.len())
    }
}

/// Opens a capture replay exactly once; a replay cannot be reacquired
pub struct ReplayConnector {
    frames: Arc<Vec<CaptureFrame>>,
    clock: Arc<dyn Clock>,
    poll: Duration,
    hold: Duration,
    opened: AtomicBool,
}

impl ReplayConnector {
    pub fn new(frames: Vec<CaptureFrame>, clock: Arc<dyn Clock>) -> Self {
        Self {
            frames: Arc::new(frames),
            clock,
            poll: REPLAY_POLL,
            hold: REPLAY_HOLD,
            opened: AtomicBool::new(false),
        }
    }

    /// Load and parse a capture file
    pub fn from_file(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path)?;
        let frames = parse_capture(&text)?;
        if frames.is_empty() {
            warn!("capture contains no frames");
        }
        Ok(Self::new(frames, clock))
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl SourceConnector for ReplayConnector {
    fn open(&self) -> Result<Box<dyn FrameSource>, SourceError> {
        if self.opened.swap(true, Ordering::SeqCst) {
            return Err(SourceError::Exhausted);
        }
        Ok(Box::new(ReplaySource {
            frames: Arc::clone(&self.frames),
            clock: Arc::clone(&self.clock),
            poll: self.poll,
            hold: self.hold,
            started: None,
            cursor: 0,
            closed: false,
        }))
    }
}

// =============================================================================
// TESTS
// =============================================================================
