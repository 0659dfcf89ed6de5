use embassy_time::{Duration, Instant};
use heapless::{Deque, Vec};

use crate::config::{SERIAL_LINE_MAX_LENGTH, SERIAL_RX_RING_SIZE};
use crate::elapsed;
use crate::log::log_warn;

/// One framed line, terminator excluded
pub type Line = Vec<u8, SERIAL_LINE_MAX_LENGTH>;

/// Splits received bytes into lines
///
/// A line ends at CR or LF; runs of terminators produce no empty lines.
/// A partial line is also completed after `timeout` of receive silence.
/// Bytes past the line limit are dropped and the line is delivered
/// truncated.
pub struct LineFramer<const RX: usize = SERIAL_RX_RING_SIZE> {
    rx: Deque<u8, RX>,
    line: Line,
    truncated: bool,
    last_rx: Instant,
    timeout: Duration,
}

impl<const RX: usize> LineFramer<RX> {
    pub const fn new(timeout: Duration) -> Self {
        Self {
            rx: Deque::new(),
            line: Vec::new(),
            truncated: false,
            last_rx: Instant::from_ticks(0),
            timeout,
        }
    }

    /// Buffer received bytes
    ///
    /// Returns how many were kept; the rest were dropped because the ring
    /// is full.
    pub fn receive(&mut self, bytes: &[u8], now: Instant) -> usize {
        if bytes.is_empty() {
            return 0;
        }
        self.last_rx = now;
        let mut kept = 0;
        for &byte in bytes {
            if self.rx.push_back(byte).is_ok() {
                kept += 1;
            }
        }
        if kept < bytes.len() {
            log_warn!("[LineFramer.receive] ring full, dropped {} bytes", bytes.len() - kept);
        }
        kept
    }

    /// Next complete line, if any
    pub fn next_line(&mut self, now: Instant) -> Option<Line> {
        while let Some(byte) = self.rx.pop_front() {
            if byte == b'\r' || byte == b'\n' {
                if !self.line.is_empty() {
                    return Some(self.take_line());
                }
                continue;
            }
            if self.line.push(byte).is_err() {
                self.truncated = true;
            }
        }
        if !self.line.is_empty() && elapsed(self.last_rx, now) > self.timeout {
            return Some(self.take_line());
        }
        None
    }

    /// Bytes waiting in the ring
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Bytes of the unfinished line
    pub fn pending(&self) -> &[u8] {
        &self.line
    }

    fn take_line(&mut self) -> Line {
        if self.truncated {
            log_warn!("[LineFramer.next_line] line longer than {} bytes truncated", SERIAL_LINE_MAX_LENGTH);
            self.truncated = false;
        }
        core::mem::take(&mut self.line)
    }
}
