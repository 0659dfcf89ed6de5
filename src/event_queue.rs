//! Bounded outgoing event queue.
//!
//! Producers on either schedule push [`Event`]s; the control loop flushes a
//! few per iteration to the serial sink. Both the queue and the sink sit
//! behind [`TimedMutex`] so neither side can block the other for long.
//! A push that cannot get in (queue full or lock timeout) is dropped and
//! counted, never retried.

use core::cell::Cell;

use critical_section::Mutex;
use embedded_io::Write;
use heapless::Deque;

use crate::config::{LockTimeouts, QUEUE_SIZE_EVENTS};
use crate::event::Event;
use crate::lock::{LockTimeout, TimedMutex};
use crate::log::log_warn;

/// Anything that accepts outgoing events
pub trait EventSink {
    /// Offer an event; returns `false` if it was dropped
    fn push(&self, event: Event) -> bool;
}

/// Event queue in front of a serial sink.
pub struct EventQueue<W, const SIZE: usize = QUEUE_SIZE_EVENTS> {
    events: TimedMutex<Deque<Event, SIZE>>,
    serial: TimedMutex<W>,
    dropped: Mutex<Cell<u32>>,
    timeouts: LockTimeouts,
}

impl<W: Write, const SIZE: usize> EventQueue<W, SIZE> {
    pub fn new(serial: W, timeouts: LockTimeouts) -> Self {
        Self {
            events: TimedMutex::new(Deque::new()),
            serial: TimedMutex::new(serial),
            dropped: Mutex::new(Cell::new(0)),
            timeouts,
        }
    }

    /// Enqueue an event, dropping it if the queue is full or busy.
    pub fn push(&self, event: Event) -> bool {
        let Ok(mut events) = self.events.lock_within(self.timeouts.queue) else {
            self.record_drop();
            log_warn!("[EventQueue.push] lock timeout, dropped {}", event.kind());
            return false;
        };
        match events.push_back(event) {
            Ok(()) => true,
            Err(event) => {
                drop(events);
                self.record_drop();
                log_warn!("[EventQueue.push] queue full, dropped {}", event.kind());
                false
            }
        }
    }

    /// Write at most `max` queued events to the serial sink.
    ///
    /// Returns the number written. Stops early when the queue is empty or a
    /// lock cannot be taken; an event whose serial write could not start is
    /// put back at the front.
    pub fn flush(&self, max: usize) -> usize {
        let mut written = 0;
        while written < max {
            let Some(event) = self.pop() else {
                break;
            };
            let Ok(line) = event.render() else {
                self.record_drop();
                log_warn!("[EventQueue.flush] {} does not fit a line", event.kind());
                continue;
            };
            let Ok(mut serial) = self.serial.lock_within(self.timeouts.serial) else {
                self.requeue(event);
                break;
            };
            if serial.write_all(line.as_bytes()).is_err() {
                log_warn!("[EventQueue.flush] serial write failed");
            }
            written += 1;
        }
        written
    }

    /// Write every queued event, ignoring the per-flush pacing
    pub fn flush_all(&self) -> usize {
        let mut total = 0;
        loop {
            let written = self.flush(SIZE);
            if written == 0 {
                return total;
            }
            total += written;
        }
    }

    /// Write a raw line (newline appended) straight to the sink
    pub fn write_line(&self, line: &str) -> Result<(), LockTimeout> {
        let mut serial = self.serial.lock_within(self.timeouts.serial)?;
        if serial
            .write_all(line.as_bytes())
            .and_then(|()| serial.write_all(b"\n"))
            .is_err()
        {
            log_warn!("[EventQueue.write_line] serial write failed");
        }
        Ok(())
    }

    /// Events dropped since construction
    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| self.dropped.borrow(cs).get())
    }

    /// Number of queued events, or `None` if the queue is busy
    pub fn len(&self) -> Option<usize> {
        self.events.try_lock().ok().map(|events| events.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Lock over the queued events
    pub fn events_lock(&self) -> &TimedMutex<Deque<Event, SIZE>> {
        &self.events
    }

    /// Lock over the serial sink
    ///
    /// Holding it keeps every flush and raw line off the wire.
    pub fn serial_lock(&self) -> &TimedMutex<W> {
        &self.serial
    }

    /// The serial sink, for inspection
    pub fn sink_mut(&mut self) -> &mut W {
        self.serial.get_mut()
    }

    pub fn into_sink(self) -> W {
        self.serial.into_inner()
    }

    fn pop(&self) -> Option<Event> {
        self.events
            .lock_within(self.timeouts.flush)
            .ok()
            .and_then(|mut events| events.pop_front())
    }

    fn requeue(&self, event: Event) {
        let restored = self
            .events
            .lock_within(self.timeouts.flush)
            .ok()
            .is_some_and(|mut events| events.push_front(event).is_ok());
        if !restored {
            self.record_drop();
        }
    }

    fn record_drop(&self) {
        critical_section::with(|cs| {
            let dropped = self.dropped.borrow(cs);
            dropped.set(dropped.get().saturating_add(1));
        });
    }
}

impl<W: Write, const SIZE: usize> EventSink for EventQueue<W, SIZE> {
    fn push(&self, event: Event) -> bool {
        EventQueue::push(self, event)
    }
}
