//! Short-timeout lock shared between schedules
//!
//! The sampling schedule and the control loop must never stall on each other,
//! so every cross-schedule access goes through [`TimedMutex::lock_within`]:
//! it spins on `try_lock` until a deadline and then gives up.

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{Duration, Instant};

/// The lock could not be acquired within the allowed time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockTimeout;

impl fmt::Display for LockTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("lock timeout")
    }
}

/// Mutex whose acquisition fails closed after a timeout
pub struct TimedMutex<T> {
    inner: Mutex<CriticalSectionRawMutex, T>,
}

impl<T> TimedMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Try once without waiting
    pub fn try_lock(&self) -> Result<MutexGuard<'_, CriticalSectionRawMutex, T>, LockTimeout> {
        self.inner.try_lock().map_err(|_| LockTimeout)
    }

    /// Spin until the lock is free or `timeout` has elapsed
    pub fn lock_within(
        &self,
        timeout: Duration,
    ) -> Result<MutexGuard<'_, CriticalSectionRawMutex, T>, LockTimeout> {
        if let Ok(guard) = self.inner.try_lock() {
            return Ok(guard);
        }
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(guard) = self.inner.try_lock() {
                return Ok(guard);
            }
            if Instant::now() >= deadline {
                return Err(LockTimeout);
            }
            core::hint::spin_loop();
        }
    }

    /// Exclusive access without locking
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
