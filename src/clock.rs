//! Run deadline and cooperative cancellation.
//!
//! Every philosopher and the monitor poll the same `Deadline` at each
//! suspension point. Nothing is interrupted: a thread notices expiry the next
//! time it wakes, so the lag is bounded by the longest single sleep or wait
//! slice in its loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on a single blocking wait before the deadline is rechecked.
pub const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Shared "stop now" switch, raised by the signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct Deadline {
    // None when the duration does not fit in an Instant: only the stop flag ends it
    at: Option<Instant>,
    stop: StopFlag,
}

impl Deadline {
    pub fn after(duration: Duration, stop: StopFlag) -> Self {
        Deadline {
            at: Instant::now().checked_add(duration),
            stop,
        }
    }

    pub fn expired(&self) -> bool {
        self.stop.is_raised() || self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn cancelled(&self) -> bool {
        self.stop.is_raised()
    }

    /// Time left, or `None` once expired.
    pub fn remaining(&self) -> Option<Duration> {
        if self.stop.is_raised() {
            return None;
        }
        match self.at {
            Some(at) => at
                .checked_duration_since(Instant::now())
                .filter(|d| !d.is_zero()),
            None => Some(Duration::MAX),
        }
    }

    /// How long a blocked waiter may sleep before looking again.
    pub fn wait_slice(&self) -> Option<Duration> {
        self.remaining().map(|d| d.min(WAIT_SLICE))
    }

    /// Sleeps for `d`, cut short at the deadline. Returns false if the
    /// deadline was reached before the full duration elapsed.
    pub fn sleep(&self, d: Duration) -> bool {
        let started = Instant::now();
        loop {
            let left = d.saturating_sub(started.elapsed());
            if left.is_zero() {
                return true;
            }
            // sleep in slices so a raised stop flag is seen promptly
            match self.wait_slice() {
                Some(slice) => thread::sleep(left.min(slice)),
                None => return false,
            }
        }
    }
}
