use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

use crate::clock::Deadline;
use crate::error::{Result, SyncError};

// Counting semaphore on Mutex + Condvar.
// Waiters draw a ticket and are served in ticket order, so a thread that
// just released a permit cannot immediately grab it back past a queued waiter.
#[derive(Debug)]
pub struct Semaphore {
    name: String,
    max: usize,
    state: Mutex<State>,
    cond: Condvar,
}

#[derive(Debug)]
struct State {
    permits: usize,
    queue: VecDeque<u64>, // tickets of blocked waiters, oldest first
    next_ticket: u64,
    peak: usize, // most permits ever out at once
}

impl State {
    fn take(&mut self, max: usize) {
        self.permits -= 1;
        self.peak = self.peak.max(max - self.permits);
    }
}

impl Semaphore {
    /// `max` must be positive; `Table::new` checks it.
    pub(crate) fn new(name: impl Into<String>, max: usize) -> Self {
        debug_assert!(max > 0);
        Semaphore {
            name: name.into(),
            max,
            state: Mutex::new(State {
                permits: max,
                queue: VecDeque::new(),
                next_ticket: 0,
                peak: 0,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| SyncError::Poisoned(self.name.clone()))
    }

    /// Takes a permit if one is free and nobody is queued for it.
    pub fn try_acquire(&self) -> Result<bool> {
        let mut st = self.lock()?;
        if st.queue.is_empty() && st.permits > 0 {
            st.take(self.max);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Blocks until a permit is granted.
    pub fn acquire(&self) -> Result<()> {
        self.acquire_inner(None).map(|_| ())
    }

    /// Blocks until a permit is granted or the deadline expires.
    /// Returns `Ok(false)` on expiry, with nothing taken.
    pub fn acquire_before(&self, deadline: &Deadline) -> Result<bool> {
        self.acquire_inner(Some(deadline))
    }

    fn acquire_inner(&self, deadline: Option<&Deadline>) -> Result<bool> {
        let mut st = self.lock()?;
        if st.queue.is_empty() && st.permits > 0 {
            st.take(self.max);
            return Ok(true);
        }

        let ticket = st.next_ticket;
        st.next_ticket += 1;
        st.queue.push_back(ticket);

        loop {
            if st.permits > 0 && st.queue.front() == Some(&ticket) {
                st.queue.pop_front();
                st.take(self.max);
                if st.permits > 0 && !st.queue.is_empty() {
                    // the next ticket may be servable too
                    self.cond.notify_all();
                }
                return Ok(true);
            }

            st = match deadline {
                None => self
                    .cond
                    .wait(st)
                    .map_err(|_| SyncError::Poisoned(self.name.clone()))?,
                Some(deadline) => match deadline.wait_slice() {
                    Some(slice) => {
                        self.cond
                            .wait_timeout(st, slice)
                            .map_err(|_| SyncError::Poisoned(self.name.clone()))?
                            .0
                    }
                    None => {
                        st.queue.retain(|t| *t != ticket);
                        // leaving may promote whoever queued behind us
                        self.cond.notify_all();
                        return Ok(false);
                    }
                },
            };
        }
    }

    pub fn release(&self) -> Result<()> {
        let mut st = self.lock()?;
        if st.permits >= self.max {
            return Err(SyncError::OverRelease(self.name.clone()));
        }
        st.permits += 1;
        if !st.queue.is_empty() {
            // only the head of the queue may proceed, so wake everyone
            self.cond.notify_all();
        }
        Ok(())
    }

    /// Permits currently handed out.
    pub fn holders(&self) -> Result<usize> {
        Ok(self.max - self.lock()?.permits)
    }

    /// Highest number of permits ever handed out at the same time.
    pub fn peak(&self) -> Result<usize> {
        Ok(self.lock()?.peak)
    }

    #[cfg(test)]
    pub(crate) fn waiting(&self) -> Result<usize> {
        Ok(self.lock()?.queue.len())
    }
}
