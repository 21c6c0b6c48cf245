//! Philosopher and monitor events.
//!
//! Every event goes through one mutex before it reaches the subscriber, so
//! lines from concurrent philosophers never interleave.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Hungry { seat: usize, thought_us: u64 },
    TookLeft { seat: usize, fork: usize },
    Eating { seat: usize, left: usize, right: usize, total: u64 },
    Finished { seat: usize, ate_us: u64 },
    ReleasedLeft { seat: usize, fork: usize },
    Anomaly { seat: usize, error: String },
    Deadlock { seats: usize },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Hungry { seat, thought_us } => {
                write!(f, "[P{seat}] wants to eat, thought {thought_us} us")
            }
            Event::TookLeft { seat, fork } => write!(f, "[P{seat}] took LEFT fork ({fork})"),
            Event::Eating {
                seat,
                left,
                right,
                total,
            } => write!(
                f,
                "[P{seat}] took LEFT ({left}) and RIGHT ({right}), EATING (total={total})"
            ),
            Event::Finished { seat, ate_us } => {
                write!(f, "[P{seat}] finished eating ({ate_us} us)")
            }
            Event::ReleasedLeft { seat, fork } => {
                write!(f, "[P{seat}] put back LEFT fork ({fork}) without eating")
            }
            Event::Anomaly { seat, error } => write!(f, "[P{seat}] anomaly: {error}"),
            Event::Deadlock { seats } => write!(
                f,
                ">>> DEADLOCK DETECTED: all {seats} philosophers hold their left fork and nobody is eating"
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct EventLog {
    captured: Mutex<Vec<Event>>,
    capture: bool,
}

impl EventLog {
    pub fn new(capture: bool) -> Self {
        EventLog {
            captured: Mutex::new(Vec::new()),
            capture,
        }
    }

    pub fn record(&self, event: Event) {
        // a poisoned log still serializes output
        let mut captured = self.captured.lock().unwrap_or_else(|e| e.into_inner());
        match &event {
            Event::Deadlock { .. } => warn!("{event}"),
            Event::Anomaly { .. } => error!("{event}"),
            _ => info!("{event}"),
        }
        if self.capture {
            captured.push(event);
        }
    }

    pub fn take(&self) -> Vec<Event> {
        let mut captured = self.captured.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *captured)
    }
}
