//! Deadlock watcher for the naive strategy.
//!
//! A heuristic, not a proof: a deadlock that forms and dissolves between two
//! polls goes unnoticed.

use std::time::Duration;

use tracing::debug;

use crate::config::Strategy;
use crate::events::Event;
use crate::seat::SeatView;
use crate::simulation::RunContext;

pub const POLL_PERIOD: Duration = Duration::from_millis(300);

/// Every seat holds its left fork and nobody is eating.
///
/// Philosophers clear `holding_left` before they set `eating`, so a torn
/// snapshot can hide a deadlock for one poll but never invent one.
pub fn looks_deadlocked(snapshot: &[SeatView]) -> bool {
    !snapshot.is_empty()
        && snapshot.iter().all(|s| s.holding_left)
        && !snapshot.iter().any(|s| s.eating)
}

/// Polls until the deadline. Reports at most once per run.
pub fn watch(ctx: &RunContext) {
    let watching = ctx.config.strategy == Strategy::Naive;
    debug!(watching, "monitor started");

    while !ctx.deadline.expired() {
        ctx.deadline.sleep(POLL_PERIOD);
        if !watching || ctx.deadlock_reported() {
            continue;
        }

        let snapshot = ctx.seats.snapshot();
        if looks_deadlocked(&snapshot) && ctx.latch_deadlock() {
            ctx.log.record(Event::Deadlock {
                seats: snapshot.len(),
            });
        }
    }
    debug!("monitor stopped");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::StopFlag;
    use crate::config::RunConfig;
    use std::thread;
    use std::time::Instant;

    fn view(holding_left: bool, eating: bool) -> SeatView {
        SeatView {
            holding_left,
            eating,
        }
    }

    #[test]
    fn test_all_holding_left_is_deadlock() {
        assert!(looks_deadlocked(&[view(true, false); 5]));
    }

    #[test]
    fn test_one_free_hand_is_not_deadlock() {
        let mut seats = [view(true, false); 5];
        seats[3] = view(false, false);
        assert!(!looks_deadlocked(&seats));
    }

    #[test]
    fn test_someone_eating_is_not_deadlock() {
        let mut seats = [view(true, false); 5];
        seats[0] = view(true, true);
        assert!(!looks_deadlocked(&seats));
        assert!(!looks_deadlocked(&[]));
    }

    #[test]
    fn test_reports_once_within_a_poll() {
        let config = RunConfig::new(3, Strategy::Naive).with_duration(Duration::from_millis(1500));
        let ctx = RunContext::new(config, StopFlag::new(), true).unwrap();
        for seat in 0..3 {
            ctx.seats[seat].set_holding_left(true);
        }

        let started = Instant::now();
        let mut detected_after = None;
        thread::scope(|s| {
            s.spawn(|| watch(&ctx));
            while started.elapsed() < Duration::from_secs(2) {
                if ctx.deadlock_reported() {
                    detected_after = Some(started.elapsed());
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        });

        let detected_after = detected_after.expect("deadlock not reported");
        assert!(detected_after < POLL_PERIOD + Duration::from_millis(250));

        // the state persists for several polls but is reported once
        let reports = ctx
            .log
            .take()
            .into_iter()
            .filter(|e| matches!(e, Event::Deadlock { .. }))
            .count();
        assert_eq!(reports, 1);
    }

    #[test]
    fn test_limit_strategy_is_not_watched() {
        let config = RunConfig::new(3, Strategy::Limit).with_duration(Duration::from_millis(700));
        let ctx = RunContext::new(config, StopFlag::new(), true).unwrap();
        for seat in 0..3 {
            ctx.seats[seat].set_holding_left(true);
        }

        let started = Instant::now();
        watch(&ctx);

        assert!(started.elapsed() < Duration::from_millis(1200));
        assert!(!ctx.deadlock_reported());
        assert!(ctx.log.take().is_empty());
    }
}
