//! One philosopher thread: think, take forks, eat, put them back.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::config::Strategy;
use crate::error::SyncError;
use crate::events::Event;
use crate::seat::SeatState;
use crate::simulation::RunContext;

/// Pause between attempts at a busy right fork (naive strategy).
pub const BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
enum Held {
    Gate,
    Fork(usize),
}

pub struct Philosopher<'a> {
    seat: usize,
    left: usize,
    right: usize,
    ctx: &'a RunContext,
    state: &'a SeatState,
    rng: StdRng,
}

impl<'a> Philosopher<'a> {
    pub fn new(ctx: &'a RunContext, seat: usize) -> Self {
        let rng = match ctx.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ seat as u64),
            None => StdRng::from_entropy(),
        };
        Philosopher {
            seat,
            left: ctx.table.left_of(seat),
            right: ctx.table.right_of(seat),
            ctx,
            state: &ctx.seats[seat],
            rng,
        }
    }

    /// Runs until the deadline. The strategy is chosen once, here.
    pub fn dine(mut self) {
        debug!(seat = self.seat, strategy = %self.ctx.config.strategy, "sitting down");
        match self.ctx.config.strategy {
            Strategy::Naive => self.dine_naive(),
            Strategy::Limit => self.dine_limit(),
        }
        debug!(seat = self.seat, meals = self.state.meals(), "leaving the table");
    }

    // Left fork, then poll the right one until the deadline.
    fn dine_naive(&mut self) {
        let ctx = self.ctx;
        while !ctx.deadline.expired() {
            if !self.think() {
                break;
            }

            let mut held = Vec::with_capacity(2);
            if !self.take(Held::Fork(self.left), &mut held) {
                continue;
            }
            self.state.set_holding_left(true);
            self.log(Event::TookLeft {
                seat: self.seat,
                fork: self.left,
            });

            let mut ate = false;
            while !ctx.deadline.expired() {
                match ctx.table.try_acquire_fork(self.right) {
                    Ok(true) => {
                        held.push(Held::Fork(self.right));
                        // clear before eating so the monitor never sees both
                        self.state.set_holding_left(false);
                        self.eat();
                        ate = true;
                        break;
                    }
                    Ok(false) => {
                        debug!(seat = self.seat, fork = self.right, "right fork busy");
                        ctx.deadline.sleep(BACKOFF);
                    }
                    Err(e) => {
                        self.anomaly(e);
                        break;
                    }
                }
            }

            if !ate {
                self.state.set_holding_left(false);
                self.log(Event::ReleasedLeft {
                    seat: self.seat,
                    fork: self.left,
                });
            }
            self.put_back(held);
        }
    }

    // Gate, left, right. Anything taken before an expiry is handed back.
    fn dine_limit(&mut self) {
        let ctx = self.ctx;
        while !ctx.deadline.expired() {
            if !self.think() {
                break;
            }

            let mut held = Vec::with_capacity(3);
            let seated = self.take(Held::Gate, &mut held)
                && self.take(Held::Fork(self.left), &mut held)
                && self.take(Held::Fork(self.right), &mut held);
            if seated {
                self.eat();
            }
            self.put_back(held);
        }
    }

    /// Returns false if the deadline cut the thinking short.
    fn think(&mut self) -> bool {
        let d = self.ctx.config.think.sample(&mut self.rng);
        if !self.ctx.deadline.sleep(d) {
            return false;
        }
        self.log(Event::Hungry {
            seat: self.seat,
            thought_us: d.as_micros() as u64,
        });
        true
    }

    // A started meal always runs to the end, even past the deadline.
    fn eat(&mut self) {
        self.state.set_eating(true);
        let total = self.state.add_meal();
        self.log(Event::Eating {
            seat: self.seat,
            left: self.left,
            right: self.right,
            total,
        });

        let d = self.ctx.config.eat.sample(&mut self.rng);
        thread::sleep(d);

        self.state.set_eating(false);
        self.log(Event::Finished {
            seat: self.seat,
            ate_us: d.as_micros() as u64,
        });
    }

    fn take(&self, what: Held, held: &mut Vec<Held>) -> bool {
        let table = &self.ctx.table;
        let deadline = &self.ctx.deadline;
        let taken = match what {
            Held::Gate => table.acquire_gate_before(deadline),
            Held::Fork(i) => table.acquire_fork_before(i, deadline),
        };
        match taken {
            Ok(true) => {
                held.push(what);
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.anomaly(e);
                false
            }
        }
    }

    /// Releases in reverse order of acquisition.
    fn put_back(&self, held: Vec<Held>) {
        let table = &self.ctx.table;
        for what in held.into_iter().rev() {
            let released = match what {
                Held::Gate => table.release_gate(),
                Held::Fork(i) => table.release_fork(i),
            };
            if let Err(e) = released {
                self.anomaly(e);
            }
        }
    }

    // Non-fatal: logged, counted, and the philosopher moves on to its next cycle.
    fn anomaly(&self, e: SyncError) {
        self.ctx.note_anomaly();
        self.log(Event::Anomaly {
            seat: self.seat,
            error: e.to_string(),
        });
        self.ctx.deadline.sleep(BACKOFF);
    }

    fn log(&self, event: Event) {
        self.ctx.log.record(event);
    }
}
