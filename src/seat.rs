use std::ops::Index;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

// Per-philosopher observable state.
//
// Only the owning philosopher writes its seat. The monitor and the final
// report read it without synchronizing with the writer: all accesses are
// Relaxed, so a reader may see a slightly stale mix of flags. That is fine
// for diagnostics and nothing else may rely on these values.
#[derive(Debug, Default)]
pub struct SeatState {
    holding_left: AtomicBool,
    eating: AtomicBool,
    meals: AtomicU64,
}

impl SeatState {
    pub fn set_holding_left(&self, v: bool) {
        self.holding_left.store(v, Ordering::Relaxed);
    }

    pub fn holding_left(&self) -> bool {
        self.holding_left.load(Ordering::Relaxed)
    }

    pub fn set_eating(&self, v: bool) {
        self.eating.store(v, Ordering::Relaxed);
    }

    pub fn eating(&self) -> bool {
        self.eating.load(Ordering::Relaxed)
    }

    /// Counts one more meal and returns the new total.
    pub fn add_meal(&self) -> u64 {
        self.meals.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn meals(&self) -> u64 {
        self.meals.load(Ordering::Relaxed)
    }
}

/// Best-effort view of one seat at one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeatView {
    pub holding_left: bool,
    pub eating: bool,
}

#[derive(Debug)]
pub struct Seats(Vec<SeatState>);

impl Seats {
    pub fn new(n: usize) -> Self {
        Seats((0..n).map(|_| SeatState::default()).collect())
    }

    /// Racy snapshot of the flags, read seat by seat.
    pub fn snapshot(&self) -> Vec<SeatView> {
        self.0
            .iter()
            .map(|s| SeatView {
                holding_left: s.holding_left(),
                eating: s.eating(),
            })
            .collect()
    }

    pub fn meal_counts(&self) -> Vec<u64> {
        self.0.iter().map(SeatState::meals).collect()
    }
}

impl Index<usize> for Seats {
    type Output = SeatState;

    fn index(&self, seat: usize) -> &SeatState {
        &self.0[seat]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fresh_seats() {
        let seats = Seats::new(3);
        assert_eq!(seats.meal_counts(), vec![0, 0, 0]);
        assert!(seats.snapshot().iter().all(|v| *v == SeatView::default()));
    }

    #[test]
    fn test_meal_counter() {
        let seats = Seats::new(2);
        let seat = &seats[1];
        assert_eq!(seat.add_meal(), 1);
        assert_eq!(seat.add_meal(), 2);
        assert_eq!(seats.meal_counts(), vec![0, 2]);
    }

    #[test]
    fn test_snapshot_reflects_flags() {
        let seats = Seats::new(2);
        seats[0].set_holding_left(true);
        seats[1].set_eating(true);
        assert_eq!(
            seats.snapshot(),
            vec![
                SeatView {
                    holding_left: true,
                    eating: false
                },
                SeatView {
                    holding_left: false,
                    eating: true
                },
            ]
        );
    }
}
