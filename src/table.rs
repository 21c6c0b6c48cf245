//! The forks and the dining-room gate shared by one run.

use crate::clock::Deadline;
use crate::error::{ConfigError, Result, SyncError};
use crate::semaphore::Semaphore;

/// N forks in a ring plus an admission gate.
///
/// Seat `i` owns fork `i` on its left and fork `(i + 1) % N` on its right.
/// Forks and the gate are touched only through acquire/release.
#[derive(Debug)]
pub struct Table {
    forks: Vec<Semaphore>,
    gate: Semaphore,
}

impl Table {
    pub fn new(seats: usize, gate_capacity: usize) -> std::result::Result<Self, ConfigError> {
        if seats == 0 {
            return Err(ConfigError::NoActors);
        }
        if gate_capacity == 0 {
            return Err(ConfigError::EmptyGate);
        }
        Ok(Table {
            forks: (0..seats)
                .map(|i| Semaphore::new(format!("fork {i}"), 1))
                .collect(),
            gate: Semaphore::new("gate", gate_capacity),
        })
    }

    pub fn seats(&self) -> usize {
        self.forks.len()
    }

    pub fn left_of(&self, seat: usize) -> usize {
        seat
    }

    pub fn right_of(&self, seat: usize) -> usize {
        (seat + 1) % self.forks.len()
    }

    fn fork(&self, index: usize) -> Result<&Semaphore> {
        self.forks.get(index).ok_or(SyncError::NoSuchFork {
            index,
            forks: self.forks.len(),
        })
    }

    pub fn acquire_fork(&self, index: usize) -> Result<()> {
        self.fork(index)?.acquire()
    }

    pub fn acquire_fork_before(&self, index: usize, deadline: &Deadline) -> Result<bool> {
        self.fork(index)?.acquire_before(deadline)
    }

    pub fn try_acquire_fork(&self, index: usize) -> Result<bool> {
        self.fork(index)?.try_acquire()
    }

    pub fn release_fork(&self, index: usize) -> Result<()> {
        self.fork(index)?.release()
    }

    pub fn acquire_gate(&self) -> Result<()> {
        self.gate.acquire()
    }

    pub fn acquire_gate_before(&self, deadline: &Deadline) -> Result<bool> {
        self.gate.acquire_before(deadline)
    }

    pub fn release_gate(&self) -> Result<()> {
        self.gate.release()
    }

    pub fn gate_capacity(&self) -> usize {
        self.gate.capacity()
    }

    /// Most philosophers ever inside the gate at once.
    pub fn gate_peak(&self) -> Result<usize> {
        self.gate.peak()
    }

    /// Indices of forks still held. Empty after a clean run.
    pub fn held_forks(&self) -> Result<Vec<usize>> {
        let mut held = Vec::new();
        for (i, fork) in self.forks.iter().enumerate() {
            if fork.holders()? > 0 {
                held.push(i);
            }
        }
        Ok(held)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rejects_empty_table_or_gate() {
        assert_eq!(Table::new(0, 1).unwrap_err(), ConfigError::NoActors);
        assert_eq!(Table::new(3, 0).unwrap_err(), ConfigError::EmptyGate);
    }

    #[test]
    fn test_ring_adjacency() {
        let table = Table::new(5, 4).unwrap();
        assert_eq!(table.left_of(0), 0);
        assert_eq!(table.right_of(0), 1);
        assert_eq!(table.right_of(4), 0);
        assert_eq!(table.seats(), 5);
    }

    #[test]
    fn test_single_seat_shares_one_fork() {
        let table = Table::new(1, 1).unwrap();
        assert_eq!(table.left_of(0), table.right_of(0));

        table.acquire_fork(0).unwrap();
        assert!(!table.try_acquire_fork(table.right_of(0)).unwrap());
        table.release_fork(0).unwrap();
    }

    #[test]
    fn test_held_forks() {
        let table = Table::new(3, 2).unwrap();
        table.acquire_fork(1).unwrap();
        assert_eq!(table.held_forks().unwrap(), vec![1]);
        table.release_fork(1).unwrap();
        assert!(table.held_forks().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_fork() {
        let table = Table::new(3, 2).unwrap();
        assert_eq!(
            table.try_acquire_fork(7),
            Err(SyncError::NoSuchFork { index: 7, forks: 3 })
        );
    }

    #[test]
    fn test_gate_peak() {
        let table = Table::new(5, 4).unwrap();
        table.acquire_gate().unwrap();
        table.acquire_gate().unwrap();
        table.release_gate().unwrap();
        table.release_gate().unwrap();
        assert_eq!(table.gate_peak().unwrap(), 2);
        assert_eq!(table.gate_capacity(), 4);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn each_fork_is_shared_by_exactly_two_seats(n in 2usize..64) {
                let table = Table::new(n, n - 1).unwrap();
                let mut users = vec![0usize; n];
                for seat in 0..n {
                    users[table.left_of(seat)] += 1;
                    users[table.right_of(seat)] += 1;
                    prop_assert_ne!(table.left_of(seat), table.right_of(seat));
                }
                prop_assert!(users.iter().all(|&u| u == 2));
            }
        }
    }
}
