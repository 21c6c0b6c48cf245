//! Dining philosophers on OS threads.
//!
//! Two ways to pick up forks are compared: `naive` (left, then poll right),
//! which can deadlock, and `limit`, which admits at most N-1 philosophers to
//! the table through a counting semaphore and so cannot.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod monitor;
pub mod philosopher;
pub mod scenario;
pub mod seat;
pub mod semaphore;
pub mod simulation;
pub mod table;

pub use clock::{Deadline, StopFlag};
pub use config::{RunConfig, Strategy, TimeRange};
pub use error::{ConfigError, SimulationError, SyncError};
pub use scenario::Scenario;
pub use simulation::{run_batch, RunReport, Simulation};
