// Scheduler module: due-state tracking and the minute tick loop

pub mod due;
pub mod engine;

pub use due::DueTracker;
pub use engine::{BackupScheduler, TickOutcome};
