// Shared library for the pgvault agent and the backupctl recovery CLI.

pub mod archive;
pub mod backup;
pub mod cadence;
pub mod config;
pub mod dump;
pub mod errors;
pub mod restore;
pub mod retention;
pub mod scheduler;
pub mod storage;
pub mod telemetry;
