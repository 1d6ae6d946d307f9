// Conveyor common library: job models, store clients, poll worker,
// recurring-job scheduling, and shared infrastructure.

pub mod config;
pub mod errors;
pub mod models;
pub mod registry;
pub mod retry;
pub mod schedule;
pub mod scheduler;
pub mod shutdown;
pub mod store;
pub mod telemetry;
pub mod worker;
