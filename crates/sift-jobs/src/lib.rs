//! Index job bookkeeping, locking, and health reporting.
//!
//! # Modules
//!
//! - [`job`]: Job ids, kinds, statuses, and records
//! - [`service`]: The lock/job collaborator contract and an in-memory implementation
//! - [`health`]: Health colors, the health sink contract, and an in-process handle

pub mod health;
pub mod job;
pub mod service;

pub use health::{HealthColor, HealthEvent, HealthHandle, HealthReport, HealthSink};
pub use job::{IndexJob, JobId, JobKind, JobStatus};
pub use service::{InMemoryJobService, JobService};
