//! Collection lifecycle orchestration for Sift.
//!
//! [`IndexOrchestrator`] exposes the index-affecting operations as
//! lock-guarded background jobs, an index status query, and a listener that
//! recreates the collection when the catalog configuration changes.
//!
//! # Modules
//!
//! - [`orchestrator`]: Jobs for create, update, delete, recreate, and single-item reindex
//! - [`status`]: Cluster health and document count
//! - [`listener`]: Configuration-change notifications

pub mod listener;
pub mod orchestrator;
pub mod status;

pub use listener::ConfigChange;
pub use orchestrator::{Collaborators, IndexOrchestrator, JobTicket};
pub use status::IndexStatus;
