//! Configuration-change listener.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::orchestrator::IndexOrchestrator;

/// Notification that the catalog configuration changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChange {
    /// Hash of the new configuration snapshot.
    pub hash: String,
}

impl ConfigChange {
    /// Create a notification for a configuration hash.
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}

impl IndexOrchestrator {
    /// Recreate the collection for every configuration change received.
    ///
    /// Each notification purges the field repository cache and starts a
    /// recreate job tagged with the notification's hash. A notification
    /// arriving while another job holds the lock is dropped. The listener
    /// stops when the channel closes or the orchestrator shuts down.
    pub fn spawn_config_listener(&self, mut rx: mpsc::Receiver<ConfigChange>) -> JoinHandle<()> {
        let orchestrator = self.clone();
        let token = self.inner().shutdown.child_token();

        tokio::spawn(async move {
            loop {
                let change = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    change = rx.recv() => match change {
                        Some(change) => change,
                        None => break,
                    },
                };

                tracing::info!(hash = %change.hash, "configuration changed");
                orchestrator.inner().collaborators.fields.purge().await;

                match orchestrator.recreate_index(Some(change.hash.clone())).await {
                    Ok(ticket) => {
                        tracing::info!(job_id = %ticket.id, hash = %change.hash, "recreate job started");
                    }
                    Err(e) if e.is_conflict() => {
                        tracing::info!(hash = %change.hash, "index job already running; change dropped");
                    }
                    Err(e) => {
                        tracing::warn!(hash = %change.hash, error = %e, "failed to start recreate job");
                    }
                }
            }
            tracing::debug!("configuration listener stopped");
        })
    }
}
