//! Health reporting for index-affecting jobs.
//!
//! A running job reports [`HealthColor::Amber`], then green or red once it
//! finishes, each time tagged with the configuration hash that triggered the
//! run. [`HealthHandle`] is the in-process sink: it broadcasts the latest
//! report over a watch channel and keeps the full event history.
//!
//! # Usage
//!
//! ```rust
//! use sift_jobs::health::{HealthColor, HealthHandle, HealthSink};
//!
//! # tokio_test_block_on(async {
//! let health = HealthHandle::new("index");
//! health.set_status(HealthColor::Amber, Some("abc123")).await;
//! assert_eq!(health.current().color, HealthColor::Amber);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

// ============================================================================
// HealthColor
// ============================================================================

/// Traffic-light health of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthColor {
    /// A job is running; the index may be incomplete.
    Amber,
    /// The last job succeeded.
    Green,
    /// The last job failed.
    Red,
}

impl fmt::Display for HealthColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amber => write!(f, "amber"),
            Self::Green => write!(f, "green"),
            Self::Red => write!(f, "red"),
        }
    }
}

/// The latest reported health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Reported color.
    pub color: HealthColor,
    /// Configuration hash of the run that reported it.
    pub hash: Option<String>,
}

/// One call received by a health sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// `set_status` was called.
    Status(HealthReport),
    /// `done` was called.
    Done,
}

// ============================================================================
// HealthSink
// ============================================================================

/// Receiver of job health reports.
///
/// Reporting is best effort: a sink never fails the job it reports on.
#[async_trait]
pub trait HealthSink: Send + Sync {
    /// Report a color, tagged with the triggering configuration hash.
    async fn set_status(&self, color: HealthColor, hash: Option<&str>);

    /// Mark the end of a run's reporting.
    async fn done(&self);
}

// ============================================================================
// HealthHandle
// ============================================================================

/// Thread-safe in-process health sink.
///
/// Cheap to clone (Arc internals). Reports are broadcast to all
/// subscribers via a watch channel.
#[derive(Clone)]
pub struct HealthHandle {
    inner: Arc<HealthHandleInner>,
}

struct HealthHandleInner {
    name: String,
    tx: watch::Sender<HealthReport>,
    history: Mutex<Vec<HealthEvent>>,
}

impl HealthHandle {
    /// Create a handle; the initial report is green with no hash.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(HealthReport {
            color: HealthColor::Green,
            hash: None,
        });
        Self {
            inner: Arc::new(HealthHandleInner {
                name: name.into(),
                tx,
                history: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Name of the monitored resource.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The latest report.
    pub fn current(&self) -> HealthReport {
        self.inner.tx.borrow().clone()
    }

    /// Subscribe to report changes.
    pub fn subscribe(&self) -> watch::Receiver<HealthReport> {
        self.inner.tx.subscribe()
    }

    /// Every call received so far, in order.
    pub fn history(&self) -> Vec<HealthEvent> {
        self.lock_history().clone()
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, Vec<HealthEvent>> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for HealthHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthHandle")
            .field("name", &self.inner.name)
            .field("current", &self.current())
            .finish()
    }
}

#[async_trait]
impl HealthSink for HealthHandle {
    async fn set_status(&self, color: HealthColor, hash: Option<&str>) {
        tracing::info!(resource = %self.inner.name, %color, hash = hash.unwrap_or(""), "health changed");
        let report = HealthReport {
            color,
            hash: hash.map(str::to_string),
        };
        self.lock_history().push(HealthEvent::Status(report.clone()));
        self.inner.tx.send_replace(report);
    }

    async fn done(&self) {
        self.lock_history().push(HealthEvent::Done);
    }
}

#[async_trait]
impl<T: HealthSink + ?Sized> HealthSink for Arc<T> {
    async fn set_status(&self, color: HealthColor, hash: Option<&str>) {
        (**self).set_status(color, hash).await
    }

    async fn done(&self) {
        (**self).done().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_report_is_green() {
        let health = HealthHandle::new("index");
        assert_eq!(health.name(), "index");
        assert_eq!(health.current().color, HealthColor::Green);
        assert!(health.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_records_every_call() {
        let health = HealthHandle::new("index");
        health.set_status(HealthColor::Amber, Some("h1")).await;
        health.set_status(HealthColor::Red, Some("h1")).await;
        health.done().await;

        let history = health.history();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history[1],
            HealthEvent::Status(HealthReport {
                color: HealthColor::Red,
                hash: Some("h1".into()),
            })
        );
        assert_eq!(history[2], HealthEvent::Done);
    }

    #[tokio::test]
    async fn test_subscribers_see_latest_report() {
        let health = HealthHandle::new("index");
        let mut rx = health.subscribe();

        let clone = health.clone();
        clone.set_status(HealthColor::Amber, None).await;

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().color, HealthColor::Amber);
    }

    #[test]
    fn test_color_display() {
        assert_eq!(HealthColor::Amber.to_string(), "amber");
        assert_eq!(HealthColor::Green.to_string(), "green");
        assert_eq!(HealthColor::Red.to_string(), "red");
    }
}
