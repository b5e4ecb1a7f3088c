//! Integration tests for lock conflicts, shutdown, and configuration changes.

use std::sync::Arc;
use std::time::Duration;

use sift_core::model::kinds;
use sift_core::{CachedFieldRepository, Error, FieldDef, ItemValueRow, Result};
use sift_jobs::{HealthColor, HealthEvent, HealthReport, JobService, JobStatus};
use sift_schema::{BackingFields, FieldKindHook};
use sift_service::ConfigChange;
use tokio::sync::mpsc;

use crate::common::{LOCK, StallingRowSource, TestHarness, item_rows};

/// Field kind whose hook blows up while the schema is generated.
struct ExplodingGeoHook;

impl FieldKindHook for ExplodingGeoHook {
    fn kind(&self) -> &str {
        "geo"
    }

    #[allow(clippy::panic)]
    fn solr_fields(&self, field: &FieldDef) -> Result<BackingFields> {
        panic!("no backing fields for '{}'", field.name)
    }

    fn field_tags(&self, _field: &FieldDef, _row: &ItemValueRow) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

async fn harness_with_geo_field() -> TestHarness {
    let harness = TestHarness::new(item_rows("a", "Old maps"));
    harness
        .catalog
        .replace_fields(vec![
            FieldDef::new("category", kinds::STRING),
            FieldDef::new("title", kinds::TEXT).multi_valued(),
            FieldDef::new("location", "geo"),
        ])
        .await;
    harness
}

#[tokio::test]
async fn test_second_job_conflicts_without_queueing() {
    let harness = TestHarness::with_source(Arc::new(StallingRowSource));
    let orchestrator = harness.orchestrator();

    let running = orchestrator.update_index().await.unwrap();

    for err in [
        orchestrator.create_index().await.unwrap_err(),
        orchestrator.delete_index().await.unwrap_err(),
        orchestrator.recreate_index(None).await.unwrap_err(),
        orchestrator.reindex_item("a").await.unwrap_err(),
    ] {
        assert!(err.is_conflict());
        assert!(err.is_retryable());
    }
    assert_eq!(harness.jobs.jobs().await.len(), 1);

    orchestrator.shutdown();
    assert!(matches!(running.wait().await, Err(Error::Cancelled)));
}

#[tokio::test]
async fn test_shutdown_cancels_running_job_and_releases_lock() {
    let harness = TestHarness::with_source(Arc::new(StallingRowSource));
    let orchestrator = harness.orchestrator();

    let ticket = orchestrator.recreate_index(Some("cfg".into())).await.unwrap();
    let id = ticket.id;
    orchestrator.shutdown();

    let err = tokio::time::timeout(Duration::from_secs(5), ticket.wait())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    let job = harness.jobs.get_job(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("Operation cancelled"));
    assert!(!harness.jobs.is_locked(LOCK).await);
    assert_eq!(harness.jobs.release_count(LOCK).await, 1);
    assert_eq!(harness.health.history().last(), Some(&HealthEvent::Done));
}

#[tokio::test]
async fn test_lock_is_free_again_after_a_job() {
    let harness = TestHarness::new(item_rows("a", "Old maps"));
    let orchestrator = harness.orchestrator();

    orchestrator.create_index().await.unwrap().wait().await.unwrap();
    orchestrator.update_index().await.unwrap().wait().await.unwrap();
    orchestrator.update_index().await.unwrap().wait().await.unwrap();

    assert_eq!(harness.jobs.release_count(LOCK).await, 3);
    assert!(harness.engine.document("a").is_some());
    assert!(
        harness
            .jobs
            .jobs()
            .await
            .iter()
            .all(|j| j.status == JobStatus::Done)
    );
}

#[tokio::test]
async fn test_config_change_triggers_recreate_with_fresh_fields() {
    let harness = TestHarness::new(item_rows("a", "Old maps"));
    let fields = Arc::new(CachedFieldRepository::new(harness.catalog.clone()));
    let orchestrator = harness.orchestrator_with_fields(fields);

    // Prime the field cache with the initial configuration.
    orchestrator.create_index().await.unwrap().wait().await.unwrap();
    harness
        .catalog
        .replace_fields(vec![
            FieldDef::new("category", kinds::STRING),
            FieldDef::new("title", kinds::TEXT).multi_valued(),
            FieldDef::new("subtitle", kinds::TEXT),
        ])
        .await;

    let (tx, rx) = mpsc::channel(4);
    let listener = orchestrator.spawn_config_listener(rx);
    tx.send(ConfigChange::new("cfg-7")).await.unwrap();
    harness.health.wait_for_done(1).await;

    assert!(
        harness
            .engine
            .field_names()
            .iter()
            .any(|f| f == "subtitle_txt")
    );
    assert!(harness.engine.document("a").is_some());
    assert_eq!(
        harness.health.history()[0],
        HealthEvent::Status(HealthReport {
            color: sift_jobs::HealthColor::Amber,
            hash: Some("cfg-7".into()),
        })
    );

    drop(tx);
    tokio::time::timeout(Duration::from_secs(5), listener)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_config_change_is_dropped_while_locked() {
    let harness = TestHarness::with_source(Arc::new(StallingRowSource));
    let orchestrator = harness.orchestrator();
    let running = orchestrator.update_index().await.unwrap();

    let (tx, rx) = mpsc::channel(4);
    let listener = orchestrator.spawn_config_listener(rx);
    tx.send(ConfigChange::new("cfg-8")).await.unwrap();
    drop(tx);
    tokio::time::timeout(Duration::from_secs(5), listener)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(harness.jobs.jobs().await.len(), 1);
    assert!(harness.health.history().is_empty());

    orchestrator.shutdown();
    assert!(running.wait().await.is_err());
}

#[tokio::test]
async fn test_listener_stops_on_shutdown() {
    let harness = TestHarness::new(vec![]);
    let orchestrator = harness.orchestrator();

    let (_tx, rx) = mpsc::channel::<ConfigChange>(1);
    let listener = orchestrator.spawn_config_listener(rx);
    orchestrator.shutdown();

    tokio::time::timeout(Duration::from_secs(5), listener)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_panicking_job_releases_lock_and_records_error() {
    let harness = harness_with_geo_field().await;
    let orchestrator = harness.orchestrator_with_kinds(vec![Arc::new(ExplodingGeoHook)]);

    let ticket = orchestrator.create_index().await.unwrap();
    let id = ticket.id;
    let err = tokio::time::timeout(Duration::from_secs(5), ticket.wait())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Error::Task { .. }));
    assert!(err.to_string().contains("no backing fields for 'location'"));

    assert!(!harness.jobs.is_locked(LOCK).await);
    assert_eq!(harness.jobs.release_count(LOCK).await, 1);
    let job = harness.jobs.get_job(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.finished_at.is_some());

    // The next job is not blocked by the failed one.
    orchestrator.delete_index().await.unwrap().wait().await.unwrap();
    assert_eq!(harness.jobs.release_count(LOCK).await, 2);
}

#[tokio::test]
async fn test_panicking_recreate_reports_red_after_unlock() {
    let harness = harness_with_geo_field().await;
    let orchestrator = harness.orchestrator_with_kinds(vec![Arc::new(ExplodingGeoHook)]);

    let ticket = orchestrator.recreate_index(Some("cfg-9".into())).await.unwrap();
    assert!(matches!(ticket.wait().await, Err(Error::Task { .. })));

    assert_eq!(
        harness.health.observed(),
        vec![(HealthColor::Amber, true), (HealthColor::Red, false)]
    );
    assert_eq!(harness.health.history().last(), Some(&HealthEvent::Done));
    assert!(!harness.jobs.is_locked(LOCK).await);
}
