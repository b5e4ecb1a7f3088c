//! Integration tests for the lifecycle operations.

use std::sync::Arc;

use sift_core::model::kinds;
use sift_core::{Error, FieldDef, ItemValueRow, SearchConfigElement};
use sift_jobs::{HealthColor, HealthEvent, HealthReport, JobService, JobStatus};
use sift_solr::{MockSearchEngine, SearchEngine};
use sift_sql::StaticRowSource;

use crate::common::{LOCK, TestHarness, item_rows};

fn three_items() -> Vec<ItemValueRow> {
    let mut rows = item_rows("a", "Old maps");
    rows.extend(item_rows("b", "Sea charts"));
    rows.extend(item_rows("c", "Star atlas"));
    rows
}

#[tokio::test]
async fn test_create_index_applies_generated_schema() {
    let harness = TestHarness::new(vec![]);
    let orchestrator = harness.orchestrator();

    let ticket = orchestrator.create_index().await.unwrap();
    let id = ticket.id;
    ticket.wait().await.unwrap();

    let fields = harness.engine.field_names();
    for name in ["id", "category_raw", "title_txt", "title_prefix", "focus_all_txt"] {
        assert!(fields.iter().any(|f| f == name), "missing field {name}");
    }
    assert!(
        harness
            .engine
            .copy_fields()
            .iter()
            .any(|c| c.source == "title_txt")
    );

    let job = harness.jobs.get_job(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert!(!harness.jobs.is_locked(LOCK).await);
    assert!(harness.health.history().is_empty());
}

#[tokio::test]
async fn test_create_index_twice_is_idempotent() {
    let harness = TestHarness::new(vec![]);
    let orchestrator = harness.orchestrator();

    orchestrator.create_index().await.unwrap().wait().await.unwrap();
    let first = (harness.engine.fields(), harness.engine.copy_fields());
    orchestrator.create_index().await.unwrap().wait().await.unwrap();
    let second = (harness.engine.fields(), harness.engine.copy_fields());

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_configuration_error_leaves_schema_untouched() {
    let harness = TestHarness::new(vec![]);
    harness
        .catalog
        .replace_search_configs(vec![SearchConfigElement::search_focus(
            "all",
            ["missing"],
        )])
        .await;
    let orchestrator = harness.orchestrator();

    let ticket = orchestrator.create_index().await.unwrap();
    let id = ticket.id;
    let err = ticket.wait().await.unwrap_err();

    assert!(matches!(err, Error::Config { .. }));
    assert_eq!(harness.engine.schema_requests(), 0);

    let job = harness.jobs.get_job(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.error.unwrap().contains("missing"));
    assert!(!harness.jobs.is_locked(LOCK).await);
}

#[tokio::test]
async fn test_update_index_uploads_every_item_in_batches() {
    let harness = TestHarness::new(three_items());
    let orchestrator = harness.orchestrator();
    orchestrator.create_index().await.unwrap().wait().await.unwrap();

    orchestrator.update_index().await.unwrap().wait().await.unwrap();

    assert_eq!(harness.engine.documents().len(), 3);
    assert_eq!(harness.engine.uploaded_batches().len(), 2);
    assert!(harness.engine.document("b").unwrap().contains("Sea charts"));
}

#[tokio::test]
async fn test_update_index_fails_on_query_error() {
    let harness = TestHarness::with_source(Arc::new(StaticRowSource::failing("connection reset")));
    let orchestrator = harness.orchestrator();

    let ticket = orchestrator.update_index().await.unwrap();
    let id = ticket.id;
    let err = ticket.wait().await.unwrap_err();

    assert!(matches!(err, Error::Database { .. }));
    assert_eq!(
        harness.jobs.get_job(id).await.unwrap().status,
        JobStatus::Error
    );
    assert_eq!(harness.jobs.release_count(LOCK).await, 1);
}

#[tokio::test]
async fn test_update_index_tolerates_failed_uploads() {
    let harness = TestHarness::new(three_items());
    harness.engine.set_fail_uploads(true);
    let orchestrator = harness.orchestrator();

    let ticket = orchestrator.update_index().await.unwrap();
    let id = ticket.id;
    ticket.wait().await.unwrap();

    assert!(harness.engine.documents().is_empty());
    assert_eq!(
        harness.jobs.get_job(id).await.unwrap().status,
        JobStatus::Done
    );
}

#[tokio::test]
async fn test_delete_index_drops_documents() {
    let harness = TestHarness::new(three_items());
    let orchestrator = harness.orchestrator();
    orchestrator.create_index().await.unwrap().wait().await.unwrap();
    orchestrator.update_index().await.unwrap().wait().await.unwrap();

    orchestrator.delete_index().await.unwrap().wait().await.unwrap();

    assert!(harness.engine.documents().is_empty());
}

#[tokio::test]
async fn test_reindex_item_replaces_one_document() {
    let source = Arc::new(StaticRowSource::new(item_rows("b", "Sea charts, revised")));
    let harness = TestHarness::with_source(source.clone());
    harness
        .engine
        .add_documents(
            &[
                "<doc><field name=\"id\">a</field></doc>".to_string(),
                "<doc><field name=\"id\">b</field></doc>".to_string(),
            ],
            Default::default(),
        )
        .await
        .unwrap();
    let orchestrator = harness.orchestrator();
    orchestrator.create_index().await.unwrap().wait().await.unwrap();

    orchestrator.reindex_item("b").await.unwrap().wait().await.unwrap();

    let statements = source.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains("AND i.id = 'b'"));
    assert!(
        harness
            .engine
            .document("b")
            .unwrap()
            .contains("Sea charts, revised")
    );
    assert_eq!(
        harness.engine.document("a").unwrap(),
        "<doc><field name=\"id\">a</field></doc>"
    );
}

#[tokio::test]
async fn test_recreate_index_builds_collection_and_reports_health() {
    let harness = TestHarness::new(three_items())
        .with_engine(MockSearchEngine::without_collection("catalog"));
    let orchestrator = harness.orchestrator();

    let ticket = orchestrator
        .recreate_index(Some("cfg-1".to_string()))
        .await
        .unwrap();
    ticket.wait().await.unwrap();

    assert!(harness.engine.has_collection("catalog"));
    assert!(
        harness
            .engine
            .field_names()
            .iter()
            .any(|f| f == "focus_all_txt")
    );
    assert_eq!(harness.engine.documents().len(), 3);

    assert_eq!(
        harness.health.observed(),
        vec![(HealthColor::Amber, true), (HealthColor::Green, false)]
    );
    assert_eq!(
        harness.health.history().last(),
        Some(&HealthEvent::Done)
    );
    assert!(harness.health.history().iter().all(|e| match e {
        HealthEvent::Status(HealthReport { hash, .. }) => hash.as_deref() == Some("cfg-1"),
        HealthEvent::Done => true,
    }));
}

#[tokio::test]
async fn test_recreate_index_drops_existing_documents() {
    let harness = TestHarness::new(item_rows("a", "Old maps"));
    harness
        .engine
        .add_documents(
            &["<doc><field name=\"id\">stale</field></doc>".to_string()],
            Default::default(),
        )
        .await
        .unwrap();
    let orchestrator = harness.orchestrator();

    orchestrator.recreate_index(None).await.unwrap().wait().await.unwrap();

    let documents = harness.engine.documents();
    assert_eq!(documents.len(), 1);
    assert!(documents.contains_key("a"));
}

#[tokio::test]
async fn test_failed_recreate_reports_red_after_releasing_lock() {
    let harness = TestHarness::new(three_items());
    harness.engine.set_unreachable(true);
    let orchestrator = harness.orchestrator();

    let ticket = orchestrator
        .recreate_index(Some("cfg-2".to_string()))
        .await
        .unwrap();
    let id = ticket.id;
    let err = ticket.wait().await.unwrap_err();

    assert!(matches!(err, Error::SearchEngine { .. }));
    assert_eq!(
        harness.health.observed(),
        vec![(HealthColor::Amber, true), (HealthColor::Red, false)]
    );
    assert_eq!(harness.jobs.release_count(LOCK).await, 1);

    let job = harness.jobs.get_job(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.finished_at.is_some());
}

#[tokio::test]
async fn test_multi_valued_link_to_single_valued_target_indexes_both_values() {
    let mut rows = item_rows("a", "Old maps");
    rows.extend([
        ItemValueRow::new("a", "parent", "p1", 0),
        ItemValueRow::new("a", "parent", "p2", 1),
        ItemValueRow::new("a", "parent__label", "Atlases", 0),
        ItemValueRow::new("a", "parent__label", "Charts", 1),
    ]);
    let harness = TestHarness::new(rows);
    let parent = FieldDef::new("parent", kinds::LINK).multi_valued();
    let label = FieldDef::new("label", kinds::STRING);
    harness
        .catalog
        .replace_fields(vec![
            FieldDef::new("category", kinds::STRING),
            FieldDef::new("title", kinds::TEXT).multi_valued(),
            FieldDef::linked(&parent, &label, "__"),
            parent,
        ])
        .await;
    let orchestrator = harness.orchestrator();

    orchestrator.create_index().await.unwrap().wait().await.unwrap();
    orchestrator.update_index().await.unwrap().wait().await.unwrap();

    let fields = harness.engine.fields();
    let raw = fields.iter().find(|f| f.name == "parent__label_raw").unwrap();
    assert!(raw.multi_valued);
    assert!(!fields.iter().any(|f| f.name == "parent__label_sort"));

    assert_eq!(harness.engine.uploaded_batches().len(), 1);
    let doc = harness.engine.document("a").unwrap();
    assert!(doc.contains("Atlases"));
    assert!(doc.contains("Charts"));
}
