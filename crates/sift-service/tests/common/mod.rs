//! Common test utilities and harness for orchestrator integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use sift_core::model::kinds;
use sift_core::{
    FieldDef, FieldRepository, IndexerConfig, ItemValueRow, SearchConfigElement, StaticCatalog,
};
use sift_jobs::{HealthColor, HealthEvent, HealthHandle, HealthSink, InMemoryJobService};
use sift_schema::{FieldKindHook, FieldKindRegistry, SearchConfigTypeRegistry};
use sift_service::{Collaborators, IndexOrchestrator};
use sift_solr::MockSearchEngine;
use sift_sql::{RowSource, RowStream, StaticRowSource};

/// Lock resource used by every harness.
pub const LOCK: &str = "index";

/// Test harness wiring an orchestrator to in-memory collaborators.
pub struct TestHarness {
    /// Catalog configuration
    pub catalog: Arc<StaticCatalog>,
    /// Mock search engine
    pub engine: Arc<MockSearchEngine>,
    /// Job and lock bookkeeping
    pub jobs: Arc<InMemoryJobService>,
    /// Health sink recording lock state at every report
    pub health: Arc<LockCheckingHealth>,
    /// Row source the projection runs against
    pub rows: Arc<dyn RowSource>,
}

impl TestHarness {
    /// Harness over the sample catalog, replaying `rows`.
    pub fn new(rows: Vec<ItemValueRow>) -> Self {
        Self::with_source(Arc::new(StaticRowSource::new(rows)))
    }

    /// Harness over the sample catalog with a custom row source.
    pub fn with_source(rows: Arc<dyn RowSource>) -> Self {
        let jobs = Arc::new(InMemoryJobService::new());
        Self {
            catalog: Arc::new(sample_catalog()),
            engine: Arc::new(MockSearchEngine::new("catalog")),
            health: Arc::new(LockCheckingHealth::new(jobs.clone())),
            jobs,
            rows,
        }
    }

    /// Replace the search engine.
    pub fn with_engine(mut self, engine: MockSearchEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    /// Build an orchestrator with a small batch size.
    pub fn orchestrator(&self) -> IndexOrchestrator {
        self.orchestrator_with_fields(self.catalog.clone())
    }

    /// Build an orchestrator reading fields from `fields`.
    pub fn orchestrator_with_fields(&self, fields: Arc<dyn FieldRepository>) -> IndexOrchestrator {
        IndexOrchestrator::new(harness_config(), self.collaborators(fields)).unwrap()
    }

    /// Build an orchestrator with the built-in kinds plus `extra` hooks.
    pub fn orchestrator_with_kinds(&self, extra: Vec<Arc<dyn FieldKindHook>>) -> IndexOrchestrator {
        let config = harness_config();
        let mut kinds = FieldKindRegistry::builtin(&config.languages);
        for hook in extra {
            kinds.register(hook);
        }
        let types = SearchConfigTypeRegistry::builtin(&config.link_separator);
        let collaborators = self.collaborators(self.catalog.clone());
        IndexOrchestrator::with_hooks(config, collaborators, kinds, types).unwrap()
    }

    fn collaborators(&self, fields: Arc<dyn FieldRepository>) -> Collaborators {
        Collaborators {
            fields,
            search_configs: self.catalog.clone(),
            entity_types: self.catalog.clone(),
            engine: self.engine.clone(),
            rows: self.rows.clone(),
            jobs: self.jobs.clone(),
            health: self.health.clone(),
        }
    }
}

fn harness_config() -> IndexerConfig {
    IndexerConfig {
        batch_size: 2,
        ..Default::default()
    }
}

/// Catalog with a string field, a multi-valued text field, and a search
/// focus over both.
pub fn sample_catalog() -> StaticCatalog {
    StaticCatalog::new(
        vec![
            FieldDef::new("category", kinds::STRING),
            FieldDef::new("title", kinds::TEXT).multi_valued(),
        ],
        vec![SearchConfigElement::search_focus(
            "all",
            ["title", "category"],
        )],
        vec!["Book".to_string()],
    )
}

/// Rows of one item, sorted by field name.
pub fn item_rows(item: &str, title: &str) -> Vec<ItemValueRow> {
    vec![
        ItemValueRow::new(item, "category", "maps", 0),
        ItemValueRow::new(item, "id", item, 0),
        ItemValueRow::new(item, "title", title, 0),
    ]
}

/// Health sink that notes, for every color reported, whether the lock was
/// still held at that moment.
pub struct LockCheckingHealth {
    handle: HealthHandle,
    jobs: Arc<InMemoryJobService>,
    observed: Mutex<Vec<(HealthColor, bool)>>,
}

impl LockCheckingHealth {
    fn new(jobs: Arc<InMemoryJobService>) -> Self {
        Self {
            handle: HealthHandle::new(LOCK),
            jobs,
            observed: Mutex::new(Vec::new()),
        }
    }

    /// Every `(color, lock held)` pair reported so far.
    pub fn observed(&self) -> Vec<(HealthColor, bool)> {
        self.observed.lock().unwrap().clone()
    }

    /// Every call received so far.
    pub fn history(&self) -> Vec<HealthEvent> {
        self.handle.history()
    }

    /// Wait until `done` has been called `count` times.
    pub async fn wait_for_done(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let done = self
                    .history()
                    .iter()
                    .filter(|e| **e == HealthEvent::Done)
                    .count();
                if done >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}

#[async_trait]
impl HealthSink for LockCheckingHealth {
    async fn set_status(&self, color: HealthColor, hash: Option<&str>) {
        let locked = self.jobs.is_locked(LOCK).await;
        self.observed.lock().unwrap().push((color, locked));
        self.handle.set_status(color, hash).await;
    }

    async fn done(&self) {
        self.handle.done().await;
    }
}

/// Row source whose stream never yields, so a run stays in flight until
/// cancelled.
#[derive(Debug, Default)]
pub struct StallingRowSource;

impl RowSource for StallingRowSource {
    fn fetch<'a>(&'a self, _sql: &'a str) -> RowStream<'a> {
        futures::stream::pending().boxed()
    }
}
