//! Collection lifecycle orchestration.
//!
//! Every index-affecting operation runs as one background job guarded by a
//! single named lock. The calling side gets a [`JobTicket`] back as soon as
//! the lock is taken and the job is recorded; the work itself runs on its
//! own task under a child of the orchestrator's shutdown token.
//!
//! A job always ends the same way: the lock is released, the job is marked
//! done or error, and (for recreate runs) the final health color is
//! reported, in that order. A panic inside the work counts as a failed job.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use sift_core::{
    EntityTypeRepository, Error, FieldRepository, IndexerConfig, Result, SearchConfigRepository,
};
use sift_indexer::{BatchUploader, DocumentIndexer, DocumentRenderer, IndexCounts};
use sift_jobs::{HealthColor, HealthSink, JobId, JobKind, JobService};
use sift_schema::{FieldKindRegistry, SchemaGenerator, SearchConfigTypeRegistry, rebuild_schema};
use sift_solr::{CollectionOptions, SearchEngine};
use sift_sql::{ProjectionBuilder, ProjectionRequest, RowSource, ident};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Collaborators
// ============================================================================

/// External services the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Configured fields.
    pub fields: Arc<dyn FieldRepository>,
    /// Search-config elements.
    pub search_configs: Arc<dyn SearchConfigRepository>,
    /// Focal entity types.
    pub entity_types: Arc<dyn EntityTypeRepository>,
    /// Search engine holding the collection.
    pub engine: Arc<dyn SearchEngine>,
    /// Relational store the projection runs against.
    pub rows: Arc<dyn RowSource>,
    /// Lock and job bookkeeping.
    pub jobs: Arc<dyn JobService>,
    /// Health reporting.
    pub health: Arc<dyn HealthSink>,
}

// ============================================================================
// JobTicket
// ============================================================================

/// Handle to a started job.
#[derive(Debug)]
pub struct JobTicket {
    /// Id of the recorded job.
    pub id: JobId,
    handle: JoinHandle<Result<()>>,
}

impl JobTicket {
    /// Wait for the job to finish and return its outcome.
    pub async fn wait(self) -> Result<()> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::task(e.to_string())),
        }
    }
}

// ============================================================================
// IndexOrchestrator
// ============================================================================

/// Runs create, update, delete, recreate, and single-item reindex jobs.
///
/// Cheap to clone (Arc internals).
#[derive(Clone)]
pub struct IndexOrchestrator {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) config: IndexerConfig,
    pub(crate) collaborators: Collaborators,
    generator: SchemaGenerator,
    pub(crate) shutdown: CancellationToken,
}

impl IndexOrchestrator {
    /// Create an orchestrator with the built-in field-kind and
    /// search-config type hooks.
    pub fn new(config: IndexerConfig, collaborators: Collaborators) -> Result<Self> {
        let kinds = FieldKindRegistry::builtin(&config.languages);
        let types = SearchConfigTypeRegistry::builtin(&config.link_separator);
        Self::with_hooks(config, collaborators, kinds, types)
    }

    /// Create an orchestrator with custom hook registries.
    ///
    /// The engine must be bound to the configured collection.
    pub fn with_hooks(
        config: IndexerConfig,
        collaborators: Collaborators,
        kinds: FieldKindRegistry,
        types: SearchConfigTypeRegistry,
    ) -> Result<Self> {
        config.validate()?;
        let bound = collaborators.engine.collection();
        if bound != config.collection {
            return Err(Error::config(format!(
                "search engine is bound to collection '{bound}', configuration names '{}'",
                config.collection
            )));
        }
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                collaborators,
                generator: SchemaGenerator::new(kinds, types),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &IndexerConfig {
        &self.inner.config
    }

    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }

    /// Rebuild the live schema from the current configuration.
    ///
    /// Indexed documents are left alone.
    pub async fn create_index(&self) -> Result<JobTicket> {
        let inner = self.inner.clone();
        self.start(JobKind::CreateIndex, None, async move {
            inner.rebuild_schema().await
        })
        .await
    }

    /// Reindex every item.
    pub async fn update_index(&self) -> Result<JobTicket> {
        let inner = self.inner.clone();
        self.start(JobKind::UpdateIndex, None, async move {
            inner.reindex(None).await.map(|_| ())
        })
        .await
    }

    /// Drop every indexed document, keeping the schema.
    pub async fn delete_index(&self) -> Result<JobTicket> {
        let inner = self.inner.clone();
        self.start(JobKind::DeleteIndex, None, async move {
            inner.delete_documents().await
        })
        .await
    }

    /// Drop and recreate the collection, rebuild its schema, and reindex.
    ///
    /// `hash` identifies the configuration snapshot that triggered the run
    /// and tags every health report.
    pub async fn recreate_index(&self, hash: Option<String>) -> Result<JobTicket> {
        let inner = self.inner.clone();
        self.start(JobKind::RecreateIndex, hash, async move {
            inner.recreate().await
        })
        .await
    }

    /// Delete one item's document and index it again from the store.
    pub async fn reindex_item(&self, item_id: &str) -> Result<JobTicket> {
        ident::literal(item_id)?;
        let inner = self.inner.clone();
        let item_id = item_id.to_string();
        self.start(JobKind::ReindexItem, None, async move {
            inner.reindex(Some(&item_id)).await.map(|_| ())
        })
        .await
    }

    /// Cancel every running job and stop the configuration listener.
    ///
    /// Cancelled jobs are recorded as errors and release the lock.
    pub fn shutdown(&self) {
        tracing::info!(collection = %self.inner.config.collection, "shutting down index jobs");
        self.inner.shutdown.cancel();
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Take the lock, record the job, and spawn `work` under a child token.
    async fn start<F>(&self, kind: JobKind, hash: Option<String>, work: F) -> Result<JobTicket>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        if self.is_shut_down() {
            return Err(Error::Cancelled);
        }
        let jobs = &self.inner.collaborators.jobs;
        let resource = self.inner.config.lock_resource.clone();

        jobs.acquire_lock(&resource).await?;
        let job = match jobs.create_job(kind, &resource).await {
            Ok(job) => job,
            Err(e) => {
                if let Err(release) = jobs.release_lock(&resource).await {
                    tracing::warn!(%resource, error = %release, "failed to release lock");
                }
                return Err(e);
            }
        };

        let inner = self.inner.clone();
        let token = self.inner.shutdown.child_token();
        let id = job.id;
        let handle = tokio::spawn(async move {
            inner
                .run_job(id, kind, resource, hash, token, work)
                .await
        });
        Ok(JobTicket { id, handle })
    }
}

impl std::fmt::Debug for IndexOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexOrchestrator")
            .field("collection", &self.inner.config.collection)
            .field("lock_resource", &self.inner.config.lock_resource)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl Inner {
    async fn run_job<F>(
        &self,
        id: JobId,
        kind: JobKind,
        resource: String,
        hash: Option<String>,
        token: CancellationToken,
        work: F,
    ) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send,
    {
        let jobs = &self.collaborators.jobs;
        let health = &self.collaborators.health;
        let reports_health = kind == JobKind::RecreateIndex;

        if let Err(e) = jobs.set_running(id).await {
            tracing::warn!(job_id = %id, error = %e, "failed to mark job running");
        }
        if reports_health {
            health.set_status(HealthColor::Amber, hash.as_deref()).await;
        }

        let work = AssertUnwindSafe(work).catch_unwind();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            result = work => result.unwrap_or_else(|payload| {
                Err(Error::task(format!("job panicked: {}", panic_message(&*payload))))
            }),
        };

        if let Err(e) = jobs.release_lock(&resource).await {
            tracing::warn!(%resource, error = %e, "failed to release lock");
        }

        let recorded = match &outcome {
            Ok(()) => jobs.set_done(id).await,
            Err(e) => {
                tracing::warn!(job_id = %id, %kind, error = %e, "index job failed");
                jobs.set_error(id, &e.to_string()).await
            }
        };
        if let Err(e) = recorded {
            tracing::warn!(job_id = %id, error = %e, "failed to record job outcome");
        }

        if reports_health {
            let color = if outcome.is_ok() {
                HealthColor::Green
            } else {
                HealthColor::Red
            };
            health.set_status(color, hash.as_deref()).await;
            health.done().await;
        }
        outcome
    }

    /// Generate the schema from configuration, then clear and apply it.
    ///
    /// Generation runs first so a configuration error leaves the live
    /// schema untouched.
    async fn rebuild_schema(&self) -> Result<()> {
        let fields = self.collaborators.fields.list_field_defs().await?;
        let search_configs = self.collaborators.search_configs.list_search_configs().await?;
        let updates = self.generator.generate(&fields, &search_configs)?;
        rebuild_schema(self.collaborators.engine.as_ref(), &updates).await
    }

    /// Project and index every item, or just `item_id`.
    async fn reindex(&self, item_id: Option<&str>) -> Result<IndexCounts> {
        let fields = self.collaborators.fields.list_field_defs().await?;
        let focal = self
            .collaborators
            .entity_types
            .list_focal_entity_types()
            .await?;

        let mut request =
            ProjectionRequest::from_fields(&fields, focal, &self.config.link_separator);
        if let Some(id) = item_id {
            request = request.for_item(id);
        }
        let sql = ProjectionBuilder::new(&self.config.projection)?.build(&request)?;

        let renderer = DocumentRenderer::new(fields, self.generator.kinds().clone());
        let uploader = BatchUploader::new(
            self.collaborators.engine.clone(),
            self.config.commit_within(),
        );
        match item_id {
            Some(id) => uploader.delete(&[id.to_string()]).await?,
            None => renderer.reset_caches(),
        }

        let indexer = DocumentIndexer::new(renderer, uploader, self.config.batch_size);
        indexer.index(self.collaborators.rows.as_ref(), &sql).await
    }

    async fn delete_documents(&self) -> Result<()> {
        tracing::info!(collection = %self.config.collection, "deleting all documents");
        self.collaborators
            .engine
            .delete_all_documents(self.config.commit_within())
            .await
    }

    /// Drop the collection if present, create it, rebuild, and reindex.
    async fn recreate(&self) -> Result<()> {
        let engine = &self.collaborators.engine;
        let collection = engine.collection();

        if engine.list_collections().await?.iter().any(|c| c == collection) {
            tracing::info!(%collection, "dropping collection");
            engine.delete_collection(collection).await?;
        }
        tracing::info!(%collection, "creating collection");
        engine
            .create_collection(collection, &CollectionOptions::from(&self.config.solr))
            .await?;

        self.rebuild_schema().await?;
        self.reindex(None).await.map(|_| ())
    }
}

fn panic_message<'a>(payload: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

// ============================================================================
// Tests
// ============================================================================
