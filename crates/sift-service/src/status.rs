//! Index status query.
//!
//! Status checks are health probes, so they never fail: anything that cannot
//! be reached is reported as a message alongside whatever was collected.

use serde::Serialize;
use sift_solr::{ShardStatus, document_count};

use crate::orchestrator::IndexOrchestrator;

/// Cluster health and size of the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    /// Collection name.
    pub collection: String,
    /// Collection health reported by the cluster.
    pub health: Option<String>,
    /// Per-shard and per-replica state.
    pub shards: Vec<ShardStatus>,
    /// Number of indexed documents, if the count query succeeded.
    pub document_count: Option<u64>,
    /// Explanations for anything that could not be collected.
    pub messages: Vec<String>,
}

impl IndexStatus {
    /// Returns `true` if every part of the status was collected.
    pub fn is_complete(&self) -> bool {
        self.messages.is_empty()
    }
}

impl IndexOrchestrator {
    /// Report cluster health and document count of the collection.
    pub async fn index_status(&self) -> IndexStatus {
        let engine = &self.inner().collaborators.engine;
        let mut status = IndexStatus {
            collection: engine.collection().to_string(),
            ..Default::default()
        };

        match engine.cluster_status().await {
            Ok(cluster) => {
                status.health = cluster.health;
                status.shards = cluster.shards;
            }
            Err(e) => {
                tracing::warn!(collection = %status.collection, error = %e, "cluster status unavailable");
                status
                    .messages
                    .push(format!("cluster status unavailable: {e}"));
            }
        }

        match document_count(engine.as_ref()).await {
            Ok(count) => status.document_count = Some(count),
            Err(e) => {
                tracing::warn!(collection = %status.collection, error = %e, "document count unavailable");
                status
                    .messages
                    .push(format!("document count unavailable: {e}"));
            }
        }

        status
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::orchestrator::Collaborators;
    use sift_core::{IndexerConfig, StaticCatalog};
    use sift_jobs::{HealthHandle, InMemoryJobService};
    use sift_solr::{MockSearchEngine, SearchEngine};
    use sift_sql::StaticRowSource;

    fn orchestrator(engine: Arc<MockSearchEngine>) -> IndexOrchestrator {
        let catalog = Arc::new(StaticCatalog::default());
        let collaborators = Collaborators {
            fields: catalog.clone(),
            search_configs: catalog.clone(),
            entity_types: catalog,
            engine,
            rows: Arc::new(StaticRowSource::default()),
            jobs: Arc::new(InMemoryJobService::new()),
            health: Arc::new(HealthHandle::new("index")),
        };
        IndexOrchestrator::new(IndexerConfig::default(), collaborators).unwrap()
    }

    #[tokio::test]
    async fn test_status_of_reachable_cluster() {
        let engine = Arc::new(MockSearchEngine::new("catalog"));
        engine
            .add_documents(
                &[
                    "<doc><field name=\"id\">a</field></doc>".to_string(),
                    "<doc><field name=\"id\">b</field></doc>".to_string(),
                ],
                Default::default(),
            )
            .await
            .unwrap();

        let status = orchestrator(engine).index_status().await;

        assert!(status.is_complete());
        assert_eq!(status.collection, "catalog");
        assert_eq!(status.health.as_deref(), Some("GREEN"));
        assert_eq!(status.shards.len(), 1);
        assert!(status.shards[0].replicas[0].leader);
        assert_eq!(status.document_count, Some(2));
    }

    #[tokio::test]
    async fn test_unreachable_engine_yields_messages() {
        let engine = Arc::new(MockSearchEngine::new("catalog"));
        engine.set_unreachable(true);

        let status = orchestrator(engine).index_status().await;

        assert_eq!(status.collection, "catalog");
        assert!(status.shards.is_empty());
        assert_eq!(status.document_count, None);
        assert_eq!(status.messages.len(), 2);
        assert!(status.messages[0].starts_with("cluster status unavailable"));
    }
}
