//! Batch upload to the search engine.

use std::sync::Arc;
use std::time::Duration;

use sift_core::Result;
use sift_solr::SearchEngine;

/// Uploads rendered documents in batches.
#[derive(Clone)]
pub struct BatchUploader {
    engine: Arc<dyn SearchEngine>,
    commit_within: Duration,
}

impl BatchUploader {
    /// Create an uploader committing within `commit_within`.
    pub fn new(engine: Arc<dyn SearchEngine>, commit_within: Duration) -> Self {
        Self {
            engine,
            commit_within,
        }
    }

    /// Upload one batch in a single call.
    pub async fn upload(&self, batch: &[String]) -> Result<()> {
        tracing::debug!(
            collection = self.engine.collection(),
            documents = batch.len(),
            "uploading batch"
        );
        self.engine.add_documents(batch, self.commit_within).await
    }

    /// Remove documents by id.
    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        self.engine.delete_documents(ids, self.commit_within).await
    }
}

impl std::fmt::Debug for BatchUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchUploader")
            .field("collection", &self.engine.collection())
            .field("commit_within", &self.commit_within)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sift_solr::{MockSearchEngine, xml};

    #[tokio::test]
    async fn test_upload_and_delete() {
        let engine = Arc::new(MockSearchEngine::new("catalog"));
        let uploader = BatchUploader::new(engine.clone(), Duration::from_secs(1));

        let doc = xml::doc(&[xml::field_tag("id", "a")]);
        uploader.upload(&[doc]).await.unwrap();
        assert!(engine.document("a").is_some());

        uploader.delete(&["a".to_string()]).await.unwrap();
        assert!(engine.document("a").is_none());
    }
}
