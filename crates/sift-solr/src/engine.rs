//! Search-engine abstraction.
//!
//! Everything Sift needs from the search engine goes through
//! [`SearchEngine`]: schema introspection and updates, collection admin,
//! document updates, and status queries. [`SolrClient`](crate::SolrClient)
//! talks to a real Solr cluster; [`MockSearchEngine`](crate::MockSearchEngine)
//! keeps state in memory for tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sift_core::Result;

use crate::types::{
    ClusterStatus, CollectionOptions, CopyFieldDef, DynamicFieldDef, SchemaCommands,
    SolrFieldDef,
};

/// Operations on one search-engine collection and its cluster.
///
/// All calls are I/O; dropping the returned future cancels the request.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Name of the collection this engine operates on.
    fn collection(&self) -> &str;

    /// Fields currently defined in the collection's schema.
    async fn list_fields(&self) -> Result<Vec<SolrFieldDef>>;

    /// Dynamic fields currently defined in the collection's schema.
    async fn list_dynamic_fields(&self) -> Result<Vec<DynamicFieldDef>>;

    /// Copy-field rules currently defined in the collection's schema.
    async fn list_copy_fields(&self) -> Result<Vec<CopyFieldDef>>;

    /// Apply a batch of schema commands in one request.
    async fn update_schema(&self, commands: &SchemaCommands) -> Result<()>;

    /// Names of all collections in the cluster.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Create a collection.
    async fn create_collection(&self, name: &str, options: &CollectionOptions) -> Result<()>;

    /// Delete a collection.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Add (or replace) rendered `<doc>` fragments.
    async fn add_documents(&self, docs: &[String], commit_within: Duration) -> Result<()>;

    /// Remove documents by unique key.
    async fn delete_documents(&self, ids: &[String], commit_within: Duration) -> Result<()>;

    /// Remove every document, keeping the schema.
    async fn delete_all_documents(&self, commit_within: Duration) -> Result<()>;

    /// Cluster state of this engine's collection.
    async fn cluster_status(&self) -> Result<ClusterStatus>;

    /// Run a JSON request-API query and return the raw response.
    async fn query(&self, request: &Value) -> Result<Value>;
}

/// Number of documents in the collection.
pub async fn document_count(engine: &dyn SearchEngine) -> Result<u64> {
    let response = engine
        .query(&serde_json::json!({ "query": "*:*", "limit": 0 }))
        .await?;
    response
        .pointer("/response/numFound")
        .and_then(Value::as_u64)
        .ok_or_else(|| sift_core::Error::search_engine("query response lacks numFound"))
}
