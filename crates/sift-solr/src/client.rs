//! HTTP client for Solr.
//!
//! Wraps a `reqwest::Client` bound to one base URL and one collection.
//! Non-success responses become [`Error::SearchEngine`] carrying the HTTP
//! status and a truncated response body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use sift_core::{Error, Result, SolrConfig};

use crate::engine::SearchEngine;
use crate::types::{
    ClusterStatus, CollectionOptions, CopyFieldDef, DynamicFieldDef, ReplicaStatus,
    SchemaCommands, ShardStatus, SolrFieldDef,
};
use crate::xml;

/// Longest response body quoted in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Solr client for one collection.
#[derive(Clone)]
pub struct SolrClient {
    http: reqwest::Client,
    base_url: String,
    collection: String,
}

#[derive(Deserialize)]
struct FieldsResponse {
    #[serde(default)]
    fields: Vec<SolrFieldDef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DynamicFieldsResponse {
    #[serde(default)]
    dynamic_fields: Vec<DynamicFieldDef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CopyFieldsResponse {
    #[serde(default)]
    copy_fields: Vec<CopyFieldDef>,
}

#[derive(Deserialize)]
struct CollectionsResponse {
    #[serde(default)]
    collections: Vec<String>,
}

impl SolrClient {
    /// Create a client from connection settings.
    pub fn new(config: &SolrConfig, collection: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::search_engine_with_source("failed to build HTTP client", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            collection: collection.into(),
        })
    }

    fn collection_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.collection, path)
    }

    fn admin_url(&self) -> String {
        format!("{}/admin/collections", self.base_url)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::search_engine_with_source(format!("{what}: request failed"), e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(Error::search_engine_status(
            status.as_u16(),
            format!("{what}: HTTP {status}: {body}"),
        ))
    }

    async fn send_json(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = self.send(request, what).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::search_engine_with_source(format!("{what}: invalid JSON"), e))
    }

    async fn post_update(&self, body: String, what: &str) -> Result<()> {
        let request = self
            .http
            .post(self.collection_url("update"))
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body);
        self.send(request, what).await?;
        Ok(())
    }
}

#[async_trait]
impl SearchEngine for SolrClient {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn list_fields(&self) -> Result<Vec<SolrFieldDef>> {
        let request = self.http.get(self.collection_url("schema/fields"));
        let value = self.send_json(request, "list fields").await?;
        Ok(serde_json::from_value::<FieldsResponse>(value)?.fields)
    }

    async fn list_dynamic_fields(&self) -> Result<Vec<DynamicFieldDef>> {
        let request = self.http.get(self.collection_url("schema/dynamicfields"));
        let value = self.send_json(request, "list dynamic fields").await?;
        Ok(serde_json::from_value::<DynamicFieldsResponse>(value)?.dynamic_fields)
    }

    async fn list_copy_fields(&self) -> Result<Vec<CopyFieldDef>> {
        let request = self.http.get(self.collection_url("schema/copyfields"));
        let value = self.send_json(request, "list copy fields").await?;
        Ok(serde_json::from_value::<CopyFieldsResponse>(value)?.copy_fields)
    }

    async fn update_schema(&self, commands: &SchemaCommands) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        let request = self.http.post(self.collection_url("schema")).json(commands);
        let value = self.send_json(request, "update schema").await?;

        // Older Solr versions report command failures with HTTP 200.
        if let Some(errors) = value.get("errors").filter(|e| !e.is_null()) {
            return Err(Error::search_engine(format!(
                "update schema: {errors}"
            )));
        }
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let request = self
            .http
            .get(self.admin_url())
            .query(&[("action", "LIST"), ("wt", "json")]);
        let value = self.send_json(request, "list collections").await?;
        Ok(serde_json::from_value::<CollectionsResponse>(value)?.collections)
    }

    async fn create_collection(&self, name: &str, options: &CollectionOptions) -> Result<()> {
        let num_shards = options.num_shards.to_string();
        let replication_factor = options.replication_factor.to_string();
        let request = self.http.get(self.admin_url()).query(&[
            ("action", "CREATE"),
            ("name", name),
            ("numShards", num_shards.as_str()),
            ("replicationFactor", replication_factor.as_str()),
            ("collection.configName", options.config_set.as_str()),
            ("wt", "json"),
        ]);
        self.send(request, "create collection").await?;
        tracing::info!(collection = name, "created collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let request = self.http.get(self.admin_url()).query(&[
            ("action", "DELETE"),
            ("name", name),
            ("wt", "json"),
        ]);
        self.send(request, "delete collection").await?;
        tracing::info!(collection = name, "deleted collection");
        Ok(())
    }

    async fn add_documents(&self, docs: &[String], commit_within: Duration) -> Result<()> {
        self.post_update(xml::add_envelope(docs, commit_within), "add documents")
            .await
    }

    async fn delete_documents(&self, ids: &[String], commit_within: Duration) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.post_update(xml::delete_envelope(ids, commit_within), "delete documents")
            .await
    }

    async fn delete_all_documents(&self, commit_within: Duration) -> Result<()> {
        self.post_update(xml::delete_all_envelope(commit_within), "delete all documents")
            .await
    }

    async fn cluster_status(&self) -> Result<ClusterStatus> {
        let request = self.http.get(self.admin_url()).query(&[
            ("action", "CLUSTERSTATUS"),
            ("collection", self.collection.as_str()),
            ("wt", "json"),
        ]);
        let value = self.send_json(request, "cluster status").await?;
        parse_cluster_status(&self.collection, &value)
    }

    async fn query(&self, request: &Value) -> Result<Value> {
        let request = self.http.post(self.collection_url("query")).json(request);
        self.send_json(request, "query").await
    }
}

impl std::fmt::Debug for SolrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolrClient")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .finish()
    }
}

/// Parse a `CLUSTERSTATUS` response for one collection.
pub fn parse_cluster_status(collection: &str, value: &Value) -> Result<ClusterStatus> {
    let entry = value
        .pointer("/cluster/collections")
        .and_then(|c| c.get(collection))
        .ok_or_else(|| {
            Error::search_engine(format!(
                "cluster status does not mention collection '{collection}'"
            ))
        })?;

    let mut shards = Vec::new();
    if let Some(shard_map) = entry.get("shards").and_then(Value::as_object) {
        for (shard_name, shard) in shard_map {
            let mut replicas = Vec::new();
            if let Some(replica_map) = shard.get("replicas").and_then(Value::as_object) {
                for (replica_name, replica) in replica_map {
                    replicas.push(ReplicaStatus {
                        name: replica_name.clone(),
                        core: str_field(replica, "core"),
                        node_name: str_field(replica, "node_name"),
                        state: str_field(replica, "state"),
                        leader: matches!(
                            replica.get("leader"),
                            Some(Value::Bool(true))
                        ) || replica.get("leader").and_then(Value::as_str) == Some("true"),
                    });
                }
            }
            shards.push(ShardStatus {
                name: shard_name.clone(),
                state: str_field(shard, "state"),
                health: shard.get("health").and_then(Value::as_str).map(String::from),
                replicas,
            });
        }
    }

    Ok(ClusterStatus {
        collection: collection.to_string(),
        health: entry.get("health").and_then(Value::as_str).map(String::from),
        shards,
    })
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
