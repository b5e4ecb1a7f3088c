//! In-memory search engine for tests.
//!
//! [`MockSearchEngine`] keeps a schema, a document store, and a set of
//! collections in memory and mimics the Solr behaviours Sift relies on:
//! schema commands apply in order and reject duplicates, copy-field rules
//! must reference existing fields, and documents are keyed by `id`.
//!
//! Uploads are checked against the applied schema the way Solr checks them:
//! every field must be declared (directly or through a dynamic pattern), and
//! a single-valued field may receive at most one value, counting values
//! copied into it by copy-field rules. One bad document rejects the batch.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use sift_core::{Error, Result};

use crate::engine::SearchEngine;
use crate::types::{
    ClusterStatus, CollectionOptions, CopyFieldDef, DynamicFieldDef, ReplicaStatus,
    SchemaCommands, ShardStatus, SolrFieldDef, field_types,
};
use crate::xml;

#[derive(Debug, Default)]
struct MockState {
    fields: BTreeMap<String, SolrFieldDef>,
    dynamic_fields: BTreeMap<String, DynamicFieldDef>,
    copy_fields: Vec<CopyFieldDef>,
    collections: BTreeSet<String>,
    documents: BTreeMap<String, String>,
    uploaded_batches: Vec<Vec<String>>,
    upload_attempts: usize,
    schema_requests: usize,
    fail_uploads: bool,
    unreachable: bool,
}

/// Search engine double backed by memory.
#[derive(Debug)]
pub struct MockSearchEngine {
    collection: String,
    state: Mutex<MockState>,
}

impl MockSearchEngine {
    /// Create an engine whose collection exists with Solr's built-in fields.
    pub fn new(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let mut state = MockState::default();
        for field in [
            SolrFieldDef::new("id", field_types::STRING),
            SolrFieldDef::new("_version_", "plong").doc_values().not_stored(),
        ] {
            state.fields.insert(field.name.clone(), field);
        }
        state.collections.insert(collection.clone());

        Self {
            collection,
            state: Mutex::new(state),
        }
    }

    /// Create an engine whose collection does not exist yet.
    pub fn without_collection(collection: impl Into<String>) -> Self {
        let engine = Self::new(collection);
        engine.state().collections.clear();
        engine
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reachable(&self) -> Result<MutexGuard<'_, MockState>> {
        let state = self.state();
        if state.unreachable {
            return Err(Error::search_engine("connection refused"));
        }
        Ok(state)
    }

    /// Make every document upload fail with HTTP 500.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.state().fail_uploads = fail;
    }

    /// Make every call fail as if the engine were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Add a field directly, bypassing the schema API.
    pub fn seed_field(&self, field: SolrFieldDef) {
        self.state().fields.insert(field.name.clone(), field);
    }

    /// Add a dynamic field directly, bypassing the schema API.
    pub fn seed_dynamic_field(&self, field: DynamicFieldDef) {
        self.state().dynamic_fields.insert(field.name.clone(), field);
    }

    /// Names of all schema fields, sorted.
    pub fn field_names(&self) -> Vec<String> {
        self.state().fields.keys().cloned().collect()
    }

    /// Current schema fields, sorted by name.
    pub fn fields(&self) -> Vec<SolrFieldDef> {
        self.state().fields.values().cloned().collect()
    }

    /// Current copy-field rules, sorted.
    pub fn copy_fields(&self) -> Vec<CopyFieldDef> {
        let mut copies = self.state().copy_fields.clone();
        copies.sort();
        copies
    }

    /// Stored document fragments by id.
    pub fn documents(&self) -> BTreeMap<String, String> {
        self.state().documents.clone()
    }

    /// One stored document fragment.
    pub fn document(&self, id: &str) -> Option<String> {
        self.state().documents.get(id).cloned()
    }

    /// Batches accepted by `add_documents`, in upload order.
    pub fn uploaded_batches(&self) -> Vec<Vec<String>> {
        self.state().uploaded_batches.clone()
    }

    /// Number of `add_documents` calls, successful or not.
    pub fn upload_attempts(&self) -> usize {
        self.state().upload_attempts
    }

    /// Number of schema-API requests received.
    pub fn schema_requests(&self) -> usize {
        self.state().schema_requests
    }

    /// Whether a collection exists.
    pub fn has_collection(&self, name: &str) -> bool {
        self.state().collections.contains(name)
    }
}

impl MockState {
    fn require_collection(&self, name: &str) -> Result<()> {
        if self.collections.contains(name) {
            Ok(())
        } else {
            Err(Error::search_engine_status(
                404,
                format!("collection '{name}' does not exist"),
            ))
        }
    }

    fn apply(&mut self, commands: &SchemaCommands) -> Result<()> {
        for copy in &commands.delete_copy_fields {
            let before = self.copy_fields.len();
            self.copy_fields.retain(|c| c != copy);
            if self.copy_fields.len() == before {
                return Err(bad_request(format!(
                    "copy field '{}' -> {:?} does not exist",
                    copy.source, copy.destinations
                )));
            }
        }
        for name in &commands.delete_dynamic_fields {
            if self.dynamic_fields.remove(&name.name).is_none() {
                return Err(bad_request(format!(
                    "dynamic field '{}' does not exist",
                    name.name
                )));
            }
        }
        for name in &commands.delete_fields {
            if self.fields.remove(&name.name).is_none() {
                return Err(bad_request(format!("field '{}' does not exist", name.name)));
            }
        }
        for field in &commands.add_fields {
            if self.fields.contains_key(&field.name) {
                return Err(bad_request(format!("field '{}' already exists", field.name)));
            }
            self.fields.insert(field.name.clone(), field.clone());
        }
        for field in &commands.add_dynamic_fields {
            if self.dynamic_fields.contains_key(&field.name) {
                return Err(bad_request(format!(
                    "dynamic field '{}' already exists",
                    field.name
                )));
            }
            self.dynamic_fields.insert(field.name.clone(), field.clone());
        }
        for copy in &commands.add_copy_fields {
            let unknown = std::iter::once(&copy.source)
                .chain(copy.destinations.iter())
                .find(|name| !self.fields.contains_key(*name));
            if let Some(name) = unknown {
                return Err(bad_request(format!(
                    "copy field references undefined field '{name}'"
                )));
            }
            self.copy_fields.push(copy.clone());
        }
        Ok(())
    }

    /// Schema entry for `name`: the field itself, else the longest matching
    /// dynamic-field pattern.
    fn field_def(&self, name: &str) -> Option<&SolrFieldDef> {
        self.fields.get(name).or_else(|| {
            self.dynamic_fields
                .values()
                .filter(|d| dynamic_match(&d.name, name))
                .max_by_key(|d| d.name.len())
        })
    }

    /// Check one document against the schema and return its id.
    fn check_document(&self, doc: &str) -> Result<String> {
        let id = xml::doc_id(doc)
            .ok_or_else(|| bad_request("document is missing required field 'id'".into()))?;

        let mut values: BTreeMap<String, usize> = BTreeMap::new();
        for name in xml::field_names(doc) {
            if self.field_def(&name).is_none() {
                return Err(bad_request(format!(
                    "[doc={id}] unknown field '{name}'"
                )));
            }
            *values.entry(name).or_default() += 1;
        }

        let mut received = values.clone();
        for copy in &self.copy_fields {
            if let Some(&count) = values.get(&copy.source) {
                for dest in &copy.destinations {
                    *received.entry(dest.clone()).or_default() += count;
                }
            }
        }
        for (name, count) in &received {
            let single = self.field_def(name).is_some_and(|def| !def.multi_valued);
            if single && *count > 1 {
                return Err(bad_request(format!(
                    "[doc={id}] multiple values encountered for non multiValued field {name}"
                )));
            }
        }
        Ok(id)
    }
}

/// Solr dynamic-field patterns have a single leading or trailing `*`.
fn dynamic_match(pattern: &str, name: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        name.ends_with(suffix)
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        name.starts_with(prefix)
    } else {
        pattern == name
    }
}

fn bad_request(message: String) -> Error {
    Error::search_engine_status(400, message)
}

#[async_trait]
impl SearchEngine for MockSearchEngine {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn list_fields(&self) -> Result<Vec<SolrFieldDef>> {
        Ok(self.reachable()?.fields.values().cloned().collect())
    }

    async fn list_dynamic_fields(&self) -> Result<Vec<DynamicFieldDef>> {
        Ok(self.reachable()?.dynamic_fields.values().cloned().collect())
    }

    async fn list_copy_fields(&self) -> Result<Vec<CopyFieldDef>> {
        Ok(self.reachable()?.copy_fields.clone())
    }

    async fn update_schema(&self, commands: &SchemaCommands) -> Result<()> {
        let mut state = self.reachable()?;
        state.require_collection(&self.collection)?;
        state.schema_requests += 1;

        // Solr rejects the whole request when one command fails.
        let mut staged = MockState {
            fields: state.fields.clone(),
            dynamic_fields: state.dynamic_fields.clone(),
            copy_fields: state.copy_fields.clone(),
            ..Default::default()
        };
        staged.apply(commands)?;
        state.fields = staged.fields;
        state.dynamic_fields = staged.dynamic_fields;
        state.copy_fields = staged.copy_fields;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.reachable()?.collections.iter().cloned().collect())
    }

    async fn create_collection(&self, name: &str, _options: &CollectionOptions) -> Result<()> {
        let mut state = self.reachable()?;
        if !state.collections.insert(name.to_string()) {
            return Err(bad_request(format!("collection '{name}' already exists")));
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut state = self.reachable()?;
        state.require_collection(name)?;
        state.collections.remove(name);
        if name == self.collection {
            state.documents.clear();
            state.copy_fields.clear();
            state.dynamic_fields.clear();
            state.fields.retain(|name, _| crate::types::is_protected_field(name));
        }
        Ok(())
    }

    async fn add_documents(&self, docs: &[String], _commit_within: Duration) -> Result<()> {
        let mut state = self.reachable()?;
        state.upload_attempts += 1;
        state.require_collection(&self.collection)?;
        if state.fail_uploads {
            return Err(Error::search_engine_status(500, "upload rejected"));
        }

        let mut keyed = Vec::with_capacity(docs.len());
        for doc in docs {
            keyed.push((state.check_document(doc)?, doc.clone()));
        }
        state.documents.extend(keyed);
        state.uploaded_batches.push(docs.to_vec());
        Ok(())
    }

    async fn delete_documents(&self, ids: &[String], _commit_within: Duration) -> Result<()> {
        let mut state = self.reachable()?;
        state.require_collection(&self.collection)?;
        for id in ids {
            state.documents.remove(id);
        }
        Ok(())
    }

    async fn delete_all_documents(&self, _commit_within: Duration) -> Result<()> {
        let mut state = self.reachable()?;
        state.require_collection(&self.collection)?;
        state.documents.clear();
        Ok(())
    }

    async fn cluster_status(&self) -> Result<ClusterStatus> {
        let state = self.reachable()?;
        state.require_collection(&self.collection)?;
        Ok(ClusterStatus {
            collection: self.collection.clone(),
            health: Some("GREEN".to_string()),
            shards: vec![ShardStatus {
                name: "shard1".to_string(),
                state: "active".to_string(),
                health: Some("GREEN".to_string()),
                replicas: vec![ReplicaStatus {
                    name: "core_node1".to_string(),
                    core: format!("{}_shard1_replica_n1", self.collection),
                    node_name: "localhost:8983_solr".to_string(),
                    state: "active".to_string(),
                    leader: true,
                }],
            }],
        })
    }

    async fn query(&self, _request: &Value) -> Result<Value> {
        let state = self.reachable()?;
        state.require_collection(&self.collection)?;
        Ok(json!({
            "responseHeader": { "status": 0 },
            "response": { "numFound": state.documents.len(), "start": 0, "docs": [] }
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
