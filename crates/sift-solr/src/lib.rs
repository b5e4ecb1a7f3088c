//! Solr search-engine access for Sift.
//!
//! - [`types`]: schema, collection, and cluster wire types
//! - [`xml`]: the XML update format documents are uploaded in
//! - [`engine`]: the [`SearchEngine`] trait the rest of Sift programs against
//! - [`client`]: [`SolrClient`], the HTTP implementation
//! - [`mock`]: [`MockSearchEngine`], an in-memory implementation for tests

pub mod client;
pub mod engine;
pub mod mock;
pub mod types;
pub mod xml;

pub use client::SolrClient;
pub use engine::{SearchEngine, document_count};
pub use mock::MockSearchEngine;
pub use types::{
    ClusterStatus, CollectionOptions, CopyFieldDef, DynamicFieldDef, NameRef, ReplicaStatus,
    SchemaCommands, ShardStatus, SolrFieldDef, field_types, is_protected_field,
};
