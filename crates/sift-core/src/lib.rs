//! Sift Core: shared types, errors, configuration, and repository traits.
//!
//! This crate provides the foundational types used across all Sift crates.
//! It has no internal Sift dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy and Result alias
//! - [`model`]: Field definitions, search-config elements, item-value rows
//! - [`config`]: Indexer configuration loaded from TOML
//! - [`repository`]: Catalog configuration access (fields, search configs,
//!   focal entity types)

pub mod config;
pub mod error;
pub mod model;
pub mod repository;

// Re-export key types at crate root for convenience
pub use config::{IndexerConfig, ProjectionConfig, SolrConfig};
pub use error::{Error, ErrorClass, Result};
pub use model::{FieldDef, FieldSet, HierarchyLink, ItemValueRow, SearchConfigElement};
pub use repository::{
    CachedFieldRepository, EntityTypeRepository, FieldRepository, SearchConfigRepository,
    StaticCatalog,
};
