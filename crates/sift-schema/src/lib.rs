//! Search-engine schema generation for Sift.
//!
//! Configured fields map onto backing fields through per-kind hooks
//! ([`kinds`]); search-config elements add shared fields and copy rules
//! through per-type hooks ([`search_config`]). [`generate_solr_schema`]
//! combines both into one [`SchemaUpdates`], and [`manage`] applies it to a
//! live collection.

pub mod category;
pub mod generator;
pub mod kinds;
pub mod manage;
mod proptests;
pub mod search_config;

pub use category::Category;
pub use generator::{SchemaGenerator, SchemaUpdates, generate_solr_schema};
pub use kinds::{BackingFields, FieldKindHook, FieldKindRegistry};
pub use manage::{apply_schema, clear_schema, rebuild_schema};
pub use search_config::{
    ElementBacking, FieldWiring, SearchConfigTypeHook, SearchConfigTypeRegistry, WiredField,
};
