//! Solr schema, collection, and cluster types.

use serde::{Deserialize, Deserializer, Serialize};

/// Field types Sift's backing fields are declared with.
///
/// The collection's config set must define these types.
pub mod field_types {
    /// Unanalyzed string.
    pub const STRING: &str = "string";
    /// Standard tokenized text.
    pub const TEXT_GENERAL: &str = "text_general";
    /// Edge-ngram text for prefix matching.
    pub const TEXT_PREFIX: &str = "text_prefix";
    /// Keyword-tokenized, lowercased, ASCII-folded text.
    pub const TEXT_NORMALIZED: &str = "text_normalized";
    /// Point date.
    pub const PDATE: &str = "pdate";
    /// Point double.
    pub const PDOUBLE: &str = "pdouble";
    /// Boolean.
    pub const BOOLEAN: &str = "boolean";

    /// Language-specific text type, e.g. `text_en`.
    pub fn text_lang(language: &str) -> String {
        format!("text_{language}")
    }
}

/// Fields owned by Solr itself; never generated, never removed.
pub const PROTECTED_FIELDS: &[&str] = &["id", "_version_", "_root_", "_nest_path_", "_text_"];

/// Returns `true` if `name` is a protected field.
pub fn is_protected_field(name: &str) -> bool {
    PROTECTED_FIELDS.contains(&name)
}

/// One field in the search engine's schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolrFieldDef {
    /// Field name (or glob pattern for dynamic fields).
    pub name: String,
    /// Solr field type name.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Whether the original value is stored.
    #[serde(default)]
    pub stored: bool,
    /// Whether the field is searchable.
    #[serde(default)]
    pub indexed: bool,
    /// Whether the field holds several values.
    #[serde(default)]
    pub multi_valued: bool,
    /// Whether column-oriented doc values are kept (facets, sorting).
    #[serde(default)]
    pub doc_values: bool,
}

impl SolrFieldDef {
    /// Create a stored, indexed, single-valued field.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            stored: true,
            indexed: true,
            multi_valued: false,
            doc_values: false,
        }
    }

    /// Set the multi-valued flag.
    pub fn multi_valued(mut self, multi_valued: bool) -> Self {
        self.multi_valued = multi_valued;
        self
    }

    /// Enable doc values.
    pub fn doc_values(mut self) -> Self {
        self.doc_values = true;
        self
    }

    /// Do not store the original value.
    pub fn not_stored(mut self) -> Self {
        self.stored = false;
        self
    }
}

/// Dynamic fields share the shape of regular fields; `name` is a pattern.
pub type DynamicFieldDef = SolrFieldDef;

/// A copy-on-index rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CopyFieldDef {
    /// Source field name.
    pub source: String,
    /// Destination field names.
    #[serde(rename = "dest", deserialize_with = "one_or_many")]
    pub destinations: Vec<String>,
}

impl CopyFieldDef {
    /// Create a rule copying `source` into `destinations`.
    pub fn new<S, I, D>(source: S, destinations: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        Self {
            source: source.into(),
            destinations: destinations.into_iter().map(Into::into).collect(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(dest) => vec![dest],
        OneOrMany::Many(dests) => dests,
    })
}

/// Reference to a field by name, used by delete commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    /// Field name or pattern.
    pub name: String,
}

/// One Schema API request.
///
/// Commands execute in declaration order: copy-field and field deletions
/// first, additions last, so a single request can clear and rebuild.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaCommands {
    /// Copy-field rules to remove.
    #[serde(rename = "delete-copy-field", skip_serializing_if = "Vec::is_empty")]
    pub delete_copy_fields: Vec<CopyFieldDef>,
    /// Dynamic fields to remove.
    #[serde(rename = "delete-dynamic-field", skip_serializing_if = "Vec::is_empty")]
    pub delete_dynamic_fields: Vec<NameRef>,
    /// Fields to remove.
    #[serde(rename = "delete-field", skip_serializing_if = "Vec::is_empty")]
    pub delete_fields: Vec<NameRef>,
    /// Fields to add.
    #[serde(rename = "add-field", skip_serializing_if = "Vec::is_empty")]
    pub add_fields: Vec<SolrFieldDef>,
    /// Dynamic fields to add.
    #[serde(rename = "add-dynamic-field", skip_serializing_if = "Vec::is_empty")]
    pub add_dynamic_fields: Vec<DynamicFieldDef>,
    /// Copy-field rules to add.
    #[serde(rename = "add-copy-field", skip_serializing_if = "Vec::is_empty")]
    pub add_copy_fields: Vec<CopyFieldDef>,
}

impl SchemaCommands {
    /// Returns `true` if the request would do nothing.
    pub fn is_empty(&self) -> bool {
        self.delete_copy_fields.is_empty()
            && self.delete_dynamic_fields.is_empty()
            && self.delete_fields.is_empty()
            && self.add_fields.is_empty()
            && self.add_dynamic_fields.is_empty()
            && self.add_copy_fields.is_empty()
    }
}

/// Settings for a newly created collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Number of shards.
    pub num_shards: u32,
    /// Replicas per shard.
    pub replication_factor: u32,
    /// Config set to create the collection from.
    pub config_set: String,
}

impl From<&sift_core::SolrConfig> for CollectionOptions {
    fn from(config: &sift_core::SolrConfig) -> Self {
        Self {
            num_shards: config.num_shards,
            replication_factor: config.replication_factor,
            config_set: config.config_set.clone(),
        }
    }
}

/// Health of one collection as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    /// Collection name.
    pub collection: String,
    /// Collection health (`GREEN`, `YELLOW`, `ORANGE`, `RED`), if reported.
    pub health: Option<String>,
    /// Per-shard state.
    pub shards: Vec<ShardStatus>,
}

/// State of one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStatus {
    /// Shard name.
    pub name: String,
    /// Shard state, e.g. `active`.
    pub state: String,
    /// Shard health, if reported.
    pub health: Option<String>,
    /// Replicas of the shard.
    pub replicas: Vec<ReplicaStatus>,
}

/// State of one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaStatus {
    /// Replica (core node) name.
    pub name: String,
    /// Core name.
    pub core: String,
    /// Node hosting the replica.
    pub node_name: String,
    /// Replica state, e.g. `active` or `down`.
    pub state: String,
    /// Whether the replica leads its shard.
    pub leader: bool,
}

// ============================================================================
// Tests
// ============================================================================
