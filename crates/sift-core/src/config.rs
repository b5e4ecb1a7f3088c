//! Indexer configuration.
//!
//! Every setting has a default so a partial TOML document (or none at all)
//! yields a usable configuration.
//!
//! ```toml
//! collection = "catalog"
//! batch_size = 500
//! languages = ["en", "de"]
//!
//! [solr]
//! base_url = "http://solr:8983/solr"
//!
//! [projection]
//! item_table = "item_latest"
//! ```

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static SQL_TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

/// Returns `true` if `name` is a plain, optionally schema-qualified SQL
/// table name.
pub fn is_sql_table_name(name: &str) -> bool {
    SQL_TABLE_NAME.is_match(name)
}

/// Top-level indexer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Search-engine collection holding the index.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Lock resource serializing all index jobs.
    #[serde(default = "default_lock_resource")]
    pub lock_resource: String,

    /// Number of documents per upload batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Commit-within window passed with every update, in milliseconds.
    #[serde(default = "default_commit_within_ms")]
    pub commit_within_ms: u64,

    /// Separator between link field and target field in linked field names.
    #[serde(default = "default_link_separator")]
    pub link_separator: String,

    /// Languages that get dedicated per-language text fields.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Search-engine connection settings.
    #[serde(default)]
    pub solr: SolrConfig,

    /// Relational projection settings.
    #[serde(default)]
    pub projection: ProjectionConfig,
}

/// Search-engine connection and collection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolrConfig {
    /// Base URL of the Solr API, e.g. `http://localhost:8983/solr`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Shards of a newly created collection.
    #[serde(default = "default_one")]
    pub num_shards: u32,

    /// Replicas per shard of a newly created collection.
    #[serde(default = "default_one")]
    pub replication_factor: u32,

    /// Config set a new collection is created from.
    #[serde(default = "default_config_set")]
    pub config_set: String,
}

/// Names of the relational objects the projection reads from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Latest-version item view.
    #[serde(default = "default_item_table")]
    pub item_table: String,

    /// Item-value table.
    #[serde(default = "default_value_table")]
    pub value_table: String,
}

fn default_collection() -> String {
    "catalog".to_string()
}

fn default_lock_resource() -> String {
    "index".to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_commit_within_ms() -> u64 {
    10_000
}

fn default_link_separator() -> String {
    "__".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string(), "de".to_string()]
}

fn default_base_url() -> String {
    "http://localhost:8983/solr".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_one() -> u32 {
    1
}

fn default_config_set() -> String {
    "_default".to_string()
}

fn default_item_table() -> String {
    "item_latest".to_string()
}

fn default_value_table() -> String {
    "item_value".to_string()
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            lock_resource: default_lock_resource(),
            batch_size: default_batch_size(),
            commit_within_ms: default_commit_within_ms(),
            link_separator: default_link_separator(),
            languages: default_languages(),
            solr: SolrConfig::default(),
            projection: ProjectionConfig::default(),
        }
    }
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            num_shards: default_one(),
            replication_factor: default_one(),
            config_set: default_config_set(),
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            item_table: default_item_table(),
            value_table: default_value_table(),
        }
    }
}

impl IndexerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check settings that have no usable value.
    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(Error::config("collection name must not be empty"));
        }
        if self.lock_resource.trim().is_empty() {
            return Err(Error::config("lock resource must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        if self.link_separator.is_empty() {
            return Err(Error::config("link_separator must not be empty"));
        }
        for table in [&self.projection.item_table, &self.projection.value_table] {
            if !is_sql_table_name(table) {
                return Err(Error::config(format!(
                    "'{table}' is not a valid table name"
                )));
            }
        }
        Ok(())
    }

    /// Commit-within window as a duration.
    pub fn commit_within(&self) -> Duration {
        Duration::from_millis(self.commit_within_ms)
    }
}

impl SolrConfig {
    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_indexer_config_default() {
        let config = IndexerConfig::default();
        assert_eq!(config.collection, "catalog");
        assert_eq!(config.lock_resource, "index");
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.commit_within(), Duration::from_secs(10));
        assert_eq!(config.link_separator, "__");
        assert_eq!(config.solr.base_url, "http://localhost:8983/solr");
        assert_eq!(config.projection.item_table, "item_latest");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_with_defaults() {
        let config = IndexerConfig::from_toml_str(
            r#"
            collection = "works"
            batch_size = 50

            [solr]
            base_url = "http://solr:8983/solr"
            "#,
        )
        .unwrap();

        assert_eq!(config.collection, "works");
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.solr.base_url, "http://solr:8983/solr");
        assert_eq!(config.solr.num_shards, 1);
        assert_eq!(config.projection.value_table, "item_value");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = IndexerConfig::from_toml_str("").unwrap();
        assert_eq!(config, IndexerConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let err = IndexerConfig::from_toml_str("batch_size = 0").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_validate_rejects_bad_table_name() {
        let config = IndexerConfig {
            projection: ProjectionConfig {
                item_table: "items; DROP TABLE items".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_schema_qualified_table() {
        let config = IndexerConfig {
            projection: ProjectionConfig {
                item_table: "catalog.item_latest".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "collection = \"from-file\"").unwrap();

        let config = IndexerConfig::load(file.path()).unwrap();
        assert_eq!(config.collection, "from-file");
    }

    #[test]
    fn test_load_missing_file() {
        let result = IndexerConfig::load(Path::new("/nonexistent/sift.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
