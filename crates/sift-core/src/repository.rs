//! Read-only access to the catalog configuration.
//!
//! The indexing engine reads fields, search-config elements, and focal
//! entity types through these traits. [`StaticCatalog`] serves them from
//! memory; [`CachedFieldRepository`] memoizes any field repository until a
//! configuration change purges it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::{FieldDef, FieldSet, SearchConfigElement};

/// Source of configured field definitions.
#[async_trait]
pub trait FieldRepository: Send + Sync {
    /// All fields, including pre-defined and linked fields.
    async fn list_field_defs(&self) -> Result<FieldSet>;

    /// Look up one field by name.
    async fn get_field_def_by_name(&self, name: &str) -> Result<Option<FieldDef>> {
        Ok(self.list_field_defs().await?.get(name).cloned())
    }

    /// All fields of one kind.
    async fn get_field_defs_by_kind(&self, kind: &str) -> Result<Vec<FieldDef>> {
        Ok(self
            .list_field_defs()
            .await?
            .by_kind(kind)
            .cloned()
            .collect())
    }

    /// Drop any cached state so the next read sees fresh configuration.
    async fn purge(&self) {}
}

/// Source of search-config elements.
#[async_trait]
pub trait SearchConfigRepository: Send + Sync {
    /// All elements, in configuration order.
    async fn list_search_configs(&self) -> Result<Vec<SearchConfigElement>>;
}

/// Source of the entity types that are directly search-indexable.
#[async_trait]
pub trait EntityTypeRepository: Send + Sync {
    /// Names of the focal entity types.
    async fn list_focal_entity_types(&self) -> Result<Vec<String>>;
}

#[async_trait]
impl<T: FieldRepository + ?Sized> FieldRepository for Arc<T> {
    async fn list_field_defs(&self) -> Result<FieldSet> {
        (**self).list_field_defs().await
    }

    async fn get_field_def_by_name(&self, name: &str) -> Result<Option<FieldDef>> {
        (**self).get_field_def_by_name(name).await
    }

    async fn get_field_defs_by_kind(&self, kind: &str) -> Result<Vec<FieldDef>> {
        (**self).get_field_defs_by_kind(kind).await
    }

    async fn purge(&self) {
        (**self).purge().await
    }
}

// ============================================================================
// StaticCatalog
// ============================================================================

#[derive(Debug, Clone, Default)]
struct CatalogSnapshot {
    fields: Vec<FieldDef>,
    search_configs: Vec<SearchConfigElement>,
    focal_entities: Vec<String>,
}

/// In-memory catalog configuration.
///
/// Holds user fields (pre-defined fields are added on read), search-config
/// elements, and focal entity types. The snapshot can be swapped at runtime
/// to model a configuration change.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    snapshot: RwLock<CatalogSnapshot>,
}

impl StaticCatalog {
    /// Create a catalog from its parts.
    pub fn new(
        fields: Vec<FieldDef>,
        search_configs: Vec<SearchConfigElement>,
        focal_entities: Vec<String>,
    ) -> Self {
        Self {
            snapshot: RwLock::new(CatalogSnapshot {
                fields,
                search_configs,
                focal_entities,
            }),
        }
    }

    /// Replace the configured user fields.
    pub async fn replace_fields(&self, fields: Vec<FieldDef>) {
        self.snapshot.write().await.fields = fields;
    }

    /// Replace the search-config elements.
    pub async fn replace_search_configs(&self, search_configs: Vec<SearchConfigElement>) {
        self.snapshot.write().await.search_configs = search_configs;
    }
}

#[async_trait]
impl FieldRepository for StaticCatalog {
    async fn list_field_defs(&self) -> Result<FieldSet> {
        FieldSet::with_predefined(self.snapshot.read().await.fields.clone())
    }
}

#[async_trait]
impl SearchConfigRepository for StaticCatalog {
    async fn list_search_configs(&self) -> Result<Vec<SearchConfigElement>> {
        Ok(self.snapshot.read().await.search_configs.clone())
    }
}

#[async_trait]
impl EntityTypeRepository for StaticCatalog {
    async fn list_focal_entity_types(&self) -> Result<Vec<String>> {
        Ok(self.snapshot.read().await.focal_entities.clone())
    }
}

// ============================================================================
// CachedFieldRepository
// ============================================================================

/// Memoizing wrapper around a field repository.
///
/// The first read loads the field set from the wrapped repository; later
/// reads return the cached copy until [`FieldRepository::purge`] is called.
pub struct CachedFieldRepository<R> {
    inner: R,
    cache: RwLock<Option<FieldSet>>,
}

impl<R: FieldRepository> CachedFieldRepository<R> {
    /// Wrap a repository.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(None),
        }
    }

    /// The wrapped repository.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: FieldRepository> FieldRepository for CachedFieldRepository<R> {
    async fn list_field_defs(&self) -> Result<FieldSet> {
        if let Some(fields) = self.cache.read().await.as_ref() {
            return Ok(fields.clone());
        }

        let mut cache = self.cache.write().await;
        if let Some(fields) = cache.as_ref() {
            return Ok(fields.clone());
        }
        let fields = self.inner.list_field_defs().await?;
        *cache = Some(fields.clone());
        Ok(fields)
    }

    async fn purge(&self) {
        tracing::debug!("purging cached field definitions");
        *self.cache.write().await = None;
        self.inner.purge().await;
    }
}

impl<R> std::fmt::Debug for CachedFieldRepository<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFieldRepository").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
