//! Field-kind hooks.
//!
//! A [`FieldKindHook`] knows how one field kind maps onto search-engine
//! backing fields and how a value of that kind renders into `<field>` tags.
//! Hooks are looked up by kind key in a [`FieldKindRegistry`], so new kinds
//! can be added without touching the schema generator or the indexer.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use sift_core::model::kinds;
use sift_core::{Error, FieldDef, ItemValueRow, Result};
use sift_solr::xml::field_tag;
use sift_solr::{SolrFieldDef, field_types};

use crate::category::Category;

/// Backing fields of one configured field, keyed by category.
pub type BackingFields = BTreeMap<Category, SolrFieldDef>;

/// Behaviour of one field kind.
pub trait FieldKindHook: Send + Sync {
    /// Kind key this hook handles.
    fn kind(&self) -> &str;

    /// Structural checks on a field definition of this kind.
    fn validate(&self, _field: &FieldDef) -> Result<()> {
        Ok(())
    }

    /// Backing fields for `field`, keyed by category.
    fn solr_fields(&self, field: &FieldDef) -> Result<BackingFields>;

    /// Render one value of `field` into `<field>` tags.
    ///
    /// Failures are [`Error::DocumentBuild`] errors for the row's item.
    fn field_tags(&self, field: &FieldDef, row: &ItemValueRow) -> Result<Vec<String>>;

    /// Drop memoized state; called before every reindex run.
    fn reset_caches(&self) {}
}

fn tags_for(field: &FieldDef, categories: &[Category], value: &str) -> Vec<String> {
    categories
        .iter()
        .map(|category| field_tag(&category.backing_name(&field.name), value))
        .collect()
}

fn sort_def(field: &FieldDef, field_type: &str) -> SolrFieldDef {
    SolrFieldDef::new(Category::Sort.backing_name(&field.name), field_type)
        .doc_values()
        .not_stored()
}

// ============================================================================
// Built-in hooks
// ============================================================================

/// Short string values: codes, names, identifiers.
#[derive(Debug, Default)]
pub struct StringHook;

impl StringHook {
    fn categories(field: &FieldDef) -> Vec<Category> {
        let mut categories = vec![
            Category::Raw,
            Category::Normalized,
            Category::Prefix,
            Category::Generic,
            Category::Facet,
        ];
        if !field.multi_valued {
            categories.push(Category::Sort);
        }
        categories
    }
}

impl FieldKindHook for StringHook {
    fn kind(&self) -> &str {
        kinds::STRING
    }

    fn solr_fields(&self, field: &FieldDef) -> Result<BackingFields> {
        let multi = field.multi_valued;
        let name = |c: &Category| c.backing_name(&field.name);
        let mut backing = BackingFields::new();
        for category in Self::categories(field) {
            let def = match category {
                Category::Raw => SolrFieldDef::new(name(&category), field_types::STRING),
                Category::Normalized => {
                    SolrFieldDef::new(name(&category), field_types::TEXT_NORMALIZED).not_stored()
                }
                Category::Prefix => {
                    SolrFieldDef::new(name(&category), field_types::TEXT_PREFIX).not_stored()
                }
                Category::Generic => {
                    SolrFieldDef::new(name(&category), field_types::TEXT_GENERAL).not_stored()
                }
                Category::Facet => SolrFieldDef::new(name(&category), field_types::STRING)
                    .doc_values()
                    .not_stored(),
                _ => sort_def(field, field_types::STRING),
            };
            let def = if category == Category::Sort {
                def
            } else {
                def.multi_valued(multi)
            };
            backing.insert(category, def);
        }
        Ok(backing)
    }

    fn field_tags(&self, field: &FieldDef, row: &ItemValueRow) -> Result<Vec<String>> {
        Ok(tags_for(field, &Self::categories(field), &row.field_value))
    }
}

/// Free text, optionally language-tagged.
#[derive(Debug, Default)]
pub struct TextHook {
    languages: Vec<String>,
}

impl TextHook {
    /// Create a hook producing per-language fields for `languages`.
    pub fn new(languages: Vec<String>) -> Self {
        Self { languages }
    }
}

impl FieldKindHook for TextHook {
    fn kind(&self) -> &str {
        kinds::TEXT
    }

    fn solr_fields(&self, field: &FieldDef) -> Result<BackingFields> {
        let multi = field.multi_valued;
        let mut backing = BackingFields::new();
        backing.insert(
            Category::Generic,
            SolrFieldDef::new(
                Category::Generic.backing_name(&field.name),
                field_types::TEXT_GENERAL,
            )
            .multi_valued(multi),
        );
        backing.insert(
            Category::Prefix,
            SolrFieldDef::new(
                Category::Prefix.backing_name(&field.name),
                field_types::TEXT_PREFIX,
            )
            .multi_valued(multi)
            .not_stored(),
        );
        for lang in &self.languages {
            let category = Category::Lang(lang.clone());
            let def = SolrFieldDef::new(
                category.backing_name(&field.name),
                field_types::text_lang(lang),
            )
            .multi_valued(multi)
            .not_stored();
            backing.insert(category, def);
        }
        Ok(backing)
    }

    fn field_tags(&self, field: &FieldDef, row: &ItemValueRow) -> Result<Vec<String>> {
        let mut categories = vec![Category::Generic, Category::Prefix];
        if let Some(lang) = row.language.as_deref() {
            if self.languages.iter().any(|l| l == lang) {
                categories.push(Category::Lang(lang.to_string()));
            }
        }
        Ok(tags_for(field, &categories, &row.field_value))
    }
}

/// RFC 3339 timestamps.
#[derive(Debug, Default)]
pub struct DateTimeHook;

impl FieldKindHook for DateTimeHook {
    fn kind(&self) -> &str {
        kinds::DATETIME
    }

    fn solr_fields(&self, field: &FieldDef) -> Result<BackingFields> {
        let mut backing = BackingFields::new();
        backing.insert(
            Category::Raw,
            SolrFieldDef::new(Category::Raw.backing_name(&field.name), field_types::PDATE)
                .multi_valued(field.multi_valued)
                .doc_values(),
        );
        if !field.multi_valued {
            backing.insert(Category::Sort, sort_def(field, field_types::PDATE));
        }
        Ok(backing)
    }

    fn field_tags(&self, field: &FieldDef, row: &ItemValueRow) -> Result<Vec<String>> {
        chrono::DateTime::parse_from_rfc3339(&row.field_value).map_err(|e| {
            Error::document_build(
                &row.item_id,
                format!(
                    "field '{}': '{}' is not an RFC 3339 timestamp: {e}",
                    field.name, row.field_value
                ),
            )
        })?;
        let mut categories = vec![Category::Raw];
        if !field.multi_valued {
            categories.push(Category::Sort);
        }
        Ok(tags_for(field, &categories, &row.field_value))
    }
}

/// Numeric values.
#[derive(Debug, Default)]
pub struct NumberHook;

impl FieldKindHook for NumberHook {
    fn kind(&self) -> &str {
        kinds::NUMBER
    }

    fn solr_fields(&self, field: &FieldDef) -> Result<BackingFields> {
        let mut backing = BackingFields::new();
        backing.insert(
            Category::Raw,
            SolrFieldDef::new(Category::Raw.backing_name(&field.name), field_types::PDOUBLE)
                .multi_valued(field.multi_valued)
                .doc_values(),
        );
        if !field.multi_valued {
            backing.insert(Category::Sort, sort_def(field, field_types::PDOUBLE));
        }
        Ok(backing)
    }

    fn field_tags(&self, field: &FieldDef, row: &ItemValueRow) -> Result<Vec<String>> {
        let value = row.field_value.trim();
        value.parse::<f64>().map_err(|_| {
            Error::document_build(
                &row.item_id,
                format!("field '{}': '{}' is not a number", field.name, value),
            )
        })?;
        let mut categories = vec![Category::Raw];
        if !field.multi_valued {
            categories.push(Category::Sort);
        }
        Ok(tags_for(field, &categories, value))
    }
}

/// `true` / `false`.
#[derive(Debug, Default)]
pub struct BooleanHook;

impl FieldKindHook for BooleanHook {
    fn kind(&self) -> &str {
        kinds::BOOLEAN
    }

    fn solr_fields(&self, field: &FieldDef) -> Result<BackingFields> {
        let mut backing = BackingFields::new();
        backing.insert(
            Category::Raw,
            SolrFieldDef::new(Category::Raw.backing_name(&field.name), field_types::BOOLEAN)
                .multi_valued(field.multi_valued),
        );
        backing.insert(
            Category::Facet,
            SolrFieldDef::new(
                Category::Facet.backing_name(&field.name),
                field_types::BOOLEAN,
            )
            .multi_valued(field.multi_valued)
            .doc_values()
            .not_stored(),
        );
        Ok(backing)
    }

    fn field_tags(&self, field: &FieldDef, row: &ItemValueRow) -> Result<Vec<String>> {
        let value = row.field_value.trim().to_ascii_lowercase();
        if value != "true" && value != "false" {
            return Err(Error::document_build(
                &row.item_id,
                format!(
                    "field '{}': '{}' is not a boolean",
                    field.name, row.field_value
                ),
            ));
        }
        Ok(tags_for(field, &[Category::Raw, Category::Facet], &value))
    }
}

/// Reference to another item by business id.
#[derive(Debug, Default)]
pub struct LinkHook;

impl FieldKindHook for LinkHook {
    fn kind(&self) -> &str {
        kinds::LINK
    }

    fn solr_fields(&self, field: &FieldDef) -> Result<BackingFields> {
        let mut backing = BackingFields::new();
        backing.insert(
            Category::Raw,
            SolrFieldDef::new(Category::Raw.backing_name(&field.name), field_types::STRING)
                .multi_valued(field.multi_valued),
        );
        Ok(backing)
    }

    fn field_tags(&self, field: &FieldDef, row: &ItemValueRow) -> Result<Vec<String>> {
        Ok(tags_for(field, &[Category::Raw], &row.field_value))
    }
}

/// Reference to a code in a hierarchical code system.
///
/// Codes are dot-separated paths. The facet receives the code and every
/// ancestor path, so faceting on `A` counts items coded `A.B.C`.
#[derive(Debug, Default)]
pub struct HierarchyHook {
    ancestors: Mutex<HashMap<String, Vec<String>>>,
}

impl HierarchyHook {
    /// Ancestor paths of `code`, including the code itself.
    pub fn ancestor_paths(&self, code: &str) -> Vec<String> {
        let mut cache = self.ancestors.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .entry(code.to_string())
            .or_insert_with(|| expand_ancestors(code))
            .clone()
    }

    /// Number of memoized codes.
    pub fn cached_codes(&self) -> usize {
        self.ancestors.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn expand_ancestors(code: &str) -> Vec<String> {
    let mut paths: Vec<String> = code
        .match_indices('.')
        .map(|(idx, _)| &code[..idx])
        .filter(|prefix| !prefix.is_empty() && !prefix.ends_with('.'))
        .map(String::from)
        .collect();
    paths.push(code.to_string());
    paths
}

impl FieldKindHook for HierarchyHook {
    fn kind(&self) -> &str {
        kinds::HIERARCHY
    }

    fn validate(&self, field: &FieldDef) -> Result<()> {
        if field.hierarchy.is_none() && !field.is_linked {
            return Err(Error::config(format!(
                "hierarchy field '{}' has no link configuration",
                field.name
            )));
        }
        Ok(())
    }

    fn solr_fields(&self, field: &FieldDef) -> Result<BackingFields> {
        let mut backing = BackingFields::new();
        backing.insert(
            Category::Raw,
            SolrFieldDef::new(Category::Raw.backing_name(&field.name), field_types::STRING)
                .multi_valued(field.multi_valued),
        );
        backing.insert(
            Category::Facet,
            SolrFieldDef::new(Category::Facet.backing_name(&field.name), field_types::STRING)
                .multi_valued(true)
                .doc_values()
                .not_stored(),
        );
        Ok(backing)
    }

    fn field_tags(&self, field: &FieldDef, row: &ItemValueRow) -> Result<Vec<String>> {
        let code = row.field_value.as_str();
        let facet = Category::Facet.backing_name(&field.name);
        let mut tags = tags_for(field, &[Category::Raw], code);
        tags.extend(
            self.ancestor_paths(code)
                .iter()
                .map(|path| field_tag(&facet, path)),
        );
        Ok(tags)
    }

    fn reset_caches(&self) {
        self.ancestors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Field-kind hooks keyed by kind.
#[derive(Clone, Default)]
pub struct FieldKindRegistry {
    hooks: BTreeMap<String, Arc<dyn FieldKindHook>>,
}

impl FieldKindRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in kind.
    ///
    /// `languages` selects the per-language text fields of `text` fields.
    pub fn builtin(languages: &[String]) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(StringHook));
        registry.register(Arc::new(TextHook::new(languages.to_vec())));
        registry.register(Arc::new(DateTimeHook));
        registry.register(Arc::new(NumberHook));
        registry.register(Arc::new(BooleanHook));
        registry.register(Arc::new(LinkHook));
        registry.register(Arc::new(HierarchyHook::default()));
        registry
    }

    /// Register a hook, replacing any hook for the same kind.
    pub fn register(&mut self, hook: Arc<dyn FieldKindHook>) {
        self.hooks.insert(hook.kind().to_string(), hook);
    }

    /// Hook for a kind, if registered.
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn FieldKindHook>> {
        self.hooks.get(kind)
    }

    /// Hook for a field's kind; a missing hook is a configuration error.
    pub fn hook_for(&self, field: &FieldDef) -> Result<&dyn FieldKindHook> {
        self.hooks.get(&field.kind).map(|h| h.as_ref()).ok_or_else(|| {
            Error::config(format!(
                "no hook registered for kind '{}' of field '{}'",
                field.kind, field.name
            ))
        })
    }

    /// Registered kind keys, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(String::as_str)
    }

    /// Reset the caches of every hook.
    pub fn reset_caches(&self) {
        for hook in self.hooks.values() {
            hook.reset_caches();
        }
    }
}

impl std::fmt::Debug for FieldKindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldKindRegistry")
            .field("kinds", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
