//! Search-config type hooks.
//!
//! Each search-config element type (search focus, ordinal axis, hierarchy
//! axis) is handled by a [`SearchConfigTypeHook`] that turns the element
//! and the [`FieldWiring`] of its member fields into extra backing fields
//! and copy-field rules.

use std::collections::BTreeMap;
use std::sync::Arc;

use sift_core::model::{kinds, linked_field_name, search_config_types};
use sift_core::{Error, FieldDef, Result, SearchConfigElement};
use sift_solr::{CopyFieldDef, SolrFieldDef, field_types};

use crate::category::Category;
use crate::kinds::BackingFields;

/// A configured field together with its generated backing fields.
#[derive(Debug, Clone)]
pub struct WiredField {
    /// The configured field.
    pub def: FieldDef,
    /// Its backing fields by category.
    pub backing: BackingFields,
}

impl WiredField {
    /// Name of the backing field for `category`, if the field has one.
    pub fn backing_name(&self, category: &Category) -> Option<&str> {
        self.backing.get(category).map(|d| d.name.as_str())
    }
}

/// Per-field mapping from category to backing field, for every field the
/// schema generator processed.
#[derive(Debug, Clone, Default)]
pub struct FieldWiring {
    fields: BTreeMap<String, WiredField>,
}

impl FieldWiring {
    /// Create an empty wiring map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the backing fields of one field.
    pub fn insert(&mut self, def: FieldDef, backing: BackingFields) {
        self.fields
            .insert(def.name.clone(), WiredField { def, backing });
    }

    /// Wiring of one field.
    pub fn get(&self, name: &str) -> Option<&WiredField> {
        self.fields.get(name)
    }

    /// Wiring of a member field of `element`; unknown names are errors.
    pub fn member(&self, element: &SearchConfigElement, name: &str) -> Result<&WiredField> {
        self.fields.get(name).ok_or_else(|| {
            Error::config(format!(
                "{} '{}' references unknown field '{}'",
                element.element_type, element.name, name
            ))
        })
    }

    /// Number of wired fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field is wired.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Backing fields and copy rules contributed by one search-config element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementBacking {
    /// Destination fields.
    pub fields: Vec<SolrFieldDef>,
    /// Copy rules into the destination fields.
    pub copy_fields: Vec<CopyFieldDef>,
}

/// Behaviour of one search-config element type.
pub trait SearchConfigTypeHook: Send + Sync {
    /// Element type key this hook handles.
    fn element_type(&self) -> &str;

    /// Backing fields and copy rules for `element`.
    fn backing_fields(
        &self,
        element: &SearchConfigElement,
        wiring: &FieldWiring,
    ) -> Result<ElementBacking>;
}

fn destination_type(category: &Category) -> String {
    match category {
        Category::Generic => field_types::TEXT_GENERAL.to_string(),
        Category::Lang(lang) => field_types::text_lang(lang),
        Category::Prefix => field_types::TEXT_PREFIX.to_string(),
        Category::Normalized => field_types::TEXT_NORMALIZED.to_string(),
        Category::Raw | Category::Facet | Category::Sort => field_types::STRING.to_string(),
    }
}

fn axis_field(axis: &str, suffix: &str) -> String {
    format!("axis_{axis}_{suffix}")
}

// ============================================================================
// Built-in hooks
// ============================================================================

/// Search focus: copies every member's searchable backing fields into one
/// shared `focus_<name>_<category>` field per category.
#[derive(Debug, Default)]
pub struct SearchFocusHook;

impl SearchConfigTypeHook for SearchFocusHook {
    fn element_type(&self) -> &str {
        search_config_types::SEARCH_FOCUS
    }

    fn backing_fields(
        &self,
        element: &SearchConfigElement,
        wiring: &FieldWiring,
    ) -> Result<ElementBacking> {
        let mut destinations: BTreeMap<Category, SolrFieldDef> = BTreeMap::new();
        let mut copy_fields = Vec::new();

        for name in &element.fields {
            let member = wiring.member(element, name)?;
            for (category, source) in &member.backing {
                if !category.is_searchable() {
                    continue;
                }
                let dest = destinations.entry(category.clone()).or_insert_with(|| {
                    SolrFieldDef::new(
                        format!("focus_{}_{}", element.name, category.suffix()),
                        destination_type(category),
                    )
                    .multi_valued(true)
                    .not_stored()
                });
                copy_fields.push(CopyFieldDef::new(&source.name, [dest.name.clone()]));
            }
        }

        Ok(ElementBacking {
            fields: destinations.into_values().collect(),
            copy_fields,
        })
    }
}

/// Ordinal axis: facet values of every member into `axis_<name>_facet`,
/// the sort key of the first sortable member into `axis_<name>_sort`.
#[derive(Debug, Default)]
pub struct OrdinalAxisHook;

impl OrdinalAxisHook {
    fn axis_backing(
        element: &SearchConfigElement,
        members: &[&WiredField],
    ) -> ElementBacking {
        let facet = SolrFieldDef::new(axis_field(&element.name, "facet"), field_types::STRING)
            .multi_valued(true)
            .doc_values()
            .not_stored();
        let mut backing = ElementBacking::default();

        for member in members {
            let source = member
                .backing_name(&Category::Facet)
                .or_else(|| member.backing_name(&Category::Raw));
            if let Some(source) = source {
                backing
                    .copy_fields
                    .push(CopyFieldDef::new(source, [facet.name.clone()]));
            }
        }
        backing.fields.push(facet);

        let first_sort = members
            .iter()
            .find_map(|m| m.backing.get(&Category::Sort));
        if let Some(sort_source) = first_sort {
            let sort = SolrFieldDef::new(
                axis_field(&element.name, "sort"),
                sort_source.field_type.clone(),
            )
            .doc_values()
            .not_stored();
            backing
                .copy_fields
                .push(CopyFieldDef::new(&sort_source.name, [sort.name.clone()]));
            backing.fields.push(sort);
        }
        backing
    }
}

impl SearchConfigTypeHook for OrdinalAxisHook {
    fn element_type(&self) -> &str {
        search_config_types::ORDINAL_AXIS
    }

    fn backing_fields(
        &self,
        element: &SearchConfigElement,
        wiring: &FieldWiring,
    ) -> Result<ElementBacking> {
        let members = element
            .fields
            .iter()
            .map(|name| wiring.member(element, name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::axis_backing(element, &members))
    }
}

/// Hierarchy axis: an ordinal axis over hierarchy fields, plus the linked
/// display labels of the codes into `axis_<name>_label`.
#[derive(Debug)]
pub struct HierarchyAxisHook {
    separator: String,
}

impl HierarchyAxisHook {
    /// Create a hook resolving linked display fields with `separator`.
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl SearchConfigTypeHook for HierarchyAxisHook {
    fn element_type(&self) -> &str {
        search_config_types::HIERARCHY_AXIS
    }

    fn backing_fields(
        &self,
        element: &SearchConfigElement,
        wiring: &FieldWiring,
    ) -> Result<ElementBacking> {
        let mut members = Vec::with_capacity(element.fields.len());
        for name in &element.fields {
            let member = wiring.member(element, name)?;
            if member.def.kind != kinds::HIERARCHY {
                return Err(Error::config(format!(
                    "hierarchy axis '{}' member '{}' is of kind '{}', not hierarchy",
                    element.name, name, member.def.kind
                )));
            }
            members.push(member);
        }

        let mut backing = OrdinalAxisHook::axis_backing(element, &members);

        let label_sources: Vec<&str> = members
            .iter()
            .filter_map(|m| m.def.hierarchy.as_ref())
            .map(|link| linked_field_name(&link.link_field, &link.display_field, &self.separator))
            .filter_map(|name| wiring.get(&name))
            .filter_map(|linked| linked.backing_name(&Category::Raw))
            .collect();

        if !label_sources.is_empty() {
            let label = SolrFieldDef::new(axis_field(&element.name, "label"), field_types::STRING)
                .multi_valued(true);
            for source in label_sources {
                if backing
                    .copy_fields
                    .iter()
                    .any(|c| c.source == source && c.destinations.contains(&label.name))
                {
                    continue;
                }
                backing
                    .copy_fields
                    .push(CopyFieldDef::new(source, [label.name.clone()]));
            }
            backing.fields.push(label);
        }
        Ok(backing)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Search-config type hooks keyed by element type.
#[derive(Clone, Default)]
pub struct SearchConfigTypeRegistry {
    hooks: BTreeMap<String, Arc<dyn SearchConfigTypeHook>>,
}

impl SearchConfigTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the three built-in element types.
    pub fn builtin(separator: &str) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchFocusHook));
        registry.register(Arc::new(OrdinalAxisHook));
        registry.register(Arc::new(HierarchyAxisHook::new(separator)));
        registry
    }

    /// Register a hook, replacing any hook for the same type.
    pub fn register(&mut self, hook: Arc<dyn SearchConfigTypeHook>) {
        self.hooks.insert(hook.element_type().to_string(), hook);
    }

    /// Hook for an element; an unknown type is a configuration error.
    pub fn hook_for(&self, element: &SearchConfigElement) -> Result<&dyn SearchConfigTypeHook> {
        self.hooks
            .get(&element.element_type)
            .map(|h| h.as_ref())
            .ok_or_else(|| {
                Error::config(format!(
                    "unknown search config type '{}'",
                    element.element_type
                ))
            })
    }
}

impl std::fmt::Debug for SearchConfigTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfigTypeRegistry")
            .field("types", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
