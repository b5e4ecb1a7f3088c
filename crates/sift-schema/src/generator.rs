//! Schema generation.
//!
//! [`generate_solr_schema`] turns the configured fields and search-config
//! elements into the complete set of backing fields and copy-field rules.
//! Generation is all-or-nothing: any hook or validation error aborts it.

use std::collections::BTreeMap;

use sift_core::model::{kinds, search_config_types};
use sift_core::{Error, FieldSet, HierarchyLink, Result, SearchConfigElement};
use sift_solr::{CopyFieldDef, DynamicFieldDef, SolrFieldDef, is_protected_field};

use crate::kinds::FieldKindRegistry;
use crate::search_config::{FieldWiring, SearchConfigTypeRegistry};

/// The schema diff applied after a full schema clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaUpdates {
    /// Backing fields.
    pub fields: Vec<SolrFieldDef>,
    /// Copy-field rules.
    pub copy_fields: Vec<CopyFieldDef>,
    /// Dynamic fields.
    pub dynamic_fields: Vec<DynamicFieldDef>,
}

impl SchemaUpdates {
    /// Names of all generated fields.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Field definition by name.
    pub fn field(&self, name: &str) -> Option<&SolrFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Copy of the updates with every list sorted, for comparisons.
    pub fn sorted(&self) -> Self {
        let mut sorted = self.clone();
        sorted.fields.sort();
        sorted.copy_fields.sort();
        sorted.dynamic_fields.sort();
        sorted
    }
}

/// Generates schema updates from the catalog configuration.
#[derive(Debug, Clone)]
pub struct SchemaGenerator {
    kinds: FieldKindRegistry,
    types: SearchConfigTypeRegistry,
}

impl SchemaGenerator {
    /// Create a generator over the given hook registries.
    pub fn new(kinds: FieldKindRegistry, types: SearchConfigTypeRegistry) -> Self {
        Self { kinds, types }
    }

    /// Field-kind hooks used by this generator.
    pub fn kinds(&self) -> &FieldKindRegistry {
        &self.kinds
    }

    /// Generate schema updates; see [`generate_solr_schema`].
    pub fn generate(
        &self,
        fields: &FieldSet,
        search_configs: &[SearchConfigElement],
    ) -> Result<SchemaUpdates> {
        generate_solr_schema(fields, search_configs, &self.kinds, &self.types)
    }
}

/// Collects generated fields, rejecting two different definitions for the
/// same name.
#[derive(Default)]
struct FieldCollector {
    fields: BTreeMap<String, SolrFieldDef>,
    order: Vec<String>,
}

impl FieldCollector {
    fn add(&mut self, def: SolrFieldDef, origin: &str) -> Result<()> {
        if is_protected_field(&def.name) {
            return Err(Error::config(format!(
                "{origin} would redefine protected field '{}'",
                def.name
            )));
        }
        match self.fields.get(&def.name) {
            Some(existing) if *existing == def => Ok(()),
            Some(_) => Err(Error::config(format!(
                "{origin} generates backing field '{}' that conflicts with an existing definition",
                def.name
            ))),
            None => {
                self.order.push(def.name.clone());
                self.fields.insert(def.name.clone(), def);
                Ok(())
            }
        }
    }

    fn into_fields(mut self) -> Vec<SolrFieldDef> {
        self.order
            .iter()
            .filter_map(|name| self.fields.remove(name))
            .collect()
    }
}

/// Generate the search-engine schema for a field set and its search-config
/// elements.
///
/// The unique-key field is skipped; Solr owns it. Every other field needs a
/// hook in `kind_hooks`, and every element needs a hook in `type_hooks`. Hierarchy
/// axes spanning several fields must reference fields with identical link
/// configuration. The returned lists carry no ordering guarantee.
pub fn generate_solr_schema(
    fields: &FieldSet,
    search_configs: &[SearchConfigElement],
    kind_hooks: &FieldKindRegistry,
    type_hooks: &SearchConfigTypeRegistry,
) -> Result<SchemaUpdates> {
    // Resolve every element type up front so a bad type fails before any
    // hook runs.
    for element in search_configs {
        type_hooks.hook_for(element)?;
        if element.fields.is_empty() {
            return Err(Error::config(format!(
                "{} '{}' references no fields",
                element.element_type, element.name
            )));
        }
    }

    let mut collector = FieldCollector::default();
    let mut wiring = FieldWiring::new();
    let mut hierarchy_links: BTreeMap<&str, &HierarchyLink> = BTreeMap::new();

    for field in fields.iter() {
        if field.is_unique_key() {
            continue;
        }
        let hook = kind_hooks.hook_for(field)?;
        hook.validate(field)?;
        let backing = hook.solr_fields(field)?;
        for def in backing.values() {
            collector.add(def.clone(), &format!("field '{}'", field.name))?;
        }
        if field.kind == kinds::HIERARCHY {
            if let Some(link) = field.hierarchy.as_ref() {
                hierarchy_links.insert(field.name.as_str(), link);
            }
        }
        wiring.insert(field.clone(), backing);
    }

    for element in search_configs
        .iter()
        .filter(|e| e.element_type == search_config_types::HIERARCHY_AXIS)
    {
        check_hierarchy_axis(element, &hierarchy_links)?;
    }

    let mut copy_fields = Vec::new();
    for element in search_configs {
        let backing = type_hooks.hook_for(element)?.backing_fields(element, &wiring)?;
        let origin = format!("{} '{}'", element.element_type, element.name);
        for def in backing.fields {
            collector.add(def, &origin)?;
        }
        for copy in backing.copy_fields {
            if !copy_fields.contains(&copy) {
                copy_fields.push(copy);
            }
        }
    }

    let updates = SchemaUpdates {
        fields: collector.into_fields(),
        copy_fields,
        dynamic_fields: Vec::new(),
    };

    tracing::info!(
        fields = updates.fields.len(),
        copy_fields = updates.copy_fields.len(),
        search_configs = search_configs.len(),
        "generated search schema"
    );
    Ok(updates)
}

fn check_hierarchy_axis(
    element: &SearchConfigElement,
    links: &BTreeMap<&str, &HierarchyLink>,
) -> Result<()> {
    if element.fields.len() < 2 {
        return Ok(());
    }
    let mut first: Option<(&str, &HierarchyLink)> = None;
    for name in &element.fields {
        let Some(link) = links.get(name.as_str()) else {
            continue;
        };
        match first {
            None => first = Some((name.as_str(), *link)),
            Some((first_name, first_link)) if first_link != *link => {
                return Err(Error::config(format!(
                    "hierarchy axis '{}': fields '{}' and '{}' differ in link field, \
                     code system, or display field",
                    element.name, first_name, name
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
