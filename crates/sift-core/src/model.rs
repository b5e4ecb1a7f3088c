//! Catalog data model: configured fields, search-config elements, and the
//! item-value rows read from the relational store.
//!
//! Field and search-config definitions are read-only snapshots. The indexing
//! engine never mutates them; a configuration change produces a new snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Built-in field kind keys.
///
/// Kinds are open string keys so new kinds can be registered without
/// touching the engine; these are the ones Sift ships hooks for.
pub mod kinds {
    /// The unique-key field.
    pub const ID: &str = "id";
    /// Short string values (codes, names).
    pub const STRING: &str = "string";
    /// Free text, optionally language-tagged.
    pub const TEXT: &str = "text";
    /// RFC 3339 timestamps.
    pub const DATETIME: &str = "datetime";
    /// Numeric values.
    pub const NUMBER: &str = "number";
    /// `true` / `false`.
    pub const BOOLEAN: &str = "boolean";
    /// Reference to another item by business id.
    pub const LINK: &str = "link";
    /// Reference to a code in a hierarchical code system.
    pub const HIERARCHY: &str = "hierarchy";
}

/// Names of the pre-defined item attributes present in every field set.
pub mod predefined {
    /// Unique technical item id; the search engine's unique key.
    pub const ID: &str = "id";
    /// Entity type name of the item.
    pub const ENTITY_NAME: &str = "entityName";
    /// Business id shared by all versions of an item.
    pub const BUSINESS_ID: &str = "businessId";
    /// Creation timestamp, ISO-8601 in UTC.
    pub const CREATED_AT: &str = "createdAt";
}

/// Search-config element type keys.
pub mod search_config_types {
    /// Free-text search over a group of fields.
    pub const SEARCH_FOCUS: &str = "searchFocus";
    /// Faceting and sorting along one dimension.
    pub const ORDINAL_AXIS: &str = "ordinalAxis";
    /// Ordinal axis backed by hierarchy fields.
    pub const HIERARCHY_AXIS: &str = "hierarchyAxis";
}

/// Link configuration of a hierarchy field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyLink {
    /// Name of the field holding the reference to the code item.
    pub link_field: String,
    /// Code system (target entity type) the codes belong to.
    pub code_system: String,
    /// Field of the code item used as display label.
    pub display_field: String,
}

/// One configured metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Unique field name.
    pub name: String,
    /// Field kind key (see [`kinds`]).
    pub kind: String,
    /// Whether the field may hold several values per item.
    #[serde(default)]
    pub multi_valued: bool,
    /// Whether the field was synthesized for a link target.
    #[serde(default)]
    pub is_linked: bool,
    /// Link configuration; required for hierarchy fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<HierarchyLink>,
}

impl FieldDef {
    /// Create a single-valued, non-linked field.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            multi_valued: false,
            is_linked: false,
            hierarchy: None,
        }
    }

    /// Mark the field as multi-valued.
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// Attach hierarchy link configuration.
    pub fn with_hierarchy(mut self, link: HierarchyLink) -> Self {
        self.hierarchy = Some(link);
        self
    }

    /// Synthesize the field reached through `link` to `target`.
    ///
    /// The linked field takes the target's kind and is named
    /// `<link.name><separator><target.name>`. It is multi-valued if either
    /// side is, since every linked item contributes its own values.
    pub fn linked(link: &FieldDef, target: &FieldDef, separator: &str) -> Self {
        Self {
            name: linked_field_name(&link.name, &target.name, separator),
            kind: target.kind.clone(),
            multi_valued: link.multi_valued || target.multi_valued,
            is_linked: true,
            hierarchy: None,
        }
    }

    /// Returns `true` for link and hierarchy fields, whose values reference
    /// other items.
    pub fn is_reference(&self) -> bool {
        self.kind == kinds::LINK || self.kind == kinds::HIERARCHY
    }

    /// Returns `true` for the unique-key field.
    pub fn is_unique_key(&self) -> bool {
        self.name == predefined::ID
    }
}

/// Build the name of a linked field.
pub fn linked_field_name(link_field: &str, target_field: &str, separator: &str) -> String {
    format!("{link_field}{separator}{target_field}")
}

/// The four pre-defined item attributes.
pub fn predefined_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::new(predefined::ID, kinds::ID),
        FieldDef::new(predefined::ENTITY_NAME, kinds::STRING),
        FieldDef::new(predefined::BUSINESS_ID, kinds::STRING),
        FieldDef::new(predefined::CREATED_AT, kinds::DATETIME),
    ]
}

/// Returns `true` if `name` is one of the pre-defined item attributes.
pub fn is_predefined(name: &str) -> bool {
    matches!(
        name,
        predefined::ID | predefined::ENTITY_NAME | predefined::BUSINESS_ID | predefined::CREATED_AT
    )
}

/// A validated set of field definitions with unique names.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<FieldDef>,
    by_name: BTreeMap<String, usize>,
}

impl FieldSet {
    /// Build a field set, rejecting duplicate names.
    pub fn new(fields: Vec<FieldDef>) -> Result<Self> {
        let mut by_name = BTreeMap::new();
        for (idx, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(Error::config("field with empty name"));
            }
            if by_name.insert(field.name.clone(), idx).is_some() {
                return Err(Error::config(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
        }
        Ok(Self { fields, by_name })
    }

    /// Build a field set from user fields plus the pre-defined attributes.
    ///
    /// A user field that reuses a pre-defined name is a configuration error.
    pub fn with_predefined(user_fields: Vec<FieldDef>) -> Result<Self> {
        let mut fields = predefined_fields();
        fields.extend(user_fields);
        Self::new(fields)
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.by_name.get(name).map(|&idx| &self.fields[idx])
    }

    /// Returns `true` if a field with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All fields in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    /// Fields of the given kind.
    pub fn by_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a FieldDef> + 'a {
        self.fields.iter().filter(move |f| f.kind == kind)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the set holds no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume the set, returning the field definitions.
    pub fn into_fields(self) -> Vec<FieldDef> {
        self.fields
    }
}

/// A named grouping of fields serving one search function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfigElement {
    /// Element type key (see [`search_config_types`]).
    #[serde(rename = "type")]
    pub element_type: String,
    /// Element name, unique per type.
    pub name: String,
    /// Ordered list of member field names.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl SearchConfigElement {
    /// Create a new element.
    pub fn new<T, N, I, F>(element_type: T, name: N, fields: I) -> Self
    where
        T: Into<String>,
        N: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            element_type: element_type.into(),
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a search focus.
    pub fn search_focus<N, I, F>(name: N, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self::new(search_config_types::SEARCH_FOCUS, name, fields)
    }

    /// Create an ordinal axis.
    pub fn ordinal_axis<N, I, F>(name: N, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self::new(search_config_types::ORDINAL_AXIS, name, fields)
    }

    /// Create a hierarchy axis.
    pub fn hierarchy_axis<N, I, F>(name: N, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self::new(search_config_types::HIERARCHY_AXIS, name, fields)
    }
}

/// One (item, field, value) triple read from the relational store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemValueRow {
    /// Technical item id.
    pub item_id: String,
    /// Field name (linked fields use the composed name).
    pub field_name: String,
    /// Raw field value.
    pub field_value: String,
    /// Ordinal position among the values of a multi-valued field.
    pub place: i32,
    /// Item revision the value belongs to.
    pub revision: i32,
    /// Language tag of text values.
    pub language: Option<String>,
}

impl ItemValueRow {
    /// Create a row without language tag at revision 1.
    pub fn new(
        item_id: impl Into<String>,
        field_name: impl Into<String>,
        field_value: impl Into<String>,
        place: i32,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            field_name: field_name.into(),
            field_value: field_value.into(),
            place,
            revision: 1,
            language: None,
        }
    }

    /// Attach a language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_fields() {
        let fields = predefined_fields();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "entityName", "businessId", "createdAt"]);
        assert!(fields[0].is_unique_key());
        assert!(is_predefined("createdAt"));
        assert!(!is_predefined("title"));
    }

    #[test]
    fn test_field_set_rejects_duplicates() {
        let result = FieldSet::new(vec![
            FieldDef::new("title", kinds::TEXT),
            FieldDef::new("title", kinds::STRING),
        ]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("duplicate field name 'title'"));
    }

    #[test]
    fn test_field_set_rejects_predefined_collision() {
        let result = FieldSet::with_predefined(vec![FieldDef::new("businessId", kinds::STRING)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_field_set_lookup() {
        let set = FieldSet::with_predefined(vec![
            FieldDef::new("title", kinds::TEXT),
            FieldDef::new("parent", kinds::LINK),
        ])
        .unwrap();

        assert_eq!(set.len(), 6);
        assert_eq!(set.get("title").unwrap().kind, kinds::TEXT);
        assert!(set.get("missing").is_none());
        assert_eq!(set.by_kind(kinds::LINK).count(), 1);
        assert!(set.get("parent").unwrap().is_reference());
    }

    #[test]
    fn test_linked_field() {
        let link = FieldDef::new("parent", kinds::LINK);
        let target = FieldDef::new("label", kinds::STRING).multi_valued();
        let linked = FieldDef::linked(&link, &target, "__");
        assert_eq!(linked.name, "parent__label");
        assert_eq!(linked.kind, kinds::STRING);
        assert!(linked.multi_valued);
        assert!(linked.is_linked);
    }

    #[test]
    fn test_linked_field_cardinality_follows_either_side() {
        let single_link = FieldDef::new("parent", kinds::LINK);
        let multi_link = FieldDef::new("parents", kinds::LINK).multi_valued();
        let single_target = FieldDef::new("label", kinds::STRING);
        let multi_target = FieldDef::new("label", kinds::STRING).multi_valued();

        assert!(!FieldDef::linked(&single_link, &single_target, "__").multi_valued);
        assert!(FieldDef::linked(&multi_link, &single_target, "__").multi_valued);
        assert!(FieldDef::linked(&single_link, &multi_target, "__").multi_valued);
        assert!(FieldDef::linked(&multi_link, &multi_target, "__").multi_valued);
    }

    #[test]
    fn test_search_config_element_serde() {
        let json = r#"{"type": "searchFocus", "name": "all", "fields": ["title", "abstract"]}"#;
        let element: SearchConfigElement = serde_json::from_str(json).unwrap();
        assert_eq!(
            element,
            SearchConfigElement::search_focus("all", ["title", "abstract"])
        );
    }

    #[test]
    fn test_field_def_serde_defaults() {
        let field: FieldDef = serde_json::from_str(r#"{"name": "title", "kind": "text"}"#).unwrap();
        assert!(!field.multi_valued);
        assert!(!field.is_linked);
        assert!(field.hierarchy.is_none());
    }
}
