//! Relational projection of items onto item-value rows.
//!
//! The projection is one SQL statement: a `UNION` of sub-selects, one per
//! class of values (pre-defined attributes, direct field values, values
//! reached through link and hierarchy fields), wrapped in an outer select
//! ordered by `(item_id, field_name, place)`. The ordering lets the indexer
//! assemble documents in a single pass.

use std::fmt::Write as _;

use sift_core::model::predefined;
use sift_core::{Error, FieldSet, ProjectionConfig, Result};

use crate::ident;

/// Row shape shared by every sub-select.
pub const COLUMNS: &str = "item_id, field_name, field_value, place, revision, language";

/// What to project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionRequest {
    /// Entity types whose items are indexed.
    pub focal_entities: Vec<String>,
    /// Fields read straight from the value table.
    pub direct_fields: Vec<String>,
    /// Link and hierarchy fields whose targets are followed.
    pub link_fields: Vec<String>,
    /// Configured linked field names (`<link><sep><target>`).
    pub linked_fields: Vec<String>,
    /// Separator between link field and target field names.
    pub separator: String,
    /// Restrict the projection to one item.
    pub item_id: Option<String>,
}

impl ProjectionRequest {
    /// Partition a field set into direct, link, and linked field names.
    ///
    /// Pre-defined fields are always projected and are left out. Link and
    /// hierarchy fields are both followed and projected directly, so their
    /// own backing fields carry the referenced id or code.
    pub fn from_fields(
        fields: &FieldSet,
        focal_entities: Vec<String>,
        separator: impl Into<String>,
    ) -> Self {
        let mut request = Self {
            focal_entities,
            separator: separator.into(),
            ..Default::default()
        };
        for field in fields.iter() {
            if predefined_column(&field.name).is_some() {
                continue;
            }
            if field.is_linked {
                request.linked_fields.push(field.name.clone());
                continue;
            }
            if field.is_reference() {
                request.link_fields.push(field.name.clone());
            }
            request.direct_fields.push(field.name.clone());
        }
        request
    }

    /// Restrict the projection to a single item.
    pub fn for_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }
}

/// Column expression projecting a pre-defined attribute, by field name.
fn predefined_column(field: &str) -> Option<&'static str> {
    match field {
        predefined::ID => Some("i.id"),
        predefined::ENTITY_NAME => Some("i.entity_name"),
        predefined::BUSINESS_ID => Some("i.business_id"),
        predefined::CREATED_AT => Some(
            "to_char(i.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS\"Z\"')",
        ),
        _ => None,
    }
}

/// Builds projection statements against the configured tables.
#[derive(Debug, Clone)]
pub struct ProjectionBuilder {
    item_table: String,
    value_table: String,
}

impl ProjectionBuilder {
    /// Create a builder; table names must be plain SQL identifiers.
    pub fn new(config: &ProjectionConfig) -> Result<Self> {
        Ok(Self {
            item_table: ident::table_name(&config.item_table)?.to_string(),
            value_table: ident::table_name(&config.value_table)?.to_string(),
        })
    }

    /// Build the projection statement for `request`.
    pub fn build(&self, request: &ProjectionRequest) -> Result<String> {
        if request.focal_entities.is_empty() {
            return Err(Error::invalid_argument(
                "projection needs at least one focal entity type",
            ));
        }
        let scope = Scope {
            entities: ident::literal_list(&request.focal_entities)?,
            item: request
                .item_id
                .as_deref()
                .map(ident::literal)
                .transpose()?,
        };

        let mut selects = self.predefined_selects(&scope);
        if let Some(select) = self.direct_select(&scope, &request.direct_fields)? {
            selects.push(select);
        }
        if let Some(select) = self.linked_select(&scope, request)? {
            selects.push(select);
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM (\n{}\n) AS projection\nORDER BY item_id, field_name, place",
            selects.join("\nUNION\n")
        );
        tracing::debug!(
            sub_selects = selects.len(),
            bytes = sql.len(),
            single_item = request.item_id.is_some(),
            "built projection statement"
        );
        Ok(sql)
    }

    fn predefined_selects(&self, scope: &Scope) -> Vec<String> {
        [
            predefined::ID,
            predefined::ENTITY_NAME,
            predefined::BUSINESS_ID,
            predefined::CREATED_AT,
        ]
        .into_iter()
        .filter_map(|name| predefined_column(name).map(|column| (name, column)))
        .map(|(name, column)| {
            let mut select = format!(
                "SELECT i.id AS item_id, '{name}' AS field_name, {column} AS field_value, \
                 0 AS place, i.revision AS revision, CAST(NULL AS TEXT) AS language \
                 FROM {} i WHERE ",
                self.item_table
            );
            scope.restrict(&mut select, "i");
            select
        })
        .collect()
    }

    fn direct_select(&self, scope: &Scope, fields: &[String]) -> Result<Option<String>> {
        if fields.is_empty() {
            return Ok(None);
        }
        let mut select = format!(
            "SELECT v.item_id AS item_id, v.field_name AS field_name, v.value AS field_value, \
             v.place AS place, v.revision AS revision, v.language AS language \
             FROM {value} v JOIN {item} i ON i.id = v.item_id AND i.revision = v.revision \
             WHERE v.field_name IN ({fields}) AND ",
            value = self.value_table,
            item = self.item_table,
            fields = ident::literal_list(fields)?,
        );
        scope.restrict(&mut select, "i");
        Ok(Some(select))
    }

    fn linked_select(&self, scope: &Scope, request: &ProjectionRequest) -> Result<Option<String>> {
        if request.link_fields.is_empty() || request.linked_fields.is_empty() {
            return Ok(None);
        }
        let separator = ident::literal(&request.separator)?;
        let linked_name = format!("l.field_name || {separator} || tv.field_name");
        let mut select = format!(
            "SELECT i.id AS item_id, {linked_name} AS field_name, tv.value AS field_value, \
             tv.place AS place, i.revision AS revision, tv.language AS language \
             FROM {item} i \
             JOIN {value} l ON l.item_id = i.id AND l.revision = i.revision \
             JOIN {item} t ON t.business_id = l.value \
             JOIN {value} tv ON tv.item_id = t.id AND tv.revision = t.revision \
             WHERE l.field_name IN ({links}) AND {linked_name} IN ({linked}) AND ",
            item = self.item_table,
            value = self.value_table,
            links = ident::literal_list(&request.link_fields)?,
            linked = ident::literal_list(&request.linked_fields)?,
        );
        scope.restrict(&mut select, "i");
        Ok(Some(select))
    }
}

/// Validated restriction shared by every sub-select.
struct Scope {
    entities: String,
    item: Option<String>,
}

impl Scope {
    fn restrict(&self, select: &mut String, alias: &str) {
        let _ = write!(select, "{alias}.entity_name IN ({})", self.entities);
        if let Some(item) = &self.item {
            let _ = write!(select, " AND {alias}.id = {item}");
        }
    }
}

/// Build a projection statement in one call.
pub fn build_projection_sql(
    config: &ProjectionConfig,
    request: &ProjectionRequest,
) -> Result<String> {
    ProjectionBuilder::new(config)?.build(request)
}

// ============================================================================
// Tests
// ============================================================================
