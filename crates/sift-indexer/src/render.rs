//! Rendering one item's values into a `<doc>` fragment.

use sift_core::model::predefined;
use sift_core::{Error, FieldSet, ItemValueRow, Result};
use sift_schema::FieldKindRegistry;
use sift_solr::xml;

/// Turns the values of one item into a document.
pub trait Render {
    /// Render `values`, all belonging to `item_id`.
    fn render(&self, item_id: &str, values: &[ItemValueRow]) -> Result<String>;
}

impl<F> Render for F
where
    F: Fn(&str, &[ItemValueRow]) -> Result<String>,
{
    fn render(&self, item_id: &str, values: &[ItemValueRow]) -> Result<String> {
        self(item_id, values)
    }
}

/// Renders documents through the field-kind hooks.
///
/// The unique-key field bypasses the hooks: its value is escaped and
/// emitted as-is. A document without a unique key, a value for an unknown
/// field, a field whose kind has no hook, and any hook failure are
/// [`Error::DocumentBuild`] errors.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    fields: FieldSet,
    kinds: FieldKindRegistry,
}

impl DocumentRenderer {
    /// Create a renderer for a field set.
    pub fn new(fields: FieldSet, kinds: FieldKindRegistry) -> Self {
        Self { fields, kinds }
    }

    /// Reset the caches of every field-kind hook.
    pub fn reset_caches(&self) {
        self.kinds.reset_caches();
    }
}

impl Render for DocumentRenderer {
    fn render(&self, item_id: &str, values: &[ItemValueRow]) -> Result<String> {
        let mut tags = Vec::with_capacity(values.len() * 4);
        let mut has_id = false;

        for row in values {
            if row.field_name == predefined::ID {
                if !has_id {
                    tags.push(xml::field_tag(predefined::ID, &row.field_value));
                    has_id = true;
                }
                continue;
            }
            let field = self.fields.get(&row.field_name).ok_or_else(|| {
                Error::document_build(
                    item_id,
                    format!("value for unconfigured field '{}'", row.field_name),
                )
            })?;
            let hook = self.kinds.get(&field.kind).ok_or_else(|| {
                Error::document_build(
                    item_id,
                    format!("no hook for kind '{}' of field '{}'", field.kind, field.name),
                )
            })?;
            tags.extend(hook.field_tags(field, row)?);
        }

        if !has_id {
            return Err(Error::document_build(item_id, "document has no 'id' value"));
        }
        Ok(xml::doc(&tags))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sift_core::FieldDef;
    use sift_core::model::kinds;

    fn renderer() -> DocumentRenderer {
        let fields = FieldSet::with_predefined(vec![
            FieldDef::new("title", kinds::TEXT).multi_valued(),
            FieldDef::new("size", kinds::NUMBER),
        ])
        .unwrap();
        DocumentRenderer::new(fields, FieldKindRegistry::builtin(&["en".to_string()]))
    }

    #[test]
    fn test_render_document() {
        let values = vec![
            ItemValueRow::new("a&b", "id", "a&b", 0),
            ItemValueRow::new("a&b", "title", "Fish", 0),
        ];
        let doc = renderer().render("a&b", &values).unwrap();
        assert_eq!(
            doc,
            "<doc><field name=\"id\">a&amp;b</field>\
             <field name=\"title_txt\">Fish</field>\
             <field name=\"title_prefix\">Fish</field></doc>"
        );
    }

    #[test]
    fn test_control_characters_are_dropped_from_values() {
        let values = vec![
            ItemValueRow::new("a", "id", "a", 0),
            ItemValueRow::new("a", "title", "Fi\u{1}sh\u{1b}", 0),
        ];
        let doc = renderer().render("a", &values).unwrap();
        assert!(doc.contains("<field name=\"title_txt\">Fish</field>"));
        assert!(!doc.chars().any(|c| c.is_control()));
    }

    #[test]
    fn test_missing_id_is_error() {
        let values = vec![ItemValueRow::new("a", "title", "Fish", 0)];
        let err = renderer().render("a", &values).unwrap_err();
        assert!(err.to_string().contains("no 'id' value"));
        assert_eq!(err.class(), sift_core::ErrorClass::Recoverable);
    }

    #[test]
    fn test_unconfigured_field_is_error() {
        let values = vec![
            ItemValueRow::new("a", "id", "a", 0),
            ItemValueRow::new("a", "colour", "red", 0),
        ];
        let err = renderer().render("a", &values).unwrap_err();
        assert!(err.to_string().contains("unconfigured field 'colour'"));
    }

    #[test]
    fn test_hook_failure_is_error() {
        let values = vec![
            ItemValueRow::new("a", "id", "a", 0),
            ItemValueRow::new("a", "size", "huge", 0),
        ];
        let err = renderer().render("a", &values).unwrap_err();
        assert!(matches!(err, Error::DocumentBuild { .. }));
    }

    #[test]
    fn test_closure_renderer() {
        let render = |item: &str, values: &[ItemValueRow]| -> Result<String> {
            Ok(format!("{item}:{}", values.len()))
        };
        assert_eq!(render.render("a", &[]).unwrap(), "a:0");
    }
}
