//! Live schema maintenance.
//!
//! A rebuild is [`clear_schema`] followed by [`apply_schema`]; each is a
//! single schema-API request.

use sift_core::Result;
use sift_solr::{NameRef, SchemaCommands, SearchEngine, is_protected_field};

use crate::generator::SchemaUpdates;

/// Remove every copy-field, every dynamic field, and every non-protected
/// field from the live schema.
pub async fn clear_schema(engine: &dyn SearchEngine) -> Result<()> {
    let copy_fields = engine.list_copy_fields().await?;
    let dynamic_fields = engine.list_dynamic_fields().await?;
    let fields = engine.list_fields().await?;

    let commands = SchemaCommands {
        delete_copy_fields: copy_fields,
        delete_dynamic_fields: dynamic_fields
            .into_iter()
            .map(|f| NameRef { name: f.name })
            .collect(),
        delete_fields: fields
            .into_iter()
            .filter(|f| !is_protected_field(&f.name))
            .map(|f| NameRef { name: f.name })
            .collect(),
        ..Default::default()
    };

    tracing::info!(
        collection = engine.collection(),
        copy_fields = commands.delete_copy_fields.len(),
        dynamic_fields = commands.delete_dynamic_fields.len(),
        fields = commands.delete_fields.len(),
        "clearing search schema"
    );
    engine.update_schema(&commands).await
}

/// Add generated fields, dynamic fields, and copy-fields to the live schema.
pub async fn apply_schema(engine: &dyn SearchEngine, updates: &SchemaUpdates) -> Result<()> {
    let commands = SchemaCommands {
        add_fields: updates.fields.clone(),
        add_dynamic_fields: updates.dynamic_fields.clone(),
        add_copy_fields: updates.copy_fields.clone(),
        ..Default::default()
    };

    tracing::info!(
        collection = engine.collection(),
        fields = commands.add_fields.len(),
        copy_fields = commands.add_copy_fields.len(),
        "applying search schema"
    );
    engine.update_schema(&commands).await
}

/// Clear the live schema, then apply `updates`.
pub async fn rebuild_schema(engine: &dyn SearchEngine, updates: &SchemaUpdates) -> Result<()> {
    clear_schema(engine).await?;
    apply_schema(engine, updates).await
}

// ============================================================================
// Tests
// ============================================================================
