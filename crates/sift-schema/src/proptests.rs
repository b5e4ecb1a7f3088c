//! Property-based tests for schema generation.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;
    use sift_core::model::kinds;
    use sift_core::{FieldDef, FieldSet, HierarchyLink, SearchConfigElement};
    use sift_solr::types::PROTECTED_FIELDS;

    use crate::generator::generate_solr_schema;
    use crate::kinds::FieldKindRegistry;
    use crate::search_config::SearchConfigTypeRegistry;

    const KINDS: &[&str] = &[
        kinds::STRING,
        kinds::TEXT,
        kinds::DATETIME,
        kinds::NUMBER,
        kinds::BOOLEAN,
        kinds::LINK,
    ];

    fn field_strategy() -> impl Strategy<Value = Vec<FieldDef>> {
        prop::collection::btree_map("[a-z]{1,8}", (0..KINDS.len(), any::<bool>()), 0..8).prop_map(
            |fields| {
                fields
                    .into_iter()
                    .map(|(name, (kind, multi))| {
                        let field = FieldDef::new(format!("f{name}"), KINDS[kind]);
                        if multi { field.multi_valued() } else { field }
                    })
                    .collect()
            },
        )
    }

    fn registries() -> (FieldKindRegistry, SearchConfigTypeRegistry) {
        (
            FieldKindRegistry::builtin(&["en".to_string()]),
            SearchConfigTypeRegistry::builtin("__"),
        )
    }

    fn link(code_system: &str, display: &str) -> HierarchyLink {
        HierarchyLink {
            link_field: "code".to_string(),
            code_system: code_system.to_string(),
            display_field: display.to_string(),
        }
    }

    proptest! {
        #[test]
        fn test_copy_fields_reference_generated_fields(
            user_fields in field_strategy(),
            picks in prop::collection::vec(any::<prop::sample::Index>(), 1..6),
        ) {
            let fields = FieldSet::with_predefined(user_fields).unwrap();
            let names: Vec<String> = fields
                .iter()
                .filter(|f| !f.is_unique_key())
                .map(|f| f.name.clone())
                .collect();
            let members: Vec<String> = picks.iter().map(|i| i.get(&names).clone()).collect();
            let configs = vec![
                SearchConfigElement::search_focus("all", members.clone()),
                SearchConfigElement::ordinal_axis("axis", members),
            ];

            let (kind_hooks, type_hooks) = registries();
            let updates = generate_solr_schema(&fields, &configs, &kind_hooks, &type_hooks).unwrap();

            let known: BTreeSet<&str> = updates
                .field_names()
                .chain(PROTECTED_FIELDS.iter().copied())
                .collect();
            for copy in &updates.copy_fields {
                prop_assert!(known.contains(copy.source.as_str()));
                for dest in &copy.destinations {
                    prop_assert!(known.contains(dest.as_str()));
                }
            }
        }

        #[test]
        fn test_generation_never_panics(
            user_fields in field_strategy(),
            element_type in prop::sample::select(vec!["searchFocus", "ordinalAxis", "hierarchyAxis", "other"]),
            members in prop::collection::vec("f[a-z]{1,3}", 0..4),
        ) {
            let fields = FieldSet::with_predefined(user_fields).unwrap();
            let configs = vec![SearchConfigElement::new(element_type, "x", members)];
            let (kind_hooks, type_hooks) = registries();
            let _ = generate_solr_schema(&fields, &configs, &kind_hooks, &type_hooks);
        }

        #[test]
        fn test_mismatched_hierarchy_axis_is_named(
            first_system in "[a-z]{1,6}",
            second_system in "[a-z]{1,6}",
            first_display in "[a-z]{1,6}",
            second_display in "[a-z]{1,6}",
        ) {
            prop_assume!(first_system != second_system || first_display != second_display);
            let fields = FieldSet::with_predefined(vec![
                FieldDef::new("h1", kinds::HIERARCHY).with_hierarchy(link(&first_system, &first_display)),
                FieldDef::new("h2", kinds::HIERARCHY).with_hierarchy(link(&second_system, &second_display)),
            ])
            .unwrap();
            let axis = SearchConfigElement::hierarchy_axis("tree", ["h1", "h2"]);

            let (kind_hooks, type_hooks) = registries();
            let err = generate_solr_schema(&fields, &[axis], &kind_hooks, &type_hooks).unwrap_err();
            prop_assert!(err.to_string().contains("hierarchy axis 'tree'"));
        }
    }
}
