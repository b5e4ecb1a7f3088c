//! Functional categories of backing fields.

use std::fmt;

/// One functional aspect of a configured field, materialized as a backing
/// field named `<field>_<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Tokenized text (`txt`).
    Generic,
    /// Language-analyzed text (`txt_<lang>`).
    Lang(String),
    /// Edge-ngram prefix matching (`prefix`).
    Prefix,
    /// Unanalyzed value (`raw`).
    Raw,
    /// Lowercased, folded value for exact matching (`norm`).
    Normalized,
    /// Facet values (`facet`).
    Facet,
    /// Single sort key (`sort`).
    Sort,
}

impl Category {
    /// Backing-field name suffix.
    pub fn suffix(&self) -> String {
        match self {
            Category::Generic => "txt".to_string(),
            Category::Lang(lang) => format!("txt_{lang}"),
            Category::Prefix => "prefix".to_string(),
            Category::Raw => "raw".to_string(),
            Category::Normalized => "norm".to_string(),
            Category::Facet => "facet".to_string(),
            Category::Sort => "sort".to_string(),
        }
    }

    /// Name of the backing field of `field` for this category.
    pub fn backing_name(&self, field: &str) -> String {
        format!("{field}_{}", self.suffix())
    }

    /// Returns `true` for the categories a search focus copies.
    pub fn is_searchable(&self) -> bool {
        matches!(
            self,
            Category::Generic | Category::Lang(_) | Category::Prefix | Category::Raw
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix())
    }
}
