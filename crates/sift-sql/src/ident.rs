//! Validation of names interpolated into SQL text.
//!
//! Every table name and string literal that ends up in a projection
//! statement passes through here first. Anything outside the allow-list is
//! rejected with [`Error::InvalidArgument`].

use std::sync::LazyLock;

use regex::Regex;
use sift_core::config::is_sql_table_name;
use sift_core::{Error, Result};

static SQL_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.:\- ]+$").unwrap_or_else(|_| unreachable!("static pattern"))
});

/// Validate a table name, optionally schema-qualified.
pub fn table_name(name: &str) -> Result<&str> {
    if is_sql_table_name(name) {
        Ok(name)
    } else {
        Err(Error::invalid_argument(format!(
            "'{name}' is not a valid table name"
        )))
    }
}

/// Validate a value and render it as a single-quoted SQL literal.
pub fn literal(value: &str) -> Result<String> {
    if SQL_LITERAL.is_match(value) {
        Ok(format!("'{value}'"))
    } else {
        Err(Error::invalid_argument(format!(
            "'{value}' contains characters not allowed in a query"
        )))
    }
}

/// Render a comma-separated list of literals for an `IN (...)` clause.
pub fn literal_list<S: AsRef<str>>(values: &[S]) -> Result<String> {
    let quoted = values
        .iter()
        .map(|v| literal(v.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(", "))
}
