//! Solr XML update format.
//!
//! Documents travel as `<doc>` fragments with one `<field>` tag per value.
//! Batches are wrapped in `<add commitWithin="N">`, deletions in
//! `<delete commitWithin="N">`, with `N` in milliseconds.

use std::fmt::Write as _;
use std::time::Duration;

/// Escape text for use in XML content and attribute values.
///
/// Characters XML 1.0 does not allow at all (C0 controls other than tab,
/// newline, and carriage return, plus U+FFFE and U+FFFF) are dropped.
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(c),
            c if is_xml_illegal(c) => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

fn is_xml_illegal(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}')
}

/// Render one `<field>` tag; both name and value are escaped.
pub fn field_tag(name: &str, value: &str) -> String {
    format!(
        "<field name=\"{}\">{}</field>",
        escape(name),
        escape(value)
    )
}

/// Wrap rendered field tags into a `<doc>` fragment.
pub fn doc<S: AsRef<str>>(field_tags: &[S]) -> String {
    let mut out = String::from("<doc>");
    for tag in field_tags {
        out.push_str(tag.as_ref());
    }
    out.push_str("</doc>");
    out
}

/// Wrap `<doc>` fragments into an `<add>` request body.
pub fn add_envelope<S: AsRef<str>>(docs: &[S], commit_within: Duration) -> String {
    let mut out = format!("<add commitWithin=\"{}\">", commit_within.as_millis());
    for d in docs {
        out.push_str(d.as_ref());
    }
    out.push_str("</add>");
    out
}

/// Build a `<delete>` request body removing documents by id.
pub fn delete_envelope<S: AsRef<str>>(ids: &[S], commit_within: Duration) -> String {
    let mut out = format!("<delete commitWithin=\"{}\">", commit_within.as_millis());
    for id in ids {
        let _ = write!(out, "<id>{}</id>", escape(id.as_ref()));
    }
    out.push_str("</delete>");
    out
}

/// Build a `<delete>` request body removing every document.
pub fn delete_all_envelope(commit_within: Duration) -> String {
    format!(
        "<delete commitWithin=\"{}\"><query>*:*</query></delete>",
        commit_within.as_millis()
    )
}

/// Extract the unescaped value of the `id` field from a `<doc>` fragment.
pub fn doc_id(doc: &str) -> Option<String> {
    const OPEN: &str = "<field name=\"id\">";
    let start = doc.find(OPEN)? + OPEN.len();
    let end = doc[start..].find("</field>")? + start;
    Some(unescape(&doc[start..end]))
}

/// Unescaped names of every `<field>` tag in a `<doc>` fragment, one
/// entry per value.
pub fn field_names(doc: &str) -> Vec<String> {
    const OPEN: &str = "<field name=\"";
    let mut names = Vec::new();
    let mut rest = doc;
    while let Some(start) = rest.find(OPEN) {
        rest = &rest[start + OPEN.len()..];
        let Some(end) = rest.find('"') else { break };
        names.push(unescape(&rest[..end]));
        rest = &rest[end..];
    }
    names
}

fn unescape(escaped: &str) -> String {
    escaped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ============================================================================
// Tests
// ============================================================================
