//! Literal text lookups over raw documents.
//!
//! Documents are plain bytes and need not be valid UTF-8. Needles are escaped
//! before they are compiled, so `/`, `.`, `-` and friends only ever match
//! themselves.

use regex::bytes::NoExpand;
use regex::bytes::Regex;

/// Compile a pattern built exclusively from escaped literals and fixed syntax.
fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern).ok()
}

fn literal(needle: &str) -> Option<Regex> {
    compile(&regex::escape(needle))
}

/// True iff `needle` occurs verbatim at least once in `document`.
pub fn exists(document: &[u8], needle: &str) -> bool {
    literal(needle).is_some_and(|re| re.is_match(document))
}

/// True iff a pair shaped like `"field": "value"` occurs in `document`, with
/// any amount of ASCII whitespace between the colon and the value.
pub fn exists_structured(document: &[u8], field: &str, value: &str) -> bool {
    let pattern = format!(
        r#""{}":(?-u:\s)*"{}""#,
        regex::escape(field),
        regex::escape(value)
    );
    compile(&pattern).is_some_and(|re| re.is_match(document))
}

/// Number of non-overlapping occurrences of `needle`.
pub fn count(document: &[u8], needle: &str) -> usize {
    literal(needle).map_or(0, |re| re.find_iter(document).count())
}

/// Replace the first occurrence of `needle` with `replacement`, leaving every
/// other byte as it was.
pub fn replace_first(document: &[u8], needle: &str, replacement: &str) -> Vec<u8> {
    match literal(needle) {
        Some(re) => re
            .replacen(document, 1, NoExpand(replacement.as_bytes()))
            .into_owned(),
        None => document.to_vec(),
    }
}
