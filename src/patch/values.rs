//! Line-oriented editor for the Kubernetes values override
//! (`gw-ingress/kube/values-staging-override.yaml`).
//!
//! The scan never parses YAML. It tracks whether it is inside the `krakend:`
//! block purely from indentation, so blank lines are treated as part of the
//! block and any non-indented line (including a comment) ends it.

use std::borrow::Cow;

use super::AppliedEdit;
use super::PatchOutcome;
use crate::error::PatchError;

/// Marker after which the endpoint override is inserted.
pub const IDLE_TIMEOUT_MARKER: &str = "albIdleTimeout: 180";
pub const ENDPOINT_OVERRIDE_LINE: &str = "  endpointFullNameOverride: api-fyre";
pub const SECTION_MARKER: &str = "krakend:";
pub const INSTANCE_KEY: &str = "instance:";

pub fn instance_line(pr_identifier: &str) -> String {
    format!("      {} {}", INSTANCE_KEY, pr_identifier)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    Inside,
}

/// Scan state for a single pass. Both flags only ever go from false to true.
#[derive(Debug)]
struct SectionCursor {
    section: Section,
    section_found: bool,
    override_inserted: bool,
}

impl SectionCursor {
    fn new() -> Self {
        Self {
            section: Section::Outside,
            section_found: false,
            override_inserted: false,
        }
    }

    fn enter_section(&mut self) {
        self.section = Section::Inside;
        self.section_found = true;
    }

    fn in_section(&self) -> bool {
        self.section == Section::Inside
    }

    /// Leave the section when a passed-through line starts at column 0.
    fn observe(&mut self, line: &[u8]) {
        if self.in_section() && line.first().is_some_and(|&c| c != b' ') {
            self.section = Section::Outside;
        }
    }
}

fn contains(line: &[u8], marker: &str) -> bool {
    line.windows(marker.len()).any(|window| window == marker.as_bytes())
}

/// Give an inserted line the same `\r` terminator as the line it follows.
fn like_anchor(inserted: &str, anchor: &[u8]) -> Vec<u8> {
    let mut line = inserted.as_bytes().to_vec();
    if anchor.ends_with(b"\r") {
        line.push(b'\r');
    }
    line
}

/// Pin the krakend instance to `pr_identifier` and add the endpoint override.
///
/// Per line, first matching rule wins:
/// 1. the first line containing `albIdleTimeout: 180` is followed by the
///    endpoint override line;
/// 2. every line containing `krakend:` opens the section and is followed by
///    a fresh `instance:` line;
/// 3. inside the section, lines containing `instance:` are dropped;
/// 4. anything else passes through unchanged.
///
/// Fails without returning any content when no `krakend:` line exists.
pub fn patch_instance(document: &[u8], pr_identifier: &str) -> Result<PatchOutcome, PatchError> {
    let mut cursor = SectionCursor::new();
    let mut lines: Vec<Cow<'_, [u8]>> = Vec::new();
    let mut edits = Vec::new();
    let new_instance = instance_line(pr_identifier);

    for (idx, line) in document.split(|&b| b == b'\n').enumerate() {
        let line_no = idx + 1;

        if !cursor.override_inserted && contains(line, IDLE_TIMEOUT_MARKER) {
            lines.push(Cow::Borrowed(line));
            lines.push(Cow::Owned(like_anchor(ENDPOINT_OVERRIDE_LINE, line)));
            cursor.override_inserted = true;
            edits.push(AppliedEdit::OverrideInserted { line: line_no });
        } else if contains(line, SECTION_MARKER) {
            lines.push(Cow::Borrowed(line));
            lines.push(Cow::Owned(like_anchor(&new_instance, line)));
            cursor.enter_section();
            edits.push(AppliedEdit::InstanceInserted {
                line: line_no,
                instance: pr_identifier.to_string(),
            });
        } else if cursor.in_section() && contains(line, INSTANCE_KEY) {
            edits.push(AppliedEdit::StaleInstanceDropped { line: line_no });
        } else {
            lines.push(Cow::Borrowed(line));
            cursor.observe(line);
        }
    }

    if !cursor.section_found {
        return Err(PatchError::KrakendSectionNotFound);
    }

    Ok(PatchOutcome {
        content: lines.join(&b'\n'),
        edits,
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    fn patched(document: &str, pr_identifier: &str) -> String {
        let outcome = patch_instance(document.as_bytes(), pr_identifier).unwrap();
        String::from_utf8(outcome.content).unwrap()
    }

    const STAGING: &str = "global:
  albIdleTimeout: 180
  replicas: 2
gateway:
  ingress:
    krakend:
      instance: 101
      tag: \"2.4\"";

    #[derive(Deserialize)]
    struct Values {
        global: Global,
        gateway: Gateway,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Global {
        endpoint_full_name_override: String,
        replicas: u32,
    }

    #[derive(Deserialize)]
    struct Gateway {
        ingress: Ingress,
    }

    #[derive(Deserialize)]
    struct Ingress {
        krakend: Krakend,
    }

    #[derive(Deserialize)]
    struct Krakend {
        instance: u64,
        tag: String,
    }

    #[test]
    fn test_patch_instance_inserts_override_and_instance() {
        let outcome = patch_instance(STAGING.as_bytes(), "654").unwrap();

        insta::assert_snapshot!(std::str::from_utf8(&outcome.content).unwrap(), @r#"
        global:
          albIdleTimeout: 180
          endpointFullNameOverride: api-fyre
          replicas: 2
        gateway:
          ingress:
            krakend:
              instance: 654
              tag: "2.4"
        "#);
        assert_eq!(
            outcome.edits,
            vec![
                AppliedEdit::OverrideInserted { line: 2 },
                AppliedEdit::InstanceInserted {
                    line: 6,
                    instance: "654".to_string()
                },
                AppliedEdit::StaleInstanceDropped { line: 7 },
            ]
        );
    }

    #[test]
    fn test_patched_values_still_parse() {
        let values: Values = serde_yml::from_str(&patched(STAGING, "654")).unwrap();

        assert_eq!(values.global.endpoint_full_name_override, "api-fyre");
        assert_eq!(values.global.replicas, 2);
        assert_eq!(values.gateway.ingress.krakend.instance, 654);
        assert_eq!(values.gateway.ingress.krakend.tag, "2.4");
    }

    #[test]
    fn test_patch_instance_without_section_fails() {
        let document = "global:\n  albIdleTimeout: 180\n";

        let err = patch_instance(document.as_bytes(), "654").unwrap_err();

        assert_eq!(err, PatchError::KrakendSectionNotFound);
    }

    #[test]
    fn test_patch_instance_without_idle_timeout_only_sets_instance() {
        let document = "krakend:\n  replicas: 1\n";

        let content = patched(document, "8");

        assert_eq!(content, "krakend:\n      instance: 8\n  replicas: 1\n");
    }

    #[test]
    fn test_override_inserted_once() {
        let document = "a:\n  albIdleTimeout: 180\nb:\n  albIdleTimeout: 180\nkrakend:\n";

        let content = patched(document, "3");

        assert_eq!(
            content,
            "a:\n  albIdleTimeout: 180\n  endpointFullNameOverride: api-fyre\nb:\n  albIdleTimeout: 180\nkrakend:\n      instance: 3\n"
        );
    }

    #[test]
    fn test_instance_outside_section_is_kept() {
        let document = "other:\n  instance: keep\nkrakend:\n  instance: old\n  replicas: 1\nnext:\n  instance: keep-too\n";

        let content = patched(document, "5");

        assert_eq!(
            content,
            "other:\n  instance: keep\nkrakend:\n      instance: 5\n  replicas: 1\nnext:\n  instance: keep-too\n"
        );
    }

    #[test]
    fn test_blank_line_does_not_end_section() {
        let document = "krakend:\n\n  instance: old\n";

        let content = patched(document, "9");

        assert_eq!(content, "krakend:\n      instance: 9\n\n");
    }

    #[test]
    fn test_column_zero_comment_ends_section() {
        let document = "krakend:\n# pinned below\n  instance: old\n";

        let content = patched(document, "9");

        assert_eq!(
            content,
            "krakend:\n      instance: 9\n# pinned below\n  instance: old\n"
        );
    }

    #[test]
    fn test_crlf_line_endings_are_kept() {
        let document = "global:\r\n  albIdleTimeout: 180\r\nkrakend:\r\n  instance: old\r\n";

        let content = patched(document, "12");

        assert_eq!(
            content,
            "global:\r\n  albIdleTimeout: 180\r\n  endpointFullNameOverride: api-fyre\r\nkrakend:\r\n      instance: 12\r\n"
        );
    }

    #[test]
    fn test_cursor_leaves_section_on_dedent_only() {
        let mut cursor = SectionCursor::new();
        cursor.enter_section();

        cursor.observe(b"    nested: true");
        assert!(cursor.in_section());
        cursor.observe(b"");
        assert!(cursor.in_section());
        cursor.observe(b"top:");
        assert!(!cursor.in_section());
        assert!(cursor.section_found);
    }

    #[test]
    fn test_non_utf8_bytes_pass_through() {
        let document = b"# caf\xe9\nkrakend:\n  instance: 1\n";

        let outcome = patch_instance(document, "42").unwrap();

        assert_eq!(
            outcome.content,
            b"# caf\xe9\nkrakend:\n      instance: 42\n".to_vec()
        );
    }
}
