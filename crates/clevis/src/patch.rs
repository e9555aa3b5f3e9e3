//! Patch document assembly.
//!
//! Turns a high-level mutation request into an ordered list of patch
//! operations: shortcut fields first (title, state, description, area,
//! iteration), then free-form `key=value` fields, then removals. Order is
//! for readability of the submitted document; the remote store applies
//! all operations atomically.

use crate::coerce::coerce_field_value;
use crate::domain::fields;
use clevis_remote::PatchOperation;

/// Shortcut fields of a mutation request, each mapped to a well-known
/// field reference when present and non-blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortcutFields<'a> {
    /// Work item title (`System.Title`).
    pub title: Option<&'a str>,

    /// Workflow state (`System.State`).
    pub state: Option<&'a str>,

    /// Description body (`System.Description`).
    pub description: Option<&'a str>,

    /// Area classification path (`System.AreaPath`).
    pub area_path: Option<&'a str>,

    /// Iteration classification path (`System.IterationPath`).
    pub iteration_path: Option<&'a str>,
}

/// Build the ordered patch document for a mutation request.
///
/// `field_list` is a free-form `key=value` list (see [`split_field_list`]
/// for the separator rules); values pass through the coercer. `remove_list`
/// is a comma-separated list of field references cleared with `Remove`
/// operations.
///
/// Never fails: malformed free-form tokens (no `=`, empty key) are skipped
/// silently. That is the documented lenient-parsing policy, not an error
/// path.
#[must_use]
pub fn build_patch(
    shortcuts: &ShortcutFields<'_>,
    field_list: Option<&str>,
    remove_list: Option<&str>,
) -> Vec<PatchOperation> {
    let mut ops = Vec::new();

    let shortcut_pairs = [
        (fields::TITLE, shortcuts.title),
        (fields::STATE, shortcuts.state),
        (fields::DESCRIPTION, shortcuts.description),
        (fields::AREA_PATH, shortcuts.area_path),
        (fields::ITERATION_PATH, shortcuts.iteration_path),
    ];
    for (reference, value) in shortcut_pairs {
        if let Some(value) = value {
            if !value.trim().is_empty() {
                ops.push(PatchOperation::add_field(reference, value.into()));
            }
        }
    }

    if let Some(raw) = field_list {
        for (key, value) in split_field_list(raw) {
            ops.push(PatchOperation::add_field(&key, coerce_field_value(&value)));
        }
    }

    if let Some(raw) = remove_list {
        for reference in raw.split(',') {
            let reference = reference.trim();
            if !reference.is_empty() {
                ops.push(PatchOperation::remove_field(reference));
            }
        }
    }

    tracing::debug!(op_count = ops.len(), "assembled patch document");
    ops
}

/// Split a free-form field list into `(key, value)` pairs.
///
/// Tokens are separated by commas, with two exceptions so that values may
/// contain literal commas:
///
/// - commas inside double quotes never separate
/// - a comma separates only when the remainder looks like the start of
///   another `key=value` token: an `=` within the next 100 characters,
///   appearing before any newline or `#`
///
/// Keys and values are trimmed; a value wrapped in one pair of double
/// quotes is unwrapped. Tokens without `=` or with an empty key are
/// dropped. The lookahead rule is deliberately heuristic; see the module
/// docs on lenient parsing.
#[must_use]
pub fn split_field_list(raw: &str) -> Vec<(String, String)> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                let rest: String = chars[i + 1..].iter().collect();
                if looks_like_next_pair(&rest) {
                    tokens.push(std::mem::take(&mut current));
                } else {
                    current.push(c);
                }
            }
            _ => current.push(c),
        }
        i += 1;
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .iter()
        .filter_map(|token| {
            let (key, value) = token.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                tracing::debug!(token = %token, "skipping field token with empty key");
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

/// Whether the text following a comma looks like another `key=value` token:
/// an `=` within the first 100 characters, before any newline or `#`.
fn looks_like_next_pair(rest: &str) -> bool {
    for (seen, c) in rest.chars().enumerate() {
        if seen >= 100 {
            return false;
        }
        match c {
            '=' => return true,
            '\n' | '#' => return false,
            _ => {}
        }
    }
    false
}

/// Strip one pair of surrounding double quotes, if both are present.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clevis_remote::PatchOp;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_title_only_emits_single_op() {
        let shortcuts = ShortcutFields {
            title: Some("Fix bug"),
            ..Default::default()
        };
        let ops = build_patch(&shortcuts, None, None);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op, PatchOp::Add);
        assert_eq!(ops[0].path, "/fields/System.Title");
        assert_eq!(ops[0].value, Some(json!("Fix bug")));
    }

    #[test]
    fn test_shortcut_emission_order_is_fixed() {
        let shortcuts = ShortcutFields {
            title: Some("T"),
            state: Some("Active"),
            description: Some("D"),
            area_path: Some("Proj\\TeamA"),
            iteration_path: Some("Proj\\Sprint1"),
        };
        let ops = build_patch(&shortcuts, None, None);

        let paths: Vec<&str> = ops.iter().map(|op| op.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/fields/System.Title",
                "/fields/System.State",
                "/fields/System.Description",
                "/fields/System.AreaPath",
                "/fields/System.IterationPath",
            ]
        );
    }

    #[rstest]
    #[case::blank("   ")]
    #[case::empty("")]
    fn test_blank_shortcuts_are_skipped(#[case] blank: &str) {
        let shortcuts = ShortcutFields {
            title: Some(blank),
            ..Default::default()
        };
        assert!(build_patch(&shortcuts, None, None).is_empty());
    }

    #[test]
    fn test_free_form_fields_are_coerced() {
        let ops = build_patch(
            &ShortcutFields::default(),
            Some("Custom.Points=5, Custom.Factor=1.5, Custom.Label=alpha"),
            None,
        );

        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].value, Some(json!(5)));
        assert_eq!(ops[1].value, Some(json!(1.5)));
        assert_eq!(ops[2].value, Some(json!("alpha")));
    }

    #[test]
    fn test_remove_list_emits_valueless_ops() {
        let ops = build_patch(
            &ShortcutFields::default(),
            None,
            Some("System.Tags, Custom.Obsolete,"),
        );

        assert_eq!(ops.len(), 2);
        for op in &ops {
            assert_eq!(op.op, PatchOp::Remove);
            assert!(op.value.is_none());
            assert!(op.path.starts_with("/fields/"));
        }
    }

    #[test]
    fn test_comma_kept_when_remainder_is_not_a_pair() {
        let pairs = split_field_list("Custom.Note=foo, bar baz");
        assert_eq!(
            pairs,
            vec![("Custom.Note".to_string(), "foo, bar baz".to_string())]
        );
    }

    #[test]
    fn test_comma_splits_when_remainder_is_a_pair() {
        let pairs = split_field_list("Custom.A=1,Custom.B=2");
        assert_eq!(
            pairs,
            vec![
                ("Custom.A".to_string(), "1".to_string()),
                ("Custom.B".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_quoted_value_protects_commas() {
        let pairs = split_field_list("Custom.List=\"a, b=c, d\",Custom.B=2");
        assert_eq!(
            pairs,
            vec![
                ("Custom.List".to_string(), "a, b=c, d".to_string()),
                ("Custom.B".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_hash_blocks_lookahead() {
        // The '#' before the '=' means the remainder does not look like a
        // key=value token, so the comma stays in the value.
        let pairs = split_field_list("Custom.Note=see, item #4 = reserved");
        assert_eq!(
            pairs,
            vec![(
                "Custom.Note".to_string(),
                "see, item #4 = reserved".to_string()
            )]
        );
    }

    #[rstest]
    #[case::no_equals("just a value")]
    #[case::empty_key("=value")]
    #[case::only_commas(",,,")]
    fn test_malformed_tokens_are_skipped(#[case] raw: &str) {
        assert!(split_field_list(raw).is_empty());
    }
}
