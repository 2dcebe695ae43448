//! Response sanitizer
//!
//! Models routinely wrap JSON in Markdown fences and put literal newlines
//! inside string values. Both make an otherwise correct payload unparseable;
//! this module repairs them without touching anything else.

use tracing::debug;

/// Opening or closing fence delimiter
const FENCE: &str = "```";

/// Strip code fences and escape raw control characters inside JSON strings
///
/// Pure and idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(raw: &str) -> String {
    debug!(raw_len = raw.len(), "sanitize: called");
    let unfenced = strip_fences(raw);
    escape_control_chars(unfenced.trim())
}

/// Remove fence delimiters that sit outside JSON string literals
///
/// A delimiter is three backticks plus an optional language tag made of
/// identifier characters. Backticks inside a string value are content and
/// pass through untouched.
pub fn strip_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        if !in_string && let Some(after) = rest.strip_prefix(FENCE) {
            rest = after.trim_start_matches(is_tag_char);
            continue;
        }
        rest = &rest[c.len_utf8()..];

        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }

    out
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.' | '#')
}

/// Escape control characters that appear unescaped inside string literals
///
/// Tracks string/escape state character by character. Characters outside
/// string literals pass through unchanged.
pub fn escape_control_chars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_fences_with_language_tag() {
        let raw = "```json\n{\"status\":\"enough\"}\n```";
        assert_eq!(sanitize(raw), "{\"status\":\"enough\"}");
    }

    #[test]
    fn test_strips_bare_fences() {
        assert_eq!(sanitize("```\n{}\n```"), "{}");
    }

    #[test]
    fn test_strips_fences_mid_text() {
        assert_eq!(sanitize("Here you go: ```json {\"a\":1} ``` thanks"), "Here you go:  {\"a\":1}  thanks");
    }

    #[test]
    fn test_strips_inline_fences() {
        assert_eq!(sanitize("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(sanitize("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_keeps_code_block_inside_string_value() {
        let raw = "```json\n{\"status\":\"enough\",\"description\":\"Trace:\n```\npanic at save\n```\"}\n```";
        let cleaned = sanitize(raw);
        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value["status"], "enough");
        assert_eq!(value["description"], "Trace:\n```\npanic at save\n```");
    }

    #[test]
    fn test_fence_tag_stops_at_json() {
        assert_eq!(strip_fences("```rust\n{}"), "\n{}");
        assert_eq!(strip_fences("{\"a\":\"```rust\"}"), "{\"a\":\"```rust\"}");
    }

    #[test]
    fn test_escapes_newline_inside_string() {
        let raw = "{\"description\":\"line one\nline two\"}";
        let cleaned = sanitize(raw);
        assert_eq!(cleaned, "{\"description\":\"line one\\nline two\"}");

        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value["description"], "line one\nline two");
    }

    #[test]
    fn test_escapes_tab_cr_and_other_controls() {
        let raw = "{\"a\":\"x\ty\rz\u{0001}\"}";
        assert_eq!(escape_control_chars(raw), "{\"a\":\"x\\ty\\rz\\u0001\"}");
    }

    #[test]
    fn test_leaves_structure_whitespace_alone() {
        let raw = "{\n  \"a\": \"b\",\n\t\"c\": 1\n}";
        assert_eq!(escape_control_chars(raw), raw);
    }

    #[test]
    fn test_respects_escaped_quotes() {
        let raw = "{\"a\":\"say \\\"hi\\\"\nnow\"}";
        assert_eq!(escape_control_chars(raw), "{\"a\":\"say \\\"hi\\\"\\nnow\"}");
    }

    #[test]
    fn test_existing_escapes_untouched() {
        let raw = r#"{"a":"already\nescaped"}"#;
        assert_eq!(sanitize(raw), raw);
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(s in "\\PC*") {
            let once = sanitize(&s);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn prop_sanitize_idempotent_on_json_like(s in r#"(```[a-z]{0,4}|[{}":,\\ \n\t\r]|[a-z]){0,40}"#) {
            let once = sanitize(&s);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn prop_no_raw_controls_left_in_strings(s in r#""[a-z\n\t\r ]{0,20}""#) {
            let cleaned = escape_control_chars(&s);
            let parsed: Result<serde_json::Value, _> = serde_json::from_str(&cleaned);
            prop_assert!(parsed.is_ok());
        }
    }
}
