//! # Manifest Parsing
//!
//! `function.json` is JSON that may carry `//` and `/* */` comments.
//! Comments are blanked out (newlines kept, so parser positions still point
//! at the right line) before the document is handed to serde.

use std::fs;
use std::path::Path;

use super::errors::{FunctionError, FunctionResult};
use super::function::FunctionConfiguration;

/// Manifest file name looked for in every function directory
pub const MANIFEST_FILE: &str = "function.json";

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    String,
    StringEscape,
    LineComment,
    BlockComment,
}

/// Replace comments outside string literals with whitespace
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut state = State::Code;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match (c, chars.peek()) {
                ('"', _) => {
                    state = State::String;
                    out.push(c);
                }
                ('/', Some('/')) => {
                    chars.next();
                    state = State::LineComment;
                    out.push_str("  ");
                }
                ('/', Some('*')) => {
                    chars.next();
                    state = State::BlockComment;
                    out.push_str("  ");
                }
                _ => out.push(c),
            },
            State::String => {
                match c {
                    '\\' => state = State::StringEscape,
                    '"' => state = State::Code,
                    _ => {}
                }
                out.push(c);
            }
            State::StringEscape => {
                state = State::String;
                out.push(c);
            }
            State::LineComment => {
                if c == '\n' || c == '\r' {
                    state = State::Code;
                    out.push(c);
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                    out.push_str("  ");
                } else if c == '\n' || c == '\r' {
                    out.push(c);
                } else {
                    out.push(' ');
                }
            }
        }
    }

    out
}

/// Parse manifest text
pub fn parse_manifest(text: &str) -> Result<FunctionConfiguration, serde_json::Error> {
    serde_json::from_str(&strip_json_comments(text))
}

/// Read and parse the manifest at `path`
pub fn read_manifest(path: &Path) -> FunctionResult<FunctionConfiguration> {
    let text = fs::read_to_string(path).map_err(|e| FunctionError::manifest(path, e.to_string()))?;
    parse_manifest(&text).map_err(|e| FunctionError::manifest(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_strips_line_and_block_comments() {
        let text = r#"{
            // the trigger
            "disabled": false, /* not yet */
            "bindings": []
        }"#;

        let config = parse_manifest(text).unwrap();
        assert!(!config.disabled);
        assert!(config.bindings.is_empty());
    }

    #[test]
    fn test_keeps_comment_markers_inside_strings() {
        let text = r#"{"bindings":[{"type":"timerTrigger","schedule":"*/5 * * * *","url":"http://x//y"}]}"#;

        let config = parse_manifest(text).unwrap();
        assert_eq!(config.bindings[0].schedule.as_deref(), Some("*/5 * * * *"));
        assert_eq!(config.bindings[0].extra["url"], "http://x//y");
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let stripped = strip_json_comments(r#"{"a":"say \"//hi\""} // tail"#);
        assert_eq!(stripped.trim_end(), r#"{"a":"say \"//hi\""}"#);
    }

    #[test]
    fn test_preserves_line_structure() {
        let stripped = strip_json_comments("{\n/* one\ntwo */\n}");
        assert_eq!(stripped.lines().count(), 4);
    }

    #[test]
    fn test_malformed_manifest_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_FILE);
        fs::write(&path, "{ \"bindings\": [ }").unwrap();

        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(err, FunctionError::Manifest { .. }));
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(read_manifest(&tmp.path().join(MANIFEST_FILE)).is_err());
    }
}
