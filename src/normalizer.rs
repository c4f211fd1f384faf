//! Normalization of raw model output into a structured document.
//!
//! The generative model is treated as unreliable input: output may be
//! fenced, padded with prose, or littered with stray control bytes.
//! Strategy is strict-parse, then one bounded repair pass, then fail —
//! a document is never fabricated from unparseable output.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::types::document::Block;

/// The document shape expected from the generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedNewsletter {
    /// Management title for the newsletter.
    #[serde(default)]
    pub title: String,

    /// Generated blocks in output order.
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// Parse raw model output into a [`GeneratedNewsletter`].
///
/// Cleans the text (fence extraction, control-byte stripping), attempts
/// a strict parse, and on failure retries exactly once after a
/// conservative repair. Anything still unparseable is a [`ParseError`].
pub fn parse(raw: &str) -> Result<GeneratedNewsletter, ParseError> {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        return Err(ParseError::EmptyOutput);
    }

    match serde_json::from_str(&cleaned) {
        Ok(newsletter) => Ok(newsletter),
        Err(strict) => {
            let repaired_text = repair(&cleaned);
            serde_json::from_str(&repaired_text)
                .map_err(|repaired| ParseError::Malformed { strict, repaired })
        }
    }
}

/// Extract the parseable core of raw model output.
///
/// Trims whitespace, unwraps the first fenced code block (preferring
/// one tagged as JSON), and strips C0 control characters other than
/// tab, newline, and carriage return.
pub(crate) fn clean_text(raw: &str) -> String {
    let mut text = raw.trim();

    if text.contains("```") {
        let json_fence = regex::Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap();
        let any_fence = regex::Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap();

        if let Some(cap) = json_fence
            .captures(text)
            .or_else(|| any_fence.captures(text))
        {
            if let Some(inner) = cap.get(1) {
                text = inner.as_str();
            }
        }
    }

    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// One conservative repair pass for near-valid JSON.
///
/// Normalizes stray line terminators and removes trailing commas before
/// a closing brace or bracket.
fn repair(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let trailing_comma = regex::Regex::new(r",\s*([}\]])").unwrap();
    trailing_comma.replace_all(&normalized, "$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::BlockKind;

    const CLEAN: &str = r#"{"title": "Weekly", "blocks": [{"type": "header", "content": {"title": "Hi"}}]}"#;

    #[test]
    fn test_parses_plain_json() {
        let newsletter = parse(CLEAN).unwrap();
        assert_eq!(newsletter.title, "Weekly");
        assert_eq!(newsletter.blocks.len(), 1);
        assert_eq!(newsletter.blocks[0].kind, BlockKind::Header);
    }

    #[test]
    fn test_unwraps_tagged_fence() {
        let raw = format!("Here is the newsletter:\n```json\n{}\n```\nEnjoy!", CLEAN);
        let newsletter = parse(&raw).unwrap();
        assert_eq!(newsletter.title, "Weekly");
    }

    #[test]
    fn test_unwraps_untagged_fence() {
        let raw = format!("```\n{}\n```", CLEAN);
        let newsletter = parse(&raw).unwrap();
        assert_eq!(newsletter.title, "Weekly");
    }

    #[test]
    fn test_fenced_with_control_bytes_matches_clean_parse() {
        let raw = format!("\u{0001}\u{0002}```json\n{}\n```\u{0003}\u{0004}", CLEAN);

        let from_dirty = parse(&raw).unwrap();
        let from_clean = parse(CLEAN).unwrap();

        assert_eq!(from_dirty.title, from_clean.title);
        assert_eq!(from_dirty.blocks.len(), from_clean.blocks.len());
        assert_eq!(from_dirty.blocks[0].kind, from_clean.blocks[0].kind);
    }

    #[test]
    fn test_keeps_structural_whitespace() {
        let raw = "{\n\t\"title\": \"T\",\r\n\t\"blocks\": []\n}";
        let newsletter = parse(raw).unwrap();
        assert_eq!(newsletter.title, "T");
    }

    #[test]
    fn test_repairs_trailing_comma_once() {
        let raw = r#"{"title": "T", "blocks": [],}"#;
        let newsletter = parse(raw).unwrap();
        assert_eq!(newsletter.title, "T");
    }

    #[test]
    fn test_missing_fields_default() {
        let newsletter = parse("{}").unwrap();
        assert_eq!(newsletter.title, "");
        assert!(newsletter.blocks.is_empty());
    }

    #[test]
    fn test_empty_output_is_an_error() {
        assert!(matches!(parse("   \n "), Err(ParseError::EmptyOutput)));
    }

    #[test]
    fn test_unrepairable_output_propagates() {
        let err = parse("I could not produce a newsletter, sorry.").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }
}
