//! Pulls the JSON object out of free-form model output.
//!
//! The scan takes everything from the first `{` to the last `}`. That tolerates
//! prose and markdown fences around the object, but a stray brace in prose
//! before or after the real object still breaks it. Reasoning blocks
//! (`<think>…</think>`) are removed before the scan.

use serde_json::Value;
use tracing::{debug, error};

use crate::extraction::errors::MalformedResponseError;
use crate::models::resume::{ResumeRecord, SchemaVariant};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Parses the embedded JSON object and normalizes it into a `ResumeRecord`.
pub fn sanitize(raw: &str, variant: SchemaVariant) -> Result<ResumeRecord, MalformedResponseError> {
    let canonical = canonical_json(raw)?;
    debug!("Canonical model JSON: {canonical}");
    let value: Value = serde_json::from_str(&canonical)?;
    ResumeRecord::normalize(&value, variant).map_err(|e| {
        error!("Model response has no profile object: {raw}");
        e
    })
}

/// The embedded JSON object, re-serialized with sorted keys and no whitespace.
pub fn canonical_json(raw: &str) -> Result<String, MalformedResponseError> {
    let value = parse_embedded_object(raw)?;
    Ok(serde_json::to_string(&value)?)
}

fn parse_embedded_object(raw: &str) -> Result<Value, MalformedResponseError> {
    let cleaned = strip_reasoning(raw);
    let span = json_span(&cleaned).ok_or_else(|| {
        error!("No JSON object found in model response: {raw}");
        MalformedResponseError::NoJsonObject
    })?;

    serde_json::from_str(span).map_err(|e| {
        error!("JSON cleaning error: {e}");
        error!("Problematic text: {raw}");
        MalformedResponseError::InvalidJson(e)
    })
}

/// Slice from the first `{` through the last `}`, inclusive.
fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Removes closed `<think>…</think>` blocks. An unclosed block is left alone.
fn strip_reasoning(text: &str) -> std::borrow::Cow<'_, str> {
    if !text.contains(THINK_OPEN) {
        return std::borrow::Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(THINK_OPEN) {
        let Some(close) = rest[open..].find(THINK_CLOSE) else {
            break;
        };
        out.push_str(&rest[..open]);
        rest = &rest[open + close + THINK_CLOSE.len()..];
    }
    out.push_str(rest);
    std::borrow::Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{"profile": {"location": {"current": "Pune", "relocation": "Yes"}, "skills": [{"skill": "Rust", "yearsOfExperience": "3"}]}}"#;

    #[test]
    fn test_sanitize_discards_surrounding_prose() {
        let raw = format!("Sure! Here is the data: {PROFILE} Hope that helps!");
        let record = sanitize(&raw, SchemaVariant::Basic).unwrap();
        assert_eq!(record.profile.location.current, "Pune");
        assert_eq!(record.profile.skills[0].skill, "Rust");
    }

    #[test]
    fn test_sanitize_handles_markdown_fences() {
        let raw = format!("```json\n{PROFILE}\n```");
        let record = sanitize(&raw, SchemaVariant::Basic).unwrap();
        assert_eq!(record.profile.location.relocation, "Yes");
    }

    #[test]
    fn test_sanitize_without_braces_is_malformed() {
        let result = sanitize("I could not process this file.", SchemaVariant::Basic);
        assert!(matches!(result, Err(MalformedResponseError::NoJsonObject)));
    }

    #[test]
    fn test_sanitize_reversed_braces_is_malformed() {
        let result = sanitize("} nothing here {", SchemaVariant::Basic);
        assert!(matches!(result, Err(MalformedResponseError::NoJsonObject)));
    }

    #[test]
    fn test_sanitize_truncated_json_is_malformed() {
        let raw = r#"{"profile": {"skills": [{"skill": "Rust"}"#;
        // Last brace closes the skill object; the outer structure is cut off
        let result = sanitize(raw, SchemaVariant::Basic);
        assert!(matches!(result, Err(MalformedResponseError::InvalidJson(_))));
    }

    #[test]
    fn test_sanitize_two_objects_is_malformed() {
        let raw = r#"First {"a": 1} and then {"b": 2}"#;
        let result = sanitize(raw, SchemaVariant::Basic);
        assert!(matches!(result, Err(MalformedResponseError::InvalidJson(_))));
    }

    #[test]
    fn test_stray_brace_in_trailing_prose_misparses() {
        // Documented limitation of the outermost-brace scan
        let raw = format!("{PROFILE} (fields like {{name}} were left out)");
        assert!(sanitize(&raw, SchemaVariant::Basic).is_err());
    }

    #[test]
    fn test_sanitize_strips_reasoning_blocks() {
        let raw = format!(
            "<think>The user wants {{profile}}; maybe {{ \"x\": }}</think>\n{PROFILE}"
        );
        let record = sanitize(&raw, SchemaVariant::Basic).unwrap();
        assert_eq!(record.profile.location.current, "Pune");
    }

    #[test]
    fn test_sanitize_missing_profile_is_malformed() {
        let result = sanitize(r#"{"name": "Jane"}"#, SchemaVariant::Basic);
        assert!(matches!(result, Err(MalformedResponseError::MissingProfile)));
    }

    #[test]
    fn test_sanitize_is_idempotent_on_its_output() {
        let raw = format!("Here you go:\n{PROFILE}\nThanks");
        for variant in [SchemaVariant::Basic, SchemaVariant::Extended] {
            let first = sanitize(&raw, variant).unwrap();
            let serialized = serde_json::to_string(&first).unwrap();
            let second = sanitize(&serialized, variant).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_canonical_json_sorts_keys_and_drops_whitespace() {
        let raw = "noise {\n  \"b\": 1,\n  \"a\": {\"d\": true, \"c\": null}\n} noise";
        assert_eq!(canonical_json(raw).unwrap(), r#"{"a":{"c":null,"d":true},"b":1}"#);
    }

    #[test]
    fn test_canonical_json_is_stable() {
        let once = canonical_json(PROFILE).unwrap();
        assert_eq!(canonical_json(&once).unwrap(), once);
    }

    #[test]
    fn test_strip_reasoning_leaves_unclosed_block() {
        let text = "<think>still thinking {";
        assert_eq!(strip_reasoning(text), text);
    }

    #[test]
    fn test_json_span_is_inclusive() {
        assert_eq!(json_span("a{b}c"), Some("{b}"));
        assert_eq!(json_span("{}"), Some("{}"));
        assert_eq!(json_span("{"), None);
    }
}
