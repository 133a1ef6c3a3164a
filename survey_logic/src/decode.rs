//! Normalization of the heterogeneous at-rest encodings.
//!
//! Option lists and answers reach the store in several historical shapes:
//! plain strings, JSON-encoded strings and already-parsed objects. Everything
//! downstream (navigator, aggregator) consumes the single canonical form
//! produced here, so the defensive parsing lives in one place.

use log::warn;

use serde_json::Value as JSValue;

use crate::model::{AnswerValue, CanonicalOption, JumpTarget};

/// Decodes a stored option list into canonical options.
///
/// Accepted inputs: a JSON array, a string holding a JSON-encoded array, or
/// nothing. An unparseable string degrades to an empty list rather than
/// failing the caller: a single corrupt question must not abort a whole
/// report.
pub fn decode_options(raw: &JSValue) -> Vec<CanonicalOption> {
    match raw {
        JSValue::Null => vec![],
        JSValue::Array(entries) => entries.iter().map(decode_option).collect(),
        JSValue::String(s) => match serde_json::from_str::<JSValue>(s) {
            Ok(JSValue::Array(entries)) => entries.iter().map(decode_option).collect(),
            Ok(other) => {
                warn!("decode_options: stored string is not an array: {:?}", other);
                vec![]
            }
            Err(e) => {
                warn!("decode_options: unparseable option string: {}", e);
                vec![]
            }
        },
        other => {
            warn!("decode_options: unexpected shape: {:?}", other);
            vec![]
        }
    }
}

/// Decodes a single option entry.
///
/// Objects use `text` (or `label`) for display, `value` when distinct, and
/// `nextQuestionIndex` for the embedded jump. A string that looks like a JSON
/// object literal is parsed and treated the same, falling back to the raw
/// string on failure. Anything else is used verbatim as both text and value.
pub fn decode_option(raw: &JSValue) -> CanonicalOption {
    match raw {
        JSValue::Object(_) => decode_option_object(raw),
        JSValue::String(s) if s.trim_start().starts_with('{') => {
            match serde_json::from_str::<JSValue>(s) {
                Ok(parsed @ JSValue::Object(_)) => decode_option_object(&parsed),
                _ => CanonicalOption::new(s),
            }
        }
        JSValue::String(s) => CanonicalOption::new(s),
        other => CanonicalOption::new(&scalar_to_string(other)),
    }
}

fn decode_option_object(obj: &JSValue) -> CanonicalOption {
    let text = obj
        .get("text")
        .and_then(JSValue::as_str)
        .or_else(|| obj.get("label").and_then(JSValue::as_str))
        .map(|s| s.to_string())
        .unwrap_or_else(|| obj.to_string());
    let value = match obj.get("value") {
        Some(JSValue::Null) | None => text.clone(),
        Some(v) => scalar_to_string(v),
    };
    CanonicalOption {
        text,
        value,
        jump: decode_jump(obj.get("nextQuestionIndex")),
    }
}

/// Turns the raw `nextQuestionIndex` integer into a jump target. `-1` is the
/// terminate sentinel; other negatives are authoring mistakes and dropped.
fn decode_jump(raw: Option<&JSValue>) -> Option<JumpTarget> {
    match raw.and_then(JSValue::as_i64) {
        Some(-1) => Some(JumpTarget::End),
        Some(idx) if idx >= 0 => Some(JumpTarget::Index(idx as usize)),
        Some(idx) => {
            warn!("decode_jump: dropping invalid jump index {}", idx);
            None
        }
        None => None,
    }
}

/// Decodes one stored answer value. Arrays become multi-select answers,
/// scalars are coerced to their string rendering. Empty and null entries are
/// absent answers.
pub fn decode_answer(raw: &JSValue) -> Option<AnswerValue> {
    match raw {
        JSValue::Null => None,
        JSValue::String(s) if s.is_empty() => None,
        JSValue::Array(entries) => {
            let vs: Vec<String> = entries
                .iter()
                .filter(|v| !v.is_null())
                .map(scalar_to_string)
                .collect();
            Some(AnswerValue::Multi(vs))
        }
        other => Some(AnswerValue::Single(scalar_to_string(other))),
    }
}

fn scalar_to_string(v: &JSValue) -> String {
    match v {
        JSValue::String(s) => s.clone(),
        JSValue::Number(n) => n.to_string(),
        JSValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_strings_use_text_as_value() {
        let opts = decode_options(&json!(["Yes", "No"]));
        assert_eq!(opts.len(), 2);
        assert_eq!(opts[0].text, "Yes");
        assert_eq!(opts[0].value, "Yes");
        assert_eq!(opts[0].jump, None);
    }

    #[test]
    fn objects_carry_value_and_jump() {
        let opts = decode_options(&json!([
            {"text": "Rural", "value": "R", "nextQuestionIndex": 3},
            {"label": "Urban"},
            {"text": "Refused", "nextQuestionIndex": -1}
        ]));
        assert_eq!(opts[0].value, "R");
        assert_eq!(opts[0].jump, Some(JumpTarget::Index(3)));
        assert_eq!(opts[1].text, "Urban");
        assert_eq!(opts[1].value, "Urban");
        assert_eq!(opts[2].jump, Some(JumpTarget::End));
    }

    #[test]
    fn json_encoded_list_is_parsed() {
        let raw = json!("[\"A\", {\"text\": \"B\", \"value\": 2}]");
        let opts = decode_options(&raw);
        assert_eq!(opts[0].text, "A");
        assert_eq!(opts[1].text, "B");
        assert_eq!(opts[1].value, "2");
    }

    #[test]
    fn corrupt_option_string_degrades_to_empty() {
        assert!(decode_options(&json!("[not json")).is_empty());
        assert!(decode_options(&json!("\"scalar\"")).is_empty());
        assert!(decode_options(&JSValue::Null).is_empty());
    }

    #[test]
    fn stringified_object_entries_are_parsed() {
        let opts = decode_options(&json!(["{\"text\": \"C\", \"value\": \"c1\"}"]));
        assert_eq!(opts[0].text, "C");
        assert_eq!(opts[0].value, "c1");
        // Unparseable object-looking strings fall back to the raw text.
        let opts = decode_options(&json!(["{broken"]));
        assert_eq!(opts[0].text, "{broken");
        assert_eq!(opts[0].value, "{broken");
    }

    #[test]
    fn answers_decode_scalars_arrays_and_numbers() {
        assert_eq!(
            decode_answer(&json!("Yes")),
            Some(AnswerValue::Single("Yes".to_string()))
        );
        assert_eq!(
            decode_answer(&json!(["A", "B"])),
            Some(AnswerValue::Multi(vec!["A".to_string(), "B".to_string()]))
        );
        assert_eq!(
            decode_answer(&json!(4)),
            Some(AnswerValue::Single("4".to_string()))
        );
        assert_eq!(decode_answer(&json!("")), None);
        assert_eq!(decode_answer(&JSValue::Null), None);
    }
}
