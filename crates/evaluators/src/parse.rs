use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use levelapp_core::EvaluationResult;

/// Greedy first-`{` to last-`}` match, spanning newlines, for salvaging a
/// JSON object out of chatty model output.
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\{.*\})").expect("JSON object regex is valid"));

/// Marker returned when no JSON object can be recovered from judge output.
pub const INVALID_JSON_MARKER: &str = "Invalid JSON output";

/// Safely parse JSON output from an LLM.
///
/// Tries a direct parse first (after stripping markdown code fences), then
/// falls back to extracting the first `{...}` substring. If both fail,
/// returns the `{"error": "Invalid JSON output"}` marker instead of raising.
#[must_use]
pub fn parse_json_output(output: &str) -> Value {
    let trimmed = strip_code_fences(output);

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value;
    }

    if let Some(caps) = JSON_OBJECT_RE.captures(trimmed)
        && let Ok(value) = serde_json::from_str::<Value>(&caps[1])
    {
        return value;
    }

    serde_json::json!({"error": INVALID_JSON_MARKER})
}

/// Strip markdown code fences (```json ... ``` or ``` ... ```) if present.
fn strip_code_fences(output: &str) -> &str {
    let trimmed = output.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let without_opening = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_opening
        .strip_suffix("```")
        .unwrap_or(without_opening)
        .trim()
}

/// Interpret a parsed judge output as an [`EvaluationResult`].
///
/// Error-marker mappings and malformed outputs become level-0 failures.
/// Values above the rubric ceiling are clamped into `[0, 5]` and tagged
/// `metadata.rubric = "legacy_0_3"`; in-range values pass through untouched.
#[must_use]
pub fn interpret_judge_output(output: Value) -> EvaluationResult {
    let Value::Object(map) = output else {
        return EvaluationResult::failure(format!("non-object judge output: {output}"));
    };

    if let Some(error) = map.get("error") {
        let detail = match (error, map.get("details")) {
            (Value::String(e), Some(Value::String(d))) => format!("{e}: {d}"),
            (Value::String(e), _) => e.clone(),
            (other, _) => other.to_string(),
        };
        return EvaluationResult::failure(detail);
    }

    let metadata = match map.get("metadata") {
        Some(Value::Object(meta)) => meta.clone(),
        _ => Map::new(),
    };

    let Some(raw_level) = map.get("match_level").and_then(as_level) else {
        return EvaluationResult::failure(format!(
            "missing or invalid match_level in judge output: {}",
            Value::Object(map)
        ));
    };

    let justification = map
        .get("justification")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let mut result = EvaluationResult::new(clamp_level(raw_level), justification);
    result.metadata = metadata;
    if raw_level > 5 {
        result
            .metadata
            .insert("rubric".to_owned(), Value::String("legacy_0_3".to_owned()));
    }
    result
}

/// Accept integer levels, including negatives and floats with an integral
/// value (some providers emit `3.0`).
fn as_level(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_level(level: i64) -> u8 {
    level.clamp(0, 5) as u8
}
