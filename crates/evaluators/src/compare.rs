//! Typed comparison of reference vs. extracted metadata fields.
//!
//! Exact matches score 1.0; everything else degrades to a normalized
//! Levenshtein similarity over the raw string forms, so near-misses (a
//! reformatted date, a truncated name) still earn partial credit.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Similarity of two strings as `1 - distance / max_len`, in `[0, 1]`.
///
/// Case-insensitive; empty inputs score 0.
#[must_use]
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    // Two-row dynamic programming edit distance.
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];
    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let distance = prev[b_chars.len()];

    #[allow(clippy::cast_precision_loss)]
    let max_len = a_chars.len().max(b_chars.len()) as f64;
    #[allow(clippy::cast_precision_loss)]
    let ratio = 1.0 - distance as f64 / max_len;
    ratio.max(0.0)
}

fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    let raw = value.as_str()?;
    let normalized: String = raw
        .chars()
        .map(|c| if c == '/' || c == '.' { '-' } else { c })
        .collect();
    for fmt in ["%d-%m-%Y", "%Y-%m-%d", "%m-%d-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(normalized.trim(), fmt) {
            return Some(date);
        }
    }
    None
}

fn as_plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compare one expected/actual pair under the given field type
/// (`"float"`, `"date"`, or `"string"`), returning a score in `[0, 1]`.
#[must_use]
pub fn compare_values(field_type: &str, expected: &Value, actual: &Value) -> f64 {
    let expected_str = as_plain_string(expected);
    let actual_str = as_plain_string(actual);

    match field_type {
        "float" => {
            if let (Some(e), Some(a)) = (parse_float(expected), parse_float(actual))
                && (e - a).abs() < 1e-6
            {
                return 1.0;
            }
        }
        "date" => {
            if let (Some(e), Some(a)) = (parse_date(expected), parse_date(actual))
                && e == a
            {
                return 1.0;
            }
        }
        _ => {
            if expected_str.trim().to_lowercase() == actual_str.trim().to_lowercase() {
                return 1.0;
            }
        }
    }
    levenshtein_ratio(&expected_str, &actual_str)
}

/// Score extracted metadata against the reference across the declared fields.
///
/// Only fields present in `expected` count; the result is the mean of the
/// per-field scores, or 0.0 when no declared field applies.
#[must_use]
pub fn evaluate_metadata(
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
    field_types: &HashMap<String, String>,
) -> f64 {
    let relevant: Vec<&String> = field_types.keys().filter(|f| expected.contains_key(*f)).collect();
    if relevant.is_empty() {
        return 0.0;
    }

    let total: f64 = relevant
        .iter()
        .map(|field| {
            let field_type = field_types.get(*field).map_or("string", String::as_str);
            let actual_value = actual.get(*field).unwrap_or(&Value::Null);
            compare_values(field_type, &expected[*field], actual_value)
        })
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let count = relevant.len() as f64;
    total / count
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_strings_score_one() {
        assert!((levenshtein_ratio("hello", "HELLO") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_string_scores_zero() {
        assert!((levenshtein_ratio("", "hello")).abs() < f64::EPSILON);
    }

    #[test]
    fn single_edit_ratio() {
        // One substitution over five characters.
        let ratio = levenshtein_ratio("hello", "hallo");
        assert!((ratio - 0.8).abs() < 1e-9);
    }

    #[test]
    fn float_tolerance() {
        assert!((compare_values("float", &json!(1.5), &json!("1.5")) - 1.0).abs() < f64::EPSILON);
        assert!(compare_values("float", &json!(1.5), &json!(2.5)) < 1.0);
    }

    #[test]
    fn date_formats_compare_equal() {
        let score = compare_values("date", &json!("2026-03-01"), &json!("01/03/2026"));
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn metadata_average_over_declared_fields() {
        let expected = json!({"amount": "100", "city": "Berlin"});
        let actual = json!({"amount": "100", "city": "Berlin"});
        let mut field_types = HashMap::new();
        field_types.insert("amount".to_owned(), "float".to_owned());
        field_types.insert("city".to_owned(), "string".to_owned());

        let score = evaluate_metadata(
            expected.as_object().unwrap(),
            actual.as_object().unwrap(),
            &field_types,
        );
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn metadata_without_relevant_fields_scores_zero() {
        let expected = json!({"other": 1});
        let actual = json!({});
        let mut field_types = HashMap::new();
        field_types.insert("amount".to_owned(), "float".to_owned());

        let score = evaluate_metadata(
            expected.as_object().unwrap(),
            actual.as_object().unwrap(),
            &field_types,
        );
        assert!(score.abs() < f64::EPSILON);
    }
}
