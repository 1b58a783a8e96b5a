//! Score aggregation and justification summarization helpers.

use std::collections::BTreeMap;

/// Maximum merged justification bullets emitted per provider.
pub const MAX_JUSTIFICATION_BULLETS: usize = 5;

/// Round to 3 decimals, the precision of every emitted score.
#[must_use]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Round to 2 decimals, used for execution-time summaries.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Collapse per-provider score lists into rounded means; empty lists score 0.
#[must_use]
pub fn average_scores(collected: &BTreeMap<String, Vec<f64>>) -> BTreeMap<String, f64> {
    collected
        .iter()
        .map(|(provider, values)| {
            let avg = if values.is_empty() {
                0.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                round3(mean)
            };
            (provider.clone(), avg)
        })
        .collect()
}

/// One judge justification together with the scenario it came from.
#[derive(Debug, Clone)]
pub struct JustificationEntry {
    pub justification: String,
    pub scenario: String,
}

/// Merge justifications with identical trimmed text into bullets of the form
/// `<justification> (Scenarios: a, b)`, first-seen order, capped at
/// `max_bullets`.
#[must_use]
pub fn summarize_justifications(
    entries: &[JustificationEntry],
    max_bullets: usize,
) -> Vec<String> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for entry in entries {
        let text = entry.justification.trim();
        if text.is_empty() {
            continue;
        }
        match grouped.iter_mut().find(|(t, _)| t == text) {
            Some((_, scenarios)) => {
                if !scenarios.iter().any(|s| s == &entry.scenario) {
                    scenarios.push(entry.scenario.clone());
                }
            }
            None => grouped.push((text.to_owned(), vec![entry.scenario.clone()])),
        }
    }

    grouped
        .into_iter()
        .take(max_bullets)
        .map(|(justification, scenarios)| {
            format!("{justification} (Scenarios: {})", scenarios.join(", "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(justification: &str, scenario: &str) -> JustificationEntry {
        JustificationEntry {
            justification: justification.to_owned(),
            scenario: scenario.to_owned(),
        }
    }

    #[test]
    fn rounding() {
        assert!((round3(4.666_666) - 4.667).abs() < 1e-9);
        assert!((round2(1.005) - 1.01).abs() < 1e-9 || (round2(1.005) - 1.0).abs() < 1e-9);
        assert!((round3(0.0)).abs() < 1e-9);
    }

    #[test]
    fn average_scores_handles_empty_lists() {
        let mut collected = BTreeMap::new();
        collected.insert("openai".to_owned(), vec![5.0, 4.0]);
        collected.insert("ionos".to_owned(), vec![]);
        let avg = average_scores(&collected);
        assert!((avg["openai"] - 4.5).abs() < 1e-9);
        assert!((avg["ionos"]).abs() < 1e-9);
    }

    #[test]
    fn identical_justifications_merge() {
        let bullets = summarize_justifications(
            &[
                entry("exact match", "greeting"),
                entry("  exact match  ", "farewell"),
                entry("missing details", "greeting"),
            ],
            MAX_JUSTIFICATION_BULLETS,
        );
        assert_eq!(bullets.len(), 2);
        assert_eq!(bullets[0], "exact match (Scenarios: greeting, farewell)");
        assert_eq!(bullets[1], "missing details (Scenarios: greeting)");
    }

    #[test]
    fn bullet_cap_is_enforced() {
        let entries: Vec<JustificationEntry> = (0..10)
            .map(|i| entry(&format!("reason {i}"), "s"))
            .collect();
        let bullets = summarize_justifications(&entries, MAX_JUSTIFICATION_BULLETS);
        assert_eq!(bullets.len(), 5);
    }

    #[test]
    fn empty_justifications_are_dropped() {
        let bullets =
            summarize_justifications(&[entry("", "s"), entry("   ", "s")], MAX_JUSTIFICATION_BULLETS);
        assert!(bullets.is_empty());
    }

    #[test]
    fn duplicate_scenarios_listed_once() {
        let bullets = summarize_justifications(
            &[entry("same", "s1"), entry("same", "s1")],
            MAX_JUSTIFICATION_BULLETS,
        );
        assert_eq!(bullets, vec!["same (Scenarios: s1)".to_owned()]);
    }
}
