use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::error;

use levelapp_evaluators::EvaluationService;

/// Judge score at or above which the chatbot answer wins.
pub const JUDGE_STRONG_THRESHOLD: u8 = 4;

/// Judge score treated as a tie.
pub const JUDGE_TIE_SCORE: u8 = 3;

static MISSING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:missing|lacks|absent|omits|excludes|not mentioned|fails to mention)\b")
        .expect("missing-facts regex is valid")
});

/// LLM-as-judge comparison of the chatbot answer against the golden answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmComparison {
    /// `"chatbot"`, `"tie"`, or `"expected"`.
    pub better_answer: String,
    pub justification: String,
    #[serde(default)]
    pub missing_facts: Vec<String>,
}

/// Map a judge match level to the comparison verdict.
#[must_use]
pub fn verdict_for_level(match_level: u8) -> &'static str {
    if match_level >= JUDGE_STRONG_THRESHOLD {
        "chatbot"
    } else if match_level == JUDGE_TIE_SCORE {
        "tie"
    } else {
        "expected"
    }
}

/// Compare the chatbot answer to the golden answer with the configured judge.
///
/// Evaluation faults degrade to a tie with the error in the justification,
/// never to a failure of the whole evaluation step.
pub async fn compare_answers(
    evaluation_service: &EvaluationService,
    judge_provider: &str,
    prompt: &str,
    expected: &str,
    actual: &str,
) -> LlmComparison {
    match evaluation_service
        .evaluate_response(judge_provider, actual, expected, Some(prompt))
        .await
    {
        Ok(result) => LlmComparison {
            better_answer: verdict_for_level(result.match_level).to_owned(),
            missing_facts: extract_missing_facts(&result.justification),
            justification: result.justification,
        },
        Err(err) => {
            error!(judge_provider, error = %err, "judge comparison failed");
            LlmComparison {
                better_answer: "tie".to_owned(),
                justification: format!("Evaluation error: {err}"),
                missing_facts: Vec::new(),
            }
        }
    }
}

/// Pull lines flagging omissions out of the judge's reasoning, at most five.
#[must_use]
pub fn extract_missing_facts(reasoning: &str) -> Vec<String> {
    reasoning
        .lines()
        .filter(|line| !line.trim().is_empty() && MISSING_PATTERN.is_match(line))
        .map(|line| match line.split_once(':') {
            Some((_, fact)) => fact.trim().to_owned(),
            None => line.trim().to_owned(),
        })
        .take(5)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_thresholds() {
        assert_eq!(verdict_for_level(5), "chatbot");
        assert_eq!(verdict_for_level(4), "chatbot");
        assert_eq!(verdict_for_level(3), "tie");
        assert_eq!(verdict_for_level(2), "expected");
        assert_eq!(verdict_for_level(0), "expected");
    }

    #[test]
    fn missing_facts_are_extracted_and_capped() {
        let reasoning = "\
Completeness: the answer omits the pricing tier\n\
It is accurate otherwise\n\
Also missing: the refund policy\n\
missing a\nmissing b\nmissing c\nmissing d\n";
        let facts = extract_missing_facts(reasoning);
        assert_eq!(facts.len(), 5);
        assert_eq!(facts[0], "the answer omits the pricing tier");
        assert_eq!(facts[1], "the refund policy");
    }

    #[test]
    fn clean_reasoning_yields_no_facts() {
        assert!(extract_missing_facts("fully complete and accurate").is_empty());
        assert!(extract_missing_facts("").is_empty());
    }
}
