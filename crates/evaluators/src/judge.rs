use async_trait::async_trait;
use serde_json::Value;

use crate::error::JudgeError;

/// Strongly-typed judge trait with native `async fn`.
///
/// A judge does exactly two things: build the rubric prompt and make one LLM
/// call. This trait is **not** object-safe because `call_llm` desugars to an
/// opaque `impl Future`; for dynamic dispatch use [`DynJudge`], which every
/// `Judge` implements via a blanket implementation.
pub trait Judge: Send + Sync {
    /// Returns the provider family name of this judge.
    fn name(&self) -> &str;

    /// Construct the evaluation prompt for a (user message, generated,
    /// expected) triple. The prompt asks the model for a JSON object
    /// `{match_level, justification, metadata}` on the fixed 0-5 rubric.
    fn build_prompt(
        &self,
        user_message: Option<&str>,
        generated_text: &str,
        expected_text: &str,
    ) -> String;

    /// Perform one HTTP call to the provider.
    ///
    /// Returns the parsed judge output on success (which may itself be an
    /// error-marker mapping such as `{"error": "Invalid JSON output"}`), or a
    /// [`JudgeError`] when the exchange failed. Only
    /// [`JudgeError::Transport`] is retried by the service.
    fn call_llm(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<Value, JudgeError>> + Send;
}

/// Object-safe judge trait for use behind `Arc<dyn DynJudge>`.
///
/// You generally should not implement this directly -- implement [`Judge`]
/// and rely on the blanket implementation.
#[async_trait]
pub trait DynJudge: Send + Sync {
    /// Returns the provider family name of this judge.
    fn name(&self) -> &str;

    /// Construct the evaluation prompt. See [`Judge::build_prompt`].
    fn build_prompt(
        &self,
        user_message: Option<&str>,
        generated_text: &str,
        expected_text: &str,
    ) -> String;

    /// Perform one HTTP call to the provider. See [`Judge::call_llm`].
    async fn call_llm(&self, prompt: &str) -> Result<Value, JudgeError>;
}

#[async_trait]
impl<T: Judge + Sync> DynJudge for T {
    fn name(&self) -> &str {
        Judge::name(self)
    }

    fn build_prompt(
        &self,
        user_message: Option<&str>,
        generated_text: &str,
        expected_text: &str,
    ) -> String {
        Judge::build_prompt(self, user_message, generated_text, expected_text)
    }

    async fn call_llm(&self, prompt: &str) -> Result<Value, JudgeError> {
        Judge::call_llm(self, prompt).await
    }
}

/// Shared rubric prompt used by the prediction-style judge families.
///
/// The chat-style judges carry their own, more compact wording; both ask for
/// the same JSON shape on the same 0-5 scale.
#[must_use]
pub fn rubric_prompt(
    user_message: Option<&str>,
    generated_text: &str,
    expected_text: &str,
) -> String {
    let user_msg = user_message.unwrap_or("(no user message provided)");
    format!(
        r#"Your task is to evaluate how well the model's generated text matches the expected reference.

Use the following classification criteria:
5 - Perfect Match: The generated text is virtually identical to the expected text with no meaningful differences.
4 - Excellent Match: The generated text closely matches the expected text with only minor wording differences.
3 - Good Match: The generated text captures the main ideas with small differences.
2 - Moderate Match: The generated text captures some ideas but has noticeable gaps or omissions.
1 - Poor Match: The generated text has significant differences and misses several key points.
0 - No Match: The generated text does not match the expected text or is incorrect.

User Message:
"""
{user_msg}
"""

Expected Output:
"""
{expected_text}
"""

Generated Text:
"""
{generated_text}
"""

Return your evaluation as a valid JSON object with exactly these keys:
{{
    "match_level": <an integer between 0 and 5>,
    "justification": <a brief explanation>,
    "metadata": {{}}
}}

Output only the JSON object and nothing else.
"#
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct EchoJudge;

    impl Judge for EchoJudge {
        fn name(&self) -> &str {
            "echo"
        }

        fn build_prompt(
            &self,
            user_message: Option<&str>,
            generated_text: &str,
            expected_text: &str,
        ) -> String {
            rubric_prompt(user_message, generated_text, expected_text)
        }

        async fn call_llm(&self, prompt: &str) -> Result<Value, JudgeError> {
            Ok(serde_json::json!({"echo": prompt.len()}))
        }
    }

    #[tokio::test]
    async fn blanket_dyn_judge_impl() {
        let judge: Arc<dyn DynJudge> = Arc::new(EchoJudge);
        assert_eq!(judge.name(), "echo");
        let out = judge.call_llm("p").await.unwrap();
        assert_eq!(out["echo"], 1);
    }

    #[test]
    fn rubric_prompt_contains_scale_and_texts() {
        let prompt = rubric_prompt(Some("Hello"), "Hi there", "Hi");
        assert!(prompt.contains("5 - Perfect Match"));
        assert!(prompt.contains("0 - No Match"));
        assert!(prompt.contains("Hi there"));
        assert!(prompt.contains("\"match_level\""));
    }

    #[test]
    fn rubric_prompt_without_user_message() {
        let prompt = rubric_prompt(None, "g", "e");
        assert!(prompt.contains("(no user message provided)"));
    }
}
