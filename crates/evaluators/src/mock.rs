use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;

use crate::error::JudgeError;
use crate::judge::{Judge, rubric_prompt};

/// A judge that returns a fixed verdict without any network call.
#[derive(Debug, Clone)]
pub struct MockJudge {
    match_level: u8,
    justification: String,
}

impl MockJudge {
    /// Create a mock that always scores `match_level`.
    pub fn scoring(match_level: u8, justification: impl Into<String>) -> Self {
        Self {
            match_level,
            justification: justification.into(),
        }
    }
}

impl Judge for MockJudge {
    fn name(&self) -> &str {
        "mock"
    }

    fn build_prompt(
        &self,
        user_message: Option<&str>,
        generated_text: &str,
        expected_text: &str,
    ) -> String {
        rubric_prompt(user_message, generated_text, expected_text)
    }

    async fn call_llm(&self, _prompt: &str) -> Result<Value, JudgeError> {
        Ok(serde_json::json!({
            "match_level": self.match_level,
            "justification": self.justification,
            "metadata": {},
        }))
    }
}

/// A judge whose every call fails with a transport error.
#[derive(Debug, Clone)]
pub struct FailingJudge {
    reason: String,
}

impl FailingJudge {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Judge for FailingJudge {
    fn name(&self) -> &str {
        "failing"
    }

    fn build_prompt(
        &self,
        user_message: Option<&str>,
        generated_text: &str,
        expected_text: &str,
    ) -> String {
        rubric_prompt(user_message, generated_text, expected_text)
    }

    async fn call_llm(&self, _prompt: &str) -> Result<Value, JudgeError> {
        Err(JudgeError::Transport(self.reason.clone()))
    }
}

/// A judge that fails with transport errors a fixed number of times, then
/// scores every remaining call. Exercises the retry policy.
#[derive(Debug)]
pub struct FlakyJudge {
    failures_left: AtomicU32,
    match_level: u8,
}

impl FlakyJudge {
    pub fn new(failures: u32, match_level: u8) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            match_level,
        }
    }
}

impl Judge for FlakyJudge {
    fn name(&self) -> &str {
        "flaky"
    }

    fn build_prompt(
        &self,
        user_message: Option<&str>,
        generated_text: &str,
        expected_text: &str,
    ) -> String {
        rubric_prompt(user_message, generated_text, expected_text)
    }

    async fn call_llm(&self, _prompt: &str) -> Result<Value, JudgeError> {
        let remaining = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok();
        if remaining.is_some() {
            return Err(JudgeError::Transport("simulated connection reset".into()));
        }
        Ok(serde_json::json!({
            "match_level": self.match_level,
            "justification": "recovered after transient failure",
            "metadata": {},
        }))
    }
}
