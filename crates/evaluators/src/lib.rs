//! LLM judge providers and the evaluation dispatch service.
//!
//! A judge is anything that can build a rubric prompt and make one LLM call;
//! the [`EvaluationService`] keeps a registry of provider configurations,
//! wraps every call in the uniform retry/parse policy, and post-processes
//! results with deterministic key-point metadata. Judge failures never cross
//! the service boundary as errors — they become level-0
//! [`EvaluationResult`](levelapp_core::EvaluationResult)s with
//! `metadata.error` set.

pub mod compare;
pub mod config;
pub mod error;
pub mod judge;
pub mod keypoint;
pub mod mock;
pub mod parse;
pub mod providers;
pub mod retry;
pub mod service;

pub use config::{EvaluationConfig, LlmOptions};
pub use error::{ConfigError, JudgeError};
pub use judge::{DynJudge, Judge};
pub use keypoint::extract_key_point;
pub use mock::{FailingJudge, FlakyJudge, MockJudge};
pub use parse::{interpret_judge_output, parse_json_output};
pub use retry::retry_transport;
pub use service::{EvaluationService, JudgeFactory, judge_factory, shared_judge};
