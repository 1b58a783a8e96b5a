use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use levelapp_evaluators::EvaluationService;

use crate::comparator::{LlmComparison, compare_answers};
use crate::error::RagError;
use crate::events::RagEventLog;
use crate::generation::GenerationService;
use crate::metrics::{RagMetrics, compute_metrics};
use crate::prompts::{build_expected_answer_messages, build_fallback_expected_messages};
use crate::scrape::{ChunkInfo, scrape_page};

/// Exact sentinel the grounding prompt instructs the model to emit when the
/// context does not support an answer.
pub const NOT_FOUND_SENTINEL: &str = "Not found in the provided context.";

/// Transport timeout for chatbot init and chat calls.
const CHATBOT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(900);

fn default_model_id() -> String {
    "meta-llama/Llama-3.3-70B-Instruct".to_owned()
}

fn default_chunk_size() -> usize {
    500
}

/// Request to initialize the RAG system and scrape a page in one call.
#[derive(Debug, Clone, Deserialize)]
pub struct RagInitRequest {
    pub page_url: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Chunk size in characters, matched to the chatbot's own chunker.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    pub chatbot_base_url: String,
    #[serde(default)]
    pub chatbot_chat_path: Option<String>,
}

/// Initialization outcome with the scraped chunks.
#[derive(Debug, Clone, Serialize)]
pub struct RagInitResponse {
    pub session_id: Uuid,
    pub page_url: String,
    pub initialization_status: String,
    pub total_chunks: usize,
    pub chunks: Vec<ChunkInfo>,
    pub chunk_size: usize,
}

/// Human-selected chunks for golden-answer generation.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkSelectionRequest {
    pub session_id: Uuid,
    pub prompt: String,
    /// Chunk indices in reading order chosen by the reviewer.
    pub manual_order: Vec<usize>,
    #[serde(default)]
    pub expected_model: Option<String>,
}

/// Generated golden answer, open for human editing before evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct ExpectedAnswerResponse {
    pub session_id: Uuid,
    pub prompt: String,
    pub generated_answer: String,
    pub selected_chunks: Vec<String>,
}

/// Full evaluation request with the human-confirmed golden answer.
#[derive(Debug, Clone, Deserialize)]
pub struct RagEvaluationRequest {
    pub session_id: Uuid,
    pub prompt: String,
    pub expected_answer: String,
}

/// Complete RAG evaluation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RagEvaluationResult {
    pub evaluation_id: Uuid,
    pub session_id: Uuid,
    pub page_url: String,
    pub prompt: String,
    pub expected_answer: String,
    pub chatbot_answer: String,
    pub metrics: RagMetrics,
    pub llm_comparison: LlmComparison,
    pub execution_time: f64,
    pub created_at: DateTime<Utc>,
}

/// Per-session pipeline state.
#[derive(Debug, Clone)]
struct RagSession {
    page_url: String,
    chunks: Vec<ChunkInfo>,
    model_id: String,
    endpoint_base: String,
    chat_path: String,
}

/// Human-in-the-loop RAG evaluation pipeline.
pub struct RagPipeline {
    evaluation_service: Arc<EvaluationService>,
    generation_service: Arc<GenerationService>,
    endpoint_base: String,
    chat_path: String,
    headers: Vec<(String, String)>,
    judge_provider: String,
    expected_model: String,
    sessions: DashMap<Uuid, RagSession>,
    events: RagEventLog,
    client: reqwest::Client,
}

impl RagPipeline {
    /// Create a pipeline with judge/model defaults taken from
    /// `LEVELAPP_JUDGE_PROVIDER` and `LEVELAPP_EXPECTED_MODEL`.
    pub fn new(
        evaluation_service: Arc<EvaluationService>,
        generation_service: Arc<GenerationService>,
        endpoint_base: impl Into<String>,
        chat_path: impl Into<String>,
    ) -> Self {
        let judge_provider = std::env::var("LEVELAPP_JUDGE_PROVIDER")
            .unwrap_or_else(|_| "openai".to_owned())
            .to_lowercase();
        let expected_model =
            std::env::var("LEVELAPP_EXPECTED_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_owned());
        Self {
            evaluation_service,
            generation_service,
            endpoint_base: normalize_base(endpoint_base.into()),
            chat_path: normalize_path(chat_path.into()),
            headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
            judge_provider,
            expected_model,
            sessions: DashMap::new(),
            events: RagEventLog::default(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the judge provider used for answer comparison.
    #[must_use]
    pub fn with_judge_provider(mut self, provider: impl Into<String>) -> Self {
        self.judge_provider = provider.into().to_lowercase();
        self
    }

    /// Override the model used for golden-answer generation.
    #[must_use]
    pub fn with_expected_model(mut self, model: impl Into<String>) -> Self {
        self.expected_model = model.into();
        self
    }

    /// Add a header sent on every chatbot call.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Events recorded so far (for diagnostics surfaces).
    #[must_use]
    pub fn events(&self) -> Vec<crate::events::RagEvent> {
        self.events.snapshot()
    }

    /// Step 1: warm the chatbot's RAG index and scrape the page into
    /// reorderable chunks.
    pub async fn initialize(&self, request: RagInitRequest) -> Result<RagInitResponse, RagError> {
        let session_id = Uuid::new_v4();
        self.events.record(
            "INFO",
            format!("Starting RAG initialization and scraping for: {}", request.page_url),
        );

        let endpoint_base = if request.chatbot_base_url.is_empty() {
            self.endpoint_base.clone()
        } else {
            normalize_base(request.chatbot_base_url.clone())
        };
        let chat_path = request
            .chatbot_chat_path
            .clone()
            .map_or_else(|| self.chat_path.clone(), normalize_path);

        let init_url = format!("{endpoint_base}/init");
        let response = self
            .request(&init_url, &request.model_id, &json!({"page_url": request.page_url}))
            .await
            .map_err(RagError::InitFailed)?;
        if !response.status().is_success() {
            return Err(RagError::InitFailed(format!("HTTP {}", response.status())));
        }

        let chunks = scrape_page(&self.client, &request.page_url, request.chunk_size).await?;

        self.sessions.insert(
            session_id,
            RagSession {
                page_url: request.page_url.clone(),
                chunks: chunks.clone(),
                model_id: request.model_id,
                endpoint_base,
                chat_path,
            },
        );
        self.events
            .record("INFO", format!("RAG initialized and scraped. Session: {session_id}"));

        Ok(RagInitResponse {
            session_id,
            page_url: request.page_url,
            initialization_status: "initialized".to_owned(),
            total_chunks: chunks.len(),
            chunks,
            chunk_size: request.chunk_size,
        })
    }

    /// Step 2: generate the golden answer from the human-selected chunks.
    ///
    /// When the strict prompt comes back with the exact not-found sentinel
    /// despite non-empty context, retries once with the gentler
    /// summarization prompt.
    pub async fn generate_expected(
        &self,
        request: ChunkSelectionRequest,
    ) -> Result<ExpectedAnswerResponse, RagError> {
        let session = self
            .sessions
            .get(&request.session_id)
            .map(|entry| entry.clone())
            .ok_or(RagError::SessionNotFound(request.session_id))?;

        self.events.record(
            "INFO",
            format!("Generating expected answer for session: {}", request.session_id),
        );

        let selected_chunks: Vec<String> = request
            .manual_order
            .iter()
            .filter_map(|&i| session.chunks.get(i).map(|c| c.content.clone()))
            .collect();

        let model = request
            .expected_model
            .as_deref()
            .unwrap_or(&self.expected_model);

        let messages = build_expected_answer_messages(&selected_chunks, &request.prompt);
        let mut answer = self
            .generation_service
            .generate("openai", &messages, Some(model))
            .await?;

        if answer.trim() == NOT_FOUND_SENTINEL && !selected_chunks.is_empty() {
            self.events.record(
                "INFO",
                "Fallback triggered; retrying expected answer with summarization prompt",
            );
            let fallback = build_fallback_expected_messages(&selected_chunks, &request.prompt);
            answer = self
                .generation_service
                .generate("openai", &fallback, Some(model))
                .await?;
        }

        self.events.record("INFO", "Expected answer generated successfully");
        Ok(ExpectedAnswerResponse {
            session_id: request.session_id,
            prompt: request.prompt,
            generated_answer: answer,
            selected_chunks,
        })
    }

    /// Step 3: query the chatbot, then score its answer with lexical metrics
    /// and the LLM judge concurrently.
    pub async fn evaluate(
        &self,
        request: RagEvaluationRequest,
    ) -> Result<RagEvaluationResult, RagError> {
        let clock = Instant::now();
        let session = self
            .sessions
            .get(&request.session_id)
            .map(|entry| entry.clone())
            .ok_or(RagError::SessionNotFound(request.session_id))?;

        self.events.record(
            "INFO",
            format!("Starting RAG evaluation for session: {}", request.session_id),
        );

        let chatbot_answer = self.query_chatbot(&session, &request.prompt).await?;

        let comparison = compare_answers(
            &self.evaluation_service,
            &self.judge_provider,
            &request.prompt,
            &request.expected_answer,
            &chatbot_answer,
        );
        let metrics_input = (request.expected_answer.clone(), chatbot_answer.clone());
        let metrics_task =
            tokio::task::spawn_blocking(move || compute_metrics(&metrics_input.0, &metrics_input.1));
        let (llm_comparison, metrics) = tokio::join!(comparison, metrics_task);
        let metrics = metrics.unwrap_or_else(|err| {
            warn!(error = %err, "metrics task failed");
            compute_metrics(&request.expected_answer, &chatbot_answer)
        });

        self.events.record("INFO", "RAG evaluation completed successfully");
        Ok(RagEvaluationResult {
            evaluation_id: Uuid::new_v4(),
            session_id: request.session_id,
            page_url: session.page_url,
            prompt: request.prompt,
            expected_answer: request.expected_answer,
            chatbot_answer,
            metrics,
            llm_comparison,
            execution_time: clock.elapsed().as_secs_f64(),
            created_at: Utc::now(),
        })
    }

    /// Remove a session and its data. Returns whether it existed.
    pub fn cleanup_session(&self, session_id: Uuid) -> bool {
        self.sessions.remove(&session_id).is_some()
    }

    /// Query the chatbot at the configured chat path, falling back to the
    /// root path on a non-200.
    async fn query_chatbot(&self, session: &RagSession, prompt: &str) -> Result<String, RagError> {
        let payload = json!({"prompt": prompt});
        let primary_url = format!("{}{}", session.endpoint_base, session.chat_path);

        let mut response = self
            .request(&primary_url, &session.model_id, &payload)
            .await
            .ok()
            .filter(|r| r.status().is_success());

        if response.is_none() && session.chat_path != "/" {
            let fallback_url = format!("{}/", session.endpoint_base);
            self.events.record(
                "WARN",
                format!("Primary chat URL failed; retrying at {fallback_url}"),
            );
            response = self
                .request(&fallback_url, &session.model_id, &payload)
                .await
                .ok()
                .filter(|r| r.status().is_success());
        }

        let Some(response) = response else {
            return Err(RagError::ChatbotUnavailable(
                "no successful response from chat or root path".to_owned(),
            ));
        };

        let body: Value = response
            .json()
            .await
            .map_err(|e| RagError::ChatbotUnavailable(e.to_string()))?;
        Ok(match body.get("response") {
            Some(Value::String(reply)) => reply.clone(),
            Some(other) => other.to_string(),
            None => match body {
                Value::String(reply) => reply,
                other => other.to_string(),
            },
        })
    }

    async fn request(
        &self,
        url: &str,
        model_id: &str,
        payload: &Value,
    ) -> Result<reqwest::Response, String> {
        let mut request = self
            .client
            .post(url)
            .timeout(CHATBOT_TIMEOUT)
            .json(payload);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        request = request.header("x-model-id", model_id);
        request.send().await.map_err(|e| e.to_string())
    }
}

fn normalize_base(base: String) -> String {
    base.trim_end_matches('/').to_owned()
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}
