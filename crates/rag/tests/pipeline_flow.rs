//! End-to-end RAG pipeline tests against local mock services.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use axum::extract::Json;
use axum::response::Html;
use axum::routing::{get, post};
use serde_json::{Value, json};

use levelapp_evaluators::{EvaluationConfig, EvaluationService, MockJudge, judge_factory};
use levelapp_rag::{
    ChunkSelectionRequest, GenerationConfig, GenerationService, NOT_FOUND_SENTINEL,
    RagEvaluationRequest, RagError, RagInitRequest, RagPipeline,
};

const PAGE_HTML: &str = r"
<html><body>
  <p>IONOS offers web hosting with managed TLS certificates.</p>
  <p>Domains can be registered and transferred through the control panel.</p>
  <p>Email inboxes come with spam filtering enabled by default.</p>
</body></html>";

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// One server playing the chatbot, the source page, and the generation
/// provider. `sentinel_first` makes the first generation call return the
/// strict prompt's escape hatch, forcing the fallback retry.
async fn spawn_world(sentinel_first: bool) -> String {
    let generation_calls = Arc::new(AtomicU32::new(0));
    let router = Router::new()
        .route("/init", post(|| async { Json(json!({"status": "ok"})) }))
        .route("/page", get(|| async { Html(PAGE_HTML) }))
        .route(
            "/chat",
            post(|| async { Json(json!({"response": "IONOS offers web hosting with TLS."})) }),
        )
        .route(
            "/v1/chat/completions",
            post(move |Json(_body): Json<Value>| {
                let calls = generation_calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    let content = if sentinel_first && n == 0 {
                        NOT_FOUND_SENTINEL.to_owned()
                    } else {
                        "IONOS provides hosting with managed TLS certificates.".to_owned()
                    };
                    Json(json!({
                        "choices": [{"message": {"role": "assistant", "content": content}}],
                        "usage": {"prompt_tokens": 50, "completion_tokens": 12}
                    }))
                }
            }),
        );
    spawn(router).await
}

fn services(base: &str) -> (Arc<EvaluationService>, Arc<GenerationService>) {
    let evaluation = EvaluationService::with_client(reqwest::Client::new());
    evaluation.register_judge(
        "openai",
        judge_factory(|_, _| MockJudge::scoring(5, "chatbot answer covers everything")),
    );
    evaluation.set_config("openai", EvaluationConfig::new());

    let generation = GenerationService::with_client(reqwest::Client::new());
    generation.set_config(
        "openai",
        GenerationConfig::new().with_api_url(format!("{base}/v1/chat/completions")),
    );
    (Arc::new(evaluation), Arc::new(generation))
}

#[tokio::test]
async fn full_pipeline_flow() {
    let base = spawn_world(false).await;
    let (evaluation, generation) = services(&base);
    let pipeline = RagPipeline::new(evaluation, generation, base.clone(), "/chat")
        .with_judge_provider("openai");

    // Step 1: init + scrape.
    let init = pipeline
        .initialize(RagInitRequest {
            page_url: format!("{base}/page"),
            model_id: "test-model".to_owned(),
            chunk_size: 120,
            chatbot_base_url: base.clone(),
            chatbot_chat_path: Some("/chat".to_owned()),
        })
        .await
        .unwrap();
    assert!(init.total_chunks >= 2, "page splits into multiple chunks");
    assert_eq!(init.initialization_status, "initialized");
    assert!(init.chunks[0].content.contains("web hosting"));

    // Step 2: golden answer from the first chunk.
    let expected = pipeline
        .generate_expected(ChunkSelectionRequest {
            session_id: init.session_id,
            prompt: "What does IONOS offer?".to_owned(),
            manual_order: vec![0, 99],
            expected_model: None,
        })
        .await
        .unwrap();
    assert_eq!(expected.selected_chunks.len(), 1, "out-of-range indices are skipped");
    assert!(expected.generated_answer.contains("hosting"));

    // Step 3: evaluate the chatbot against the golden answer.
    let result = pipeline
        .evaluate(RagEvaluationRequest {
            session_id: init.session_id,
            prompt: "What does IONOS offer?".to_owned(),
            expected_answer: expected.generated_answer,
        })
        .await
        .unwrap();
    assert_eq!(result.llm_comparison.better_answer, "chatbot");
    assert!(result.metrics.bleu_score > 0.0);
    assert!(result.metrics.rouge_l_f1 > 0.0);
    assert!((result.metrics.bertscore_f1).abs() < 1e-9);
    assert!(result.chatbot_answer.contains("hosting"));

    // Cleanup is idempotent.
    assert!(pipeline.cleanup_session(init.session_id));
    assert!(!pipeline.cleanup_session(init.session_id));

    let err = pipeline
        .evaluate(RagEvaluationRequest {
            session_id: init.session_id,
            prompt: "q".to_owned(),
            expected_answer: "a".to_owned(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::SessionNotFound(_)));
}

#[tokio::test]
async fn strict_prompt_sentinel_triggers_fallback_retry() {
    let base = spawn_world(true).await;
    let (evaluation, generation) = services(&base);
    let pipeline = RagPipeline::new(evaluation, generation, base.clone(), "/chat")
        .with_judge_provider("openai");

    let init = pipeline
        .initialize(RagInitRequest {
            page_url: format!("{base}/page"),
            model_id: "test-model".to_owned(),
            chunk_size: 500,
            chatbot_base_url: base.clone(),
            chatbot_chat_path: None,
        })
        .await
        .unwrap();

    let expected = pipeline
        .generate_expected(ChunkSelectionRequest {
            session_id: init.session_id,
            prompt: "What does IONOS offer?".to_owned(),
            manual_order: vec![0],
            expected_model: None,
        })
        .await
        .unwrap();

    // The sentinel from the strict prompt was replaced by the fallback run.
    assert_ne!(expected.generated_answer, NOT_FOUND_SENTINEL);
    assert!(expected.generated_answer.contains("hosting"));
}

#[tokio::test]
async fn unknown_session_is_reported() {
    let base = spawn_world(false).await;
    let (evaluation, generation) = services(&base);
    let pipeline = RagPipeline::new(evaluation, generation, base, "/chat");

    let err = pipeline
        .generate_expected(ChunkSelectionRequest {
            session_id: uuid::Uuid::new_v4(),
            prompt: "q".to_owned(),
            manual_order: vec![0],
            expected_model: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::SessionNotFound(_)));
}
