use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use levelapp_core::{
    BasicConversation, BatchResult, ConversationBatch, EvaluationResult, Interaction,
    InteractionResult, ScenarioAttemptResult, ScenarioResult,
};
use levelapp_evaluators::EvaluationService;

use crate::adapter::adapt_agent_response;
use crate::endpoint::EndpointDescriptor;
use crate::sink::ResultSink;
use crate::summary::{
    JustificationEntry, MAX_JUSTIFICATION_BULLETS, average_scores, round2,
    summarize_justifications,
};

/// Drives a [`ConversationBatch`] against the configured agent endpoint and
/// scores every completed turn with all configured judges.
pub struct ConversationSimulator {
    core: Arc<SimulatorCore>,
    batch: ConversationBatch,
    providers: Option<Vec<String>>,
    concurrency: Option<usize>,
    sink: Option<Arc<dyn ResultSink>>,
}

struct SimulatorCore {
    evaluation_service: Arc<EvaluationService>,
    endpoint: EndpointDescriptor,
    client: reqwest::Client,
}

/// Spawned scenario tasks. Cancelling the batch run (dropping its future)
/// aborts whatever is still in flight; partial results are discarded.
#[derive(Default)]
struct ScenarioTasks(Vec<(uuid::Uuid, String, tokio::task::JoinHandle<ScenarioResult>)>);

impl Drop for ScenarioTasks {
    fn drop(&mut self) {
        for (_, _, handle) in &self.0 {
            handle.abort();
        }
    }
}

impl ConversationSimulator {
    /// Create a simulator for one batch against one endpoint.
    #[must_use]
    pub fn new(
        batch: ConversationBatch,
        evaluation_service: Arc<EvaluationService>,
        endpoint: EndpointDescriptor,
    ) -> Self {
        Self {
            core: Arc::new(SimulatorCore {
                evaluation_service,
                endpoint,
                client: reqwest::Client::new(),
            }),
            batch,
            providers: None,
            concurrency: None,
            sink: None,
        }
    }

    /// Restrict judging to an explicit provider list instead of everything
    /// configured on the evaluation service.
    #[must_use]
    pub fn with_providers(mut self, providers: Vec<String>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Bound how many scenarios run concurrently. Defaults to the batch size
    /// (unbounded within the batch).
    #[must_use]
    pub fn with_concurrency(mut self, capacity: usize) -> Self {
        self.concurrency = Some(capacity);
        self
    }

    /// Attach a persistence sink that receives the finished envelope.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run the batch: fan out scenarios, replay `attempts` sub-runs each,
    /// judge every completed turn, and aggregate scores bottom-up.
    ///
    /// Never fails: transport faults, judge faults, and crashed scenario
    /// tasks are all materialized into the returned [`BatchResult`].
    pub async fn run_batch(&self, name: &str, attempts: u32) -> BatchResult {
        let attempts = attempts.max(1);
        info!(name, attempts, scenarios = self.batch.len(), "starting batch test");
        let started_at = Utc::now();
        let clock = Instant::now();

        let providers = self.resolve_providers();
        let capacity = self.concurrency.unwrap_or_else(|| self.batch.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(capacity));

        let mut tasks = ScenarioTasks::default();
        for scenario in self.batch.conversations.iter().cloned() {
            let core = Arc::clone(&self.core);
            let providers = providers.clone();
            let semaphore = Arc::clone(&semaphore);
            let scenario_id = scenario.id;
            let description = scenario.description.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                core.simulate_single_scenario(&scenario, &providers, attempts).await
            });
            tasks.0.push((scenario_id, description, handle));
        }

        // Join in input order; a crashed task yields an empty scenario result
        // so siblings and the batch itself are unaffected.
        let mut scenarios = Vec::with_capacity(tasks.0.len());
        for (scenario_id, description, handle) in tasks.0.drain(..) {
            match handle.await {
                Ok(result) => scenarios.push(result),
                Err(join_error) => {
                    error!(%scenario_id, error = %join_error, "scenario task crashed");
                    scenarios.push(ScenarioResult {
                        scenario_id,
                        description,
                        attempts: Vec::new(),
                        average_scores: BTreeMap::new(),
                    });
                }
            }
        }

        let mut aggregate: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for scenario in &scenarios {
            for (provider, score) in &scenario.average_scores {
                aggregate.entry(provider.clone()).or_default().push(*score);
            }
        }

        let global_justifications = self.collect_justifications(&scenarios);
        let average_execution_time = {
            let durations: Vec<f64> = scenarios
                .iter()
                .flat_map(|s| s.attempts.iter().map(|a| a.execution_time_seconds))
                .collect();
            if durations.is_empty() {
                0.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let mean = durations.iter().sum::<f64>() / durations.len() as f64;
                round2(mean)
            }
        };

        let finished_at = Utc::now();
        let result = BatchResult {
            scenarios,
            average_scores: average_scores(&aggregate),
            global_justifications,
            started_at,
            finished_at,
            total_duration_seconds: clock.elapsed().as_secs_f64(),
            average_execution_time,
        };

        if let Some(sink) = &self.sink
            && let Err(err) = sink.persist(name, &result).await
        {
            warn!(name, error = %err, "failed to persist batch result");
        }

        info!(name, "batch test finished");
        result
    }

    fn resolve_providers(&self) -> Vec<String> {
        match &self.providers {
            Some(providers) => providers.clone(),
            None => {
                let mut providers = self.core.evaluation_service.configured_providers();
                providers.sort();
                providers
            }
        }
    }

    fn collect_justifications(
        &self,
        scenarios: &[ScenarioResult],
    ) -> BTreeMap<String, Vec<String>> {
        let mut per_provider: BTreeMap<String, Vec<JustificationEntry>> = BTreeMap::new();
        for scenario in scenarios {
            let label = if scenario.description.is_empty() {
                scenario.scenario_id.to_string()
            } else {
                scenario.description.clone()
            };
            for attempt in &scenario.attempts {
                for interaction in &attempt.interactions {
                    for (provider, evaluation) in &interaction.evaluation_results {
                        per_provider
                            .entry(provider.clone())
                            .or_default()
                            .push(JustificationEntry {
                                justification: evaluation.justification.clone(),
                                scenario: label.clone(),
                            });
                    }
                }
            }
        }
        per_provider
            .into_iter()
            .map(|(provider, entries)| {
                (
                    provider,
                    summarize_justifications(&entries, MAX_JUSTIFICATION_BULLETS),
                )
            })
            .filter(|(_, bullets)| !bullets.is_empty())
            .collect()
    }
}

impl SimulatorCore {
    /// Run every attempt of one scenario sequentially.
    async fn simulate_single_scenario(
        &self,
        scenario: &BasicConversation,
        providers: &[String],
        attempts: u32,
    ) -> ScenarioResult {
        debug!(scenario_id = %scenario.id, "starting scenario simulation");
        let mut attempt_results = Vec::with_capacity(attempts as usize);
        let mut cross_attempt: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for attempt in 1..=attempts {
            let clock = Instant::now();
            let conversation_id = format!("batch-{attempt}");
            let interactions = self.simulate_interactions(scenario, providers).await;

            // The per-attempt accumulator is private to this attempt.
            let mut collected: BTreeMap<String, Vec<f64>> = providers
                .iter()
                .map(|p| (p.clone(), Vec::new()))
                .collect();
            for interaction in &interactions {
                for (provider, evaluation) in &interaction.evaluation_results {
                    if let Some(scores) = collected.get_mut(provider) {
                        scores.push(f64::from(evaluation.match_level));
                    }
                }
            }

            let attempt_averages = average_scores(&collected);
            for (provider, score) in &attempt_averages {
                cross_attempt.entry(provider.clone()).or_default().push(*score);
            }

            attempt_results.push(ScenarioAttemptResult {
                attempt_id: attempt,
                conversation_id,
                interactions,
                average_scores: attempt_averages,
                execution_time_seconds: round2(clock.elapsed().as_secs_f64()),
            });
        }

        ScenarioResult {
            scenario_id: scenario.id,
            description: scenario.description.clone(),
            attempts: attempt_results,
            average_scores: average_scores(&cross_attempt),
        }
    }

    /// Replay a scenario's interactions strictly in order.
    async fn simulate_interactions(
        &self,
        scenario: &BasicConversation,
        providers: &[String],
    ) -> Vec<InteractionResult> {
        let mut results = Vec::with_capacity(scenario.interactions.len());
        for interaction in &scenario.interactions {
            results.push(self.run_turn(interaction, providers).await);
        }
        results
    }

    /// One turn: call the agent, adapt the reply, fan out to all judges.
    /// Transport failures are contained to the turn.
    async fn run_turn(&self, interaction: &Interaction, providers: &[String]) -> InteractionResult {
        let variables = HashMap::from([(
            "user_message".to_owned(),
            interaction.user_message.clone(),
        )]);
        let payload = self.endpoint.render_payload(&variables);

        let mut request = self
            .client
            .post(&self.endpoint.url)
            .timeout(self.endpoint.timeout)
            .json(&payload);
        for (name, value) in &self.endpoint.headers {
            request = request.header(name, value);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                error!(
                    interaction_id = %interaction.id,
                    error = %err,
                    "inbound interaction request failed"
                );
                return InteractionResult::transport_failure(
                    &interaction.user_message,
                    &interaction.reference_reply,
                    interaction.reference_metadata.clone(),
                );
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(
                interaction_id = %interaction.id,
                status = status.as_u16(),
                "inbound interaction request failed"
            );
            return InteractionResult::transport_failure(
                &interaction.user_message,
                &interaction.reference_reply,
                interaction.reference_metadata.clone(),
            );
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                error!(interaction_id = %interaction.id, error = %err, "failed to read agent reply");
                return InteractionResult::transport_failure(
                    &interaction.user_message,
                    &interaction.reference_reply,
                    interaction.reference_metadata.clone(),
                );
            }
        };

        let agent_reply = adapt_agent_response(&body);
        let evaluation_results = self
            .evaluate_turn(interaction, &agent_reply, providers)
            .await;

        InteractionResult {
            user_message: interaction.user_message.clone(),
            agent_reply,
            reference_reply: interaction.reference_reply.clone(),
            reference_metadata: interaction.reference_metadata.clone(),
            generated_metadata: interaction.generated_metadata.clone(),
            evaluation_results,
        }
    }

    /// Invoke every configured judge in parallel and key results by provider.
    /// A failed judge contributes a level-0 result, not an error.
    async fn evaluate_turn(
        &self,
        interaction: &Interaction,
        agent_reply: &str,
        providers: &[String],
    ) -> BTreeMap<String, EvaluationResult> {
        let futures = providers.iter().map(|provider| async move {
            let outcome = self
                .evaluation_service
                .evaluate_response(
                    provider,
                    agent_reply,
                    &interaction.reference_reply,
                    Some(&interaction.user_message),
                )
                .await;
            let evaluation = outcome.unwrap_or_else(|err| EvaluationResult::failure(err.to_string()));
            (provider.clone(), evaluation)
        });
        join_all(futures).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelapp_core::ConversationBatch;

    #[tokio::test]
    async fn empty_batch_yields_empty_result() {
        let service = Arc::new(EvaluationService::with_client(reqwest::Client::new()));
        let simulator = ConversationSimulator::new(
            ConversationBatch::default(),
            service,
            EndpointDescriptor::new("http://127.0.0.1:1/chat"),
        );
        let result = simulator.run_batch("empty", 1).await;
        assert!(result.scenarios.is_empty());
        assert!(result.average_scores.is_empty());
        assert!(result.global_justifications.is_empty());
        assert!(result.finished_at >= result.started_at);
    }
}
