//! Batch driver: runs every lead through scoring and (conditional) outreach
//! generation and assembles the per-lead results.
//!
//! Leads are independent. Up to `max_concurrency` of them are in flight at
//! once; each result is written to the slot of its input index, so output
//! order equals input order no matter which lead finishes first. A failing
//! lead produces a `LeadFailure` and never aborts the batch; every lead is
//! attempted unless the model service keeps refusing the credential.

use failsafe::futures::CircuitBreaker as _;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::circuit_breaker::create_upstream_circuit_breaker;
use crate::credential::ApiKey;
use crate::errors::LeadError;
use crate::generator::MessageGenerator;
use crate::llm_client::LanguageModel;
use crate::models::{Lead, LeadFailure, LeadOutcome};
use crate::prompts::PromptContext;
use crate::scorer::LeadScorer;

/// Input of one batch run.
pub struct BatchJob {
    pub leads: Vec<Lead>,
    pub credential: ApiKey,
    pub prompts: PromptContext,
}

/// Output of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One entry per input lead, in input order.
    pub results: Vec<LeadOutcome>,
    /// One entry per failed lead, ordered by index.
    pub errors: Vec<LeadFailure>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.len() - self.errors.len()
    }
}

/// Scoring followed by conditional outreach for a single lead.
#[derive(Clone)]
struct LeadPipeline {
    scorer: LeadScorer,
    generator: MessageGenerator,
}

impl LeadPipeline {
    async fn run(
        &self,
        lead: &Lead,
        prompts: &PromptContext,
        credential: &ApiKey,
    ) -> Result<LeadOutcome, LeadError> {
        let score = self.scorer.score(lead, prompts, credential).await?;
        let message = self
            .generator
            .generate(lead, &score, prompts, credential)
            .await?;
        Ok(LeadOutcome::completed(lead, &score, message))
    }
}

/// Processes batches of leads against a language model.
#[derive(Clone)]
pub struct BatchProcessor {
    pipeline: LeadPipeline,
    max_concurrency: usize,
}

impl BatchProcessor {
    pub fn new(model: Arc<dyn LanguageModel>, max_concurrency: usize) -> Self {
        Self {
            pipeline: LeadPipeline {
                scorer: LeadScorer::new(model.clone()),
                generator: MessageGenerator::new(model),
            },
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn process(&self, job: BatchJob) -> BatchReport {
        let BatchJob {
            leads,
            credential,
            prompts,
        } = job;
        let total = leads.len();
        let credential = Arc::new(credential);
        let prompts = Arc::new(prompts);
        let breaker = create_upstream_circuit_breaker();
        let permits = Arc::new(Semaphore::new(self.max_concurrency));

        tracing::info!(
            "Processing {} lead(s) with concurrency {}",
            total,
            self.max_concurrency
        );

        let mut tasks = JoinSet::new();
        for (index, lead) in leads.iter().cloned().enumerate() {
            let pipeline = self.pipeline.clone();
            let credential = credential.clone();
            let prompts = prompts.clone();
            let breaker = breaker.clone();
            let permits = permits.clone();
            let span = tracing::info_span!(
                "lead",
                index,
                lead_id = lead.lead_id.as_deref().unwrap_or("-")
            );

            tasks.spawn(
                async move {
                    // The semaphore is never closed.
                    let _permit = permits.acquire_owned().await;
                    let outcome = breaker
                        .call_with(LeadError::is_credential_rejection, async {
                            pipeline.run(&lead, &prompts, &credential).await
                        })
                        .await
                        .map_err(|e| match e {
                            failsafe::Error::Inner(err) => err,
                            failsafe::Error::Rejected => LeadError::CircuitOpen,
                        });
                    (index, outcome)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<Result<LeadOutcome, LeadError>>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::error!("Lead task failed to complete: {}", e),
            }
        }

        let mut report = BatchReport::default();
        for (index, (lead, slot)) in leads.iter().zip(slots).enumerate() {
            let outcome = slot.unwrap_or_else(|| {
                Err(LeadError::Aborted("task ended without a result".to_string()))
            });
            match outcome {
                Ok(result) => report.results.push(result),
                Err(err) => {
                    tracing::warn!(
                        "Lead {} ({}) failed: {}",
                        index,
                        lead.lead_id.as_deref().unwrap_or("-"),
                        err
                    );
                    let kind = err.kind();
                    report.errors.push(LeadFailure {
                        index,
                        lead_id: lead.lead_id.clone(),
                        stage: err.stage(),
                        kind,
                        detail: kind.describe().to_string(),
                    });
                    report.results.push(LeadOutcome::failed(lead));
                }
            }
        }

        tracing::info!(
            "Batch complete: {} lead(s), {} succeeded, {} failed",
            total,
            report.succeeded(),
            report.errors.len()
        );
        report
    }
}
