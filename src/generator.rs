use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::credential::ApiKey;
use crate::errors::LeadError;
use crate::extraction::{extract, required_text, ExtractionError, StructuredOutput};
use crate::llm_client::{CompletionRequest, LanguageModel};
use crate::models::{Lead, MessageResult, ScoreResult, Stage, INELIGIBLE};
use crate::prompts::PromptContext;

/// Higher temperature for varied copy.
pub const MESSAGE_TEMPERATURE: f32 = 0.6;

/// Minimum score (inclusive) for which outreach is written.
pub const MESSAGE_THRESHOLD: u8 = 50;

/// The outreach reply as the model writes it.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageReply {
    #[serde(rename = "SUBJECT", alias = "subject")]
    pub subject: String,
    #[serde(rename = "MESSAGE", alias = "message")]
    pub message: String,
}

impl StructuredOutput for MessageReply {
    type Output = MessageResult;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "SUBJECT": {
                    "type": "string",
                    "description": "A catchy subject line for the outreach email, within 5-7 words."
                },
                "MESSAGE": {
                    "type": "string",
                    "description": "A personalized outreach message for the lead, within 50-70 words."
                }
            },
            "required": ["SUBJECT", "MESSAGE"]
        })
    }

    fn into_validated(self) -> Result<MessageResult, ExtractionError> {
        Ok(MessageResult {
            subject: outreach_text("SUBJECT", self.subject)?,
            message: outreach_text("MESSAGE", self.message)?,
        })
    }
}

/// Generated copy must be non-blank and must not collide with the skip marker.
fn outreach_text(field: &'static str, value: String) -> Result<String, ExtractionError> {
    let text = required_text(field, value)?;
    if text.eq_ignore_ascii_case(INELIGIBLE) {
        return Err(ExtractionError::invalid(
            field,
            "must not be the ineligible placeholder",
        ));
    }
    Ok(text)
}

pub fn is_eligible(score: &ScoreResult) -> bool {
    score.score >= MESSAGE_THRESHOLD
}

/// Writes outreach for leads that cleared the score threshold.
#[derive(Clone)]
pub struct MessageGenerator {
    model: Arc<dyn LanguageModel>,
}

impl MessageGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Below the threshold this returns the `ineligible` sentinel without
    /// calling the model.
    pub async fn generate(
        &self,
        lead: &Lead,
        score: &ScoreResult,
        prompts: &PromptContext,
        credential: &ApiKey,
    ) -> Result<MessageResult, LeadError> {
        if !is_eligible(score) {
            tracing::debug!(
                "Score {} below {}, skipping outreach",
                score.score,
                MESSAGE_THRESHOLD
            );
            return Ok(MessageResult::ineligible());
        }

        let prompt = prompts.message_prompt(lead);
        let raw = self
            .model
            .complete(
                credential,
                CompletionRequest {
                    system: prompt.system,
                    user: prompt.user,
                    temperature: MESSAGE_TEMPERATURE,
                },
            )
            .await
            .map_err(|source| LeadError::Upstream {
                stage: Stage::Messaging,
                source,
            })?;

        extract::<MessageReply>(&raw).map_err(|source| {
            tracing::warn!("Outreach output rejected: {}", source);
            LeadError::InvalidOutput {
                stage: Stage::Messaging,
                source,
            }
        })
    }
}
