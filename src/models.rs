use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Placeholder written to subject and message when generation is skipped.
pub const INELIGIBLE: &str = "ineligible";

// ============ Inbound Models ============

/// A prospective contact as supplied by the caller.
///
/// Every field is optional; absent fields are simply left out of prompts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Lead {
    /// Caller-supplied identifier. Numbers are accepted and stringified.
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub lead_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Free-form work history (text, list or object).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub experience: Option<Value>,
    /// Free-form skills (text, list or object).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub skills: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_page_url: Option<String>,
}

impl Lead {
    /// Profile link reported back to the caller: `profile_url`, else `linkedin_url`.
    pub fn profile_link(&self) -> Option<&str> {
        self.profile_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.linkedin_url.as_deref().filter(|s| !s.trim().is_empty()))
    }

    /// The lead record as it is shown to the model.
    pub fn render_for_prompt(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(text)) => Some(text),
        Some(RawId::Number(number)) => Some(number.to_string()),
        None => None,
    })
}

/// Body of `POST /process-leads`.
#[derive(Clone, Deserialize, ToSchema)]
pub struct ProcessRequest {
    /// Model credential for this batch. Never stored or logged.
    #[serde(default)]
    pub api_key: String,
    /// Replaces the startup company context for this batch when non-blank.
    #[serde(default, alias = "wildnet_data")]
    pub company_context: Option<String>,
    /// Extra qualification criteria / ideal customer profile.
    #[serde(default)]
    pub scoring_criteria_and_icp: Option<String>,
    /// Replaces the generic outreach-writing instruction when non-blank.
    #[serde(default)]
    pub message_prompt: Option<String>,
    /// Leads to process, in the order results should come back.
    #[serde(default)]
    pub leads: Vec<Lead>,
}

// ============ Results ============

/// Pipeline stage that talks to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scoring,
    Messaging,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Scoring => write!(f, "scoring"),
            Stage::Messaging => write!(f, "messaging"),
        }
    }
}

/// Validated outcome of the scoring stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Final score in `[0, 100]`.
    pub score: u8,
    /// Model's explanation. Informational only.
    pub reasoning: String,
    /// Exactly 0 or 1.
    pub should_contact: u8,
}

/// Outcome of the messaging stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResult {
    pub subject: String,
    pub message: String,
}

impl MessageResult {
    /// Both fields set to the "not generated" sentinel.
    pub fn ineligible() -> Self {
        Self {
            subject: INELIGIBLE.to_string(),
            message: INELIGIBLE.to_string(),
        }
    }

    pub fn is_generated(&self) -> bool {
        !(self.subject == INELIGIBLE && self.message == INELIGIBLE)
    }
}

/// One entry of the response, in input position.
///
/// A lead that failed keeps its identity fields and has every result field
/// null; the matching `LeadFailure` explains why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeadOutcome {
    pub lead_id: Option<String>,
    pub tag: Option<String>,
    pub name: Option<String>,
    pub linkedin_url: Option<String>,
    pub location: Option<String>,
    pub score: Option<u8>,
    /// Scoring rationale.
    pub response: Option<String>,
    pub should_contact: Option<u8>,
    pub message: Option<String>,
    pub subject: Option<String>,
}

impl LeadOutcome {
    pub fn completed(lead: &Lead, score: &ScoreResult, message: MessageResult) -> Self {
        Self {
            score: Some(score.score),
            response: Some(score.reasoning.clone()),
            should_contact: Some(score.should_contact),
            message: Some(message.message),
            subject: Some(message.subject),
            ..Self::identity(lead)
        }
    }

    pub fn failed(lead: &Lead) -> Self {
        Self::identity(lead)
    }

    fn identity(lead: &Lead) -> Self {
        Self {
            lead_id: lead.lead_id.clone(),
            tag: lead.tag.clone(),
            name: lead.name.clone(),
            linkedin_url: lead.profile_link().map(str::to_string),
            location: lead.location.clone(),
            score: None,
            response: None,
            should_contact: None,
            message: None,
            subject: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.score.is_some()
    }
}

/// Public classification of a per-lead failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network failure or non-2xx answer from the model service.
    UpstreamError,
    /// The model service refused the credential.
    CredentialRejected,
    /// The model service throttled the request.
    RateLimited,
    /// The model call exceeded its timeout.
    Timeout,
    /// The model answered with output that does not fit the schema.
    InvalidModelOutput,
    /// Skipped after the credential was repeatedly refused in the same batch.
    CircuitOpen,
    /// Unexpected internal failure.
    Internal,
}

impl FailureKind {
    /// Caller-facing description. Raw error detail stays in the logs.
    pub fn describe(&self) -> &'static str {
        match self {
            FailureKind::UpstreamError => "the language model service could not be reached",
            FailureKind::CredentialRejected => "the language model service rejected the api_key",
            FailureKind::RateLimited => "the language model service is rate limiting this api_key",
            FailureKind::Timeout => "the language model call timed out",
            FailureKind::InvalidModelOutput => {
                "the language model returned output that did not match the expected schema"
            }
            FailureKind::CircuitOpen => {
                "skipped after the api_key was repeatedly rejected earlier in this batch"
            }
            FailureKind::Internal => "internal error while processing this lead",
        }
    }
}

/// Error record for one lead, listed in the response's `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeadFailure {
    /// Position of the lead in the request.
    pub index: usize,
    pub lead_id: Option<String>,
    pub stage: Option<Stage>,
    pub kind: FailureKind,
    pub detail: String,
}

/// Body returned by `POST /process-leads`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessResponse {
    pub batch_id: Uuid,
    /// Exactly one entry per input lead, in input order.
    pub results: Vec<LeadOutcome>,
    /// One entry per failed lead, ordered by `index`.
    pub errors: Vec<LeadFailure>,
    /// Wall-clock processing time, rounded to milliseconds.
    pub duration_sec: f64,
    pub processed_at: DateTime<Utc>,
}
