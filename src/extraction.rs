//! Structured extraction of model replies.
//!
//! Contract: a reply type declares the JSON schema it asks the model for
//! ([`StructuredOutput::schema`]) and how a decoded reply is validated into
//! the domain value ([`StructuredOutput::into_validated`]). [`extract`] does
//! the rest:
//!
//! 1. locate one JSON object in the raw text (bare, fenced in a code block,
//!    or surrounded by prose),
//! 2. decode it into the reply type,
//! 3. validate / repair it into the output value.
//!
//! Any step failing is an [`ExtractionError`]; nothing is silently defaulted.
//! Prompt construction only depends on [`format_instructions`], so the
//! strategy here can change without touching the prompts.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

/// Errors returned when a model reply cannot be turned into its schema.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// No JSON object anywhere in the reply.
    #[error("no JSON object found in model output")]
    NoJsonObject,
    /// Found something object-shaped that does not decode into the schema.
    #[error("model output does not match schema: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Decoded, but a field value is out of contract.
    #[error("invalid value for {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

impl ExtractionError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ExtractionError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// A reply schema the model is asked to fill in.
pub trait StructuredOutput: DeserializeOwned {
    /// Domain value produced after validation.
    type Output;

    /// JSON schema shown to the model.
    fn schema() -> Value;

    /// Validation and repair step.
    fn into_validated(self) -> Result<Self::Output, ExtractionError>;
}

/// Output-format directive appended to every prompt that expects `T`.
pub fn format_instructions<T: StructuredOutput>() -> String {
    let schema = serde_json::to_string_pretty(&T::schema()).unwrap_or_default();
    format!(
        "Return your answer as a single JSON object that conforms to the JSON schema below. \
Use exactly the listed property names, include every required property and nothing else, \
and do not add any text before or after the object.\n\
```json\n{}\n```",
        schema
    )
}

/// Parses a raw model reply into `T::Output`.
pub fn extract<T: StructuredOutput>(raw: &str) -> Result<T::Output, ExtractionError> {
    let candidate = locate_json_object(raw).ok_or(ExtractionError::NoJsonObject)?;
    let reply: T = serde_json::from_str(candidate)?;
    reply.into_validated()
}

fn fenced_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```").expect("fence pattern is valid")
    })
}

fn locate_json_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }
    if let Some(inner) = fenced_block().captures(trimmed).and_then(|c| c.get(1)) {
        return Some(inner.as_str());
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// A number the model may have written as a number, a numeric string or a
/// boolean.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LenientNumber {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl LenientNumber {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            LenientNumber::Number(n) => *n,
            LenientNumber::Bool(b) => f64::from(u8::from(*b)),
            LenientNumber::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Requires a non-blank string, trimmed.
pub fn required_text(field: &'static str, value: String) -> Result<String, ExtractionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::invalid(field, "must not be blank"));
    }
    Ok(trimmed.to_string())
}
