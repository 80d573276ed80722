use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::credential::ApiKey;
use crate::errors::LeadError;
use crate::extraction::{extract, ExtractionError, LenientNumber, StructuredOutput};
use crate::geo::LocationTier;
use crate::llm_client::{CompletionRequest, LanguageModel};
use crate::models::{Lead, ScoreResult, Stage};
use crate::prompts::PromptContext;

/// Low temperature for consistent scoring.
pub const SCORING_TEMPERATURE: f32 = 0.3;

/// The scoring reply as the model writes it.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreReply {
    #[serde(rename = "SCORE", alias = "score")]
    pub score: LenientNumber,
    #[serde(rename = "RESPONSE", alias = "response", alias = "reasoning")]
    pub response: String,
    #[serde(rename = "SHOULD_CONTACT", alias = "should_contact")]
    pub should_contact: LenientNumber,
}

impl StructuredOutput for ScoreReply {
    type Output = ScoreResult;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "SCORE": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": 100,
                    "description": "Final lead score between 0 and 100, after the location multiplier"
                },
                "RESPONSE": {
                    "type": "string",
                    "description": "Reasoning for the score, including the lead's location. Write within the range of 50-100 words."
                },
                "SHOULD_CONTACT": {
                    "type": "integer",
                    "enum": [0, 1],
                    "description": "1 if the lead should be contacted, else 0"
                }
            },
            "required": ["SCORE", "RESPONSE", "SHOULD_CONTACT"]
        })
    }

    fn into_validated(self) -> Result<ScoreResult, ExtractionError> {
        let raw_score = self
            .score
            .as_f64()
            .ok_or_else(|| ExtractionError::invalid("SCORE", "not a finite number"))?;
        Ok(ScoreResult {
            score: normalize_score(raw_score),
            reasoning: self.response.trim().to_string(),
            should_contact: contact_flag(&self.should_contact)?,
        })
    }
}

/// Rounds half up and clamps into `[0, 100]`.
pub fn normalize_score(raw: f64) -> u8 {
    let rounded = (raw + 0.5).floor();
    let clamped = rounded.clamp(0.0, 100.0);
    if clamped != rounded {
        tracing::warn!("Model score {} outside [0, 100], clamped to {}", raw, clamped);
    }
    clamped as u8
}

fn contact_flag(value: &LenientNumber) -> Result<u8, ExtractionError> {
    match value.as_f64() {
        Some(flag) if flag == 0.0 => Ok(0),
        Some(flag) if flag == 1.0 => Ok(1),
        _ => Err(ExtractionError::invalid(
            "SHOULD_CONTACT",
            format!("expected 0 or 1, got {:?}", value),
        )),
    }
}

/// Scores a lead against the qualification rubric.
#[derive(Clone)]
pub struct LeadScorer {
    model: Arc<dyn LanguageModel>,
}

impl LeadScorer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn score(
        &self,
        lead: &Lead,
        prompts: &PromptContext,
        credential: &ApiKey,
    ) -> Result<ScoreResult, LeadError> {
        let tier = LocationTier::classify(lead.location.as_deref());
        tracing::debug!(
            "Scoring lead with {} (location tier {:?})",
            self.model.model_id(),
            tier
        );

        let prompt = prompts.scoring_prompt(lead);
        let raw = self
            .model
            .complete(
                credential,
                CompletionRequest {
                    system: prompt.system,
                    user: prompt.user,
                    temperature: SCORING_TEMPERATURE,
                },
            )
            .await
            .map_err(|source| LeadError::Upstream {
                stage: Stage::Scoring,
                source,
            })?;

        let result = extract::<ScoreReply>(&raw).map_err(|source| {
            tracing::warn!("Scoring output rejected: {}", source);
            LeadError::InvalidOutput {
                stage: Stage::Scoring,
                source,
            }
        })?;

        tracing::info!(
            "Lead scored {} (should_contact={})",
            result.score,
            result.should_contact
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompanyContext;
    use crate::llm_client::ModelError;
    use crate::prompts::PromptOverrides;
    use crate::test_support::ScriptedModel;

    fn parse(raw: &str) -> Result<ScoreResult, ExtractionError> {
        extract::<ScoreReply>(raw)
    }

    fn prompts() -> PromptContext {
        PromptContext::new(
            &CompanyContext::new("WildnetEdge", "Salesforce", "Salesforce consulting."),
            PromptOverrides::default(),
        )
    }

    fn key() -> ApiKey {
        ApiKey::parse("test-key").unwrap()
    }

    #[test]
    fn test_score_boundaries() {
        assert_eq!(normalize_score(0.0), 0);
        assert_eq!(normalize_score(50.0), 50);
        assert_eq!(normalize_score(100.0), 100);
        assert_eq!(normalize_score(101.0), 100);
        assert_eq!(normalize_score(-1.0), 0);
    }

    #[test]
    fn test_score_rounds_half_up() {
        assert_eq!(normalize_score(55.5), 56);
        assert_eq!(normalize_score(49.5), 50);
        assert_eq!(normalize_score(49.4), 49);
        assert_eq!(normalize_score(56.000000000000014), 56);
    }

    #[test]
    fn test_parse_well_formed_reply() {
        let result = parse(
            r#"{"SCORE": 70, "RESPONSE": "Director at a manufacturer in the USA.", "SHOULD_CONTACT": 1}"#,
        )
        .unwrap();
        assert_eq!(
            result,
            ScoreResult {
                score: 70,
                reasoning: "Director at a manufacturer in the USA.".to_string(),
                should_contact: 1,
            }
        );
    }

    #[test]
    fn test_parse_repairs_loose_types() {
        let result =
            parse(r#"{"score": "56", "reasoning": "ok", "should_contact": false}"#).unwrap();
        assert_eq!(result.score, 56);
        assert_eq!(result.should_contact, 0);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let high = parse(r#"{"SCORE": 101, "RESPONSE": "x", "SHOULD_CONTACT": 1}"#).unwrap();
        assert_eq!(high.score, 100);
        let low = parse(r#"{"SCORE": -1, "RESPONSE": "x", "SHOULD_CONTACT": 0}"#).unwrap();
        assert_eq!(low.score, 0);
    }

    #[test]
    fn test_invalid_contact_flag_rejected() {
        let err = parse(r#"{"SCORE": 70, "RESPONSE": "x", "SHOULD_CONTACT": 2}"#).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::InvalidField {
                field: "SHOULD_CONTACT",
                ..
            }
        ));
    }

    #[test]
    fn test_non_numeric_score_rejected() {
        let err =
            parse(r#"{"SCORE": "high", "RESPONSE": "x", "SHOULD_CONTACT": 1}"#).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::InvalidField { field: "SCORE", .. }
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        assert!(matches!(
            parse(r#"{"SCORE": 70, "SHOULD_CONTACT": 1}"#),
            Err(ExtractionError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_scorer_uses_low_temperature() {
        let model = ScriptedModel::new(|_| {
            Ok(r#"{"SCORE": 70, "RESPONSE": "fits", "SHOULD_CONTACT": 1}"#.to_string())
        });
        let scorer = LeadScorer::new(model.clone());
        let lead = Lead {
            company_name: Some("Acme Manufacturing".to_string()),
            ..Lead::default()
        };

        let result = scorer.score(&lead, &prompts(), &key()).await.unwrap();
        assert_eq!(result.score, 70);

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!((requests[0].temperature - 0.3).abs() < f32::EPSILON);
        assert!(requests[0].user.contains("Acme Manufacturing"));
        assert!(requests[0].system.contains("Salesforce consulting."));
    }

    #[tokio::test]
    async fn test_scorer_distinguishes_failure_kinds() {
        let unreachable = LeadScorer::new(ScriptedModel::new(|_| Err(ModelError::Timeout)));
        let err = unreachable
            .score(&Lead::default(), &prompts(), &key())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LeadError::Upstream {
                stage: Stage::Scoring,
                source: ModelError::Timeout
            }
        ));

        let incoherent =
            LeadScorer::new(ScriptedModel::new(|_| Ok("I think 70 or so".to_string())));
        let err = incoherent
            .score(&Lead::default(), &prompts(), &key())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LeadError::InvalidOutput {
                stage: Stage::Scoring,
                ..
            }
        ));
    }
}
