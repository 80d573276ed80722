//! Prompt construction for the scoring and messaging calls.
//!
//! Everything here is deterministic: the same lead and context always give
//! the same text.

use crate::context::CompanyContext;
use crate::extraction::format_instructions;
use crate::generator::MessageReply;
use crate::geo::{apply_multiplier, LocationTier};
use crate::models::{Lead, ProcessRequest};
use crate::scorer::ScoreReply;

/// Base score used for the worked example in criterion 3.
const EXAMPLE_BASE_SCORE: u8 = 70;

const DEFAULT_MESSAGE_INSTRUCTION: &str = "Produce a compelling subject line (5-7 words) and a \
personalized outreach message (50-70 words) tailored to the lead.";

/// System and user text of one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Request-level texts that adjust the prompts for one batch.
///
/// Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptOverrides {
    pub company_context: Option<String>,
    pub scoring_criteria: Option<String>,
    pub message_prompt: Option<String>,
}

impl PromptOverrides {
    pub fn from_request(request: &ProcessRequest) -> Self {
        Self {
            company_context: non_blank(request.company_context.as_deref()),
            scoring_criteria: non_blank(request.scoring_criteria_and_icp.as_deref()),
            message_prompt: non_blank(request.message_prompt.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Everything the prompts of one batch are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    company_name: String,
    partner_platform: String,
    document: String,
    scoring_criteria: Option<String>,
    message_instruction: Option<String>,
}

impl PromptContext {
    pub fn new(company: &CompanyContext, overrides: PromptOverrides) -> Self {
        Self {
            company_name: company.company_name.clone(),
            partner_platform: company.partner_platform.clone(),
            document: overrides
                .company_context
                .unwrap_or_else(|| company.document().to_string()),
            scoring_criteria: overrides.scoring_criteria,
            message_instruction: overrides.message_prompt,
        }
    }

    /// Prompt for the scoring call.
    pub fn scoring_prompt(&self, lead: &Lead) -> PromptPair {
        let company = &self.company_name;
        let platform = &self.partner_platform;

        let mut system = format!(
            "You are an expert lead qualifier. We ({company}) as a company offer the following \
services to our clients:\n\
{company}: ```{document}```\n\n\
Your task is to evaluate whether each lead is a potential buyer of our {platform} services, or \
instead a potential seller of {platform} services like us. Score the lead on a scale of 0-100 \
using criteria 1 and 2, then multiply that score by the location multiplier of criterion 3 to \
get the final score.\n\n\
Criteria - 1 (high weightage): The lead must hold a position of authority such as Manager, \
Senior Manager, Director, Head, VP, C-suite or Founder, not an individual-contributor role \
(Developer, Analyst, etc.). Give extra points, and say so explicitly, when the lead is in an IT \
department, but only if they also hold one of those positions.\n\n\
Criteria - 2 (very high weightage): The lead's COMPANY must not itself offer IT or software \
services like {company}: its industry must not be \"IT or software services\" or any of the \
services listed above within triple backticks, i.e. it must not be our direct competitor. The \
company must also not be a partner or reseller of {platform} like us. Use the provided lead \
details to work out what their company does. If you cannot determine it, say so in your \
response and give a score between 40 and 60, provided criterion 1 is satisfied. Do not make \
assumptions.\n\n\
Criteria - 3: After scoring on the two criteria above, apply this multiplier based on the \
lead's location:\n\
- If the lead is located in {primary} - multiply the score by {primary_factor}\n\
- If the lead is located in {secondary} - multiply the score by {secondary_factor}\n\
- If the lead is located in any other country - multiply the score by {other_factor}\n\
For example, if a lead scores {base} on the first two criteria, the final score is \
{base}*{primary_factor}={primary_example} in USA, {base}*{secondary_factor}={secondary_example} \
in India and {base}*{other_factor}={other_example} in any other country. Round the final score \
to the nearest whole number.",
            document = self.document,
            primary = LocationTier::Primary.country_list(),
            secondary = LocationTier::Secondary.country_list(),
            primary_factor = LocationTier::Primary.multiplier(),
            secondary_factor = LocationTier::Secondary.multiplier(),
            other_factor = LocationTier::Other.multiplier(),
            base = EXAMPLE_BASE_SCORE,
            primary_example = apply_multiplier(EXAMPLE_BASE_SCORE, LocationTier::Primary),
            secondary_example = apply_multiplier(EXAMPLE_BASE_SCORE, LocationTier::Secondary),
            other_example = apply_multiplier(EXAMPLE_BASE_SCORE, LocationTier::Other),
        );

        if let Some(criteria) = &self.scoring_criteria {
            system.push_str(&format!(
                "\n\nAdditional qualification criteria and ideal customer profile provided by \
the sales team. Apply them together with criteria 1 and 2; they never replace the location \
multiplier of criterion 3:\n```{}```",
                criteria
            ));
        }

        let user = format!(
            "Evaluate this lead for potential:\n{lead}\n\n\
Should we approach this lead? Score the lead based on the rules above (0-100) and explain your \
reasoning, including the lead's location, based on how well they match our services. Keep the \
scoring strict and give a high score only to leads that fulfil all the criteria to a good \
extent.\n\n{format}",
            lead = lead.render_for_prompt(),
            format = format_instructions::<ScoreReply>(),
        );

        PromptPair { system, user }
    }

    /// Prompt for the messaging call.
    pub fn message_prompt(&self, lead: &Lead) -> PromptPair {
        let instruction = self
            .message_instruction
            .as_deref()
            .unwrap_or(DEFAULT_MESSAGE_INSTRUCTION);

        let system = format!(
            "You are an expert sales development representative crafting concise, personalized \
outreach on behalf of {company}.\n\
Company context ({company} services):\n```{document}```\n{instruction}",
            company = self.company_name,
            document = self.document,
            instruction = instruction,
        );

        let user = format!(
            "Lead info:\n{lead}\n\nGenerate outreach.\n{format}",
            lead = lead.render_for_prompt(),
            format = format_instructions::<MessageReply>(),
        );

        PromptPair { system, user }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> CompanyContext {
        CompanyContext::new(
            "WildnetEdge",
            "Salesforce",
            "Salesforce consulting, implementation and managed services.",
        )
    }

    fn lead() -> Lead {
        Lead {
            lead_id: Some("42".to_string()),
            name: Some("Jane Doe".to_string()),
            title: Some("Director of Operations".to_string()),
            company_name: Some("Acme Manufacturing".to_string()),
            location: Some("United States".to_string()),
            ..Lead::default()
        }
    }

    #[test]
    fn test_scoring_prompt_embeds_rubric_and_context() {
        let prompts = PromptContext::new(&company(), PromptOverrides::default());
        let pair = prompts.scoring_prompt(&lead());

        assert!(pair.system.contains("Salesforce consulting, implementation"));
        assert!(pair.system.contains("partner or reseller of Salesforce"));
        assert!(pair.system.contains("between 40 and 60"));
        assert!(pair.system.contains(
            "USA, Canada, UK, Germany, Italy, France, Netherlands, Switzerland, Sweden, Ireland, Australia, Singapore"
        ));
        assert!(pair.system.contains("70*0.8=56"));
        assert!(pair.system.contains("70*0.5=35"));
        assert!(!pair.system.contains("Additional qualification criteria"));
    }

    #[test]
    fn test_scoring_prompt_user_message() {
        let prompts = PromptContext::new(&company(), PromptOverrides::default());
        let pair = prompts.scoring_prompt(&lead());

        assert!(pair.user.contains("Acme Manufacturing"));
        assert!(pair.user.contains("to a good extent"));
        assert!(pair.user.contains("SCORE"));
        assert!(pair.user.contains("RESPONSE"));
        assert!(pair.user.contains("SHOULD_CONTACT"));
        assert!(!pair.user.contains("SUBJECT"));
    }

    #[test]
    fn test_overrides_apply() {
        let overrides = PromptOverrides {
            company_context: Some("We resell nothing; we build ERPs.".to_string()),
            scoring_criteria: Some("Prefer manufacturing firms over 500 employees.".to_string()),
            message_prompt: Some("Write in a warm, informal tone.".to_string()),
        };
        let prompts = PromptContext::new(&company(), overrides);

        let scoring = prompts.scoring_prompt(&lead());
        assert!(scoring.system.contains("We resell nothing"));
        assert!(!scoring.system.contains("managed services"));
        assert!(scoring.system.contains("Prefer manufacturing firms"));

        let message = prompts.message_prompt(&lead());
        assert!(message.system.contains("warm, informal tone"));
        assert!(!message.system.contains("50-70 words"));
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let request: ProcessRequest = serde_json::from_value(serde_json::json!({
            "api_key": "k",
            "company_context": "   ",
            "scoring_criteria_and_icp": "",
            "message_prompt": "\n",
            "leads": []
        }))
        .unwrap();
        assert_eq!(
            PromptOverrides::from_request(&request),
            PromptOverrides::default()
        );
    }

    #[test]
    fn test_message_prompt_defaults() {
        let prompts = PromptContext::new(&company(), PromptOverrides::default());
        let pair = prompts.message_prompt(&lead());
        assert!(pair.system.contains("on behalf of WildnetEdge"));
        assert!(pair.system.contains("5-7 words"));
        assert!(pair.user.contains("Jane Doe"));
        assert!(pair.user.contains("SUBJECT"));
        assert!(pair.user.contains("MESSAGE"));
        assert!(!pair.user.contains("SHOULD_CONTACT"));
    }

    #[test]
    fn test_prompts_are_deterministic() {
        let prompts = PromptContext::new(&company(), PromptOverrides::default());
        assert_eq!(prompts.scoring_prompt(&lead()), prompts.scoring_prompt(&lead()));
    }
}
