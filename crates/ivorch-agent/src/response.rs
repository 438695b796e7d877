use ivorch_domain::model::{ClaimCategory, TurnIntent, Verdict};
use serde::{Deserialize, Serialize};

/// Closed set of structured shapes the Agent Runtime is ever asked to
/// produce (spec.md §4.2, §4.5, §4.8). Each prompt template names exactly
/// one of these as its expected response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "response_type")]
pub enum StructuredResponse {
    InterviewerTurn {
        utterance: String,
        want_followup: bool,
        intent: TurnIntent,
    },
    ClaimVerdict {
        verdict: Verdict,
        confidence: f32,
        supporting_claim_ids: Vec<String>,
        category: ClaimCategory,
        reasoning: String,
    },
    FinalSummary {
        summary: String,
        category: Option<ClaimCategory>,
    },
    HirabilityAssessment {
        technical: f64,
        ai_ml: f64,
        experience: f64,
        education: f64,
        soft: f64,
        reasoning: String,
    },
}

/// Strip a ```json fenced block if the model wrapped its JSON in one;
/// otherwise return the input unchanged. LLMs ignored instructed to
/// respond with raw JSON still do this often enough to be worth handling
/// before falling back to a schema-retry.
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.trim().strip_suffix("```").unwrap_or(rest).trim()
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.trim().strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_fenced_block() {
        let raw = "```json\n{\"a\":1}\n```";
        assert_eq!(extract_json(raw), "{\"a\":1}");
    }

    #[test]
    fn extract_json_passes_through_plain_json() {
        assert_eq!(extract_json("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn interviewer_turn_round_trips() {
        let resp = StructuredResponse::InterviewerTurn {
            utterance: "Tell me about X.".into(),
            want_followup: true,
            intent: TurnIntent::Question,
        };
        let raw = serde_json::to_string(&resp).unwrap();
        let back: StructuredResponse = serde_json::from_str(&raw).unwrap();
        match back {
            StructuredResponse::InterviewerTurn { utterance, .. } => {
                assert_eq!(utterance, "Tell me about X.")
            }
            _ => panic!("wrong variant"),
        }
    }
}
