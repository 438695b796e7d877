//! Verification-prompt assembly and nudge-text composition
//! (spec.md §4.5).

use ivorch_agent::prompt::{PromptBuilder, PromptSection};
use ivorch_agent::traits::CompletionRequest;
use ivorch_domain::model::{ClaimCategory, NudgeIntensity};
use ivorch_knowledge::oracle::OracleResult;

const MAX_SECTION_CHARS: usize = 2000;
const MAX_PROMPT_CHARS: usize = 8000;

/// Build the verify-claim request: the oracle's best match plus any other
/// claims in its category, so the model can judge an actual conflict
/// rather than a plain lack of textual overlap (spec.md §4.4).
pub fn build_verification_request(utterance: &str, oracle: &OracleResult) -> CompletionRequest {
    let best_match = oracle
        .best_match
        .as_ref()
        .map(|m| format!("[{:?}] {} (score {:.2})", m.claim.category, m.claim.text, m.score))
        .unwrap_or_else(|| "(no relevant claim found)".into());

    let contradictions = if oracle.contradictions.is_empty() {
        "(none)".to_string()
    } else {
        oracle
            .contradictions
            .iter()
            .map(|m| format!("- [{:?}] {}", m.claim.category, m.claim.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let sections = vec![
        PromptSection { name: "best_matching_claim".into(), content: best_match },
        PromptSection { name: "other_claims_in_category".into(), content: contradictions },
        PromptSection { name: "candidate_utterance".into(), content: utterance.to_string() },
    ];
    let builder = PromptBuilder::new(MAX_SECTION_CHARS, MAX_PROMPT_CHARS);
    let (body, _report) = builder.build(&sections);

    CompletionRequest {
        system_prompt: "You fact-check one interview utterance against recorded claims about \
            the candidate. Respond as JSON: {\"response_type\":\"ClaimVerdict\",\
            \"verdict\":\"consistent\"|\"unverifiable\"|\"contradicted\",\"confidence\":0..1,\
            \"supporting_claim_ids\":[...],\"category\":\"experience\"|\"education\"|\"skill\"|\
            \"project\"|\"achievement\"|\"personal\",\"reasoning\":\"...\"}. Only use \
            \"contradicted\" when the utterance actually conflicts with a specific recorded \
            detail, not merely when it adds new information."
            .into(),
        user_prompt: body,
        temperature: 0.1,
        max_tokens: 300,
    }
}

/// Compose a nudge prompt that presses on the contradiction without
/// quoting the underlying claim verbatim — the candidate should feel
/// challenged, not see their source material (spec.md §4.5 step 3).
pub fn compose_nudge_text(category: ClaimCategory, intensity: NudgeIntensity) -> String {
    let topic = match category {
        ClaimCategory::Experience => "your work history",
        ClaimCategory::Education => "your educational background",
        ClaimCategory::Skill => "the skills you listed",
        ClaimCategory::Project => "that project",
        ClaimCategory::Achievement => "that achievement",
        ClaimCategory::Personal => "what you said about yourself",
    };

    match intensity {
        NudgeIntensity::Polite => {
            format!("Quick clarification — can you say a bit more about {topic}? I want to make sure I've got the details right.")
        }
        NudgeIntensity::Firm => {
            format!("That doesn't quite match what I have on file about {topic}. Can you walk me through it again, specifically?")
        }
        NudgeIntensity::Aggressive => {
            format!("I'm going to push back here: what you've said about {topic} conflicts with what's on record. Please clarify precisely.")
        }
        NudgeIntensity::FinalWarning => {
            format!("I want to be direct: there's a real inconsistency in what you've told me about {topic}. This is your chance to set the record straight.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nudge_text_varies_by_intensity_and_never_quotes_claim_verbatim() {
        let claim_text = "4 years at Acme Corp";
        for intensity in [
            NudgeIntensity::Polite,
            NudgeIntensity::Firm,
            NudgeIntensity::Aggressive,
            NudgeIntensity::FinalWarning,
        ] {
            let text = compose_nudge_text(ClaimCategory::Experience, intensity);
            assert!(!text.contains(claim_text));
        }
    }

    #[test]
    fn distinct_intensities_produce_distinct_text() {
        let polite = compose_nudge_text(ClaimCategory::Skill, NudgeIntensity::Polite);
        let firm = compose_nudge_text(ClaimCategory::Skill, NudgeIntensity::Firm);
        assert_ne!(polite, firm);
    }
}
