//! LLM-backed claim extraction and contradiction detection.
//!
//! One call extracts `---`-separated claim blocks from the answer; a second
//! call compares the answer against recent history. Both outputs are parsed
//! with the same tolerance as the evaluation protocol: missing keys get
//! defaults, unknown values fall back to the safest variant.

use futures::join;
use tracing::debug;

use crate::error::Result;
use crate::llm::{ChatRequest, LlmGateway};
use crate::session::QaRecord;

use super::types::{Claim, ClaimType, Verifiability};

const EXTRACTION_TEMPERATURE: f64 = 0.2;

/// Extracts claims from candidate answers.
pub struct ClaimExtractor;

impl ClaimExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract claims from an answer and cross-check them against the last
    /// three exchanges. When a contradiction is detected every extracted
    /// claim is coerced to `contradictory`.
    pub async fn extract(
        &self,
        gateway: &LlmGateway,
        answer_text: &str,
        question_text: &str,
        question_id: &str,
        answer_id: &str,
        recent_history: &[&QaRecord],
    ) -> Result<Vec<Claim>> {
        let extraction = gateway.chat(
            ChatRequest::from_prompt(
                extraction_system_prompt(),
                format!(
                    "Question: \"{}\"\n\nAnswer: \"{}\"\n\nExtract the claims.",
                    question_text, answer_text
                ),
            )
            .with_temperature(EXTRACTION_TEMPERATURE),
        );

        let contradiction = async {
            if recent_history.is_empty() {
                Ok(None)
            } else {
                let request = ChatRequest::from_prompt(
                    contradiction_system_prompt(),
                    contradiction_user_prompt(answer_text, recent_history),
                )
                .with_temperature(EXTRACTION_TEMPERATURE);
                gateway.chat(request).await.map(Some)
            }
        };

        let (extraction, contradiction) = join!(extraction, contradiction);

        let raw = extraction?;
        let mut claims = parse_extraction_output(&raw, question_id, answer_id);
        debug!(count = claims.len(), question_id, "extracted claims");

        // the contradiction pass is best-effort; a failed call never blocks
        // the claims it would have annotated
        if let Ok(Some(raw)) = contradiction {
            if let Some(evidence) = parse_contradiction_output(&raw) {
                debug!(question_id, "contradiction detected, coercing claims");
                for claim in &mut claims {
                    claim.mark_contradictory(evidence.clone());
                }
            }
        }

        Ok(claims)
    }
}

impl Default for ClaimExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn extraction_system_prompt() -> &'static str {
    "You are analyzing an interview answer for verifiable claims.\n\n\
     A claim is a concrete statement about the candidate's experience, skills, \
     or achievements that could be probed with a follow-up question.\n\n\
     CLAIM TYPES: technical_achievement, metric, tool_expertise, \
     role_responsibility, project_scale, problem_solved, architecture_decision\n\n\
     VERIFIABILITY: verifiable (specific, checkable), vague (no specifics), \
     suspicious (implausible or inflated)\n\n\
     For EACH claim output a block:\n\
     CLAIM: [the claim, one sentence]\n\
     TYPE: [one of the claim types]\n\
     VERIFIABILITY: [verifiable, vague, or suspicious]\n\
     PRIORITY: [1-10, how important to verify]\n\
     VERIFICATION_QUESTION_1: [a probing question]\n\
     VERIFICATION_QUESTION_2: [another probing question, or omit]\n\
     RED_FLAG: [concern worth recording, or NONE]\n\n\
     Separate blocks with a line containing only ---\n\
     If there are no claims output exactly: NO_CLAIMS"
}

fn contradiction_system_prompt() -> &'static str {
    "You compare a candidate's latest interview answer against their previous \
     answers and decide whether the new answer contradicts anything they said \
     before.\n\n\
     Output exactly two lines:\n\
     CONTRADICTION: [YES or NO]\n\
     EVIDENCE: [one sentence naming the conflicting statements, or NONE]"
}

fn contradiction_user_prompt(answer_text: &str, recent_history: &[&QaRecord]) -> String {
    let mut history = String::new();
    for (i, qa) in recent_history.iter().enumerate() {
        let answer: String = qa.answer_text.chars().take(300).collect();
        history.push_str(&format!(
            "{}. Q: {}\n   A: {}\n",
            i + 1,
            qa.question_text,
            answer
        ));
    }
    format!(
        "PREVIOUS ANSWERS:\n{}\nLATEST ANSWER:\n\"{}\"\n\nDoes the latest answer \
         contradict any previous answer?",
        history, answer_text
    )
}

/// Parse `---`-separated claim blocks.
pub fn parse_extraction_output(raw: &str, question_id: &str, answer_id: &str) -> Vec<Claim> {
    let cleaned = raw.replace("**", "").replace('*', "");
    if cleaned.to_uppercase().contains("NO_CLAIMS") {
        return Vec::new();
    }

    let mut claims = Vec::new();

    for block in cleaned.split("---") {
        let mut text = None;
        let mut claim_type = ClaimType::TechnicalAchievement;
        let mut verifiability = Verifiability::Verifiable;
        let mut priority = 5u8;
        let mut questions = Vec::new();
        let mut red_flags = Vec::new();

        for line in block.lines() {
            let line = line.trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_uppercase();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            if key == "CLAIM" {
                text = Some(value.to_string());
            } else if key == "TYPE" {
                claim_type = ClaimType::parse(value);
            } else if key == "VERIFIABILITY" {
                verifiability = Verifiability::parse(value);
            } else if key == "PRIORITY" {
                priority = value
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse()
                    .unwrap_or(5);
            } else if key.starts_with("VERIFICATION_QUESTION") {
                questions.push(value.to_string());
            } else if key == "RED_FLAG" && !value.eq_ignore_ascii_case("none") {
                red_flags.push(value.to_string());
            }
        }

        let Some(text) = text else { continue };

        let mut claim = Claim::new(
            text,
            claim_type,
            verifiability,
            priority,
            question_id,
            answer_id,
        );
        claim.verification_questions = questions;
        claim.red_flags.extend(red_flags);
        claim.refresh_requires_verification();
        claims.push(claim);
    }

    claims
}

/// Returns the contradiction evidence when the checker answered YES.
pub fn parse_contradiction_output(raw: &str) -> Option<String> {
    let cleaned = raw.replace("**", "").replace('*', "");
    let mut detected = false;
    let mut evidence = String::from("conflicting statements detected");

    for line in cleaned.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim().to_uppercase().as_str() {
            "CONTRADICTION" => detected = value.trim().to_uppercase().contains("YES"),
            "EVIDENCE" => {
                let value = value.trim();
                if !value.is_empty() && !value.eq_ignore_ascii_case("none") {
                    evidence = value.to_string();
                }
            }
            _ => {}
        }
    }

    detected.then_some(evidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_two_blocks() {
        let raw = "\
CLAIM: Reduced API latency by 70%
TYPE: metric
VERIFIABILITY: verifiable
PRIORITY: 8
VERIFICATION_QUESTION_1: What was the latency before and after?
RED_FLAG: NONE
---
CLAIM: Led a team of twelve engineers
TYPE: role_responsibility
VERIFIABILITY: suspicious
PRIORITY: 6
VERIFICATION_QUESTION_1: How were the twelve engineers organized?
RED_FLAG: Team size seems high for the described project";

        let claims = parse_extraction_output(raw, "q_4", "a_4");
        assert_eq!(claims.len(), 2);

        assert_eq!(claims[0].claim_type, ClaimType::Metric);
        assert_eq!(claims[0].priority, 8);
        assert!(claims[0].requires_verification); // priority >= 7
        assert_eq!(claims[0].verification_questions.len(), 1);

        assert_eq!(claims[1].verifiability, Verifiability::Suspicious);
        assert_eq!(claims[1].red_flags.len(), 1);
        assert!(claims[1].requires_verification);
    }

    #[test]
    fn test_parse_no_claims_marker() {
        assert!(parse_extraction_output("NO_CLAIMS", "q_1", "a_1").is_empty());
    }

    #[test]
    fn test_parse_skips_blocks_without_claim_text() {
        let raw = "TYPE: metric\nPRIORITY: 9\n---\nCLAIM: Shipped the billing service\nTYPE: technical_achievement";
        let claims = parse_extraction_output(raw, "q_4", "a_4");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_text, "Shipped the billing service");
    }

    #[test]
    fn test_parse_tolerates_garbage_priority() {
        let raw = "CLAIM: something\nPRIORITY: high";
        let claims = parse_extraction_output(raw, "q_4", "a_4");
        assert_eq!(claims[0].priority, 5);
    }

    #[test]
    fn test_contradiction_yes_with_evidence() {
        let raw = "CONTRADICTION: YES\nEVIDENCE: Earlier they led the team, now they only assisted";
        let evidence = parse_contradiction_output(raw).unwrap();
        assert!(evidence.contains("led the team"));
    }

    #[test]
    fn test_contradiction_no() {
        assert!(parse_contradiction_output("CONTRADICTION: NO\nEVIDENCE: NONE").is_none());
    }

    #[test]
    fn test_contradiction_yes_without_evidence_uses_default() {
        let evidence = parse_contradiction_output("CONTRADICTION: YES\nEVIDENCE: NONE").unwrap();
        assert_eq!(evidence, "conflicting statements detected");
    }
}
