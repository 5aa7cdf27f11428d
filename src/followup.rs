//! Follow-up question generation after interruptions.
//!
//! Each interruption reason has its own prompt strategy. The off-topic case
//! never calls the LLM: the redirect is fixed. All LLM paths degrade to a
//! fixed clarification question, so this generator never fails.

use tracing::warn;

use crate::eval::clean_question;
use crate::interrupt::InterruptionReason;
use crate::llm::{ChatRequest, LlmGateway};
use crate::session::QaRecord;

const FOLLOWUP_TEMPERATURE: f64 = 0.7;
const FALLBACK_FOLLOWUP: &str = "Can you clarify what you just said?";

/// Generates sharp one-sentence follow-ups keyed by interruption reason.
pub struct FollowupGenerator;

impl FollowupGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a follow-up question for an interruption.
    pub async fn generate(
        &self,
        gateway: &LlmGateway,
        reason: InterruptionReason,
        partial_answer: &str,
        original_question: &str,
        recent_history: &[&QaRecord],
        evidence: &str,
    ) -> String {
        // fixed redirect, no LLM round-trip
        if reason == InterruptionReason::CompletelyOffTopic {
            return format!(
                "That's not what I asked. Let me be specific: {}",
                original_question
            );
        }

        let system = self.strategy_prompt(reason, partial_answer, original_question, recent_history, evidence);
        let request = ChatRequest::from_prompt(system, "Generate the question.")
            .with_temperature(FOLLOWUP_TEMPERATURE);

        match gateway.chat(request).await {
            Ok(raw) => clean_question(&raw),
            Err(e) => {
                warn!(?reason, error = %e, "follow-up generation failed, using fallback");
                FALLBACK_FOLLOWUP.to_string()
            }
        }
    }

    fn strategy_prompt(
        &self,
        reason: InterruptionReason,
        partial_answer: &str,
        original_question: &str,
        recent_history: &[&QaRecord],
        evidence: &str,
    ) -> String {
        let answer_excerpt: String = partial_answer.chars().take(300).collect();

        let strategy = match reason {
            InterruptionReason::FalseClaim => format!(
                "You are a technical interviewer who just detected a false or incorrect claim.\n\n\
                 ISSUE DETECTED:\n{}\n\n\
                 Generate ONE sharp, direct follow-up question that:\n\
                 1. Points out the specific inaccuracy\n\
                 2. Asks them to clarify or correct their statement\n\
                 3. Is 1 sentence maximum\n\n\
                 Example: \"That's not quite right - Redis is not a relational database. \
                 Can you clarify what you meant?\"",
                evidence
            ),
            InterruptionReason::Contradiction => format!(
                "You are an interviewer who detected a contradiction.\n\n\
                 RECENT CONVERSATION:\n{}\n\n\
                 ISSUE:\nThis contradicts something they said earlier.\n\n\
                 Generate ONE direct question that:\n\
                 1. Highlights the contradiction\n\
                 2. Asks them to clarify which statement is correct\n\
                 3. Is brief and firm\n\n\
                 Example: \"Wait - earlier you said you led the team, but now you're saying \
                 you assisted. Which was it?\"",
                history_snippet(recent_history)
            ),
            InterruptionReason::DodgingQuestion =>
                "You are an interviewer. The candidate is avoiding answering your question \
                 directly.\n\n\
                 Generate ONE redirect question that:\n\
                 1. Brings them back to the actual question\n\
                 2. Is specific about what you want to know\n\
                 3. Is direct and firm\n\n\
                 Example: \"Let me stop you - I asked about your PERSONAL role, not the \
                 team's. What did YOU specifically do?\""
                    .to_string(),
            InterruptionReason::ExcessiveRambling | InterruptionReason::MinorRambling => {
                "You are an interviewer. The candidate is rambling and needs to focus.\n\n\
                 Generate ONE focused question that:\n\
                 1. Asks them to get to the point\n\
                 2. Focuses on ONE specific aspect\n\
                 3. Demands brevity\n\n\
                 Example: \"Let me stop you - just tell me the RESULT in one sentence.\""
                    .to_string()
            }
            InterruptionReason::VagueAnswer => {
                "You are an interviewer. The candidate is being too vague and general.\n\n\
                 Generate ONE demand for specifics:\n\
                 1. Ask for concrete examples\n\
                 2. Ask for numbers/metrics\n\
                 3. Ask for specific technologies/tools\n\n\
                 Example: \"That's too general - give me a specific metric. How much did \
                 performance improve?\""
                    .to_string()
            }
            InterruptionReason::LackOfSpecifics => {
                "You are an interviewer demanding concrete details.\n\n\
                 Generate ONE sharp question demanding specifics:\n\
                 1. Ask for exact numbers\n\
                 2. Ask for specific names (tools, frameworks, etc.)\n\
                 3. Ask for measurable outcomes\n\n\
                 Example: \"I need specifics - what EXACT tool did you use and what were \
                 the NUMBERS?\""
                    .to_string()
            }
            InterruptionReason::ExcessivePausing => {
                "The candidate is struggling with long pauses.\n\n\
                 Generate ONE simpler, more specific question to help them:\n\
                 1. Break down the original question into something easier\n\
                 2. Focus on just ONE aspect\n\
                 3. Make it a yes/no or concrete question\n\n\
                 Example: \"Let me help you focus - did you personally write the code for \
                 this, yes or no?\""
                    .to_string()
            }
            InterruptionReason::HighUncertainty => {
                "The candidate sounds very uncertain and lacks confidence.\n\n\
                 Generate ONE question that:\n\
                 1. Asks if they're confident in what they just said\n\
                 2. Gives them a chance to reconsider\n\
                 3. Is direct but not harsh\n\n\
                 Example: \"You sound unsure - are you confident in that answer, or would \
                 you like to reconsider?\""
                    .to_string()
            }
            InterruptionReason::CompletelyOffTopic
            | InterruptionReason::SpeakingTooLong
            | InterruptionReason::InconsistentDelivery => {
                "You are an interviewer. Ask the candidate to briefly clarify the point \
                 they were making.\n\nGenerate ONE short clarifying question."
                    .to_string()
            }
        };

        format!(
            "{}\n\nORIGINAL QUESTION:\n\"{}\"\n\nWHAT THEY SAID:\n\"{}\"\n\n\
             Output ONLY the question, nothing else.",
            strategy, original_question, answer_excerpt
        )
    }
}

impl Default for FollowupGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn history_snippet(recent_history: &[&QaRecord]) -> String {
    if recent_history.is_empty() {
        return "No previous context.".to_string();
    }
    recent_history
        .iter()
        .enumerate()
        .map(|(i, qa)| {
            let q: String = qa.question_text.chars().take(80).collect();
            let a: String = qa.answer_text.chars().take(100).collect();
            format!("{}. Q: {}\n   A: {}...", i + 1, q, a)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use crate::error::{Error, Result};
    use crate::llm::LlmClient;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct CannedClient(&'static str);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn chat(&self, _request: ChatRequest) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Local
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn chat(&self, _request: ChatRequest) -> Result<String> {
            Err(Error::backend("local", "connection refused"))
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Local
        }
    }

    fn gateway(client: impl LlmClient + 'static) -> LlmGateway {
        LlmGateway::new(Arc::new(client), 4, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_off_topic_redirect_is_fixed() {
        let generator = FollowupGenerator::new();
        // no LLM needed; a failing client proves no call is made
        let gateway = gateway(FailingClient);

        let question = generator
            .generate(
                &gateway,
                InterruptionReason::CompletelyOffTopic,
                "so anyway my hobbies are",
                "How does a B-tree split?",
                &[],
                "",
            )
            .await;

        assert_eq!(
            question,
            "That's not what I asked. Let me be specific: How does a B-tree split?"
        );
    }

    #[tokio::test]
    async fn test_generated_followup_is_cleaned() {
        let generator = FollowupGenerator::new();
        let gateway = gateway(CannedClient("Question: \"What was the exact metric\""));

        let question = generator
            .generate(
                &gateway,
                InterruptionReason::VagueAnswer,
                "we improved performance a lot",
                "What did you optimize?",
                &[],
                "no numbers given",
            )
            .await;

        assert_eq!(question, "What was the exact metric?");
        assert!(question.ends_with('?'));
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back() {
        let generator = FollowupGenerator::new();
        let gateway = gateway(FailingClient);

        let question = generator
            .generate(
                &gateway,
                InterruptionReason::ExcessiveRambling,
                "and then and then",
                "Describe the migration",
                &[],
                "filler ratio 0.3",
            )
            .await;

        assert_eq!(question, FALLBACK_FOLLOWUP);
    }
}
