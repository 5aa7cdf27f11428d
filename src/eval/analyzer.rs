//! Answer analyzer: routes an answer to its round evaluator, optionally runs
//! claim extraction, and reconciles the two.
//!
//! Claim extraction is skipped for early questions (a latency optimization;
//! the threshold is configuration, see `EngineConfig`). The evaluation path
//! is resilient: a backend failure after retry degrades to a neutral canned
//! evaluation instead of surfacing.

use tracing::{debug, warn};

use crate::claims::{Claim, ClaimAnalyzer, ClaimExtractor, Verifiability};
use crate::error::Result;
use crate::llm::LlmGateway;
use crate::session::{QaRecord, RoundKind};

use super::rounds::{fallback_evaluation, RoundEvaluator};
use super::types::{Dimension, Evaluation};

/// How many recent exchanges feed the contradiction check.
const CONTRADICTION_WINDOW: usize = 3;

/// Result of analyzing one answer.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub evaluation: Evaluation,
    pub claims: Vec<Claim>,
    /// True when the canned fallback evaluation was used
    pub degraded: bool,
}

/// Evaluates answers for all three rounds.
pub struct AnswerAnalyzer {
    extractor: ClaimExtractor,
    claim_analyzer: ClaimAnalyzer,
}

impl AnswerAnalyzer {
    pub fn new() -> Self {
        Self {
            extractor: ClaimExtractor::new(),
            claim_analyzer: ClaimAnalyzer::new(),
        }
    }

    /// Evaluate an answer. `round_kind` routing for unknown round strings
    /// happens upstream in `RoundKind::parse`, which defaults to Technical.
    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate(
        &self,
        gateway: &LlmGateway,
        answer_text: &str,
        question_text: &str,
        question_id: &str,
        round_kind: RoundKind,
        history: &[QaRecord],
        skip_claim_extraction: bool,
    ) -> Result<AnalysisOutcome> {
        let mut claims = if skip_claim_extraction {
            debug!(question_id, "skipping claim extraction (fast path)");
            Vec::new()
        } else {
            let recent: Vec<&QaRecord> = history
                .iter()
                .rev()
                .take(CONTRADICTION_WINDOW)
                .rev()
                .collect();
            let answer_id = format!("a_{}", question_id.trim_start_matches("q_"));
            match self
                .extractor
                .extract(
                    gateway,
                    answer_text,
                    question_text,
                    question_id,
                    &answer_id,
                    &recent,
                )
                .await
            {
                Ok(claims) => claims,
                Err(e) => {
                    // claims are an enhancement; evaluation proceeds without
                    warn!(question_id, error = %e, "claim extraction failed");
                    Vec::new()
                }
            }
        };

        let evaluator = RoundEvaluator::new(round_kind);
        let (mut evaluation, degraded) = match evaluator
            .evaluate(gateway, answer_text, question_text, question_id)
            .await
        {
            Ok(evaluation) => (evaluation, false),
            Err(e) if e.is_recoverable() => {
                warn!(question_id, error = %e, "evaluator backend unavailable, using fallback");
                (fallback_evaluation(question_id, round_kind), true)
            }
            Err(e) => return Err(e),
        };

        if !claims.is_empty() {
            self.claim_analyzer.annotate(&mut claims);
            self.adjust_with_claims(&mut evaluation, &claims);
        }

        Ok(AnalysisOutcome {
            evaluation,
            claims,
            degraded,
        })
    }

    /// Fold claim findings back into the evaluation: red flags for
    /// contradictory and suspicious claims, score penalties for vagueness and
    /// contradiction, and a weakness when many claims need verification.
    fn adjust_with_claims(&self, evaluation: &mut Evaluation, claims: &[Claim]) {
        let vague = claims
            .iter()
            .filter(|c| c.verifiability == Verifiability::Vague)
            .count();
        let suspicious: Vec<&Claim> = claims
            .iter()
            .filter(|c| c.verifiability == Verifiability::Suspicious)
            .collect();
        let contradictory: Vec<&Claim> = claims
            .iter()
            .filter(|c| c.verifiability == Verifiability::Contradictory)
            .collect();

        for claim in &contradictory {
            let flag = format!("Contradiction detected: {}", excerpt(&claim.claim_text));
            if !evaluation.red_flags.contains(&flag) {
                evaluation.red_flags.push(flag);
            }
        }
        for claim in &suspicious {
            let flag = format!("Suspicious claim: {}", excerpt(&claim.claim_text));
            if !evaluation.red_flags.contains(&flag) {
                evaluation.red_flags.push(flag);
            }
        }

        if vague >= 2 {
            let penalty = (vague as u32 * 5).min(15);
            let score = evaluation
                .scores
                .entry(Dimension::ConceptAccuracy)
                .or_insert(0);
            *score = score.saturating_sub(penalty);
            debug!(penalty, "reduced concept accuracy for vague claims");
        }

        if !contradictory.is_empty() {
            let penalty = (contradictory.len() as u32 * 10).min(20);
            let score = evaluation
                .scores
                .entry(Dimension::ConfidenceConsistency)
                .or_insert(0);
            *score = score.saturating_sub(penalty);
            debug!(penalty, "reduced confidence for contradictory claims");
        }

        evaluation.recompute_overall();

        let unverified = claims.iter().filter(|c| c.requires_verification).count();
        if unverified >= 3 {
            let weakness = format!("Made {} claims that need verification", unverified);
            if !evaluation.weaknesses.contains(&weakness) {
                evaluation.weaknesses.push(weakness);
            }
        }
    }
}

impl Default for AnswerAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= 60 {
        text.to_string()
    } else {
        let cut: String = text.chars().take(60).collect();
        format!("{}...", cut)
    }
}
