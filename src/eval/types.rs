//! Evaluation types: the five rubric dimensions and per-answer scoring.
//!
//! Every answer is scored across all five dimensions. The overall score is
//! always recomputed from the dimension scores with fixed weights; an
//! LLM-supplied overall is never trusted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One of the five rubric axes used for scoring every answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TechnicalDepth,
    ConceptAccuracy,
    StructuredThinking,
    CommunicationClarity,
    ConfidenceConsistency,
}

impl Dimension {
    /// All five dimensions, in weight order.
    pub const ALL: [Dimension; 5] = [
        Dimension::TechnicalDepth,
        Dimension::ConceptAccuracy,
        Dimension::StructuredThinking,
        Dimension::CommunicationClarity,
        Dimension::ConfidenceConsistency,
    ];

    /// Fixed weight used in the overall score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::TechnicalDepth => 0.30,
            Self::ConceptAccuracy => 0.25,
            Self::StructuredThinking => 0.20,
            Self::CommunicationClarity => 0.15,
            Self::ConfidenceConsistency => 0.10,
        }
    }

    /// Key used in the line-oriented LLM protocol (`TECHNICAL_DEPTH: 80`).
    pub fn protocol_key(&self) -> &'static str {
        match self {
            Self::TechnicalDepth => "TECHNICAL_DEPTH",
            Self::ConceptAccuracy => "CONCEPT_ACCURACY",
            Self::StructuredThinking => "STRUCTURED_THINKING",
            Self::CommunicationClarity => "COMMUNICATION_CLARITY",
            Self::ConfidenceConsistency => "CONFIDENCE_CONSISTENCY",
        }
    }

    /// Human-readable name ("Technical Depth").
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::TechnicalDepth => "Technical Depth",
            Self::ConceptAccuracy => "Concept Accuracy",
            Self::StructuredThinking => "Structured Thinking",
            Self::CommunicationClarity => "Communication Clarity",
            Self::ConfidenceConsistency => "Confidence & Consistency",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TechnicalDepth => write!(f, "technical_depth"),
            Self::ConceptAccuracy => write!(f, "concept_accuracy"),
            Self::StructuredThinking => write!(f, "structured_thinking"),
            Self::CommunicationClarity => write!(f, "communication_clarity"),
            Self::ConfidenceConsistency => write!(f, "confidence_consistency"),
        }
    }
}

/// Difficulty steering emitted by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyAdjustment {
    Decrease,
    #[default]
    Maintain,
    Increase,
}

impl DifficultyAdjustment {
    /// Parse the evaluator output value; anything unrecognized is `Maintain`.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "decrease" => Self::Decrease,
            "increase" => Self::Increase,
            _ => Self::Maintain,
        }
    }

    /// Apply this adjustment to a difficulty level, clamped to 1..=10.
    pub fn apply(&self, level: u8) -> u8 {
        match self {
            Self::Decrease => level.saturating_sub(1).max(1),
            Self::Increase => (level + 1).min(10),
            Self::Maintain => level,
        }
    }
}

/// Per-dimension scoring detail with evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub dimension: Dimension,
    pub score: u32,
    pub evidence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement: Option<String>,
}

/// The structured per-answer output: scores, narrative, follow-up hint,
/// difficulty hint. All five dimensions are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub question_id: String,
    pub round_kind: crate::session::RoundKind,
    pub scores: HashMap<Dimension, u32>,
    pub score_details: Vec<ScoreDetail>,
    pub overall_score: u32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub red_flags: Vec<String>,
    pub requires_followup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followup_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_followup: Option<String>,
    pub difficulty_adjustment: DifficultyAdjustment,
}

impl Evaluation {
    /// Recompute `overall_score` from the dimension scores. Call after any
    /// mutation of `scores`.
    pub fn recompute_overall(&mut self) {
        self.overall_score = weighted_overall(&self.scores);
    }
}

/// Weighted overall score, rounded down.
pub fn weighted_overall(scores: &HashMap<Dimension, u32>) -> u32 {
    let sum: f64 = Dimension::ALL
        .iter()
        .map(|d| d.weight() * f64::from(scores.get(d).copied().unwrap_or(0)))
        .sum();
    sum.floor() as u32
}

/// Performance band for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl PerformanceLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            85.. => Self::Excellent,
            70..=84 => Self::Good,
            50..=69 => Self::Average,
            _ => Self::NeedsImprovement,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Dimension::ALL.iter().map(|d| d.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_overall_floors() {
        let mut scores = HashMap::new();
        scores.insert(Dimension::TechnicalDepth, 80);
        // 0.30 * 80 = 24.0, all others default to 0
        assert_eq!(weighted_overall(&scores), 24);

        scores.insert(Dimension::ConceptAccuracy, 33);
        // 24.0 + 8.25 = 32.25 -> 32
        assert_eq!(weighted_overall(&scores), 32);
    }

    #[test]
    fn test_difficulty_adjustment_clamps() {
        assert_eq!(DifficultyAdjustment::Decrease.apply(1), 1);
        assert_eq!(DifficultyAdjustment::Increase.apply(10), 10);
        assert_eq!(DifficultyAdjustment::Increase.apply(5), 6);
        assert_eq!(DifficultyAdjustment::Decrease.apply(5), 4);
        assert_eq!(DifficultyAdjustment::Maintain.apply(7), 7);
    }

    #[test]
    fn test_difficulty_parse_tolerant() {
        assert_eq!(
            DifficultyAdjustment::parse(" INCREASE "),
            DifficultyAdjustment::Increase
        );
        assert_eq!(
            DifficultyAdjustment::parse("harder"),
            DifficultyAdjustment::Maintain
        );
    }

    #[test]
    fn test_performance_bands() {
        assert_eq!(PerformanceLevel::from_score(92), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_score(85), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_score(70), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_score(50), PerformanceLevel::Average);
        assert_eq!(
            PerformanceLevel::from_score(49),
            PerformanceLevel::NeedsImprovement
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // overall == floor(sum of weighted dimension scores)
            #[test]
            fn overall_matches_weighted_sum(
                td in 0u32..=100,
                ca in 0u32..=100,
                st in 0u32..=100,
                cc in 0u32..=100,
                cf in 0u32..=100,
            ) {
                let mut scores = HashMap::new();
                scores.insert(Dimension::TechnicalDepth, td);
                scores.insert(Dimension::ConceptAccuracy, ca);
                scores.insert(Dimension::StructuredThinking, st);
                scores.insert(Dimension::CommunicationClarity, cc);
                scores.insert(Dimension::ConfidenceConsistency, cf);

                let expected = (0.30 * td as f64
                    + 0.25 * ca as f64
                    + 0.20 * st as f64
                    + 0.15 * cc as f64
                    + 0.10 * cf as f64)
                    .floor() as u32;

                prop_assert_eq!(weighted_overall(&scores), expected);
                prop_assert!(weighted_overall(&scores) <= 100);
            }
        }
    }
}
