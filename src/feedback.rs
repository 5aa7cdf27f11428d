//! Immediate per-answer feedback.

use serde::{Deserialize, Serialize};

use crate::eval::{Evaluation, PerformanceLevel};

/// Compact summary shown to the candidate right after an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmediateFeedback {
    pub overall_score: u32,
    pub performance_level: PerformanceLevel,
    pub emoji: String,
    pub key_strength: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_weakness: Option<String>,
    pub red_flags: Vec<String>,
}

/// Pure function of one evaluation.
pub fn immediate_feedback(evaluation: &Evaluation) -> ImmediateFeedback {
    let emoji = match evaluation.overall_score {
        85.. => "🌟",
        70..=84 => "👍",
        50..=69 => "🤔",
        _ => "📚",
    };

    ImmediateFeedback {
        overall_score: evaluation.overall_score,
        performance_level: PerformanceLevel::from_score(evaluation.overall_score),
        emoji: emoji.to_string(),
        key_strength: evaluation
            .strengths
            .first()
            .cloned()
            .unwrap_or_else(|| "Good effort".to_string()),
        key_weakness: evaluation.weaknesses.first().cloned(),
        red_flags: evaluation.red_flags.iter().take(1).cloned().collect(),
    }
}
