//! Tolerant parser for the line-oriented evaluation protocol.
//!
//! LLM output is untyped: the parser accepts reordered keys, stray markdown,
//! mixed case, and missing fields. Whatever the model omits is defaulted so
//! the resulting `Evaluation` always carries all five dimensions.

use std::collections::HashMap;
use tracing::debug;

use crate::session::RoundKind;

use super::types::{Dimension, DifficultyAdjustment, Evaluation, ScoreDetail, weighted_overall};

const MISSING_EVIDENCE: &str = "No evaluation data available from LLM response";
const MISSING_IMPROVEMENT: &str = "Unable to assess - LLM did not return this dimension";

/// Parse raw evaluator output into a structurally complete `Evaluation`.
pub fn parse_evaluation(raw: &str, question_id: &str, round_kind: RoundKind) -> Evaluation {
    // markdown emphasis confuses key matching; drop it up front
    let cleaned = raw.replace("**", "").replace('*', "");

    let mut scores: HashMap<Dimension, u32> = HashMap::new();
    let mut evidence: HashMap<Dimension, String> = HashMap::new();
    let mut improvement: HashMap<Dimension, String> = HashMap::new();
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut red_flags = Vec::new();
    let mut requires_followup = false;
    let mut followup_reason = None;
    let mut suggested_followup = None;
    let mut difficulty_adjustment = DifficultyAdjustment::Maintain;

    for line in cleaned.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("```") {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_uppercase();
        let value = value.trim();

        if let Some(dimension) = dimension_for_key(&key) {
            if key.ends_with("_EVIDENCE") {
                evidence.insert(dimension, value.to_string());
            } else if key.ends_with("_IMPROVEMENT") {
                if !value.is_empty() && !value.eq_ignore_ascii_case("none") {
                    improvement.insert(dimension, value.to_string());
                }
            } else {
                scores.insert(dimension, parse_score(value));
            }
            continue;
        }

        match key.as_str() {
            "STRENGTHS" => strengths = split_list(value),
            "WEAKNESSES" => weaknesses = split_list(value),
            "RED_FLAGS" => {
                if !value.eq_ignore_ascii_case("none") {
                    red_flags = split_list(value);
                }
            }
            "REQUIRES_FOLLOWUP" => requires_followup = value.to_uppercase().contains("YES"),
            "FOLLOWUP_REASON" => {
                if !value.is_empty() && !value.eq_ignore_ascii_case("none") {
                    followup_reason = Some(value.to_string());
                }
            }
            "SUGGESTED_FOLLOWUP" => {
                if !value.is_empty() && !value.eq_ignore_ascii_case("none") {
                    suggested_followup = Some(value.to_string());
                }
            }
            "DIFFICULTY_ADJUSTMENT" => {
                difficulty_adjustment = DifficultyAdjustment::parse(value);
            }
            _ => {}
        }
    }

    // every required dimension must be present; inject defaults for the rest
    for dimension in Dimension::ALL {
        if !scores.contains_key(&dimension) {
            debug!(%dimension, "dimension missing from LLM output, defaulting to 0");
            scores.insert(dimension, 0);
            evidence
                .entry(dimension)
                .or_insert_with(|| MISSING_EVIDENCE.to_string());
            improvement
                .entry(dimension)
                .or_insert_with(|| MISSING_IMPROVEMENT.to_string());
        }
    }

    let score_details: Vec<ScoreDetail> = Dimension::ALL
        .iter()
        .map(|d| ScoreDetail {
            dimension: *d,
            score: scores[d],
            evidence: evidence
                .remove(d)
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "No evidence provided".to_string()),
            improvement: improvement.remove(d),
        })
        .collect();

    if strengths.is_empty() {
        strengths.push("Provided an answer".to_string());
    }
    if weaknesses.is_empty() {
        weaknesses.push("Could provide more depth".to_string());
    }

    let overall_score = weighted_overall(&scores);

    Evaluation {
        question_id: question_id.to_string(),
        round_kind,
        scores,
        score_details,
        overall_score,
        strengths,
        weaknesses,
        red_flags,
        requires_followup,
        followup_reason,
        suggested_followup,
        difficulty_adjustment,
    }
}

fn dimension_for_key(key: &str) -> Option<Dimension> {
    let base = key
        .strip_suffix("_EVIDENCE")
        .or_else(|| key.strip_suffix("_IMPROVEMENT"))
        .unwrap_or(key);
    Dimension::ALL
        .iter()
        .find(|d| d.protocol_key() == base)
        .copied()
}

/// Parse a score value, tolerating wrappers like `[80]` or `80/100`.
/// Anything unusable defaults to 0.
fn parse_score(value: &str) -> u32 {
    let digits: String = value
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().map(|s| s.min(100)).unwrap_or(0)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
