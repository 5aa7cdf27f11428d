//! Final report synthesis at the end of an interview.
//!
//! Aggregates the whole session: dimension averages, skill heatmap,
//! strong/weak areas, critical mistakes, per-round breakdown, deterministic
//! recommendations, interruption and claim summaries, and next steps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::eval::Dimension;
use crate::session::{InterviewPhase, RoundKind, Session};

/// Proficiency band in the skill heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    Expert,
    Advanced,
    Intermediate,
    Beginner,
}

impl Proficiency {
    fn from_score(score: u32) -> Self {
        match score {
            85.. => Self::Expert,
            70..=84 => Self::Advanced,
            50..=69 => Self::Intermediate,
            _ => Self::Beginner,
        }
    }
}

/// One row of the skill heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAssessment {
    pub skill_name: String,
    pub proficiency_level: Proficiency,
    pub evidence: Vec<String>,
    pub score: u32,
}

/// A specific mistake with its source question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalMistake {
    pub mistake: String,
    pub question: String,
    pub impact: String,
}

/// Per-round performance summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundBreakdown {
    pub score: u32,
    pub questions_asked: usize,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Interruption analysis summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptionSummary {
    pub total_interruptions: u32,
    pub primary_trigger: String,
    pub recovery_quality: String,
    pub trigger_breakdown: HashMap<String, u32>,
    pub notes: String,
}

/// Claim verification summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReport {
    pub total_claims: usize,
    pub verified: usize,
    pub unverified: Vec<String>,
    pub red_flags: Vec<String>,
}

/// The complete final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub session_id: String,
    pub overall_score: u32,
    pub overall_assessment: String,
    pub dimension_scores: HashMap<Dimension, u32>,
    pub skill_assessments: Vec<SkillAssessment>,
    pub strong_areas: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub critical_mistakes: Vec<CriticalMistake>,
    pub detailed_feedback: HashMap<String, Vec<String>>,
    pub round_breakdown: HashMap<String, RoundBreakdown>,
    pub recommended_topics: Vec<String>,
    pub interruption_summary: InterruptionSummary,
    pub claim_report: ClaimReport,
    pub next_steps: Vec<String>,
    pub interview_duration_seconds: f64,
    pub questions_asked: usize,
    pub phases_completed: Vec<InterviewPhase>,
    pub difficulty_reached: String,
}

/// Generates the final report from a completed session.
pub struct FinalReportGenerator;

impl FinalReportGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, session: &Session) -> FinalReport {
        let averages = session.average_scores();
        let dimension_scores: HashMap<Dimension, u32> = Dimension::ALL
            .iter()
            .map(|d| (*d, averages.get(d).copied().unwrap_or(0.0) as u32))
            .collect();

        let overall_score = if averages.is_empty() {
            0
        } else {
            (averages.values().sum::<f64>() / averages.len() as f64) as u32
        };

        let (strong_areas, improvement_areas) = identify_areas(session, &dimension_scores);

        let interview_duration_seconds = session
            .completed_at
            .map(|end| (end - session.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        FinalReport {
            session_id: session.session_id.clone(),
            overall_score,
            overall_assessment: overall_assessment(&dimension_scores, overall_score),
            skill_assessments: skill_assessments(session, &dimension_scores),
            critical_mistakes: critical_mistakes(session),
            detailed_feedback: detailed_feedback(session),
            round_breakdown: round_breakdown(session),
            recommended_topics: recommendations(session, &improvement_areas),
            interruption_summary: interruption_summary(session),
            claim_report: claim_report(session),
            next_steps: next_steps(session, &improvement_areas),
            interview_duration_seconds,
            questions_asked: session.history.len(),
            phases_completed: session.phases_completed.clone(),
            difficulty_reached: difficulty_band(session.difficulty_level).to_string(),
            dimension_scores,
            strong_areas,
            improvement_areas,
        }
    }
}

impl Default for FinalReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// One-sentence assessment templated from the best and worst dimensions.
fn overall_assessment(dimension_scores: &HashMap<Dimension, u32>, overall_score: u32) -> String {
    let top = dimension_scores
        .iter()
        .max_by_key(|(_, s)| **s)
        .map(|(d, _)| d.display_name())
        .unwrap_or("Communication Clarity");
    let weak = dimension_scores
        .iter()
        .min_by_key(|(_, s)| **s)
        .map(|(d, _)| d.display_name())
        .unwrap_or("Technical Depth");

    match overall_score {
        85.. => format!(
            "Excellent performance overall. Strong {}, minor improvements needed in {}.",
            top, weak
        ),
        70..=84 => format!(
            "Good performance with strong {}, but needs work on {}.",
            top, weak
        ),
        50..=69 => format!(
            "Average performance. Focus on improving {} while maintaining {}.",
            weak, top
        ),
        _ => format!(
            "Needs significant improvement, especially in {}. {} shows some potential.",
            weak, top
        ),
    }
}

fn skill_assessments(
    session: &Session,
    dimension_scores: &HashMap<Dimension, u32>,
) -> Vec<SkillAssessment> {
    Dimension::ALL
        .iter()
        .filter(|d| {
            session
                .dimension_scores
                .get(*d)
                .is_some_and(|v| !v.is_empty())
        })
        .map(|dimension| {
            let score = dimension_scores.get(dimension).copied().unwrap_or(0);
            SkillAssessment {
                skill_name: dimension.display_name().to_string(),
                proficiency_level: Proficiency::from_score(score),
                evidence: evidence_for_dimension(session, *dimension),
                score,
            }
        })
        .collect()
}

/// Up to three distinct evidence quotes pulled from conversation history.
fn evidence_for_dimension(session: &Session, dimension: Dimension) -> Vec<String> {
    let mut evidence = Vec::new();
    for qa in &session.history {
        let Some(evaluation) = &qa.evaluation else {
            continue;
        };
        for detail in &evaluation.score_details {
            if detail.dimension != dimension || detail.evidence.is_empty() {
                continue;
            }
            if !evidence.contains(&detail.evidence) {
                evidence.push(detail.evidence.clone());
            }
            if evidence.len() >= 3 {
                return evidence;
            }
        }
    }
    evidence
}

fn identify_areas(
    session: &Session,
    dimension_scores: &HashMap<Dimension, u32>,
) -> (Vec<String>, Vec<String>) {
    let mut strong = Vec::new();
    let mut improvement = Vec::new();

    for dimension in Dimension::ALL {
        let Some(score) = dimension_scores.get(&dimension) else {
            continue;
        };
        if session
            .dimension_scores
            .get(&dimension)
            .is_none_or(|v| v.is_empty())
        {
            continue;
        }
        if *score >= 75 {
            strong.push(dimension.display_name().to_string());
        } else if *score < 60 {
            improvement.push(dimension.display_name().to_string());
        }
    }

    for phase in &session.phases_completed {
        if *phase == InterviewPhase::Completed {
            continue;
        }
        let average = session.phase_average_score(*phase);
        let name = format!("{} Phase", title_case(&phase.to_string()));
        if average >= 75.0 && !strong.contains(&name) {
            strong.push(name);
        } else if average > 0.0 && average < 60.0 && !improvement.contains(&name) {
            improvement.push(name);
        }
    }

    (strong, improvement)
}

/// Red flags plus the lowest-scoring answers, capped at five.
fn critical_mistakes(session: &Session) -> Vec<CriticalMistake> {
    let mut mistakes = Vec::new();

    for flag in &session.red_flags {
        mistakes.push(CriticalMistake {
            mistake: flag.description.clone(),
            question: flag.question_id.clone(),
            impact: "Critical accuracy issue".to_string(),
        });
    }

    for qa in &session.history {
        let Some(evaluation) = &qa.evaluation else {
            continue;
        };
        if evaluation.overall_score < 50 {
            if let Some(weakness) = evaluation.weaknesses.first() {
                mistakes.push(CriticalMistake {
                    mistake: weakness.clone(),
                    question: qa.question_id.clone(),
                    impact: format!("Low score: {}/100", evaluation.overall_score),
                });
            }
        }
    }

    mistakes.truncate(5);
    mistakes
}

/// Lexical binning of strengths and weaknesses into dimension categories.
fn detailed_feedback(session: &Session) -> HashMap<String, Vec<String>> {
    let mut feedback: HashMap<String, Vec<String>> = HashMap::new();
    for key in [
        "technical_depth",
        "concept_accuracy",
        "structured_thinking",
        "communication",
        "confidence",
    ] {
        feedback.insert(key.to_string(), Vec::new());
    }

    for qa in &session.history {
        let Some(evaluation) = &qa.evaluation else {
            continue;
        };
        for strength in evaluation.strengths.iter().take(2) {
            let entry = feedback.entry(categorize(strength).to_string()).or_default();
            let text = format!("✅ {}", strength);
            if !entry.contains(&text) {
                entry.push(text);
            }
        }
        for weakness in evaluation.weaknesses.iter().take(2) {
            let entry = feedback.entry(categorize(weakness).to_string()).or_default();
            let text = format!("❌ {}", weakness);
            if !entry.contains(&text) {
                entry.push(text);
            }
        }
    }

    for items in feedback.values_mut() {
        items.truncate(5);
    }
    feedback
}

fn categorize(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if ["technical", "depth", "detail", "architecture", "system"]
        .iter()
        .any(|w| lower.contains(w))
    {
        "technical_depth"
    } else if ["accurate", "correct", "wrong", "error", "mistake"]
        .iter()
        .any(|w| lower.contains(w))
    {
        "concept_accuracy"
    } else if ["structure", "star", "organized", "logical"]
        .iter()
        .any(|w| lower.contains(w))
    {
        "structured_thinking"
    } else if ["clear", "filler", "rambling", "concise", "explain"]
        .iter()
        .any(|w| lower.contains(w))
    {
        "communication"
    } else {
        "confidence"
    }
}

fn round_breakdown(session: &Session) -> HashMap<String, RoundBreakdown> {
    let mut breakdown = HashMap::new();

    for round in [RoundKind::Hr, RoundKind::Technical, RoundKind::SystemDesign] {
        let questions: Vec<_> = session
            .history
            .iter()
            .filter(|qa| qa.round_kind == round)
            .collect();
        if questions.is_empty() {
            continue;
        }

        let scores: Vec<u32> = questions
            .iter()
            .filter_map(|qa| qa.evaluation.as_ref().map(|e| e.overall_score))
            .collect();
        let score = if scores.is_empty() {
            0
        } else {
            scores.iter().sum::<u32>() / scores.len() as u32
        };

        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();
        for qa in &questions {
            if let Some(evaluation) = &qa.evaluation {
                for s in &evaluation.strengths {
                    if !strengths.contains(s) {
                        strengths.push(s.clone());
                    }
                }
                for w in &evaluation.weaknesses {
                    if !weaknesses.contains(w) {
                        weaknesses.push(w.clone());
                    }
                }
            }
        }
        strengths.truncate(3);
        weaknesses.truncate(3);

        breakdown.insert(
            round.to_string(),
            RoundBreakdown {
                score,
                questions_asked: questions.len(),
                strengths,
                weaknesses,
            },
        );
    }

    breakdown
}

/// Fixed recommendation mapping keyed by improvement areas.
fn recommendations(session: &Session, improvement_areas: &[String]) -> Vec<String> {
    let map: [(&str, &str); 5] = [
        (
            "Technical Depth",
            "Study system design patterns and practice explaining technical concepts in detail",
        ),
        (
            "Concept Accuracy",
            "Review fundamental CS concepts and verify your understanding with practice problems",
        ),
        (
            "Structured Thinking",
            "Practice the STAR method with specific examples and measurable outcomes",
        ),
        (
            "Communication Clarity",
            "Record yourself answering and work on reducing filler words",
        ),
        (
            "Confidence & Consistency",
            "Practice mock interviews to build confidence and maintain consistency",
        ),
    ];

    let mut recommendations = Vec::new();
    for area in improvement_areas {
        if let Some((_, text)) = map.iter().find(|(name, _)| name == area) {
            recommendations.push(text.to_string());
        }
    }

    if !session.red_flags.is_empty() {
        recommendations
            .push("Verify all claims before interviews - inconsistencies were detected".to_string());
    }
    if session.total_interruptions > 2 {
        recommendations
            .push("Work on staying concise and on-topic to avoid interruptions".to_string());
    }

    recommendations.truncate(5);
    recommendations
}

fn interruption_summary(session: &Session) -> InterruptionSummary {
    if session.interruptions.is_empty() {
        return InterruptionSummary {
            total_interruptions: 0,
            primary_trigger: "none".to_string(),
            recovery_quality: "n/a".to_string(),
            trigger_breakdown: HashMap::new(),
            notes: "No interruptions during interview".to_string(),
        };
    }

    let mut triggers: HashMap<String, u32> = HashMap::new();
    for event in &session.interruptions {
        let key = serde_json::to_value(event.reason)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "UNKNOWN".to_string());
        *triggers.entry(key).or_insert(0) += 1;
    }

    let primary_trigger = triggers
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(reason, _)| reason.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let recovery_quality = if session.total_interruptions <= 2 {
        "good"
    } else {
        "needs_work"
    };

    InterruptionSummary {
        total_interruptions: session.total_interruptions,
        primary_trigger: primary_trigger.clone(),
        recovery_quality: recovery_quality.to_string(),
        trigger_breakdown: triggers,
        notes: format!(
            "Most common trigger: {}. Focus on staying concise and accurate.",
            primary_trigger
        ),
    }
}

fn claim_report(session: &Session) -> ClaimReport {
    let unverified: Vec<String> = session
        .unverified_claims()
        .iter()
        .take(3)
        .map(|c| c.claim_text.clone())
        .collect();

    let red_flags: Vec<String> = session
        .red_flags
        .iter()
        .filter(|f| f.flag_type == "claim")
        .take(3)
        .map(|f| f.description.clone())
        .collect();

    ClaimReport {
        total_claims: session.claims.len(),
        verified: session.verified_claims().len(),
        unverified,
        red_flags,
    }
}

fn next_steps(session: &Session, improvement_areas: &[String]) -> Vec<String> {
    let mut steps = Vec::new();

    if improvement_areas.iter().any(|a| a == "Communication Clarity") {
        steps.push(
            "Record 3 practice answers and count filler words - aim for <2 per minute".to_string(),
        );
    }
    if improvement_areas.iter().any(|a| a == "Structured Thinking") {
        steps.push(
            "Prepare 5 STAR stories with specific metrics before your next interview".to_string(),
        );
    }
    if improvement_areas.iter().any(|a| a == "Technical Depth") {
        steps.push(
            "Practice explaining 3 complex technical concepts to a non-technical friend"
                .to_string(),
        );
    }
    if !session.red_flags.is_empty() {
        steps.push("Review and verify all claims from your resume before interviews".to_string());
    }

    steps.push("Take at least 2 more mock interviews focusing on your weak areas".to_string());
    steps.push("Join interview practice communities for peer feedback".to_string());

    steps.truncate(5);
    steps
}

fn difficulty_band(level: u8) -> &'static str {
    match level {
        0..=3 => "easy",
        4..=6 => "medium",
        _ => "hard",
    }
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{fallback_evaluation, Evaluation, ScoreDetail};
    use chrono::Utc;

    fn evaluation(question_id: &str, score: u32) -> Evaluation {
        let mut evaluation = fallback_evaluation(question_id, RoundKind::Technical);
        for value in evaluation.scores.values_mut() {
            *value = score;
        }
        evaluation.recompute_overall();
        evaluation.score_details = Dimension::ALL
            .iter()
            .map(|d| ScoreDetail {
                dimension: *d,
                score,
                evidence: format!("evidence for {} on {}", d, question_id),
                improvement: None,
            })
            .collect();
        evaluation.strengths = vec!["clear structure throughout".to_string()];
        evaluation.weaknesses = vec!["no concrete metrics given".to_string()];
        evaluation
    }

    fn session_with_answers(scores: &[u32]) -> Session {
        let mut session = Session::new("sess_report", RoundKind::Technical, None);
        for (i, score) in scores.iter().enumerate() {
            let question_id = format!("q_{}", i + 1);
            let evaluation = evaluation(&question_id, *score);
            session.add_answer_scores(&evaluation.scores);
            session.score_progression.push(evaluation.overall_score);
            session.history.push(crate::session::QaRecord {
                question_id,
                question_text: format!("question {}", i + 1),
                answer_text: "an answer".to_string(),
                round_kind: RoundKind::Technical,
                phase: InterviewPhase::ResumeDeepDive,
                recording_duration: 30.0,
                was_interrupted: false,
                is_followup_answer: false,
                triggered_followup: false,
                degraded: false,
                evaluation: Some(evaluation),
                timestamp: Utc::now(),
            });
        }
        session.phases_completed = vec![InterviewPhase::ResumeDeepDive];
        session.complete();
        session
    }

    #[test]
    fn test_overall_score_is_mean_of_dimension_averages() {
        let session = session_with_answers(&[80, 80]);
        let report = FinalReportGenerator::new().generate(&session);
        assert_eq!(report.overall_score, 80);
        assert_eq!(report.questions_asked, 2);
        for dimension in Dimension::ALL {
            assert_eq!(report.dimension_scores[&dimension], 80);
        }
    }

    #[test]
    fn test_strong_and_improvement_areas() {
        let strong = FinalReportGenerator::new().generate(&session_with_answers(&[80, 90]));
        assert!(strong
            .strong_areas
            .iter()
            .any(|a| a == "Technical Depth"));
        assert!(strong.improvement_areas.is_empty() || !strong.improvement_areas.contains(&"Technical Depth".to_string()));

        let weak = FinalReportGenerator::new().generate(&session_with_answers(&[40, 45]));
        assert!(weak
            .improvement_areas
            .iter()
            .any(|a| a == "Technical Depth"));
    }

    #[test]
    fn test_critical_mistakes_from_low_scores_and_flags() {
        let mut session = session_with_answers(&[30, 85]);
        session.add_red_flag("evaluation_flag", "claimed O(1) sorting", "q_1");

        let report = FinalReportGenerator::new().generate(&session);
        assert!(report
            .critical_mistakes
            .iter()
            .any(|m| m.mistake == "claimed O(1) sorting"));
        assert!(report
            .critical_mistakes
            .iter()
            .any(|m| m.impact.starts_with("Low score:")));
        assert!(report.critical_mistakes.len() <= 5);
    }

    #[test]
    fn test_skill_assessment_evidence_capped_at_three() {
        let session = session_with_answers(&[70, 72, 74, 76, 78]);
        let report = FinalReportGenerator::new().generate(&session);

        let assessment = report
            .skill_assessments
            .iter()
            .find(|a| a.skill_name == "Technical Depth")
            .unwrap();
        assert_eq!(assessment.evidence.len(), 3);
        assert_eq!(assessment.proficiency_level, Proficiency::Advanced);
    }

    #[test]
    fn test_round_breakdown_groups_by_round() {
        let session = session_with_answers(&[60, 70]);
        let report = FinalReportGenerator::new().generate(&session);

        let technical = &report.round_breakdown["technical"];
        assert_eq!(technical.questions_asked, 2);
        assert_eq!(technical.score, 65);
        assert!(report.round_breakdown.get("hr").is_none());
    }

    #[test]
    fn test_empty_interruption_summary() {
        let session = session_with_answers(&[70]);
        let report = FinalReportGenerator::new().generate(&session);
        assert_eq!(report.interruption_summary.total_interruptions, 0);
        assert_eq!(report.interruption_summary.primary_trigger, "none");
    }

    #[test]
    fn test_recommendations_follow_improvement_areas() {
        let report = FinalReportGenerator::new().generate(&session_with_answers(&[40, 42]));
        // every dimension is weak, so the map contributes entries, capped at 5
        assert!(!report.recommended_topics.is_empty());
        assert!(report.recommended_topics.len() <= 5);
        assert!(report.next_steps.len() <= 5);
    }

    #[test]
    fn test_difficulty_band() {
        assert_eq!(difficulty_band(2), "easy");
        assert_eq!(difficulty_band(5), "medium");
        assert_eq!(difficulty_band(9), "hard");
    }
}
