//! Per-session interview state.
//!
//! A `Session` is exclusively owned by the `SessionStore`; components borrow
//! it for the duration of one operation and never hold references across
//! operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::claims::Claim;
use crate::eval::{Dimension, Evaluation};
use crate::interrupt::{InterruptionEvent, InterruptionReason};

/// Which interview round is being conducted. Determines evaluator emphasis
/// and prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    Hr,
    Technical,
    SystemDesign,
}

impl RoundKind {
    /// Lenient parse: "behavioral" maps to HR, anything mentioning design to
    /// system design, everything else to technical.
    pub fn parse(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("hr") || lower.contains("behavioral") {
            Self::Hr
        } else if lower.contains("system") || lower.contains("design") {
            Self::SystemDesign
        } else {
            Self::Technical
        }
    }
}

impl std::fmt::Display for RoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hr => write!(f, "hr"),
            Self::Technical => write!(f, "technical"),
            Self::SystemDesign => write!(f, "system_design"),
        }
    }
}

/// A coarse stage within a round; governs question pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    ResumeDeepDive,
    CoreSkillAssessment,
    ScenarioSolving,
    StressTesting,
    ClaimVerification,
    WrapUp,
    Completed,
}

impl InterviewPhase {
    /// Fixed phase order. Transitions are monotonic along this sequence.
    pub const ORDER: [InterviewPhase; 7] = [
        InterviewPhase::ResumeDeepDive,
        InterviewPhase::CoreSkillAssessment,
        InterviewPhase::ScenarioSolving,
        InterviewPhase::StressTesting,
        InterviewPhase::ClaimVerification,
        InterviewPhase::WrapUp,
        InterviewPhase::Completed,
    ];

    /// Position in the fixed order.
    pub fn index(&self) -> usize {
        Self::ORDER.iter().position(|p| p == self).unwrap_or(0)
    }

    /// The phase that follows this one.
    pub fn successor(&self) -> InterviewPhase {
        Self::ORDER
            .get(self.index() + 1)
            .copied()
            .unwrap_or(InterviewPhase::Completed)
    }
}

impl std::fmt::Display for InterviewPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ResumeDeepDive => "resume_deep_dive",
            Self::CoreSkillAssessment => "core_skill_assessment",
            Self::ScenarioSolving => "scenario_solving",
            Self::StressTesting => "stress_testing",
            Self::ClaimVerification => "claim_verification",
            Self::WrapUp => "wrap_up",
            Self::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

/// A recorded concern, either evaluator-surfaced or claim-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    pub flag_type: String,
    pub description: String,
    pub question_id: String,
    pub timestamp: DateTime<Utc>,
}

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question_id: String,
    pub question_text: String,
    pub answer_text: String,
    pub round_kind: RoundKind,
    pub phase: InterviewPhase,
    pub recording_duration: f64,
    pub was_interrupted: bool,
    /// Set on the answer to a follow-up question
    pub is_followup_answer: bool,
    /// Set on the parent answer after a follow-up is issued
    pub triggered_followup: bool,
    /// Set when the evaluation came from the canned fallback path
    pub degraded: bool,
    pub evaluation: Option<Evaluation>,
    pub timestamp: DateTime<Utc>,
}

/// The full per-session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub round_kind: RoundKind,
    pub phase: InterviewPhase,
    pub current_question_text: Option<String>,
    pub current_question_id: Option<String>,
    /// Questions answered within the current phase (follow-ups excluded)
    pub questions_in_current_phase: u32,
    /// Count of non-follow-up questions, hard-capped by configuration
    pub actual_question_number: u32,
    /// Lifetime follow-up budget consumed. Source of truth for the budget;
    /// the per-record flags are derived markers.
    pub followup_count: u32,
    /// 1..=10
    pub difficulty_level: u8,
    pub history: Vec<QaRecord>,
    pub dimension_scores: HashMap<Dimension, Vec<u32>>,
    pub score_progression: Vec<u32>,
    pub claims: Vec<Claim>,
    pub interruptions: Vec<InterruptionEvent>,
    /// Consecutive-detection counters per reason
    pub interruption_counts: HashMap<InterruptionReason, u32>,
    /// Last warning time per reason, for rate limiting
    pub warning_timestamps: HashMap<InterruptionReason, DateTime<Utc>>,
    pub total_interruptions: u32,
    pub resume_context: Option<String>,
    pub red_flags: Vec<RedFlag>,
    pub phases_completed: Vec<InterviewPhase>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session in the first phase at medium difficulty.
    pub fn new(
        session_id: impl Into<String>,
        round_kind: RoundKind,
        resume_context: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            round_kind,
            phase: InterviewPhase::ResumeDeepDive,
            current_question_text: None,
            current_question_id: None,
            questions_in_current_phase: 0,
            actual_question_number: 0,
            followup_count: 0,
            difficulty_level: 5,
            history: Vec::new(),
            dimension_scores: HashMap::new(),
            score_progression: Vec::new(),
            claims: Vec::new(),
            interruptions: Vec::new(),
            interruption_counts: HashMap::new(),
            warning_timestamps: HashMap::new(),
            total_interruptions: 0,
            resume_context,
            red_flags: Vec::new(),
            phases_completed: Vec::new(),
            started_at: now,
            completed_at: None,
            last_activity: now,
        }
    }

    /// Fold an evaluation's dimension scores into the running vectors.
    pub fn add_answer_scores(&mut self, scores: &HashMap<Dimension, u32>) {
        for (dimension, score) in scores {
            self.dimension_scores
                .entry(*dimension)
                .or_default()
                .push(*score);
        }
    }

    /// Per-dimension averages over the whole session.
    pub fn average_scores(&self) -> HashMap<Dimension, f64> {
        self.dimension_scores
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(d, v)| (*d, v.iter().sum::<u32>() as f64 / v.len() as f64))
            .collect()
    }

    /// Average overall score of answers given in a phase.
    pub fn phase_average_score(&self, phase: InterviewPhase) -> f64 {
        let scores: Vec<u32> = self
            .history
            .iter()
            .filter(|qa| qa.phase == phase)
            .filter_map(|qa| qa.evaluation.as_ref().map(|e| e.overall_score))
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<u32>() as f64 / scores.len() as f64
        }
    }

    /// Record a red flag.
    pub fn add_red_flag(
        &mut self,
        flag_type: impl Into<String>,
        description: impl Into<String>,
        question_id: impl Into<String>,
    ) {
        self.red_flags.push(RedFlag {
            flag_type: flag_type.into(),
            description: description.into(),
            question_id: question_id.into(),
            timestamp: Utc::now(),
        });
    }

    /// Claims still awaiting verification.
    pub fn unverified_claims(&self) -> Vec<&Claim> {
        self.claims
            .iter()
            .filter(|c| c.requires_verification && !c.is_verified())
            .collect()
    }

    /// Claims that have been verified.
    pub fn verified_claims(&self) -> Vec<&Claim> {
        self.claims.iter().filter(|c| c.is_verified()).collect()
    }

    pub fn has_unverified_claims(&self) -> bool {
        self.claims
            .iter()
            .any(|c| c.requires_verification && !c.is_verified())
    }

    /// The most recent answers, newest last, for contradiction checks and
    /// prompt context.
    pub fn recent_answers(&self, limit: usize) -> Vec<&QaRecord> {
        let start = self.history.len().saturating_sub(limit);
        self.history[start..].iter().collect()
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn is_completed(&self) -> bool {
        self.phase == InterviewPhase::Completed
    }

    /// Mark the session completed and stamp the end time.
    pub fn complete(&mut self) {
        if self.phase != InterviewPhase::Completed {
            self.phases_completed.push(self.phase);
            self.phase = InterviewPhase::Completed;
        }
        self.completed_at = Some(Utc::now());
    }
}
