//! Claim types: verifiable statements extracted from candidate answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of assertion the claim makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    TechnicalAchievement,
    Metric,
    ToolExpertise,
    RoleResponsibility,
    ProjectScale,
    ProblemSolved,
    ArchitectureDecision,
}

impl ClaimType {
    /// Parse the extractor output value; unknown types fall back to
    /// `TechnicalAchievement`.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "metric" => Self::Metric,
            "tool_expertise" => Self::ToolExpertise,
            "role_responsibility" => Self::RoleResponsibility,
            "project_scale" => Self::ProjectScale,
            "problem_solved" => Self::ProblemSolved,
            "architecture_decision" => Self::ArchitectureDecision,
            _ => Self::TechnicalAchievement,
        }
    }

    /// Priority bonus applied when ranking claims for verification. Metrics
    /// and scale claims are the easiest to falsify, so they surface first.
    pub fn priority_bonus(&self) -> i32 {
        match self {
            Self::Metric => 3,
            Self::ProjectScale => 3,
            Self::TechnicalAchievement => 2,
            Self::ArchitectureDecision => 2,
            Self::RoleResponsibility => 1,
            Self::ProblemSolved => 1,
            Self::ToolExpertise => 0,
        }
    }
}

/// How trustworthy the claim looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verifiability {
    Verifiable,
    Vague,
    Suspicious,
    Contradictory,
}

impl Verifiability {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "vague" => Self::Vague,
            "suspicious" => Self::Suspicious,
            "contradictory" => Self::Contradictory,
            _ => Self::Verifiable,
        }
    }

    /// Priority bonus when ranking claims for verification follow-ups.
    pub fn priority_bonus(&self) -> i32 {
        match self {
            Self::Contradictory => 30,
            Self::Suspicious => 15,
            Self::Vague => 10,
            Self::Verifiable => 0,
        }
    }
}

/// A verifiable statement extracted from an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: String,
    pub claim_text: String,
    pub claim_type: ClaimType,
    pub verifiability: Verifiability,
    /// 1..=10, from the extractor
    pub priority: u8,
    pub verification_questions: Vec<String>,
    pub red_flags: Vec<String>,
    pub source_question_id: String,
    pub source_answer_id: String,
    pub requires_verification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_result: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

impl Claim {
    /// Create a claim and derive `requires_verification` from its fields.
    pub fn new(
        claim_text: impl Into<String>,
        claim_type: ClaimType,
        verifiability: Verifiability,
        priority: u8,
        source_question_id: impl Into<String>,
        source_answer_id: impl Into<String>,
    ) -> Self {
        let mut claim = Self {
            claim_id: Uuid::new_v4().to_string(),
            claim_text: claim_text.into(),
            claim_type,
            verifiability,
            priority: priority.clamp(1, 10),
            verification_questions: Vec::new(),
            red_flags: Vec::new(),
            source_question_id: source_question_id.into(),
            source_answer_id: source_answer_id.into(),
            requires_verification: false,
            verification_result: None,
            extracted_at: Utc::now(),
        };
        claim.refresh_requires_verification();
        claim
    }

    /// A claim needs verification when it is not cleanly verifiable, carries
    /// a high priority, or has red flags attached.
    pub fn refresh_requires_verification(&mut self) {
        self.requires_verification = !matches!(self.verifiability, Verifiability::Verifiable)
            || self.priority >= 7
            || !self.red_flags.is_empty();
    }

    /// Mark this claim as contradicting earlier answers.
    pub fn mark_contradictory(&mut self, evidence: impl Into<String>) {
        self.verifiability = Verifiability::Contradictory;
        self.red_flags
            .push(format!("Contradicts earlier answer: {}", evidence.into()));
        self.refresh_requires_verification();
    }

    /// Priority adjusted for surfacing: base priority plus type and
    /// verifiability bonuses, plus a bump for red flags.
    pub fn adjusted_priority(&self) -> i32 {
        i32::from(self.priority)
            + self.claim_type.priority_bonus()
            + self.verifiability.priority_bonus()
            + if self.red_flags.is_empty() { 0 } else { 20 }
    }

    pub fn is_verified(&self) -> bool {
        self.verification_result.is_some()
    }
}
