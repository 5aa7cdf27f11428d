//! Phase pacing rules and transition logic.
//!
//! Each phase carries a question budget and a transition rule. The engine
//! ships two named presets: `demo` (five questions over two phases, the
//! rest disabled) and `production` (the full six-phase flow).

use serde::{Deserialize, Serialize};

use super::state::InterviewPhase;

/// Pacing rules for a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseRules {
    /// Questions required before a score-based transition is considered
    pub min_questions: u32,
    /// Question budget for the phase; zero disables the phase entirely
    pub max_questions: u32,
    /// Transition is forced once this many questions were asked
    pub force_transition_after: u32,
    /// Phase-average overall score that permits an early transition once
    /// `min_questions` is met; zero means "transition as soon as
    /// `min_questions` is reached"
    pub transition_score: u32,
    /// Skip the phase when the session has no unverified claims
    pub skip_if_no_claims: bool,
}

impl PhaseRules {
    /// A disabled phase: zero budget, always skipped.
    pub const DISABLED: PhaseRules = PhaseRules {
        min_questions: 0,
        max_questions: 0,
        force_transition_after: 0,
        transition_score: 0,
        skip_if_no_claims: false,
    };

    pub fn is_disabled(&self) -> bool {
        self.max_questions == 0
    }

    /// Whether the phase should hand over given the questions asked in it
    /// and its average overall score so far.
    pub fn should_transition(&self, questions_in_phase: u32, phase_average: f64) -> bool {
        if self.is_disabled() {
            return true;
        }
        if questions_in_phase >= self.force_transition_after {
            return true;
        }
        if questions_in_phase >= self.min_questions {
            if self.transition_score == 0 {
                return true;
            }
            if phase_average >= f64::from(self.transition_score) {
                return true;
            }
        }
        false
    }
}

/// Named phase rule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhasePreset {
    /// Five questions: two resume, three core skill; later phases disabled
    Demo,
    /// Full six-phase interview
    Production,
}

impl PhasePreset {
    /// Rules for a phase under this preset. `Completed` has no rules and is
    /// reported as disabled.
    pub fn rules_for(&self, phase: InterviewPhase) -> PhaseRules {
        match self {
            Self::Demo => match phase {
                InterviewPhase::ResumeDeepDive => PhaseRules {
                    min_questions: 2,
                    max_questions: 2,
                    force_transition_after: 2,
                    transition_score: 0,
                    skip_if_no_claims: false,
                },
                InterviewPhase::CoreSkillAssessment => PhaseRules {
                    min_questions: 3,
                    max_questions: 3,
                    force_transition_after: 3,
                    transition_score: 0,
                    skip_if_no_claims: false,
                },
                _ => PhaseRules::DISABLED,
            },
            Self::Production => match phase {
                InterviewPhase::ResumeDeepDive => PhaseRules {
                    min_questions: 2,
                    max_questions: 3,
                    force_transition_after: 3,
                    transition_score: 65,
                    skip_if_no_claims: false,
                },
                InterviewPhase::CoreSkillAssessment => PhaseRules {
                    min_questions: 3,
                    max_questions: 4,
                    force_transition_after: 4,
                    transition_score: 65,
                    skip_if_no_claims: false,
                },
                InterviewPhase::ScenarioSolving => PhaseRules {
                    min_questions: 2,
                    max_questions: 3,
                    force_transition_after: 3,
                    transition_score: 70,
                    skip_if_no_claims: false,
                },
                InterviewPhase::StressTesting => PhaseRules {
                    min_questions: 1,
                    max_questions: 2,
                    force_transition_after: 2,
                    transition_score: 0,
                    skip_if_no_claims: false,
                },
                InterviewPhase::ClaimVerification => PhaseRules {
                    min_questions: 1,
                    max_questions: 2,
                    force_transition_after: 2,
                    transition_score: 0,
                    skip_if_no_claims: true,
                },
                InterviewPhase::WrapUp => PhaseRules {
                    min_questions: 1,
                    max_questions: 1,
                    force_transition_after: 1,
                    transition_score: 0,
                    skip_if_no_claims: false,
                },
                InterviewPhase::Completed => PhaseRules::DISABLED,
            },
        }
    }

    /// Total question budget across all phases.
    pub fn max_total_questions(&self) -> u32 {
        InterviewPhase::ORDER
            .iter()
            .map(|p| self.rules_for(*p).max_questions)
            .sum()
    }

    /// The phase that follows `current`, skipping disabled phases and, when
    /// the session has no unverified claims, the claim-verification phase.
    pub fn next_phase(
        &self,
        current: InterviewPhase,
        has_unverified_claims: bool,
    ) -> InterviewPhase {
        let mut phase = current.successor();
        loop {
            if phase == InterviewPhase::Completed {
                return phase;
            }
            let rules = self.rules_for(phase);
            let skip_for_claims = rules.skip_if_no_claims && !has_unverified_claims;
            if rules.is_disabled() || skip_for_claims {
                phase = phase.successor();
                continue;
            }
            return phase;
        }
    }
}
