//! Interruption types: reasons, weights, thresholds, and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why the system considered interrupting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterruptionReason {
    FalseClaim,
    Contradiction,
    CompletelyOffTopic,
    DodgingQuestion,
    ExcessiveRambling,
    ExcessivePausing,
    VagueAnswer,
    LackOfSpecifics,
    HighUncertainty,
    MinorRambling,
    SpeakingTooLong,
    InconsistentDelivery,
}

/// How severe a trigger is, used for display and warning styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl InterruptionReason {
    /// Weight used to pick the winning trigger when layers disagree.
    pub fn weight(&self) -> u32 {
        match self {
            Self::FalseClaim => 100,
            Self::Contradiction => 95,
            Self::CompletelyOffTopic => 90,
            Self::DodgingQuestion => 85,
            Self::ExcessiveRambling => 80,
            Self::ExcessivePausing => 75,
            Self::VagueAnswer => 70,
            Self::LackOfSpecifics => 65,
            Self::HighUncertainty => 60,
            Self::MinorRambling => 30,
            Self::SpeakingTooLong => 25,
            Self::InconsistentDelivery => 20,
        }
    }

    /// Consecutive detections required before interrupting. `None` means the
    /// reason only ever warns.
    pub fn interrupt_threshold(&self) -> Option<u32> {
        match self.severity() {
            Severity::Critical => Some(1),
            Severity::High => Some(2),
            Severity::Medium => Some(3),
            Severity::Low => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self.weight() {
            90.. => Severity::Critical,
            75..=89 => Severity::High,
            60..=74 => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// Canned phrase spoken when actually interrupting.
    pub fn interrupt_phrase(&self) -> &'static str {
        match self {
            Self::FalseClaim => "Hold on - I need to stop you there. That doesn't sound right.",
            Self::Contradiction => "Wait - that contradicts what you said earlier.",
            Self::CompletelyOffTopic => "Let me stop you - that's not what I asked.",
            Self::DodgingQuestion => "Let me stop you - you're not answering my question.",
            Self::ExcessiveRambling => "Let me stop you there - please get to the point.",
            Self::ExcessivePausing => "Let me jump in, since you seem to be stuck.",
            Self::VagueAnswer => "I'll stop you - I need specifics, not generalities.",
            Self::LackOfSpecifics => "Hold on - give me concrete details.",
            Self::HighUncertainty => "Let me pause you there for a moment.",
            Self::MinorRambling | Self::SpeakingTooLong | Self::InconsistentDelivery => {
                "Let me stop you there for a second."
            }
        }
    }

    /// Short coaching message shown with a warning.
    pub fn warning_message(&self) -> &'static str {
        match self {
            Self::FalseClaim => "Check the accuracy of that statement",
            Self::Contradiction => "That may conflict with an earlier answer",
            Self::CompletelyOffTopic => "Stay focused on the question",
            Self::DodgingQuestion => "Address the question directly",
            Self::ExcessiveRambling => "Reduce filler words and get to the point",
            Self::ExcessivePausing => "You're taking long pauses",
            Self::VagueAnswer => "Be more specific",
            Self::LackOfSpecifics => "Give concrete examples",
            Self::HighUncertainty => "Speak with more confidence",
            Self::MinorRambling => "Watch the filler words",
            Self::SpeakingTooLong => "Wrap up your point",
            Self::InconsistentDelivery => "Maintain a steady pace",
        }
    }
}

/// One detection produced by a layer. The analyzer unions these and keeps
/// the highest weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub reason: InterruptionReason,
    pub evidence: String,
}

/// A recorded interruption event on the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptionEvent {
    pub timestamp: DateTime<Utc>,
    pub reason: InterruptionReason,
    pub weight: u32,
    pub evidence: String,
    pub partial_transcript: String,
    pub triggered_at_seconds: f64,
    pub threshold: u32,
    pub occurrence_count: u32,
}

/// Issue detected by the upstream audio recorder. The core never parses raw
/// audio; it only interprets these pre-classified issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioIssue {
    pub kind: String,
    pub severity: String,
    pub evidence: String,
    pub priority: u32,
}

/// Metrics attached to a recording in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMetrics {
    pub duration_seconds: f64,
    #[serde(default)]
    pub detected_issues: Vec<AudioIssue>,
}

/// Outcome of a `check_interruption` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Nothing noteworthy
    None,
    /// Candidate keeps talking; a coaching hint is surfaced
    Warn {
        reason: InterruptionReason,
        message: String,
        evidence: String,
    },
    /// Recording is cut; the phrase is spoken and the follow-up asked
    Interrupt {
        reason: InterruptionReason,
        phrase: String,
        followup_question: String,
        evidence: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_table() {
        assert_eq!(InterruptionReason::FalseClaim.weight(), 100);
        assert_eq!(InterruptionReason::Contradiction.weight(), 95);
        assert_eq!(InterruptionReason::ExcessiveRambling.weight(), 80);
        assert_eq!(InterruptionReason::InconsistentDelivery.weight(), 20);
    }

    #[test]
    fn test_thresholds_by_severity() {
        // critical reasons interrupt on the first detection
        assert_eq!(InterruptionReason::Contradiction.interrupt_threshold(), Some(1));
        // high on the second
        assert_eq!(
            InterruptionReason::ExcessiveRambling.interrupt_threshold(),
            Some(2)
        );
        // medium on the third
        assert_eq!(InterruptionReason::VagueAnswer.interrupt_threshold(), Some(3));
        // low severity never interrupts
        assert_eq!(InterruptionReason::MinorRambling.interrupt_threshold(), None);
        assert_eq!(InterruptionReason::SpeakingTooLong.interrupt_threshold(), None);
    }

    #[test]
    fn test_reason_serializes_screaming_snake() {
        let json = serde_json::to_string(&InterruptionReason::DodgingQuestion).unwrap();
        assert_eq!(json, "\"DODGING_QUESTION\"");
    }

    #[test]
    fn test_audio_metrics_default_issues() {
        let metrics: AudioMetrics = serde_json::from_str(r#"{"duration_seconds": 12.5}"#).unwrap();
        assert!(metrics.detected_issues.is_empty());
    }
}
