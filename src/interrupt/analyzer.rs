//! Four-layer interruption detection.
//!
//! Layers: audio (upstream recorder issues), lexical (filler/uncertainty/
//! repetition regexes), contextual (relevance and polar contradictions
//! against recent answers), and semantic (one LLM call for long
//! transcripts). Triggers are unioned and the highest-weight reason wins;
//! per-session consecutive counters decide warn vs interrupt.

use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::followup::FollowupGenerator;
use crate::llm::{ChatRequest, LlmGateway};
use crate::session::Session;

use super::types::{AudioMetrics, CheckOutcome, InterruptionEvent, InterruptionReason, Trigger};

/// Minimum words before the lexical layer runs.
const MIN_WORDS_FOR_LEXICAL: usize = 10;
/// Minimum transcript length before the semantic layer runs.
const MIN_CHARS_FOR_SEMANTIC: usize = 100;
/// Minimum seconds between warnings for the same reason.
const WARNING_COOLDOWN_SECS: i64 = 10;
const SEMANTIC_TEMPERATURE: f64 = 0.1;

static FILLER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(um|uh|like|you know|basically|actually|literally|kind of|sort of|i mean)\b")
        .expect("Invalid regex")
});

static UNCERTAINTY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(maybe|probably|possibly|perhaps|i think|i guess|not sure|might be)\b")
        .expect("Invalid regex")
});

static DIGIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("Invalid regex"));

/// Polar word pairs for the cheap contradiction check.
const POLAR_PAIRS: [(&str, &str); 4] = [
    ("yes", "no"),
    ("did", "didn't"),
    ("can", "can't"),
    ("will", "won't"),
];

const STOPWORDS: [&str; 24] = [
    "the", "and", "that", "this", "with", "from", "have", "what", "your", "about", "would",
    "could", "should", "their", "there", "been", "were", "when", "where", "which", "them",
    "then", "than", "because",
];

/// Input to one `check` call.
#[derive(Debug, Clone)]
pub struct InterruptionInput<'a> {
    pub partial_transcript: &'a str,
    pub audio_metrics: Option<&'a AudioMetrics>,
    pub recording_duration: f64,
}

/// Configuration for the analyzer.
#[derive(Debug, Clone, Copy)]
pub struct InterruptionConfig {
    pub enabled: bool,
    pub max_interruptions: u32,
}

impl Default for InterruptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_interruptions: 5,
        }
    }
}

/// Multi-layer interruption detector.
pub struct InterruptionAnalyzer {
    config: InterruptionConfig,
    followups: FollowupGenerator,
}

impl InterruptionAnalyzer {
    pub fn new(config: InterruptionConfig) -> Self {
        Self {
            config,
            followups: FollowupGenerator::new(),
        }
    }

    /// Run all four layers and decide. Counter and rate-limit mutations
    /// happen on the borrowed session; the caller holds the session lock.
    pub async fn check(
        &self,
        gateway: &LlmGateway,
        session: &mut Session,
        input: InterruptionInput<'_>,
    ) -> CheckOutcome {
        if !self.config.enabled {
            return CheckOutcome::None;
        }

        let word_count = input.partial_transcript.split_whitespace().count();
        if input.audio_metrics.is_none() && word_count < MIN_WORDS_FOR_LEXICAL {
            return CheckOutcome::None;
        }

        let question = session.current_question_text.clone().unwrap_or_default();

        let mut triggers = Vec::new();
        triggers.extend(audio_triggers(input.audio_metrics));
        triggers.extend(lexical_triggers(input.partial_transcript));
        triggers.extend(contextual_triggers(input.partial_transcript, &question, session));
        triggers.extend(
            self.semantic_triggers(gateway, input.partial_transcript, &question)
                .await,
        );

        self.decide(gateway, session, &question, input, triggers).await
    }

    async fn decide(
        &self,
        gateway: &LlmGateway,
        session: &mut Session,
        question: &str,
        input: InterruptionInput<'_>,
        triggers: Vec<Trigger>,
    ) -> CheckOutcome {
        let detected: HashSet<InterruptionReason> = triggers.iter().map(|t| t.reason).collect();

        // counters are consecutive: a round without a reason resets it
        session
            .interruption_counts
            .retain(|reason, _| detected.contains(reason));
        for reason in &detected {
            *session.interruption_counts.entry(*reason).or_insert(0) += 1;
        }

        let Some(winner) = triggers
            .into_iter()
            .max_by_key(|t| t.reason.weight())
        else {
            return CheckOutcome::None;
        };

        let count = session
            .interruption_counts
            .get(&winner.reason)
            .copied()
            .unwrap_or(1);

        let threshold = winner.reason.interrupt_threshold();
        let cap_reached = session.total_interruptions >= self.config.max_interruptions;

        let interrupt = match threshold {
            Some(threshold) if !cap_reached => count >= threshold,
            _ => false,
        };

        if !interrupt {
            return self.warn(session, winner);
        }

        debug!(reason = ?winner.reason, count, "interrupting candidate");

        let history = session.recent_answers(2);
        let followup_question = self
            .followups
            .generate(
                gateway,
                winner.reason,
                input.partial_transcript,
                question,
                &history,
                &winner.evidence,
            )
            .await;

        session.interruptions.push(InterruptionEvent {
            timestamp: Utc::now(),
            reason: winner.reason,
            weight: winner.reason.weight(),
            evidence: winner.evidence.clone(),
            partial_transcript: input.partial_transcript.to_string(),
            triggered_at_seconds: input.recording_duration,
            threshold: threshold.unwrap_or(0),
            occurrence_count: count,
        });
        session.total_interruptions += 1;
        // an interruption consumes the consecutive run
        session.interruption_counts.remove(&winner.reason);

        CheckOutcome::Interrupt {
            reason: winner.reason,
            phrase: winner.reason.interrupt_phrase().to_string(),
            followup_question,
            evidence: winner.evidence,
        }
    }

    fn warn(&self, session: &mut Session, winner: Trigger) -> CheckOutcome {
        let now = Utc::now();
        if let Some(last) = session.warning_timestamps.get(&winner.reason) {
            if (now - *last).num_seconds() < WARNING_COOLDOWN_SECS {
                return CheckOutcome::None;
            }
        }
        session.warning_timestamps.insert(winner.reason, now);

        CheckOutcome::Warn {
            reason: winner.reason,
            message: winner.reason.warning_message().to_string(),
            evidence: winner.evidence,
        }
    }

    /// Layer 4: one LLM call for long transcripts. Backend failures degrade
    /// to "no triggers".
    async fn semantic_triggers(
        &self,
        gateway: &LlmGateway,
        transcript: &str,
        question: &str,
    ) -> Vec<Trigger> {
        if transcript.len() <= MIN_CHARS_FOR_SEMANTIC {
            return Vec::new();
        }

        let request = ChatRequest::from_prompt(
            "You monitor an interview answer in progress and flag delivery problems.\n\
             Respond with ONLY a JSON object, no prose:\n\
             {\"is_off_topic\": bool, \"is_dodging\": bool, \"is_rambling\": bool, \
             \"is_vague\": bool, \"contains_false_claim\": bool, \
             \"contradicts_history\": bool, \"confidence_level\": 0.0-1.0, \
             \"explanation\": \"one sentence\"}",
            format!(
                "QUESTION: \"{}\"\n\nANSWER SO FAR: \"{}\"",
                question, transcript
            ),
        )
        .with_temperature(SEMANTIC_TEMPERATURE);

        let raw = match gateway.chat(request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "semantic interruption layer unavailable");
                return Vec::new();
            }
        };

        let Some(flags) = parse_semantic_flags(&raw) else {
            return Vec::new();
        };

        let evidence = if flags.explanation.is_empty() {
            "flagged by semantic analysis".to_string()
        } else {
            flags.explanation.clone()
        };

        let mut triggers = Vec::new();
        let mut push = |cond: bool, reason: InterruptionReason| {
            if cond {
                triggers.push(Trigger {
                    reason,
                    evidence: evidence.clone(),
                });
            }
        };
        push(flags.contains_false_claim, InterruptionReason::FalseClaim);
        push(flags.contradicts_history, InterruptionReason::Contradiction);
        push(flags.is_off_topic, InterruptionReason::CompletelyOffTopic);
        push(flags.is_dodging, InterruptionReason::DodgingQuestion);
        push(flags.is_rambling, InterruptionReason::ExcessiveRambling);
        push(flags.is_vague, InterruptionReason::VagueAnswer);
        triggers
    }
}

#[derive(Debug, Default, Deserialize)]
struct SemanticFlags {
    #[serde(default)]
    is_off_topic: bool,
    #[serde(default)]
    is_dodging: bool,
    #[serde(default)]
    is_rambling: bool,
    #[serde(default)]
    is_vague: bool,
    #[serde(default)]
    contains_false_claim: bool,
    #[serde(default)]
    contradicts_history: bool,
    #[serde(default)]
    #[allow(dead_code)]
    confidence_level: f64,
    #[serde(default)]
    explanation: String,
}

/// Parse the semantic layer's JSON-ish response: strip code fences, then
/// take the outermost brace span.
fn parse_semantic_flags(raw: &str) -> Option<SemanticFlags> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&cleaned[start..=end]).ok()
}

/// Layer 1: map pre-classified recorder issues to reasons. Unknown kinds
/// are ignored.
fn audio_triggers(metrics: Option<&AudioMetrics>) -> Vec<Trigger> {
    let Some(metrics) = metrics else {
        return Vec::new();
    };

    metrics
        .detected_issues
        .iter()
        .filter_map(|issue| {
            let reason = match issue.kind.as_str() {
                "excessive_pausing" => InterruptionReason::ExcessivePausing,
                "high_hesitation" => InterruptionReason::HighUncertainty,
                "speaking_too_long" => InterruptionReason::SpeakingTooLong,
                _ => return None,
            };
            Some(Trigger {
                reason,
                evidence: issue.evidence.clone(),
            })
        })
        .collect()
}

/// Layer 2: regex counts over the partial transcript.
fn lexical_triggers(transcript: &str) -> Vec<Trigger> {
    let words: Vec<&str> = transcript.split_whitespace().collect();
    if words.len() < MIN_WORDS_FOR_LEXICAL {
        return Vec::new();
    }

    let mut triggers = Vec::new();
    let word_count = words.len() as f64;

    let filler_count = FILLER_PATTERN.find_iter(transcript).count() as f64;
    let filler_ratio = filler_count / word_count;
    if filler_ratio > 0.15 {
        triggers.push(Trigger {
            reason: InterruptionReason::ExcessiveRambling,
            evidence: format!("filler-word ratio {:.2}", filler_ratio),
        });
    } else if filler_ratio >= 0.08 {
        triggers.push(Trigger {
            reason: InterruptionReason::MinorRambling,
            evidence: format!("filler-word ratio {:.2}", filler_ratio),
        });
    }

    let uncertainty_count = UNCERTAINTY_PATTERN.find_iter(transcript).count() as f64;
    let uncertainty_ratio = uncertainty_count / word_count;
    if uncertainty_ratio > 0.10 {
        triggers.push(Trigger {
            reason: InterruptionReason::HighUncertainty,
            evidence: format!("uncertainty-marker ratio {:.2}", uncertainty_ratio),
        });
    }

    let lower = transcript.to_lowercase();
    if words.len() > 50
        && !DIGIT_PATTERN.is_match(transcript)
        && !lower.contains("example")
        && !lower.contains("specifically")
    {
        triggers.push(Trigger {
            reason: InterruptionReason::VagueAnswer,
            evidence: "long answer with no numbers or concrete examples".to_string(),
        });
    }

    if let Some(uniqueness) = trigram_uniqueness(transcript) {
        if uniqueness < 0.6 {
            triggers.push(Trigger {
                reason: InterruptionReason::ExcessiveRambling,
                evidence: format!("repetitive phrasing, trigram uniqueness {:.2}", uniqueness),
            });
        }
    }

    triggers
}

/// Trigram uniqueness over the transcript; `None` when under 3 sentences.
fn trigram_uniqueness(transcript: &str) -> Option<f64> {
    let sentences = transcript
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    if sentences < 3 {
        return None;
    }

    let words: Vec<String> = transcript
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() < 3 {
        return None;
    }

    let total = words.len() - 2;
    let unique: HashSet<String> = words.windows(3).map(|w| w.join(" ")).collect();
    Some(unique.len() as f64 / total as f64)
}

/// Layer 3: relevance against the current question plus a polar
/// contradiction check against recent answers.
fn contextual_triggers(transcript: &str, question: &str, session: &Session) -> Vec<Trigger> {
    let mut triggers = Vec::new();

    let question_keywords = content_keywords(question);
    let answer_words: Vec<&str> = transcript.split_whitespace().collect();

    if !question_keywords.is_empty() && answer_words.len() > 30 {
        let answer_keywords = content_keywords(transcript);
        let overlap = question_keywords.intersection(&answer_keywords).count();
        let relevance = overlap as f64 / question_keywords.len() as f64;
        if relevance < 0.3 {
            triggers.push(Trigger {
                reason: InterruptionReason::DodgingQuestion,
                evidence: format!("answer relevance to question only {:.2}", relevance),
            });
        }
    }

    let current_keywords = content_keywords(transcript);
    let current_lower = format!(" {} ", transcript.to_lowercase());

    for qa in session.recent_answers(3) {
        let previous_lower = format!(" {} ", qa.answer_text.to_lowercase());
        let shared = content_keywords(&qa.answer_text)
            .intersection(&current_keywords)
            .count();
        if shared < 2 {
            continue;
        }

        for (positive, negative) in POLAR_PAIRS {
            let pos = format!(" {} ", positive);
            let neg = format!(" {} ", negative);
            let conflict = (previous_lower.contains(&pos) && current_lower.contains(&neg))
                || (previous_lower.contains(&neg) && current_lower.contains(&pos));
            if conflict {
                triggers.push(Trigger {
                    reason: InterruptionReason::Contradiction,
                    evidence: format!(
                        "current answer flips '{}'/'{}' against an earlier answer",
                        positive, negative
                    ),
                });
                return triggers;
            }
        }
    }

    triggers
}

/// Non-stopword tokens longer than three characters.
fn content_keywords(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|w| w.len() > 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use crate::error::{Error, Result};
    use crate::interrupt::AudioIssue;
    use crate::llm::LlmClient;
    use crate::session::{InterviewPhase, QaRecord, RoundKind};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct NoLlm;

    #[async_trait]
    impl LlmClient for NoLlm {
        async fn chat(&self, _request: ChatRequest) -> Result<String> {
            Err(Error::backend("local", "offline"))
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Local
        }
    }

    struct CannedLlm(String);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn chat(&self, _request: ChatRequest) -> Result<String> {
            Ok(self.0.clone())
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Local
        }
    }

    fn gateway_with(client: impl LlmClient + 'static) -> LlmGateway {
        LlmGateway::new(Arc::new(client), 4, Duration::from_secs(5))
    }

    fn session_with_question(question: &str) -> Session {
        let mut session = Session::new("sess_1", RoundKind::Technical, None);
        session.current_question_text = Some(question.to_string());
        session.current_question_id = Some("q_1".to_string());
        session
    }

    fn qa(question: &str, answer: &str) -> QaRecord {
        QaRecord {
            question_id: "q_0".to_string(),
            question_text: question.to_string(),
            answer_text: answer.to_string(),
            round_kind: RoundKind::Technical,
            phase: InterviewPhase::ResumeDeepDive,
            recording_duration: 30.0,
            was_interrupted: false,
            is_followup_answer: false,
            triggered_followup: false,
            degraded: false,
            evaluation: None,
            timestamp: Utc::now(),
        }
    }

    fn rambling_transcript() -> String {
        // ~100 words, >20% fillers
        let mut text = String::new();
        for _ in 0..20 {
            text.push_str("um so like basically the thing I was, you know, doing there. ");
        }
        text
    }

    #[test]
    fn test_lexical_filler_ratio_excessive() {
        let triggers = lexical_triggers(&rambling_transcript());
        assert!(triggers
            .iter()
            .any(|t| t.reason == InterruptionReason::ExcessiveRambling));
    }

    #[test]
    fn test_lexical_requires_ten_words() {
        assert!(lexical_triggers("um uh like basically").is_empty());
    }

    #[test]
    fn test_lexical_vague_long_answer() {
        let transcript = "we worked on the system and it went well and the team was happy \
                          and we did many things over the months and the project moved forward \
                          and people liked the outcome and we continued to improve the system \
                          and everyone agreed it was better than before in every way overall"
            .to_string();
        let triggers = lexical_triggers(&transcript);
        assert!(triggers
            .iter()
            .any(|t| t.reason == InterruptionReason::VagueAnswer));
    }

    #[test]
    fn test_uncertainty_markers() {
        let transcript =
            "maybe it works probably I think it might be possibly correct perhaps not sure";
        let triggers = lexical_triggers(transcript);
        assert!(triggers
            .iter()
            .any(|t| t.reason == InterruptionReason::HighUncertainty));
    }

    #[test]
    fn test_audio_layer_closed_set() {
        let metrics = AudioMetrics {
            duration_seconds: 40.0,
            detected_issues: vec![
                AudioIssue {
                    kind: "excessive_pausing".to_string(),
                    severity: "high".to_string(),
                    evidence: "three pauses over 5s".to_string(),
                    priority: 2,
                },
                AudioIssue {
                    kind: "some_future_issue".to_string(),
                    severity: "low".to_string(),
                    evidence: "ignored".to_string(),
                    priority: 1,
                },
            ],
        };

        let triggers = audio_triggers(Some(&metrics));
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].reason, InterruptionReason::ExcessivePausing);
    }

    #[test]
    fn test_contextual_dodging() {
        let session = session_with_question("Explain database indexing strategies");
        let transcript = "well my favorite part of working remotely has been the flexible \
                          schedule and honestly the coffee situation at home improved a lot \
                          since I bought a proper machine and my commute disappeared entirely";
        let triggers = contextual_triggers(
            transcript,
            "Explain database indexing strategies for large tables",
            &session,
        );
        assert!(triggers
            .iter()
            .any(|t| t.reason == InterruptionReason::DodgingQuestion));
    }

    #[test]
    fn test_contextual_polar_contradiction() {
        let mut session = session_with_question("Did you lead the project?");
        session.history.push(qa(
            "Tell me about the project",
            "Yes I did lead the payments migration project team",
        ));

        let transcript = "honestly I didn't lead the payments migration project team directly";
        let triggers = contextual_triggers(transcript, "Did you lead the project?", &session);
        assert!(triggers
            .iter()
            .any(|t| t.reason == InterruptionReason::Contradiction));
    }

    #[test]
    fn test_semantic_flag_parsing_with_fences() {
        let raw = "```json\n{\"is_rambling\": true, \"explanation\": \"circular\"}\n```";
        let flags = parse_semantic_flags(raw).unwrap();
        assert!(flags.is_rambling);
        assert!(!flags.is_vague);
        assert_eq!(flags.explanation, "circular");
    }

    #[tokio::test]
    async fn test_no_metrics_short_transcript_returns_none() {
        let analyzer = InterruptionAnalyzer::new(InterruptionConfig::default());
        let gateway = gateway_with(NoLlm);
        let mut session = session_with_question("anything");

        let outcome = analyzer
            .check(
                &gateway,
                &mut session,
                InterruptionInput {
                    partial_transcript: "just a few words",
                    audio_metrics: None,
                    recording_duration: 3.0,
                },
            )
            .await;

        assert_eq!(outcome, CheckOutcome::None);
    }

    #[tokio::test]
    async fn test_disabled_short_circuits() {
        let analyzer = InterruptionAnalyzer::new(InterruptionConfig {
            enabled: false,
            max_interruptions: 5,
        });
        let gateway = gateway_with(NoLlm);
        let mut session = session_with_question("anything");

        let outcome = analyzer
            .check(
                &gateway,
                &mut session,
                InterruptionInput {
                    partial_transcript: &rambling_transcript(),
                    audio_metrics: None,
                    recording_duration: 30.0,
                },
            )
            .await;

        assert_eq!(outcome, CheckOutcome::None);
    }

    #[tokio::test]
    async fn test_rambling_warns_then_interrupts() {
        // scenario: high-severity reason warns on the first detection and
        // interrupts on the second, with a ?-terminated follow-up
        let analyzer = InterruptionAnalyzer::new(InterruptionConfig::default());
        let gateway = gateway_with(CannedLlm("Just give me the result?".to_string()));
        let mut session = session_with_question("What was the outcome?");
        let transcript = rambling_transcript();

        let input = InterruptionInput {
            partial_transcript: &transcript,
            audio_metrics: None,
            recording_duration: 45.0,
        };

        let first = analyzer.check(&gateway, &mut session, input.clone()).await;
        match first {
            CheckOutcome::Warn { reason, .. } => {
                assert_eq!(reason, InterruptionReason::ExcessiveRambling)
            }
            other => panic!("expected warn, got {:?}", other),
        }

        let second = analyzer.check(&gateway, &mut session, input).await;
        match second {
            CheckOutcome::Interrupt {
                reason,
                phrase,
                followup_question,
                ..
            } => {
                assert_eq!(reason, InterruptionReason::ExcessiveRambling);
                assert_eq!(phrase, InterruptionReason::ExcessiveRambling.interrupt_phrase());
                assert!(followup_question.ends_with('?'));
            }
            other => panic!("expected interrupt, got {:?}", other),
        }

        assert_eq!(session.total_interruptions, 1);
        assert_eq!(session.interruptions.len(), 1);
        assert_eq!(session.interruptions[0].occurrence_count, 2);
    }

    #[tokio::test]
    async fn test_contradiction_interrupts_first_time_over_lexical_triggers() {
        // scenario: contradiction (weight 95, threshold 1) wins over any
        // concurrent lexical trigger and interrupts immediately
        let analyzer = InterruptionAnalyzer::new(InterruptionConfig::default());
        let gateway = gateway_with(CannedLlm("Which was it?".to_string()));

        let mut session = session_with_question("What was your role on the team?");
        session.history.push(qa(
            "What was your role?",
            "I did lead the checkout team through the replatform effort",
        ));

        // contradiction plus plenty of fillers in one transcript
        let transcript = "um so like basically I didn't lead the checkout team through \
                          the replatform effort you know I um like mostly watched honestly \
                          um like and uh basically you know that was um the whole thing";

        let outcome = analyzer
            .check(
                &gateway,
                &mut session,
                InterruptionInput {
                    partial_transcript: transcript,
                    audio_metrics: None,
                    recording_duration: 20.0,
                },
            )
            .await;

        match outcome {
            CheckOutcome::Interrupt { reason, .. } => {
                assert_eq!(reason, InterruptionReason::Contradiction)
            }
            other => panic!("expected interrupt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_low_severity_never_interrupts() {
        let analyzer = InterruptionAnalyzer::new(InterruptionConfig::default());
        let gateway = gateway_with(NoLlm);
        let mut session = session_with_question("Tell me about caching");

        let metrics = AudioMetrics {
            duration_seconds: 120.0,
            detected_issues: vec![AudioIssue {
                kind: "speaking_too_long".to_string(),
                severity: "low".to_string(),
                evidence: "two minutes".to_string(),
                priority: 1,
            }],
        };

        for round in 0..5 {
            // clear the cooldown so every round is eligible to warn
            session.warning_timestamps.clear();
            let outcome = analyzer
                .check(
                    &gateway,
                    &mut session,
                    InterruptionInput {
                        partial_transcript: "short",
                        audio_metrics: Some(&metrics),
                        recording_duration: 120.0,
                    },
                )
                .await;
            match outcome {
                CheckOutcome::Warn { reason, .. } => {
                    assert_eq!(reason, InterruptionReason::SpeakingTooLong)
                }
                other => panic!("round {}: expected warn, got {:?}", round, other),
            }
        }
        assert_eq!(session.total_interruptions, 0);
    }

    #[tokio::test]
    async fn test_warning_rate_limit() {
        let analyzer = InterruptionAnalyzer::new(InterruptionConfig::default());
        let gateway = gateway_with(NoLlm);
        let mut session = session_with_question("Tell me about caching");

        let metrics = AudioMetrics {
            duration_seconds: 120.0,
            detected_issues: vec![AudioIssue {
                kind: "speaking_too_long".to_string(),
                severity: "low".to_string(),
                evidence: "two minutes".to_string(),
                priority: 1,
            }],
        };
        let input = InterruptionInput {
            partial_transcript: "short",
            audio_metrics: Some(&metrics),
            recording_duration: 120.0,
        };

        let first = analyzer.check(&gateway, &mut session, input.clone()).await;
        assert!(matches!(first, CheckOutcome::Warn { .. }));

        // immediately repeated: suppressed by the 10s cooldown
        let second = analyzer.check(&gateway, &mut session, input).await;
        assert_eq!(second, CheckOutcome::None);
    }

    #[tokio::test]
    async fn test_session_interruption_cap() {
        let analyzer = InterruptionAnalyzer::new(InterruptionConfig {
            enabled: true,
            max_interruptions: 0,
        });
        let gateway = gateway_with(CannedLlm("Which was it?".to_string()));
        let mut session = session_with_question("What was your role?");
        session.history.push(qa(
            "What was your role?",
            "Yes I did lead the checkout team rebuild effort myself",
        ));

        let outcome = analyzer
            .check(
                &gateway,
                &mut session,
                InterruptionInput {
                    partial_transcript:
                        "I didn't lead the checkout team rebuild effort at any point really",
                    audio_metrics: None,
                    recording_duration: 10.0,
                },
            )
            .await;

        // cap reached: the critical trigger degrades to a warning
        assert!(matches!(outcome, CheckOutcome::Warn { .. }));
        assert_eq!(session.total_interruptions, 0);
    }
}
