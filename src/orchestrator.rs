//! Top-level interview state machine.
//!
//! Owns session lifecycle: `start`, `process_answer`, `check_interruption`,
//! and `final_report`. Operations on the same session serialize on its lock;
//! cross-session work runs concurrently. Every mutation is followed by a
//! snapshot write so a cancelled call leaves either the pre- or the
//! post-mutation state on disk.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::eval::{
    clean_question, AnswerAnalyzer, Evaluation, QuestionContext, RoundEvaluator,
};
use crate::feedback::{immediate_feedback, ImmediateFeedback};
use crate::interrupt::{
    AudioMetrics, CheckOutcome, InterruptionAnalyzer, InterruptionConfig, InterruptionInput,
};
use crate::llm::{ChatRequest, LlmGateway};
use crate::report::{FinalReport, FinalReportGenerator};
use crate::session::{
    InterviewPhase, QaRecord, RoundKind, Session, SessionStore, SnapshotStore,
};

/// Weakness phrases that trigger a follow-up on their own.
const CRITICAL_WEAKNESSES: [&str; 6] = [
    "vague",
    "no specific",
    "missing details",
    "unclear",
    "contradictory",
    "no metrics",
];

const FOLLOWUP_FALLBACK: &str = "Can you elaborate on that with more specific details?";

/// Phase description shown to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseInfo {
    pub phase: InterviewPhase,
    pub description: String,
    pub min_questions: u32,
    pub max_questions: u32,
}

/// A generated question with its display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionInfo {
    pub text: String,
    pub round_kind: RoundKind,
    pub phase: InterviewPhase,
    pub difficulty: u8,
    pub question_number: u32,
}

/// Result of `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartOutcome {
    pub session_id: String,
    pub round_kind: RoundKind,
    pub introduction: String,
    pub question: QuestionInfo,
    pub question_number: u32,
    pub total_questions_allowed: u32,
    pub phase_info: PhaseInfo,
}

/// What happens after an answer is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerDisposition {
    /// The interview is over
    Completed { reason: String },
    /// A follow-up question was issued; the main counter did not advance
    RequiresFollowup {
        followup_question: String,
        followup_reason: String,
    },
    /// The next main question
    NextQuestion {
        question: QuestionInfo,
        phase_info: PhaseInfo,
        difficulty_level: u8,
    },
}

/// Result of `process_answer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub evaluation: Evaluation,
    pub immediate_feedback: ImmediateFeedback,
    pub question_number: u32,
    pub total_questions_allowed: u32,
    pub disposition: AnswerDisposition,
}

/// Main orchestrator for interview flow.
pub struct InterviewOrchestrator {
    config: EngineConfig,
    gateway: Arc<LlmGateway>,
    store: SessionStore,
    analyzer: AnswerAnalyzer,
    interruptions: InterruptionAnalyzer,
    reports: FinalReportGenerator,
    max_total_questions: u32,
}

impl InterviewOrchestrator {
    pub fn new(
        config: EngineConfig,
        gateway: Arc<LlmGateway>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        let max_total_questions = config
            .phase_preset
            .max_total_questions()
            .min(config.max_questions_per_session);

        let interruptions = InterruptionAnalyzer::new(InterruptionConfig {
            enabled: config.enable_interruptions,
            max_interruptions: config.max_interruptions_per_session,
        });

        info!(
            preset = ?config.phase_preset,
            max_total_questions,
            "interview orchestrator initialized"
        );

        Self {
            store: SessionStore::new(snapshots),
            analyzer: AnswerAnalyzer::new(),
            interruptions,
            reports: FinalReportGenerator::new(),
            max_total_questions,
            config,
            gateway,
        }
    }

    /// Restore persisted sessions into memory. Call once at startup.
    pub async fn restore_sessions(&self) -> Result<usize> {
        self.store.restore().await
    }

    /// Drop sessions idle past the configured timeout, flushing each first.
    pub async fn prune_idle_sessions(&self) -> Vec<String> {
        self.store.prune_idle(self.config.idle_timeout).await
    }

    /// Start a new interview session.
    pub async fn start(
        &self,
        session_id: &str,
        round_kind: &str,
        resume_context: Option<String>,
    ) -> Result<StartOutcome> {
        let round = RoundKind::parse(round_kind);
        info!(session_id, %round, "starting interview");

        let mut session = Session::new(session_id, round, resume_context.clone());

        let introduction = generate_introduction(round, resume_context.is_some(), session_id);

        let first_question = self
            .generate_question(&mut session, None)
            .await;

        session.current_question_text = Some(first_question.clone());
        session.current_question_id = Some("q_1".to_string());
        session.actual_question_number = 1;
        session.touch();

        let phase_info = self.phase_info(session.phase);
        let question = QuestionInfo {
            text: first_question,
            round_kind: round,
            phase: session.phase,
            difficulty: session.difficulty_level,
            question_number: 1,
        };

        self.store.persist(&session)?;
        self.store.insert(session).await;

        Ok(StartOutcome {
            session_id: session_id.to_string(),
            round_kind: round,
            introduction,
            question,
            question_number: 1,
            total_questions_allowed: self.max_total_questions,
            phase_info,
        })
    }

    /// Process an answer: evaluate, update state, and decide between
    /// completion, a follow-up, and the next question.
    pub async fn process_answer(
        &self,
        session_id: &str,
        question_id: &str,
        answer_text: &str,
        recording_duration: f64,
        was_interrupted: bool,
        is_followup_answer: bool,
    ) -> Result<AnswerOutcome> {
        let handle = self.store.handle(session_id).await?;
        let mut session = handle.lock().await;

        let current = session.current_question_id.clone().unwrap_or_default();
        if session.is_completed() || current != question_id {
            return Err(Error::invalid_transition(current, question_id));
        }

        let question_text = session.current_question_text.clone().unwrap_or_default();
        let actual_q = session.actual_question_number;
        debug!(
            session_id,
            question_id,
            actual_q,
            is_followup_answer,
            followup_count = session.followup_count,
            phase = %session.phase,
            "processing answer"
        );

        let skip_claims = actual_q < self.config.skip_claim_extraction_below;
        let analysis = self
            .analyzer
            .evaluate(
                &self.gateway,
                answer_text,
                &question_text,
                question_id,
                session.round_kind,
                &session.history,
                skip_claims,
            )
            .await?;

        if !is_followup_answer {
            session.questions_in_current_phase += 1;
        }

        self.record_answer(
            &mut session,
            &analysis.evaluation,
            analysis.claims,
            &question_text,
            answer_text,
            recording_duration,
            was_interrupted,
            is_followup_answer,
            analysis.degraded,
        );

        let evaluation = analysis.evaluation;
        let feedback = immediate_feedback(&evaluation);

        // hard stop comes before any follow-up intent
        if actual_q >= self.max_total_questions {
            info!(session_id, actual_q, "interview completed: reached question cap");
            session.complete();
            session.touch();
            self.store.persist(&session)?;
            return Ok(AnswerOutcome {
                evaluation,
                immediate_feedback: feedback,
                question_number: actual_q,
                total_questions_allowed: self.max_total_questions,
                disposition: AnswerDisposition::Completed {
                    reason: format!("Completed all {} questions", self.max_total_questions),
                },
            });
        }

        if self.should_followup(&session, &evaluation, answer_text, is_followup_answer, actual_q) {
            let followup_question = self.generate_followup(&evaluation, &question_text, answer_text).await;
            let reason = evaluation
                .followup_reason
                .clone()
                .unwrap_or_else(|| "Answer needs clarification".to_string());
            debug!(session_id, %reason, "follow-up triggered");

            if let Some(parent) = session.history.last_mut() {
                parent.triggered_followup = true;
            }
            session.followup_count += 1;
            session.current_question_text = Some(followup_question.clone());
            session.current_question_id = Some(format!("q_{}_followup", actual_q));
            session.touch();
            self.store.persist(&session)?;

            return Ok(AnswerOutcome {
                evaluation,
                immediate_feedback: feedback,
                question_number: actual_q,
                total_questions_allowed: self.max_total_questions,
                disposition: AnswerDisposition::RequiresFollowup {
                    followup_question,
                    followup_reason: reason,
                },
            });
        }

        if !is_followup_answer {
            session.difficulty_level = evaluation
                .difficulty_adjustment
                .apply(session.difficulty_level);
        }

        let rules = self.config.phase_preset.rules_for(session.phase);
        let phase_average = session.phase_average_score(session.phase);
        if rules.should_transition(session.questions_in_current_phase, phase_average) {
            let completed_phase = session.phase;
            let next = self
                .config
                .phase_preset
                .next_phase(completed_phase, session.has_unverified_claims());
            debug!(session_id, from = %completed_phase, to = %next, "phase transition");

            session.phases_completed.push(completed_phase);
            session.phase = next;
            session.questions_in_current_phase = 0;

            if next == InterviewPhase::Completed {
                info!(session_id, "interview completed: all phases done");
                session.complete();
                session.touch();
                self.store.persist(&session)?;
                return Ok(AnswerOutcome {
                    evaluation,
                    immediate_feedback: feedback,
                    question_number: actual_q,
                    total_questions_allowed: self.max_total_questions,
                    disposition: AnswerDisposition::Completed {
                        reason: "Completed all phases".to_string(),
                    },
                });
            }
        }

        // the counter moves before the next non-follow-up question exists
        let next_number = actual_q + 1;
        session.actual_question_number = next_number;

        let next_question = self
            .generate_question(&mut session, Some(&evaluation))
            .await;

        session.current_question_text = Some(next_question.clone());
        session.current_question_id = Some(format!("q_{}", next_number));
        session.touch();
        self.store.persist(&session)?;

        let phase_info = self.phase_info(session.phase);
        Ok(AnswerOutcome {
            evaluation,
            immediate_feedback: feedback,
            question_number: next_number,
            total_questions_allowed: self.max_total_questions,
            disposition: AnswerDisposition::NextQuestion {
                question: QuestionInfo {
                    text: next_question,
                    round_kind: session.round_kind,
                    phase: session.phase,
                    difficulty: session.difficulty_level,
                    question_number: next_number,
                },
                phase_info,
                difficulty_level: session.difficulty_level,
            },
        })
    }

    /// Run the interruption detector against a recording in progress.
    pub async fn check_interruption(
        &self,
        session_id: &str,
        partial_transcript: &str,
        audio_metrics: Option<&AudioMetrics>,
        recording_duration: f64,
    ) -> Result<CheckOutcome> {
        let handle = self.store.handle(session_id).await?;
        let mut session = handle.lock().await;

        let outcome = self
            .interruptions
            .check(
                &self.gateway,
                &mut session,
                InterruptionInput {
                    partial_transcript,
                    audio_metrics,
                    recording_duration,
                },
            )
            .await;

        if let CheckOutcome::Interrupt { reason, evidence, .. } = &outcome {
            self.store.append_event(
                "interruptions",
                &serde_json::json!({
                    "session_id": session_id,
                    "reason": reason,
                    "evidence": evidence,
                    "recording_duration": recording_duration,
                }),
            );
        }

        session.touch();
        self.store.persist(&session)?;
        Ok(outcome)
    }

    /// Generate the final report. A session that is not yet completed is
    /// closed out first.
    pub async fn final_report(&self, session_id: &str) -> Result<FinalReport> {
        let handle = self.store.handle(session_id).await?;
        let mut session = handle.lock().await;

        if !session.is_completed() {
            session.complete();
            self.store.persist(&session)?;
        }

        Ok(self.reports.generate(&session))
    }

    fn phase_info(&self, phase: InterviewPhase) -> PhaseInfo {
        let rules = self.config.phase_preset.rules_for(phase);
        PhaseInfo {
            phase,
            description: phase_description(phase).to_string(),
            min_questions: rules.min_questions,
            max_questions: rules.max_questions,
        }
    }

    /// Append the Q/A record and fold evaluation and claims into the session.
    #[allow(clippy::too_many_arguments)]
    fn record_answer(
        &self,
        session: &mut Session,
        evaluation: &Evaluation,
        claims: Vec<crate::claims::Claim>,
        question_text: &str,
        answer_text: &str,
        recording_duration: f64,
        was_interrupted: bool,
        is_followup_answer: bool,
        degraded: bool,
    ) {
        session.add_answer_scores(&evaluation.scores);
        session.score_progression.push(evaluation.overall_score);

        for flag in &evaluation.red_flags {
            session.add_red_flag("evaluation_flag", flag.clone(), evaluation.question_id.clone());
        }
        for claim in &claims {
            for flag in &claim.red_flags {
                session.add_red_flag("claim", flag.clone(), claim.source_question_id.clone());
            }
        }
        session.claims.extend(claims);

        session.history.push(QaRecord {
            question_id: evaluation.question_id.clone(),
            question_text: question_text.to_string(),
            answer_text: answer_text.to_string(),
            round_kind: session.round_kind,
            phase: session.phase,
            recording_duration,
            was_interrupted,
            is_followup_answer,
            triggered_followup: false,
            degraded,
            evaluation: Some(evaluation.clone()),
            timestamp: Utc::now(),
        });

        self.store.append_event(
            "answers",
            &serde_json::json!({
                "session_id": session.session_id,
                "question_id": evaluation.question_id,
                "answer": answer_text,
                "recording_duration": recording_duration,
                "was_interrupted": was_interrupted,
                "is_followup_answer": is_followup_answer,
            }),
        );
        self.store.append_event(
            "evaluations",
            &serde_json::json!({
                "session_id": session.session_id,
                "question_id": evaluation.question_id,
                "overall_score": evaluation.overall_score,
                "degraded": degraded,
            }),
        );
    }

    /// Follow-up decision. Suppression rules run first, then triggers.
    fn should_followup(
        &self,
        session: &Session,
        evaluation: &Evaluation,
        answer_text: &str,
        is_followup_answer: bool,
        actual_q: u32,
    ) -> bool {
        if actual_q + 1 >= self.max_total_questions {
            debug!(actual_q, "near end of interview, no follow-ups");
            return false;
        }
        if is_followup_answer {
            return false;
        }
        // the record preceding the current answer
        if session.history.len() >= 2 {
            if session.history[session.history.len() - 2].triggered_followup {
                debug!("previous question already had a follow-up");
                return false;
            }
        }
        if session.followup_count >= self.config.max_followups_per_session {
            debug!(count = session.followup_count, "follow-up budget exhausted");
            return false;
        }

        if evaluation.requires_followup {
            return true;
        }
        if evaluation.overall_score < 55 {
            return true;
        }
        if answer_text.split_whitespace().count() < 30 {
            return true;
        }
        if !evaluation.red_flags.is_empty() {
            return true;
        }
        evaluation.weaknesses.iter().any(|weakness| {
            let lower = weakness.to_lowercase();
            CRITICAL_WEAKNESSES.iter().any(|cw| lower.contains(cw))
        })
    }

    /// The follow-up question: evaluator suggestion if present, otherwise
    /// one LLM sentence, otherwise a fixed fallback.
    async fn generate_followup(
        &self,
        evaluation: &Evaluation,
        original_question: &str,
        answer_text: &str,
    ) -> String {
        if let Some(suggested) = &evaluation.suggested_followup {
            return clean_question(suggested);
        }

        let weaknesses = evaluation
            .weaknesses
            .iter()
            .take(2)
            .cloned()
            .collect::<Vec<_>>()
            .join("; ");
        let answer_excerpt: String = answer_text.chars().take(300).collect();

        let request = ChatRequest::from_prompt(
            format!(
                "You are an interviewer asking a brief follow-up question.\n\n\
                 ORIGINAL QUESTION: {}\n\nCANDIDATE'S ANSWER: {}\n\n\
                 ISSUES DETECTED: {}\n\n\
                 Generate ONE short, direct follow-up question (1 sentence) that:\n\
                 1. Asks for specific details they missed\n\
                 2. Probes deeper into vague points\n\
                 3. Requests concrete examples or metrics\n\n\
                 Output ONLY the question, nothing else.",
                original_question, answer_excerpt, weaknesses
            ),
            "Generate the follow-up question.",
        )
        .with_temperature(0.7);

        match self.gateway.chat(request).await {
            Ok(raw) => clean_question(&raw),
            Err(e) => {
                warn!(error = %e, "follow-up generation failed, using fallback");
                FOLLOWUP_FALLBACK.to_string()
            }
        }
    }

    /// Generate a question for the session's current phase and difficulty.
    /// Backend failure after retry degrades to the per-round fallback pool.
    async fn generate_question(
        &self,
        session: &mut Session,
        previous_evaluation: Option<&Evaluation>,
    ) -> String {
        let evaluator = RoundEvaluator::new(session.round_kind);

        let recent_questions: Vec<String> = session
            .recent_answers(3)
            .iter()
            .map(|qa| qa.question_text.clone())
            .collect();

        let ctx = QuestionContext {
            phase: session.phase,
            difficulty_level: session.difficulty_level,
            questions_asked: session.history.len(),
            resume_context: session.resume_context.clone(),
            previous_evaluation: previous_evaluation.cloned(),
            recent_questions,
        };

        match evaluator.generate_question(&self.gateway, &ctx).await {
            Ok(question) => question,
            Err(e) => {
                warn!(error = %e, "question generation failed, using fallback pool");
                evaluator.fallback_question(session.actual_question_number)
            }
        }
    }
}

fn phase_description(phase: InterviewPhase) -> &'static str {
    match phase {
        InterviewPhase::ResumeDeepDive => "Deep dive into resume claims and past projects",
        InterviewPhase::CoreSkillAssessment => "Assessment of core skills for the round",
        InterviewPhase::ScenarioSolving => "Hypothetical scenarios and problem solving",
        InterviewPhase::StressTesting => "High-pressure and edge-case questions",
        InterviewPhase::ClaimVerification => "Verification of earlier claims",
        InterviewPhase::WrapUp => "Closing questions",
        InterviewPhase::Completed => "Interview completed",
    }
}

/// Canned greeting pools per round. Selection is deterministic on the
/// session id so restarts replay the same greeting.
fn generate_introduction(round: RoundKind, has_resume: bool, session_id: &str) -> String {
    let pool: [&str; 3] = match round {
        RoundKind::Hr => [
            "Hello! I'm your AI interviewer for today's behavioral round. I'll be asking you \
             about your past experiences and how you've handled various situations. Please use \
             the STAR method: describe the Situation, Task, Action you took, and Results you \
             achieved. Let's begin!",
            "Welcome to your HR interview! Today we'll explore your professional experiences \
             and how you approach challenges. I'm looking for specific examples with measurable \
             outcomes. Ready? Let's start!",
            "Hi there! I'll be conducting your behavioral interview today. I want to hear about \
             real situations you've faced, the actions you took, and the results you achieved. \
             Please be specific with examples. Shall we begin?",
        ],
        RoundKind::Technical => [
            "Hello! Welcome to your technical interview. I'll be assessing your understanding \
             of computer science fundamentals, problem-solving skills, and technical depth. I'm \
             looking for clear explanations of concepts, trade-off analysis, and consideration \
             of edge cases. Let's get started!",
            "Hi! I'm here to evaluate your technical expertise. I'll ask questions about \
             algorithms, data structures, and system concepts. Please explain your thought \
             process, discuss time and space complexity, and mention any trade-offs. Ready to \
             begin?",
            "Welcome to the technical round! I'll be testing your programming knowledge and \
             problem-solving abilities. Focus on correctness, efficiency, and explaining WHY \
             things work, not just WHAT they do. Let's dive in!",
        ],
        RoundKind::SystemDesign => [
            "Hello! This is your system design interview. I'll ask you to design scalable \
             systems that handle millions of users. Focus on component architecture, bottleneck \
             identification, and trade-offs between different approaches. Let's start designing!",
            "Welcome to the system design round! I want to see how you architect large-scale \
             distributed systems. Think about scalability, reliability, and performance. \
             Discuss your design choices and their trade-offs. Ready?",
            "Hi! I'll be your interviewer for system design. I'm looking for systematic \
             thinking: requirements gathering, high-level design, component breakdown, and deep \
             dives into critical parts. Let's build something!",
        ],
    };

    let pick = session_id.bytes().map(usize::from).sum::<usize>() % pool.len();
    let mut intro = pool[pick].to_string();

    if has_resume {
        intro.push_str(
            " I see you've uploaded your resume, so I'll be asking you questions specifically \
             about your background.",
        );
    }
    intro.push_str(" But before that, let me ask you:");
    intro
}
