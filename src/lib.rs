//! # interview-core
//!
//! An adaptive AI interview orchestration engine. A candidate answers spoken
//! questions; the engine transcribes speech, evaluates each answer along five
//! rubric dimensions, decides whether to interrupt, escalate, follow up, or
//! advance, adjusts difficulty, and emits a final report.
//!
//! ## Core Components
//!
//! - **Orchestrator**: per-session state machine driving phase progression
//! - **Round evaluators**: HR, Technical, SystemDesign five-dimension scoring
//! - **Claims**: extraction, prioritization, and contradiction detection
//! - **Interruptions**: four-layer mid-recording detector
//! - **Report**: end-of-session aggregation
//!
//! ## Example
//!
//! ```rust,ignore
//! use interview_core::{
//!     EngineConfig, FsSnapshotStore, InterviewOrchestrator, LlmGateway,
//!     OpenAiCompatClient, ClientConfig, LlmProvider,
//! };
//!
//! let config = EngineConfig::from_env()?;
//! let client = OpenAiCompatClient::new(ClientConfig::local("llama3"), LlmProvider::Local);
//! let gateway = Arc::new(LlmGateway::new(Arc::new(client), 16, config.call_timeout));
//! let snapshots = Arc::new(FsSnapshotStore::open("./sessions")?);
//!
//! let orchestrator = InterviewOrchestrator::new(config, gateway, snapshots);
//! orchestrator.restore_sessions().await?;
//!
//! let started = orchestrator.start("sess_1", "technical", None).await?;
//! println!("{}", started.question.text);
//! ```

pub mod claims;
pub mod config;
pub mod error;
pub mod eval;
pub mod feedback;
pub mod followup;
pub mod interrupt;
pub mod llm;
pub mod orchestrator;
pub mod report;
pub mod session;
pub mod stt;

// Re-exports for convenience
pub use claims::{Claim, ClaimAnalyzer, ClaimExtractor, ClaimType, Verifiability};
pub use config::{EngineConfig, LlmProvider};
pub use error::{Error, Result};
pub use eval::{
    clean_question, parse_evaluation, weighted_overall, AnalysisOutcome, AnswerAnalyzer,
    DifficultyAdjustment, Dimension, Evaluation, PerformanceLevel, QuestionContext,
    RoundEvaluator, ScoreDetail,
};
pub use feedback::{immediate_feedback, ImmediateFeedback};
pub use followup::FollowupGenerator;
pub use interrupt::{
    AudioIssue, AudioMetrics, CheckOutcome, InterruptionAnalyzer, InterruptionConfig,
    InterruptionEvent, InterruptionInput, InterruptionReason, Severity,
};
pub use llm::{ChatMessage, ChatRequest, ChatRole, ClientConfig, LlmClient, LlmGateway, OpenAiCompatClient};
pub use orchestrator::{
    AnswerDisposition, AnswerOutcome, InterviewOrchestrator, PhaseInfo, QuestionInfo,
    StartOutcome,
};
pub use report::{
    ClaimReport, CriticalMistake, FinalReport, FinalReportGenerator, InterruptionSummary,
    Proficiency, RoundBreakdown, SkillAssessment,
};
pub use session::{
    FsSnapshotStore, InterviewPhase, MemorySnapshotStore, PhasePreset, PhaseRules, QaRecord,
    RedFlag, RoundKind, Session, SessionStore, SnapshotStore,
};
pub use stt::{SpeechToText, Transcript, TranscriptSegment, TranscriptionClient};
