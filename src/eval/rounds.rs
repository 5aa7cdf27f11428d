//! Round-specific evaluators and question prompts.
//!
//! The three rounds share the five-dimension protocol and the tolerant
//! parser; they differ in rubric emphasis, red-flag lists, and question
//! style. Rounds are a fixed closed set, so selection is a match on
//! `RoundKind` rather than dynamic dispatch.

use crate::error::Result;
use crate::llm::{ChatRequest, LlmGateway};
use crate::session::{InterviewPhase, RoundKind};

use super::parser::parse_evaluation;
use super::types::{Dimension, DifficultyAdjustment, Evaluation, ScoreDetail};

/// Temperature for scoring calls. Low, for stable rubric output.
const EVAL_TEMPERATURE: f64 = 0.3;
/// Temperature for question generation. Higher, for variety.
const QUESTION_TEMPERATURE: f64 = 0.7;

/// Inputs for building a question-generation prompt.
#[derive(Debug, Clone)]
pub struct QuestionContext {
    pub phase: InterviewPhase,
    pub difficulty_level: u8,
    pub questions_asked: usize,
    pub resume_context: Option<String>,
    pub previous_evaluation: Option<Evaluation>,
    /// Up to the last three questions, oldest first
    pub recent_questions: Vec<String>,
}

impl Default for QuestionContext {
    fn default() -> Self {
        Self {
            phase: InterviewPhase::ResumeDeepDive,
            difficulty_level: 5,
            questions_asked: 0,
            resume_context: None,
            previous_evaluation: None,
            recent_questions: Vec::new(),
        }
    }
}

/// Evaluator for one interview round.
#[derive(Debug, Clone, Copy)]
pub struct RoundEvaluator {
    round_kind: RoundKind,
}

impl RoundEvaluator {
    pub fn new(round_kind: RoundKind) -> Self {
        Self { round_kind }
    }

    pub fn round_kind(&self) -> RoundKind {
        self.round_kind
    }

    /// Score an answer: one LLM call, then the tolerant parse.
    pub async fn evaluate(
        &self,
        gateway: &LlmGateway,
        answer_text: &str,
        question_text: &str,
        question_id: &str,
    ) -> Result<Evaluation> {
        let request = ChatRequest::from_prompt(
            self.evaluation_system_prompt(),
            format!(
                "Question: \"{}\"\n\nAnswer: \"{}\"\n\n{}",
                question_text,
                answer_text,
                self.evaluation_user_suffix()
            ),
        )
        .with_temperature(EVAL_TEMPERATURE);

        let raw = gateway.chat(request).await?;
        Ok(parse_evaluation(&raw, question_id, self.round_kind))
    }

    /// Generate the next question: prompt, LLM call, cleanup.
    pub async fn generate_question(
        &self,
        gateway: &LlmGateway,
        ctx: &QuestionContext,
    ) -> Result<String> {
        let request = self.question_request(ctx);
        let raw = gateway.chat(request).await?;
        Ok(clean_question(&raw))
    }

    /// Build the question-generation request without sending it.
    pub fn question_request(&self, ctx: &QuestionContext) -> ChatRequest {
        let mut system = format!(
            "{}\n\nCURRENT PHASE: {}\nDIFFICULTY LEVEL: {}/10\nQUESTIONS ASKED: {}\n\n\
             PHASE-SPECIFIC FOCUS:\n{}\n\nDIFFICULTY GUIDELINES:\n{}\n\n\
             OUTPUT:\nJust the question text, nothing else.",
            self.question_role_prompt(),
            ctx.phase,
            ctx.difficulty_level,
            ctx.questions_asked,
            phase_guidance(ctx.phase, self.round_kind),
            difficulty_guidance(ctx.difficulty_level),
        );

        if let Some(resume) = &ctx.resume_context {
            let excerpt: String = resume.chars().take(500).collect();
            system.push_str(&format!(
                "\n\nRESUME CONTEXT:\n{}\n\n{}",
                excerpt,
                self.resume_steering()
            ));
        }

        if let Some(prev) = &ctx.previous_evaluation {
            system.push_str(&format!(
                "\n\nPREVIOUS ANSWER SCORE: {}/100",
                prev.overall_score
            ));
            if prev.overall_score < 60 {
                system.push_str("\nAdjust difficulty DOWN - ask a more straightforward question.");
            } else if prev.overall_score > 80 {
                system.push_str("\nAdjust difficulty UP - ask a more challenging question.");
            }
            if !prev.weaknesses.is_empty() {
                let weak = prev.weaknesses[..prev.weaknesses.len().min(2)].join(", ");
                system.push_str(&format!(
                    "\nWEAKNESSES DETECTED: {}\nProbe these weak areas with targeted questions.",
                    weak
                ));
            }
        }

        if ctx.recent_questions.is_empty() {
            system.push_str(&format!("\n\nCRITICAL: {}", self.first_question_steering()));
        } else {
            let listed: Vec<String> = ctx
                .recent_questions
                .iter()
                .enumerate()
                .map(|(i, q)| format!("{}. {}", i + 1, q))
                .collect();
            system.push_str(&format!(
                "\n\nPREVIOUS QUESTIONS ASKED:\n{}\n\nDo NOT repeat similar questions. \
                 The candidate has ALREADY introduced themselves.",
                listed.join("\n")
            ));
        }

        ChatRequest::from_prompt(
            system,
            format!("Generate the next {} interview question.", self.round_label()),
        )
        .with_temperature(QUESTION_TEMPERATURE)
    }

    /// A question from the fixed per-round pool, used when the backend is
    /// unavailable. Selection rotates on the question number so consecutive
    /// fallbacks differ.
    pub fn fallback_question(&self, question_number: u32) -> String {
        let pool = match self.round_kind {
            RoundKind::Hr => [
                "Tell me about a time you had to resolve a disagreement within your team.",
                "Describe a project you owned end to end. What was the measurable outcome?",
                "Tell me about a time you missed a deadline. What did you change afterwards?",
            ],
            RoundKind::Technical => [
                "Explain the difference between a hash map and a balanced tree, and when you would pick each.",
                "Walk me through how you would debug a service whose latency doubled overnight.",
                "What are the trade-offs between optimistic and pessimistic locking?",
            ],
            RoundKind::SystemDesign => [
                "Design a URL shortener that serves one million redirects per day.",
                "How would you design the caching layer for a read-heavy product catalog?",
                "Design a rate limiter for a public API. Where are the bottlenecks?",
            ],
        };
        pool[question_number as usize % pool.len()].to_string()
    }

    fn round_label(&self) -> &'static str {
        match self.round_kind {
            RoundKind::Hr => "behavioral",
            RoundKind::Technical => "technical",
            RoundKind::SystemDesign => "system design",
        }
    }

    fn question_role_prompt(&self) -> &'static str {
        match self.round_kind {
            RoundKind::Hr => {
                "You are an expert HR interviewer conducting a behavioral interview.\n\n\
                 YOUR GOAL:\nAsk ONE behavioral question that tests STAR method \
                 (Situation, Task, Action, Result).\n\n\
                 QUESTION REQUIREMENTS:\n\
                 - Ask about specific experiences, not general approaches\n\
                 - Encourage storytelling with concrete examples\n\
                 - Probe for metrics and measurable outcomes\n\
                 - Focus on ownership and decision-making"
            }
            RoundKind::Technical => {
                "You are a senior software engineer conducting a technical interview.\n\n\
                 YOUR GOAL:\nAsk ONE technical question that tests depth, accuracy, and \
                 problem-solving.\n\n\
                 QUESTION REQUIREMENTS:\n\
                 - Test conceptual understanding (not just definitions)\n\
                 - Probe for trade-offs and edge cases\n\
                 - Encourage discussion of time/space complexity\n\
                 - Ask about real-world application"
            }
            RoundKind::SystemDesign => {
                "You are a principal architect conducting a system design interview.\n\n\
                 YOUR GOAL:\nAsk ONE system design question that tests architecture, \
                 scalability, and trade-offs.\n\n\
                 QUESTION REQUIREMENTS:\n\
                 - Ask about designing real-world systems\n\
                 - Expect discussion of components (load balancer, cache, database, etc)\n\
                 - Probe for bottleneck identification\n\
                 - Test scalability thinking (millions of users)"
            }
        }
    }

    fn resume_steering(&self) -> &'static str {
        match self.round_kind {
            RoundKind::Hr => "Reference specific experiences from their resume.",
            RoundKind::Technical => "Ask about technologies they claim to know.",
            RoundKind::SystemDesign => "Reference systems they've built.",
        }
    }

    fn first_question_steering(&self) -> &'static str {
        match self.round_kind {
            RoundKind::Hr => {
                "This is the FIRST question. Ask the candidate to introduce themselves, \
                 their background, and their key strengths in a way that fits this \
                 HR/Behavioral round."
            }
            RoundKind::Technical => {
                "This is the FIRST question. Ask the candidate to introduce themselves \
                 and their technical background/expertise in a way that fits this \
                 Technical round."
            }
            RoundKind::SystemDesign => {
                "This is the FIRST question. Ask the candidate to introduce themselves \
                 and their experience with building large-scale systems in a way that \
                 fits this System Design round."
            }
        }
    }

    fn evaluation_user_suffix(&self) -> &'static str {
        match self.round_kind {
            RoundKind::Hr => {
                "Evaluate this HR/behavioral answer. Focus on STAR method adherence and \
                 specific examples."
            }
            RoundKind::Technical => {
                "Evaluate this technical answer. Focus on correctness, depth, and \
                 trade-off analysis."
            }
            RoundKind::SystemDesign => {
                "Evaluate this system design answer. Focus on scalability, architecture, \
                 and bottleneck awareness."
            }
        }
    }

    fn evaluation_system_prompt(&self) -> String {
        let (header, criteria, red_flags, closing) = match self.round_kind {
            RoundKind::Hr => (
                "You are an expert HR interviewer evaluating a behavioral interview answer.\n\n\
                 Your task: Evaluate the answer across 5 dimensions and provide specific feedback.",
                "1. Technical Depth (0-100):\n\
                 - For HR round, this measures depth of understanding about their role/project\n\
                 - Did they explain what they actually did?\n\n\
                 2. Concept Accuracy (0-100):\n\
                 - Are their claims accurate and verifiable?\n\
                 - Consistent with previous answers?\n\n\
                 3. Structured Thinking (0-100) - MOST IMPORTANT FOR HR:\n\
                 - STAR method: Situation, Task, Action, Result\n\
                 - Did they share measurable outcomes?\n\n\
                 4. Communication Clarity (0-100):\n\
                 - Concise and to the point?\n\
                 - Minimal filler words\n\n\
                 5. Confidence & Consistency (0-100):\n\
                 - Confident delivery, ownership vs deflection",
                "RED FLAGS TO DETECT:\n\
                 - Blaming others instead of taking ownership\n\
                 - No specific examples (all vague generalizations)\n\
                 - No measurable results (\"we improved things\" without numbers)\n\
                 - Inconsistent with previous answers\n\
                 - Taking credit for team work without acknowledging team",
                "Be harsh but fair. This is training, not encouragement.",
            ),
            RoundKind::Technical => (
                "You are an expert senior engineer evaluating a technical interview answer.\n\n\
                 Your task: Evaluate the answer across 5 dimensions with TECHNICAL FOCUS.",
                "1. Technical Depth (0-100) - MOST IMPORTANT FOR TECHNICAL:\n\
                 - Deep understanding of concepts (not surface level)\n\
                 - Explains WHY things work, not just WHAT\n\n\
                 2. Concept Accuracy (0-100) - CRITICAL:\n\
                 - Are technical statements correct?\n\
                 - No false claims about how things work?\n\n\
                 3. Structured Thinking (0-100):\n\
                 - Organized explanation, systematic reasoning\n\n\
                 4. Communication Clarity (0-100):\n\
                 - Explains complex topics clearly\n\n\
                 5. Confidence & Consistency (0-100):\n\
                 - Admits when unsure (vs making things up)",
                "TECHNICAL RED FLAGS:\n\
                 - Fundamental concept errors (e.g., \"hash maps are O(n) lookup\")\n\
                 - Buzzword dropping without understanding\n\
                 - No mention of trade-offs (everything is \"best practice\")\n\
                 - No edge case consideration\n\
                 - Unrealistic claims (\"this solution works for everything\")",
                "Be technically rigorous. Flag incorrect concepts immediately.",
            ),
            RoundKind::SystemDesign => (
                "You are an expert system architect evaluating a system design interview answer.\n\n\
                 Your task: Evaluate the answer across 5 dimensions with ARCHITECTURE FOCUS.",
                "1. Technical Depth (0-100) - MOST IMPORTANT FOR SYSTEM DESIGN:\n\
                 - Scalability thinking (horizontal vs vertical)\n\
                 - Component architecture (load balancers, caching, databases, queues)\n\n\
                 2. Concept Accuracy (0-100):\n\
                 - Accurate capacity estimations, realistic architecture choices\n\n\
                 3. Structured Thinking (0-100) - CRITICAL:\n\
                 - Systematic approach (requirements, architecture, deep dive)\n\
                 - Identifies bottlenecks methodically\n\n\
                 4. Communication Clarity (0-100):\n\
                 - Explains architecture clearly, makes trade-offs explicit\n\n\
                 5. Confidence & Consistency (0-100):\n\
                 - Justifies choices with reasoning",
                "RED FLAGS TO DETECT:\n\
                 - No scalability strategy\n\
                 - No bottleneck identification\n\
                 - Unrealistic capacity claims\n\
                 - Single point of failure ignored",
                "Be architecturally rigorous. This is senior-level evaluation.",
            ),
        };

        format!(
            "{}\n\nEVALUATION CRITERIA:\n\n{}\n\n{}\n\nOUTPUT FORMAT (plain text, parseable):\n{}\n\n{}",
            header,
            criteria,
            red_flags,
            output_format_block(),
            closing
        )
    }
}

/// The shared output contract sent to the LLM for every round.
fn output_format_block() -> String {
    let mut block = String::from("```\n");
    for dimension in Dimension::ALL {
        let key = dimension.protocol_key();
        block.push_str(&format!(
            "{}: [0-100]\n{}_EVIDENCE: [one sentence]\n{}_IMPROVEMENT: [one sentence or NONE]\n\n",
            key, key, key
        ));
    }
    block.push_str(
        "STRENGTHS: [2-3 specific strengths, separated by |]\n\
         WEAKNESSES: [2-3 specific weaknesses, separated by |]\n\
         RED_FLAGS: [any critical issues, separated by | or NONE]\n\n\
         REQUIRES_FOLLOWUP: [YES or NO]\n\
         FOLLOWUP_REASON: [reason or NONE]\n\
         SUGGESTED_FOLLOWUP: [question or NONE]\n\n\
         DIFFICULTY_ADJUSTMENT: [decrease, maintain, or increase]\n```",
    );
    block
}

/// Phase-specific guidance for question prompts.
fn phase_guidance(phase: InterviewPhase, round: RoundKind) -> &'static str {
    match (phase, round) {
        (InterviewPhase::ResumeDeepDive, RoundKind::Hr) => {
            "Verify claims from resume. Ask about specific projects and achievements."
        }
        (InterviewPhase::ResumeDeepDive, RoundKind::Technical) => {
            "Test technologies listed on resume. Ask for code examples."
        }
        (InterviewPhase::ResumeDeepDive, RoundKind::SystemDesign) => {
            "Ask about architecture of systems they claim to have built."
        }
        (InterviewPhase::CoreSkillAssessment, RoundKind::Hr) => {
            "Test fundamental soft skills: communication, teamwork, problem-solving."
        }
        (InterviewPhase::CoreSkillAssessment, RoundKind::Technical) => {
            "Test core CS concepts: data structures, algorithms, complexity."
        }
        (InterviewPhase::CoreSkillAssessment, RoundKind::SystemDesign) => {
            "Test fundamental architecture patterns: caching, load balancing, databases."
        }
        (InterviewPhase::ScenarioSolving, RoundKind::Hr) => {
            "Present HYPOTHETICAL real-world conflicts. Phrasing: 'Imagine you are in a \
             situation where... what would you do?'. Focus on future actions and reasoning."
        }
        (InterviewPhase::ScenarioSolving, RoundKind::Technical) => {
            "Give debugging scenarios and edge cases to solve."
        }
        (InterviewPhase::ScenarioSolving, RoundKind::SystemDesign) => {
            "Present scaling challenges and ask for solutions."
        }
        (InterviewPhase::StressTesting, RoundKind::Hr) => {
            "Present HYPOTHETICAL high-pressure scenarios. Phrasing: 'Imagine you have a \
             tight deadline and... how would you prioritize?'."
        }
        (InterviewPhase::StressTesting, RoundKind::Technical) => {
            "Ask about optimization under constraints."
        }
        (InterviewPhase::StressTesting, RoundKind::SystemDesign) => {
            "Design systems under extreme scale (billions of users)."
        }
        (InterviewPhase::ClaimVerification, RoundKind::Hr) => {
            "Follow up on vague claims from earlier answers."
        }
        (InterviewPhase::ClaimVerification, RoundKind::Technical) => {
            "Probe deeper into technical claims that seemed suspicious."
        }
        (InterviewPhase::ClaimVerification, RoundKind::SystemDesign) => {
            "Ask for specifics about scalability claims."
        }
        (InterviewPhase::WrapUp, RoundKind::Hr) => {
            "Final opportunity: 'What would you like us to know about you?'"
        }
        (InterviewPhase::WrapUp, RoundKind::Technical) => {
            "Final challenge: 'What's the hardest technical problem you've solved?'"
        }
        (InterviewPhase::WrapUp, RoundKind::SystemDesign) => {
            "Final design: 'Design your dream system with unlimited resources.'"
        }
        _ => "Ask a relevant question for this phase.",
    }
}

fn difficulty_guidance(level: u8) -> &'static str {
    match level {
        0..=3 => "EASY: Ask straightforward questions with clear answers.",
        4..=6 => "MEDIUM: Ask questions requiring trade-off analysis.",
        _ => "HARD: Ask questions with multiple layers and edge cases.",
    }
}

/// Strip common prefixes, markdown, and wrapping quotes from a generated
/// question, and make sure it ends with a question mark.
pub fn clean_question(raw: &str) -> String {
    let mut question = raw.trim().replace("**", "").replace('*', "");

    for prefix in [
        "Question:",
        "Q:",
        "Next question:",
        "Follow-up question:",
        "Follow-up:",
        "Here's the question:",
        "I would ask:",
    ] {
        if question.to_lowercase().starts_with(&prefix.to_lowercase()) {
            question = question[prefix.len()..].trim_start().to_string();
        }
    }

    for quote in ['"', '\''] {
        if question.starts_with(quote) && question.ends_with(quote) && question.len() >= 2 {
            question = question[1..question.len() - 1].to_string();
        }
    }

    let mut question = question.trim().to_string();
    if !question.ends_with('?') {
        question.push('?');
    }
    question
}

/// Neutral evaluation used when the backend stays unavailable after a retry.
/// The Q/A record is marked degraded by the caller.
pub fn fallback_evaluation(question_id: &str, round_kind: RoundKind) -> Evaluation {
    let scores = Dimension::ALL.iter().map(|d| (*d, 50)).collect();
    let score_details = Dimension::ALL
        .iter()
        .map(|d| ScoreDetail {
            dimension: *d,
            score: 50,
            evidence: "Evaluation backend unavailable".to_string(),
            improvement: None,
        })
        .collect();

    let mut evaluation = Evaluation {
        question_id: question_id.to_string(),
        round_kind,
        scores,
        score_details,
        overall_score: 0,
        strengths: vec!["Provided an answer".to_string()],
        weaknesses: vec!["Could not be evaluated automatically".to_string()],
        red_flags: Vec::new(),
        requires_followup: false,
        followup_reason: None,
        suggested_followup: None,
        difficulty_adjustment: DifficultyAdjustment::Maintain,
    };
    evaluation.recompute_overall();
    evaluation
}
