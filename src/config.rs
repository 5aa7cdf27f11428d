//! Process-wide engine configuration.
//!
//! Loaded once at startup from the environment and passed to the
//! orchestrator. Every knob has a working default so the engine runs with an
//! empty environment.

use crate::error::{Error, Result};
use crate::session::PhasePreset;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which LLM backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Local OpenAI-compatible server (Ollama, llama.cpp, vLLM, ...)
    Local,
    /// Hosted OpenAI-compatible API
    Hosted,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Hosted => write!(f, "hosted"),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Which backend `LlmGateway` talks to
    pub llm_provider: LlmProvider,
    /// Hard cap on non-follow-up questions per session
    pub max_questions_per_session: u32,
    /// Short-circuits the interruption analyzer when false
    pub enable_interruptions: bool,
    /// Cap on interruptions per session
    pub max_interruptions_per_session: u32,
    /// Which phase rule table to use
    pub phase_preset: PhasePreset,
    /// Lifetime follow-up budget per session
    pub max_followups_per_session: u32,
    /// Claim extraction is skipped for question indices below this
    pub skip_claim_extraction_below: u32,
    /// Per-call LLM/STT timeout
    pub call_timeout: Duration,
    /// Max concurrent in-flight backend calls
    pub max_concurrent_llm_calls: usize,
    /// Sessions idle longer than this are pruned from memory
    pub idle_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::Local,
            max_questions_per_session: 5,
            enable_interruptions: true,
            max_interruptions_per_session: 5,
            phase_preset: PhasePreset::Demo,
            max_followups_per_session: 2,
            skip_claim_extraction_below: 4,
            call_timeout: Duration::from_secs(30),
            max_concurrent_llm_calls: 16,
            idle_timeout: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset. Malformed values are an error rather
    /// than a silent default.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm_provider = match provider.to_lowercase().as_str() {
                "local" => LlmProvider::Local,
                "hosted" => LlmProvider::Hosted,
                other => {
                    return Err(Error::Config(format!("unknown LLM_PROVIDER: {}", other)));
                }
            };
        }

        if let Some(v) = parse_env_u32("MAX_QUESTIONS_PER_SESSION")? {
            config.max_questions_per_session = v;
        }

        if let Ok(v) = std::env::var("ENABLE_INTERRUPTIONS") {
            config.enable_interruptions = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(v) = parse_env_u32("MAX_INTERRUPTIONS_PER_SESSION")? {
            config.max_interruptions_per_session = v;
        }

        if let Ok(preset) = std::env::var("PHASE_TRANSITION_RULES") {
            config.phase_preset = match preset.to_lowercase().as_str() {
                "demo" => PhasePreset::Demo,
                "production" => PhasePreset::Production,
                other => {
                    return Err(Error::Config(format!(
                        "unknown PHASE_TRANSITION_RULES preset: {}",
                        other
                    )));
                }
            };
        }

        if let Some(v) = parse_env_u32("FOLLOWUP_RULES_MAX_PER_SESSION")? {
            config.max_followups_per_session = v;
        }

        if let Some(v) = parse_env_u32("SKIP_CLAIM_EXTRACTION_FOR_QUESTIONS")? {
            config.skip_claim_extraction_below = v;
        }

        Ok(config)
    }

    /// Set the phase preset.
    pub fn with_phase_preset(mut self, preset: PhasePreset) -> Self {
        self.phase_preset = preset;
        self
    }

    /// Set the question cap.
    pub fn with_max_questions(mut self, max: u32) -> Self {
        self.max_questions_per_session = max;
        self
    }

    /// Set the follow-up budget.
    pub fn with_max_followups(mut self, max: u32) -> Self {
        self.max_followups_per_session = max;
        self
    }
}

fn parse_env_u32(name: &str) -> Result<Option<u32>> {
    match std::env::var(name) {
        Ok(v) => v
            .parse::<u32>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be an integer, got '{}'", name, v))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_questions_per_session, 5);
        assert_eq!(config.max_followups_per_session, 2);
        assert_eq!(config.skip_claim_extraction_below, 4);
        assert_eq!(config.max_concurrent_llm_calls, 16);
        assert!(config.enable_interruptions);
        assert_eq!(config.phase_preset, PhasePreset::Demo);
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::default()
            .with_max_questions(8)
            .with_max_followups(1)
            .with_phase_preset(PhasePreset::Production);
        assert_eq!(config.max_questions_per_session, 8);
        assert_eq!(config.max_followups_per_session, 1);
        assert_eq!(config.phase_preset, PhasePreset::Production);
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(LlmProvider::Local.to_string(), "local");
        assert_eq!(LlmProvider::Hosted.to_string(), "hosted");
    }
}
