//! LLM gateway: uniform request/response to the language-model backend.

mod client;
mod gateway;
mod types;

pub use client::{ClientConfig, LlmClient, OpenAiCompatClient};
pub use gateway::LlmGateway;
pub use types::{ChatMessage, ChatRequest, ChatRole};
