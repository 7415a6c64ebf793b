//! All AI/LLM functionality

pub mod client;
pub mod prompt;

pub use client::{CompletionClient, LlmClient, estimate_tokens};
