use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::ai::CompletionClient;
use crate::ai::prompt::{build_prompt, parse_summary};
use crate::core::models::{Message, SummaryResult};
use crate::core::ports::Summarizer;
use crate::errors::SummarizeError;

/// [`Summarizer`] backed by a completion model and the fixed JSON summary prompt.
pub struct LlmSummarizer {
    client: Arc<dyn CompletionClient>,
}

impl LlmSummarizer {
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, transcript: &[Message]) -> Result<SummaryResult, SummarizeError> {
        let prompt = build_prompt(transcript);
        let raw = self
            .client
            .complete(prompt)
            .await
            .map_err(|e| SummarizeError::Transport(e.to_string()))?;

        match parse_summary(&raw) {
            Ok(summary) => {
                info!(
                    key_points = summary.key_points.len(),
                    follow_ups = summary.follow_ups.len(),
                    "Summary parsed"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, "Model answer rejected");
                Err(e)
            }
        }
    }
}
