//! Collaborator contracts the pipeline depends on.
//!
//! The Slack and OpenAI clients implement these; tests substitute in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;

use super::document::Document;
use super::models::{
    DocumentRef, FileRef, Message, MessageRef, SummaryResult, ThreadContext, ThreadRef,
};
use crate::errors::{FetchError, PublishError, SlackError, SummarizeError};

#[async_trait]
pub trait ThreadRetriever: Send + Sync {
    /// Fetch every message of the thread, oldest first, plus its root permalink.
    async fn fetch_thread(&self, thread: &ThreadRef) -> Result<ThreadContext, FetchError>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &[Message]) -> Result<SummaryResult, SummarizeError>;
}

#[async_trait]
pub trait PrimaryPublisher: Send + Sync {
    /// Create a native document. `requested_by` is granted access to it.
    async fn publish(
        &self,
        document: &Document,
        thread: &ThreadRef,
        requested_by: &str,
    ) -> Result<DocumentRef, PublishError>;
}

#[async_trait]
pub trait FallbackPublisher: Send + Sync {
    /// Upload `content` as a file reply in the thread. Any failure is a transport error.
    async fn upload_file(
        &self,
        content: &str,
        file_name: &str,
        title: &str,
        thread: &ThreadRef,
    ) -> Result<FileRef, PublishError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, thread: &ThreadRef, text: &str) -> Result<MessageRef, SlackError>;

    async fn update_message(&self, message: &MessageRef, text: &str) -> Result<(), SlackError>;

    /// Post an interactive (Block Kit) message in the thread.
    async fn post_prompt(
        &self,
        thread: &ThreadRef,
        text: &str,
        blocks: &Value,
    ) -> Result<MessageRef, SlackError>;

    /// Replace a message's text and drop its interactive blocks.
    async fn replace_prompt(&self, message: &MessageRef, text: &str) -> Result<(), SlackError>;
}
