use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Stable identity of a conversation thread: the channel plus the root message ts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadRef {
    pub channel_id: String,
    pub thread_ts: String,
}

impl ThreadRef {
    #[must_use]
    pub fn new(channel_id: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            thread_ts: thread_ts.into(),
        }
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.thread_ts)
    }
}

/// Which inbound shape an event was normalized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
    SlashCommand,
    Mention,
    Message,
    InteractiveAction,
}

/// Canonical form of any inbound signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub source: TriggerSource,
    pub channel_id: String,
    /// `None` for messages posted at the top level of a channel.
    pub thread_ts: Option<String>,
    pub text: String,
    pub actor_id: String,
    /// Only set for `InteractiveAction`.
    pub action_id: Option<String>,
    /// ts of the triggering message; for `InteractiveAction`, the message carrying the clicked button.
    pub message_ts: Option<String>,
}

impl TriggerEvent {
    #[must_use]
    pub fn is_in_thread(&self) -> bool {
        self.thread_ts.as_deref().is_some_and(|ts| !ts.is_empty())
    }

    #[must_use]
    pub fn thread_ref(&self) -> Option<ThreadRef> {
        self.thread_ts
            .as_deref()
            .filter(|ts| !ts.is_empty())
            .map(|ts| ThreadRef::new(self.channel_id.clone(), ts))
    }
}

/// Outcome of classifying a `TriggerEvent`. Exactly one applies per event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    ExplicitCommand(ThreadRef),
    MentionWithSkipKeyword(ThreadRef),
    MentionRequiringConfirmation(ThreadRef),
    ButtonConfirmed { thread: ThreadRef, prompt_ts: String },
    ButtonCancelled { thread: ThreadRef, prompt_ts: String },
    NotApplicable(Option<ValidationError>),
}

impl TriggerDecision {
    #[must_use]
    pub fn thread(&self) -> Option<&ThreadRef> {
        match self {
            Self::ExplicitCommand(t)
            | Self::MentionWithSkipKeyword(t)
            | Self::MentionRequiringConfirmation(t) => Some(t),
            Self::ButtonConfirmed { thread, .. } | Self::ButtonCancelled { thread, .. } => {
                Some(thread)
            }
            Self::NotApplicable(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    AwaitingConfirmation,
    Confirmed,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub thread: ThreadRef,
    pub prompt_ts: String,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: ConfirmationState,
}

impl PendingConfirmation {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Fetching,
    Summarizing,
    Assembling,
    Publishing,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRun {
    pub run_id: String,
    pub thread: ThreadRef,
    pub requested_by: String,
    pub started_at: DateTime<Utc>,
    pub state: RunState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author_id: String,
    pub text: String,
    pub ts: String,
    pub is_from_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadContext {
    pub thread: ThreadRef,
    pub permalink: String,
    pub messages: Vec<Message>,
}

impl ThreadContext {
    /// Messages eligible for summarization: human-authored and non-blank.
    #[must_use]
    pub fn transcript(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| !m.is_from_bot && !m.text.trim().is_empty())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryResult {
    pub title: String,
    pub overview: String,
    pub key_points: Vec<String>,
    pub decisions: Option<Vec<String>>,
    pub action_items: Option<Vec<String>>,
    pub follow_ups: Vec<String>,
    pub references: Option<Vec<String>>,
}

/// Handle to a posted Slack message, usable for later updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: String,
    pub ts: String,
}

/// A canvas created by the primary publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub canvas_id: String,
    pub url: Option<String>,
}

/// A file uploaded by the fallback publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub file_id: String,
    pub permalink: Option<String>,
}

/// Where the assembled document ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Canvas(DocumentRef),
    File(FileRef),
}
