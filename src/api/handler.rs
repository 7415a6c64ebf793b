//! Entry points invoked by the transport for every normalized event.
//!
//! Each call classifies the event, applies the confirmation gate where needed,
//! and hands accepted threads to the [`GenerationCoordinator`]. Both entry points
//! return quickly; the slow pipeline runs on its own task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::core::classifier::TriggerClassifier;
use crate::core::confirmation::{ConfirmationGate, GateError, Resolution};
use crate::core::models::{
    MessageRef, PendingConfirmation, ThreadRef, TriggerDecision, TriggerEvent, TriggerSource,
};
use crate::core::ports::Notifier;
use crate::errors::ValidationError;
use crate::slack::response_builder::{
    ALREADY_PENDING_TEXT, PROMPT_CANCELLED_TEXT, PROMPT_CONFIRMED_TEXT, PROMPT_EXPIRED_TEXT,
    PROMPT_FALLBACK_TEXT, PROMPT_UNKNOWN_TEXT, build_confirmation_blocks,
};
use crate::worker::{ALREADY_IN_FLIGHT_MESSAGE, GenerationCoordinator, RunHandle};

/// Reply shown to the invoker of a slash command whose run was accepted.
pub const RUN_ACCEPTED_TEXT: &str =
    "Got it. I'm creating a canvas from that thread and will post the result there.";

/// Button click as delivered by the interactive transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPayload {
    pub channel_id: String,
    pub thread_ts: Option<String>,
    /// ts of the prompt message carrying the button.
    pub message_ts: String,
    pub actor_id: String,
}

/// What handling an event did.
#[derive(Debug)]
pub enum EventOutcome {
    /// Nothing to do for this event.
    Ignored,
    Rejected(ValidationError),
    RunStarted(RunHandle),
    AlreadyInFlight(ThreadRef),
    PromptPosted(PendingConfirmation),
    AlreadyPending(ThreadRef),
    Cancelled(ThreadRef),
    Expired(ThreadRef),
    UnknownPrompt(String),
    /// A Slack call needed to continue failed; nothing was started.
    NotifyFailed(String),
}

impl EventOutcome {
    /// Text for a synchronous reply to the invoker (slash command response).
    #[must_use]
    pub fn reply_text(&self) -> Option<String> {
        match self {
            Self::Rejected(e) => Some(e.to_string()),
            Self::RunStarted(_) => Some(RUN_ACCEPTED_TEXT.to_string()),
            Self::AlreadyInFlight(_) => Some(ALREADY_IN_FLIGHT_MESSAGE.to_string()),
            Self::NotifyFailed(_) => {
                Some("Something went wrong while talking to Slack. Please try again.".to_string())
            }
            _ => None,
        }
    }
}

pub struct App {
    classifier: TriggerClassifier,
    gate: Arc<ConfirmationGate>,
    coordinator: Arc<GenerationCoordinator>,
    notifier: Arc<dyn Notifier>,
}

impl App {
    #[must_use]
    pub fn new(
        classifier: TriggerClassifier,
        gate: Arc<ConfirmationGate>,
        coordinator: Arc<GenerationCoordinator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            classifier,
            gate,
            coordinator,
            notifier,
        }
    }

    #[must_use]
    pub fn gate(&self) -> &Arc<ConfirmationGate> {
        &self.gate
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<GenerationCoordinator> {
        &self.coordinator
    }

    pub async fn handle_event(&self, event: TriggerEvent) -> EventOutcome {
        self.handle_event_at(event, Utc::now()).await
    }

    pub async fn handle_interactive_action(
        &self,
        action_id: &str,
        payload: ActionPayload,
    ) -> EventOutcome {
        self.handle_event(TriggerEvent {
            source: TriggerSource::InteractiveAction,
            channel_id: payload.channel_id,
            thread_ts: payload.thread_ts,
            text: String::new(),
            actor_id: payload.actor_id,
            action_id: Some(action_id.to_string()),
            message_ts: Some(payload.message_ts),
        })
        .await
    }

    /// Same as [`App::handle_event`] with an explicit clock.
    pub async fn handle_event_at(&self, event: TriggerEvent, now: DateTime<Utc>) -> EventOutcome {
        let decision = self.classifier.classify(&event);
        info!(
            source = ?event.source,
            channel = %event.channel_id,
            actor = %event.actor_id,
            decision = ?decision,
            "Trigger classified"
        );

        match decision {
            TriggerDecision::ExplicitCommand(thread) => {
                self.start(&thread, &event.actor_id, false).await
            }
            TriggerDecision::MentionWithSkipKeyword(thread) => {
                self.start(&thread, &event.actor_id, true).await
            }
            TriggerDecision::MentionRequiringConfirmation(thread) => {
                self.ask_confirmation(&thread, &event.actor_id, now).await
            }
            TriggerDecision::ButtonConfirmed { thread, prompt_ts } => {
                self.resolve_prompt(&thread, &prompt_ts, Resolution::Confirm, &event.actor_id, now)
                    .await
            }
            TriggerDecision::ButtonCancelled { thread, prompt_ts } => {
                self.resolve_prompt(&thread, &prompt_ts, Resolution::Cancel, &event.actor_id, now)
                    .await
            }
            TriggerDecision::NotApplicable(Some(reason)) => {
                if event.source == TriggerSource::Mention {
                    self.reply_to_mention(&event, &reason.to_string()).await;
                }
                EventOutcome::Rejected(reason)
            }
            TriggerDecision::NotApplicable(None) => EventOutcome::Ignored,
        }
    }

    /// Rewrite every prompt past its deadline. Lookups expire lazily regardless.
    pub async fn sweep_expired_prompts(&self, now: DateTime<Utc>) -> usize {
        let expired = self.gate.sweep_expired(now);
        for pending in &expired {
            info!(thread = %pending.thread, prompt_ts = %pending.prompt_ts, "Prompt expired");
            self.rewrite_prompt(&pending.thread, &pending.prompt_ts, PROMPT_EXPIRED_TEXT)
                .await;
        }
        expired.len()
    }

    async fn start(&self, thread: &ThreadRef, actor: &str, notify_busy: bool) -> EventOutcome {
        match self.coordinator.start_run(thread, actor) {
            Ok(handle) => {
                info!(thread = %thread, run_id = %handle.run_id, "Run started");
                EventOutcome::RunStarted(handle)
            }
            Err(busy) => {
                info!(thread = %thread, "Run already in flight");
                if notify_busy {
                    self.post(thread, ALREADY_IN_FLIGHT_MESSAGE).await;
                }
                EventOutcome::AlreadyInFlight(busy.0)
            }
        }
    }

    async fn ask_confirmation(
        &self,
        thread: &ThreadRef,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EventOutcome {
        if self.coordinator.registry().is_active(thread) {
            self.post(thread, ALREADY_IN_FLIGHT_MESSAGE).await;
            return EventOutcome::AlreadyInFlight(thread.clone());
        }

        if let Err(e) = self.gate.reserve(thread, now) {
            info!(thread = %thread, reason = %e, "Confirmation not posted");
            self.post(thread, ALREADY_PENDING_TEXT).await;
            return EventOutcome::AlreadyPending(thread.clone());
        }

        let blocks = build_confirmation_blocks(thread);
        match self
            .notifier
            .post_prompt(thread, PROMPT_FALLBACK_TEXT, &blocks)
            .await
        {
            Ok(prompt) => {
                EventOutcome::PromptPosted(self.gate.record(thread, &prompt.ts, actor, now))
            }
            Err(e) => {
                self.gate.release(thread);
                error!(thread = %thread, error = %e, "Failed to post confirmation prompt");
                EventOutcome::NotifyFailed(e.to_string())
            }
        }
    }

    async fn resolve_prompt(
        &self,
        thread: &ThreadRef,
        prompt_ts: &str,
        resolution: Resolution,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EventOutcome {
        match self.gate.resolve(prompt_ts, resolution, now) {
            Ok(pending) if resolution == Resolution::Confirm => {
                self.rewrite_prompt(&pending.thread, prompt_ts, PROMPT_CONFIRMED_TEXT)
                    .await;
                self.start(&pending.thread, actor, true).await
            }
            Ok(pending) => {
                self.rewrite_prompt(&pending.thread, prompt_ts, PROMPT_CANCELLED_TEXT)
                    .await;
                EventOutcome::Cancelled(pending.thread)
            }
            Err(GateError::Expired(pending)) => {
                self.rewrite_prompt(&pending.thread, prompt_ts, PROMPT_EXPIRED_TEXT)
                    .await;
                EventOutcome::Expired(pending.thread)
            }
            Err(GateError::UnknownPrompt(ts)) => {
                self.rewrite_prompt(thread, prompt_ts, PROMPT_UNKNOWN_TEXT).await;
                EventOutcome::UnknownPrompt(ts)
            }
            Err(GateError::AlreadyPending(other)) => EventOutcome::AlreadyPending(other),
        }
    }

    async fn rewrite_prompt(&self, thread: &ThreadRef, prompt_ts: &str, text: &str) {
        let prompt = MessageRef {
            channel_id: thread.channel_id.clone(),
            ts: prompt_ts.to_string(),
        };
        if let Err(e) = self.notifier.replace_prompt(&prompt, text).await {
            warn!(thread = %thread, prompt_ts, error = %e, "Failed to update prompt");
        }
    }

    /// Answer a mention that cannot start anything, threading under the mention itself.
    async fn reply_to_mention(&self, event: &TriggerEvent, text: &str) {
        let Some(ts) = event.thread_ts.as_deref().or(event.message_ts.as_deref()) else {
            return;
        };
        self.post(&ThreadRef::new(event.channel_id.clone(), ts), text).await;
    }

    async fn post(&self, thread: &ThreadRef, text: &str) {
        if let Err(e) = self.notifier.post_message(thread, text).await {
            warn!(thread = %thread, error = %e, "Failed to post notice");
        }
    }
}
