//! Drives one generation run per thread: fetch, summarize, assemble, publish.
//!
//! [`GenerationCoordinator::start_run`] claims the thread in the [`RunRegistry`]
//! synchronously and returns immediately; the slow stages run on a spawned tokio
//! task that owns the [`RunGuard`].

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};

use super::deliver::DocumentAssembler;
use super::registry::{RunGuard, RunRegistry};
use super::{PROCESSING_MESSAGE, failure_message, success_message};
use crate::core::document::Document;
use crate::core::models::{MessageRef, Published, RunState, ThreadRef};
use crate::core::ports::{Notifier, Summarizer, ThreadRetriever};
use crate::errors::{AlreadyInFlight, RunError};

/// How a spawned run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(Published),
    Failed(RunError),
    /// The task panicked or was cancelled before reporting.
    Aborted(String),
}

/// Handle to a run accepted by [`GenerationCoordinator::start_run`].
#[derive(Debug)]
pub struct RunHandle {
    pub run_id: String,
    pub thread: ThreadRef,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Wait for the run to finish.
    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::Aborted(e.to_string()),
        }
    }
}

pub struct GenerationCoordinator {
    registry: Arc<RunRegistry>,
    retriever: Arc<dyn ThreadRetriever>,
    summarizer: Arc<dyn Summarizer>,
    assembler: DocumentAssembler,
    notifier: Arc<dyn Notifier>,
}

impl GenerationCoordinator {
    #[must_use]
    pub fn new(
        registry: Arc<RunRegistry>,
        retriever: Arc<dyn ThreadRetriever>,
        summarizer: Arc<dyn Summarizer>,
        assembler: DocumentAssembler,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            retriever,
            summarizer,
            assembler,
            notifier,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    /// Accept a run for `thread` and start it in the background.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyInFlight`] without side effects when the thread already has an
    /// active run.
    pub fn start_run(
        self: &Arc<Self>,
        thread: &ThreadRef,
        requested_by: &str,
    ) -> Result<RunHandle, AlreadyInFlight> {
        let guard = self.registry.try_begin(thread, requested_by, Utc::now())?;
        let run_id = guard.run_id().to_string();

        let span = info_span!("run", thread = %thread, run_id = %run_id);
        let this = Arc::clone(self);
        let requested_by = requested_by.to_string();
        let task = tokio::spawn(async move { this.drive(guard, requested_by).await }.instrument(span));

        Ok(RunHandle {
            run_id,
            thread: thread.clone(),
            task,
        })
    }

    async fn drive(&self, guard: RunGuard, requested_by: String) -> RunOutcome {
        let thread = guard.thread().clone();

        let progress = match self.notifier.post_message(&thread, PROCESSING_MESSAGE).await {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(error = %e, "Failed to post processing message");
                None
            }
        };

        let result = self.run_stages(&guard, &requested_by).await;
        let (outcome, text) = match result {
            Ok(published) => {
                guard.advance(RunState::Done);
                info!("Run completed");
                let text = success_message(&requested_by, &published);
                (RunOutcome::Completed(published), text)
            }
            Err(e) => {
                guard.advance(RunState::Failed);
                error!(error = %e, "Run failed");
                let text = failure_message(&requested_by, &e);
                (RunOutcome::Failed(e), text)
            }
        };
        drop(guard);

        self.report(&thread, progress.as_ref(), &text).await;
        outcome
    }

    async fn run_stages(&self, guard: &RunGuard, requested_by: &str) -> Result<Published, RunError> {
        let thread = guard.thread();

        guard.advance(RunState::Fetching);
        let context = self.retriever.fetch_thread(thread).await?;

        let transcript = context.transcript();
        if transcript.is_empty() {
            return Err(RunError::EmptyThread);
        }
        info!(messages = transcript.len(), "Thread fetched");

        guard.advance(RunState::Summarizing);
        let summary = self.summarizer.summarize(&transcript).await?;

        guard.advance(RunState::Assembling);
        let document = Document::assemble(&summary, &context);

        guard.advance(RunState::Publishing);
        Ok(self.assembler.publish(&document, thread, requested_by).await?)
    }

    /// Replace the processing message with `text`, or post it fresh when that fails.
    async fn report(&self, thread: &ThreadRef, progress: Option<&MessageRef>, text: &str) {
        if let Some(message) = progress {
            match self.notifier.update_message(message, text).await {
                Ok(()) => return,
                Err(e) => warn!(error = %e, "Failed to update processing message"),
            }
        }
        if let Err(e) = self.notifier.post_message(thread, text).await {
            error!(error = %e, "Failed to post completion message");
        }
    }
}
