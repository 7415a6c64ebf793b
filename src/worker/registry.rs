//! In-flight run registry keyed by thread identity.
//!
//! `try_begin` is an atomic insert-if-absent; the returned [`RunGuard`] owns the
//! entry and removes it when dropped, so every exit path (success, failure, panic)
//! frees the thread for a fresh run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::models::{GenerationRun, RunState, ThreadRef};
use crate::errors::AlreadyInFlight;

#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: Mutex<HashMap<ThreadRef, GenerationRun>>,
}

impl RunRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ThreadRef, GenerationRun>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `thread` for a new run.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyInFlight`] when another run for the same thread is active.
    pub fn try_begin(
        self: &Arc<Self>,
        thread: &ThreadRef,
        requested_by: &str,
        now: DateTime<Utc>,
    ) -> Result<RunGuard, AlreadyInFlight> {
        let mut runs = self.lock();
        if runs.contains_key(thread) {
            return Err(AlreadyInFlight(thread.clone()));
        }

        let run = GenerationRun {
            run_id: Uuid::new_v4().to_string(),
            thread: thread.clone(),
            requested_by: requested_by.to_string(),
            started_at: now,
            state: RunState::Fetching,
        };
        let run_id = run.run_id.clone();
        runs.insert(thread.clone(), run);
        info!(thread = %thread, run_id = %run_id, "Run registered");

        Ok(RunGuard {
            registry: Arc::clone(self),
            thread: thread.clone(),
            run_id,
        })
    }

    #[must_use]
    pub fn get(&self, thread: &ThreadRef) -> Option<GenerationRun> {
        self.lock().get(thread).cloned()
    }

    #[must_use]
    pub fn is_active(&self, thread: &ThreadRef) -> bool {
        self.lock().contains_key(thread)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn set_state(&self, thread: &ThreadRef, run_id: &str, state: RunState) {
        if let Some(run) = self.lock().get_mut(thread).filter(|r| r.run_id == run_id) {
            run.state = state;
        }
    }

    fn release(&self, thread: &ThreadRef, run_id: &str) {
        let mut runs = self.lock();
        if runs.get(thread).is_some_and(|r| r.run_id == run_id) {
            runs.remove(thread);
            debug!(thread = %thread, run_id, "Run released");
        }
    }
}

/// Ownership of one registry entry for the lifetime of a run.
#[derive(Debug)]
pub struct RunGuard {
    registry: Arc<RunRegistry>,
    thread: ThreadRef,
    run_id: String,
}

impl RunGuard {
    #[must_use]
    pub fn thread(&self) -> &ThreadRef {
        &self.thread
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn advance(&self, state: RunState) {
        debug!(thread = %self.thread, run_id = %self.run_id, state = ?state, "Run state changed");
        self.registry.set_state(&self.thread, &self.run_id, state);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.release(&self.thread, &self.run_id);
    }
}
