//! Confirmation gate for ambiguous mentions.
//!
//! A thread moves through `AwaitingConfirmation -> {Confirmed, Cancelled, Expired}`.
//! Entries are keyed by the prompt message ts, with a secondary index by thread so
//! that only one prompt per thread can be active. Expiry is checked on every lookup,
//! so no background timer is needed for correctness.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::{ConfirmationState, PendingConfirmation, ThreadRef};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("a confirmation is already pending for thread {0}")]
    AlreadyPending(ThreadRef),

    #[error("confirmation prompt {} expired", .0.prompt_ts)]
    Expired(PendingConfirmation),

    #[error("no active confirmation for prompt {0}")]
    UnknownPrompt(String),
}

/// Answer given on a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Confirm,
    Cancel,
}

#[derive(Debug)]
enum Slot {
    /// Claimed while the prompt message is being posted.
    Reserved,
    Awaiting(PendingConfirmation),
}

#[derive(Debug, Default)]
struct GateState {
    by_thread: HashMap<ThreadRef, Slot>,
    by_prompt: HashMap<String, ThreadRef>,
}

impl GateState {
    fn remove_thread(&mut self, thread: &ThreadRef) -> Option<PendingConfirmation> {
        match self.by_thread.remove(thread) {
            Some(Slot::Awaiting(pending)) => {
                self.by_prompt.remove(&pending.prompt_ts);
                Some(pending)
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ConfirmationGate {
    ttl: chrono::Duration,
    state: Mutex<GateState>,
}

impl ConfirmationGate {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(10));
        Self {
            ttl,
            state: Mutex::new(GateState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        // A panic while holding the lock leaves the maps consistent; keep serving.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Claim the confirmation slot for `thread` before posting a prompt.
    ///
    /// An expired prompt still occupying the slot is dropped here.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::AlreadyPending`] while another prompt for the thread is live.
    pub fn reserve(&self, thread: &ThreadRef, now: DateTime<Utc>) -> Result<(), GateError> {
        let mut state = self.lock();

        match state.by_thread.get(thread) {
            Some(Slot::Reserved) => return Err(GateError::AlreadyPending(thread.clone())),
            Some(Slot::Awaiting(pending)) if !pending.is_expired_at(now) => {
                return Err(GateError::AlreadyPending(thread.clone()));
            }
            Some(Slot::Awaiting(_)) => {
                if let Some(stale) = state.remove_thread(thread) {
                    debug!(thread = %thread, prompt_ts = %stale.prompt_ts, "Dropping expired confirmation");
                }
            }
            None => {}
        }

        state.by_thread.insert(thread.clone(), Slot::Reserved);
        Ok(())
    }

    /// Record the posted prompt for a previously reserved thread.
    pub fn record(
        &self,
        thread: &ThreadRef,
        prompt_ts: &str,
        requested_by: &str,
        now: DateTime<Utc>,
    ) -> PendingConfirmation {
        let pending = PendingConfirmation {
            thread: thread.clone(),
            prompt_ts: prompt_ts.to_string(),
            requested_by: requested_by.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
            state: ConfirmationState::AwaitingConfirmation,
        };

        let mut state = self.lock();
        if let Some(Slot::Awaiting(previous)) = state
            .by_thread
            .insert(thread.clone(), Slot::Awaiting(pending.clone()))
        {
            warn!(thread = %thread, prompt_ts = %previous.prompt_ts, "Replaced unreserved confirmation");
            state.by_prompt.remove(&previous.prompt_ts);
        }
        state
            .by_prompt
            .insert(pending.prompt_ts.clone(), thread.clone());

        info!(
            thread = %thread,
            prompt_ts = %pending.prompt_ts,
            expires_at = %pending.expires_at,
            "Awaiting confirmation"
        );
        pending
    }

    /// Give up a reservation whose prompt could not be posted.
    pub fn release(&self, thread: &ThreadRef) {
        let mut state = self.lock();
        if matches!(state.by_thread.get(thread), Some(Slot::Reserved)) {
            state.by_thread.remove(thread);
        }
    }

    /// Apply a button click to the prompt it was clicked on.
    ///
    /// The entry is removed in every outcome, since all reachable states are terminal.
    ///
    /// # Errors
    ///
    /// - [`GateError::Expired`] when the click arrives at or after `expires_at`
    /// - [`GateError::UnknownPrompt`] when the prompt is not (or no longer) active
    pub fn resolve(
        &self,
        prompt_ts: &str,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> Result<PendingConfirmation, GateError> {
        let mut state = self.lock();

        let Some(thread) = state.by_prompt.get(prompt_ts).cloned() else {
            return Err(GateError::UnknownPrompt(prompt_ts.to_string()));
        };
        let Some(mut pending) = state.remove_thread(&thread) else {
            state.by_prompt.remove(prompt_ts);
            return Err(GateError::UnknownPrompt(prompt_ts.to_string()));
        };

        if pending.is_expired_at(now) {
            pending.state = ConfirmationState::Expired;
            info!(thread = %thread, prompt_ts, "Confirmation expired");
            return Err(GateError::Expired(pending));
        }

        pending.state = match resolution {
            Resolution::Confirm => ConfirmationState::Confirmed,
            Resolution::Cancel => ConfirmationState::Cancelled,
        };
        info!(thread = %thread, prompt_ts, state = ?pending.state, "Confirmation resolved");
        Ok(pending)
    }

    /// Expire every prompt past its deadline. Optional; lookups expire lazily anyway.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<PendingConfirmation> {
        let mut state = self.lock();

        let stale: Vec<ThreadRef> = state
            .by_thread
            .iter()
            .filter_map(|(thread, slot)| match slot {
                Slot::Awaiting(p) if p.is_expired_at(now) => Some(thread.clone()),
                _ => None,
            })
            .collect();

        stale
            .iter()
            .filter_map(|thread| state.remove_thread(thread))
            .map(|mut pending| {
                pending.state = ConfirmationState::Expired;
                pending
            })
            .collect()
    }

    /// The live (unexpired) prompt for a thread, if any.
    #[must_use]
    pub fn pending_for(&self, thread: &ThreadRef, now: DateTime<Utc>) -> Option<PendingConfirmation> {
        match self.lock().by_thread.get(thread) {
            Some(Slot::Awaiting(p)) if !p.is_expired_at(now) => Some(p.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock().by_thread.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap_or_default()
    }

    #[test]
    fn reservation_blocks_second_prompt_until_released() {
        let gate = ConfirmationGate::new(Duration::from_secs(60));
        let thread = ThreadRef::new("C1", "1.1");

        gate.reserve(&thread, at(0)).unwrap();
        assert_eq!(
            gate.reserve(&thread, at(1)),
            Err(GateError::AlreadyPending(thread.clone()))
        );

        gate.release(&thread);
        assert!(gate.reserve(&thread, at(2)).is_ok());
    }

    #[test]
    fn release_does_not_drop_a_recorded_prompt() {
        let gate = ConfirmationGate::new(Duration::from_secs(60));
        let thread = ThreadRef::new("C1", "1.1");

        gate.reserve(&thread, at(0)).unwrap();
        gate.record(&thread, "2.2", "U1", at(0));
        gate.release(&thread);

        assert!(gate.pending_for(&thread, at(1)).is_some());
    }

    #[test]
    fn sweep_removes_only_expired_prompts() {
        let gate = ConfirmationGate::new(Duration::from_secs(60));
        let old = ThreadRef::new("C1", "1.1");
        let fresh = ThreadRef::new("C1", "3.3");

        gate.reserve(&old, at(0)).unwrap();
        gate.record(&old, "2.2", "U1", at(0));
        gate.reserve(&fresh, at(50)).unwrap();
        gate.record(&fresh, "4.4", "U1", at(50));

        let expired = gate.sweep_expired(at(61));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].thread, old);
        assert_eq!(expired[0].state, ConfirmationState::Expired);
        assert_eq!(gate.active_count(), 1);
    }
}
