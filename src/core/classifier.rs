//! Trigger classification.
//!
//! Decides, from a normalized [`TriggerEvent`], whether the bot should act and how.
//! Rules are evaluated in a fixed precedence order and the first match wins:
//!
//! 1. slash command outside a thread: explicit command for the linked thread
//! 2. slash command inside a thread: rejected, mention the bot instead
//! 3. interactive action with a known action id: button confirmed / cancelled
//! 4. mention or message containing a skip keyword (case-insensitive substring)
//! 5. plain mention: needs confirmation
//! 6. anything else: not applicable
//!
//! Keyword matching is substring-based: `create` also matches inside `recreated`.

use super::models::{TriggerDecision, TriggerEvent, TriggerSource};
use crate::errors::ValidationError;
use crate::slack::response_builder::{CANCEL_ACTION_ID, CONFIRM_ACTION_ID};
use crate::utils::links::parse_thread_permalink;

use super::config::DEFAULT_SKIP_KEYWORDS;

/// Immutable, lower-cased set of skip keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for k in keywords {
            let k = k.as_ref().trim().to_lowercase();
            if !k.is_empty() && !out.contains(&k) {
                out.push(k);
            }
        }
        Self { keywords: out }
    }

    #[must_use]
    pub fn default_set() -> Self {
        Self::new(DEFAULT_SKIP_KEYWORDS.iter().copied())
    }

    /// True when any keyword occurs anywhere in `text`, ignoring case.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::default_set()
    }
}

#[derive(Debug, Clone)]
pub struct TriggerClassifier {
    skip_keywords: KeywordSet,
    slash_command: String,
}

impl TriggerClassifier {
    #[must_use]
    pub fn new(skip_keywords: KeywordSet, slash_command: impl Into<String>) -> Self {
        Self {
            skip_keywords,
            slash_command: slash_command.into(),
        }
    }

    #[must_use]
    pub fn classify(&self, event: &TriggerEvent) -> TriggerDecision {
        let in_thread = event.is_in_thread();

        match event.source {
            TriggerSource::SlashCommand if !in_thread => self.classify_command(&event.text),
            TriggerSource::SlashCommand => {
                TriggerDecision::NotApplicable(Some(ValidationError::SlashCommandInThread))
            }
            TriggerSource::InteractiveAction => classify_action(event),
            TriggerSource::Mention | TriggerSource::Message
                if self.skip_keywords.matches(&event.text) =>
            {
                match event.thread_ref() {
                    Some(thread) => TriggerDecision::MentionWithSkipKeyword(thread),
                    None => self.outside_thread(event.source),
                }
            }
            TriggerSource::Mention => match event.thread_ref() {
                Some(thread) => TriggerDecision::MentionRequiringConfirmation(thread),
                None => self.outside_thread(event.source),
            },
            TriggerSource::Message => TriggerDecision::NotApplicable(None),
        }
    }

    fn classify_command(&self, text: &str) -> TriggerDecision {
        let Some(arg) = text.split_whitespace().next() else {
            return TriggerDecision::NotApplicable(Some(ValidationError::MissingThreadUrl {
                command: self.slash_command.clone(),
            }));
        };

        match parse_thread_permalink(arg) {
            Some(thread) => TriggerDecision::ExplicitCommand(thread),
            None => TriggerDecision::NotApplicable(Some(ValidationError::InvalidThreadUrl(
                arg.to_string(),
            ))),
        }
    }

    fn outside_thread(&self, source: TriggerSource) -> TriggerDecision {
        match source {
            TriggerSource::Mention => {
                TriggerDecision::NotApplicable(Some(ValidationError::MentionOutsideThread {
                    command: self.slash_command.clone(),
                }))
            }
            _ => TriggerDecision::NotApplicable(None),
        }
    }
}

fn classify_action(event: &TriggerEvent) -> TriggerDecision {
    let (Some(thread), Some(prompt_ts)) = (event.thread_ref(), event.message_ts.clone()) else {
        return TriggerDecision::NotApplicable(None);
    };

    match event.action_id.as_deref() {
        Some(CONFIRM_ACTION_ID) => TriggerDecision::ButtonConfirmed { thread, prompt_ts },
        Some(CANCEL_ACTION_ID) => TriggerDecision::ButtonCancelled { thread, prompt_ts },
        _ => TriggerDecision::NotApplicable(None),
    }
}
