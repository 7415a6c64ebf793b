use thread_canvas::core::classifier::{KeywordSet, TriggerClassifier};
use thread_canvas::core::config::{DEFAULT_SKIP_KEYWORDS, parse_keyword_list};
use thread_canvas::core::models::{ThreadRef, TriggerDecision, TriggerEvent, TriggerSource};
use thread_canvas::errors::ValidationError;
use thread_canvas::slack::response_builder::{CANCEL_ACTION_ID, CONFIRM_ACTION_ID};

const LINK: &str = "https://acme.slack.com/archives/C0123/p1700000000000100";

fn classifier() -> TriggerClassifier {
    TriggerClassifier::new(KeywordSet::new(DEFAULT_SKIP_KEYWORDS.iter().copied()), "/create-canvas")
}

fn event(source: TriggerSource, thread_ts: Option<&str>, text: &str) -> TriggerEvent {
    TriggerEvent {
        source,
        channel_id: "C0123".to_string(),
        thread_ts: thread_ts.map(str::to_string),
        text: text.to_string(),
        actor_id: "U1".to_string(),
        action_id: None,
        message_ts: Some("1700000500.000900".to_string()),
    }
}

fn thread() -> ThreadRef {
    ThreadRef::new("C0123", "1700000000.000100")
}

#[test]
fn every_event_gets_exactly_one_decision() {
    let sources = [
        TriggerSource::SlashCommand,
        TriggerSource::Mention,
        TriggerSource::Message,
        TriggerSource::InteractiveAction,
    ];
    let threads = [None, Some("1700000000.000100")];
    let texts = ["", ".", "SUMMARY", "まとめて", LINK, "lunch?"];
    let actions = [None, Some(CONFIRM_ACTION_ID), Some(CANCEL_ACTION_ID), Some("other")];

    let c = classifier();
    for source in sources {
        for thread_ts in threads {
            for text in texts {
                for action in actions {
                    let mut e = event(source, thread_ts, text);
                    e.action_id = action.map(str::to_string);
                    let first = c.classify(&e);
                    // Pure: classifying twice gives the same single answer.
                    assert_eq!(first, c.classify(&e), "{e:?}");
                    if let Some(t) = first.thread() {
                        assert!(!t.thread_ts.is_empty());
                    }
                }
            }
        }
    }
}

#[test]
fn skip_keyword_match_ignores_case() {
    let c = classifier();
    for text in ["Summary", "SUMMARY please", "can you MAKE a doc", "キャンバス作成お願いします"] {
        assert_eq!(
            c.classify(&event(TriggerSource::Mention, Some("1700000000.000100"), text)),
            TriggerDecision::MentionWithSkipKeyword(thread()),
            "{text}"
        );
    }
}

#[test]
fn bare_mention_in_thread_requires_confirmation() {
    assert_eq!(
        classifier().classify(&event(TriggerSource::Mention, Some("1700000000.000100"), ".")),
        TriggerDecision::MentionRequiringConfirmation(thread())
    );
}

#[test]
fn slash_command_in_thread_is_a_validation_error() {
    assert_eq!(
        classifier().classify(&event(TriggerSource::SlashCommand, Some("1700000000.000100"), LINK)),
        TriggerDecision::NotApplicable(Some(ValidationError::SlashCommandInThread))
    );
}

#[test]
fn slash_command_requires_a_parseable_link() {
    let c = classifier();
    assert_eq!(
        c.classify(&event(TriggerSource::SlashCommand, None, LINK)),
        TriggerDecision::ExplicitCommand(thread())
    );
    assert_eq!(
        c.classify(&event(TriggerSource::SlashCommand, None, "   ")),
        TriggerDecision::NotApplicable(Some(ValidationError::MissingThreadUrl {
            command: "/create-canvas".to_string()
        }))
    );
    assert_eq!(
        c.classify(&event(TriggerSource::SlashCommand, None, "https://example.com/x")),
        TriggerDecision::NotApplicable(Some(ValidationError::InvalidThreadUrl(
            "https://example.com/x".to_string()
        )))
    );
}

#[test]
fn messages_only_trigger_with_keyword_inside_thread() {
    let c = classifier();
    assert_eq!(
        c.classify(&event(TriggerSource::Message, Some("1700000000.000100"), "要約して")),
        TriggerDecision::MentionWithSkipKeyword(thread())
    );
    assert_eq!(
        c.classify(&event(TriggerSource::Message, None, "summary")),
        TriggerDecision::NotApplicable(None)
    );
    assert_eq!(
        c.classify(&event(TriggerSource::Message, Some("1700000000.000100"), "ok")),
        TriggerDecision::NotApplicable(None)
    );
}

#[test]
fn button_actions_map_to_their_resolution() {
    let c = classifier();
    let mut e = event(TriggerSource::InteractiveAction, Some("1700000000.000100"), "");
    e.action_id = Some(CONFIRM_ACTION_ID.to_string());
    assert_eq!(
        c.classify(&e),
        TriggerDecision::ButtonConfirmed {
            thread: thread(),
            prompt_ts: "1700000500.000900".to_string()
        }
    );

    e.action_id = Some(CANCEL_ACTION_ID.to_string());
    assert!(matches!(c.classify(&e), TriggerDecision::ButtonCancelled { .. }));

    e.message_ts = None;
    assert_eq!(c.classify(&e), TriggerDecision::NotApplicable(None));
}

#[test]
fn configured_keyword_list_replaces_defaults() {
    let set = parse_keyword_list(" recap , ,TL;DR ");
    assert_eq!(set.len(), 2);
    let c = TriggerClassifier::new(set, "/create-canvas");
    assert_eq!(
        c.classify(&event(TriggerSource::Mention, Some("1700000000.000100"), "tl;dr pls")),
        TriggerDecision::MentionWithSkipKeyword(thread())
    );
    assert_eq!(
        c.classify(&event(TriggerSource::Mention, Some("1700000000.000100"), "summary")),
        TriggerDecision::MentionRequiringConfirmation(thread())
    );
}
