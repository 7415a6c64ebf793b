use std::collections::HashSet;
use std::error::Error;

use thread_canvas::errors::{
    AlreadyInFlight, FetchError, PublishError, RunError, SlackError, SummarizeError,
    ValidationError,
};
use thread_canvas::core::models::ThreadRef;

fn method_error(code: &str) -> SlackError {
    SlackError::MethodError {
        method: "canvases.create".to_string(),
        code: code.to_string(),
    }
}

#[test]
fn slack_error_implements_error_trait() {
    fn assert_error<T: Error>(_: &T) {}
    assert_error(&SlackError::ParseError("bad payload".to_string()));
}

#[test]
fn slack_error_display() {
    assert_eq!(
        SlackError::ApiError("API failed".to_string()).to_string(),
        "Failed to access Slack API: API failed"
    );
    assert_eq!(
        method_error("not_allowed").to_string(),
        "Slack API method canvases.create returned error: not_allowed"
    );
    assert_eq!(method_error("not_allowed").slack_code(), Some("not_allowed"));
    assert_eq!(SlackError::HttpError("timeout".to_string()).slack_code(), None);
}

#[test]
fn fetch_errors_are_classified_by_slack_code() {
    assert!(matches!(
        FetchError::from_slack(&method_error("thread_not_found")),
        FetchError::NotFound(_)
    ));
    assert!(matches!(
        FetchError::from_slack(&method_error("not_in_channel")),
        FetchError::Permission(_)
    ));
    assert!(matches!(
        FetchError::from_slack(&SlackError::HttpError("reset".to_string())),
        FetchError::Transport(_)
    ));
}

#[test]
fn publish_errors_separate_feature_from_permission() {
    assert!(matches!(
        PublishError::from_slack(&method_error("free_teams_cannot_create_non_tabbed_canvases")),
        PublishError::FeatureUnavailable(_)
    ));
    assert!(matches!(
        PublishError::from_slack(&method_error("missing_scope")),
        PublishError::Permission(_)
    ));
    assert!(matches!(
        PublishError::from_slack(&method_error("ratelimited")),
        PublishError::Transport(_)
    ));
}

#[test]
fn generic_canvas_failure_does_not_trigger_the_file_fallback() {
    assert!(matches!(
        PublishError::from_slack(&method_error("canvas_creation_failed")),
        PublishError::Transport(_)
    ));
    assert!(matches!(
        PublishError::from_slack(&method_error("canvas_disabled_user_team")),
        PublishError::FeatureUnavailable(_)
    ));
}

#[test]
fn user_facing_failure_texts_name_their_cause() {
    let causes = [
        RunError::Fetch(FetchError::NotFound(String::new())),
        RunError::Fetch(FetchError::Permission(String::new())),
        RunError::EmptyThread,
        RunError::Summarize(SummarizeError::Malformed(String::new())),
        RunError::Publish(PublishError::Permission(String::new())),
        RunError::Publish(PublishError::FeatureUnavailable(String::new())),
        RunError::Publish(PublishError::Transport(String::new())),
    ];
    let texts: HashSet<_> = causes.iter().map(RunError::user_message).collect();
    assert_eq!(texts.len(), causes.len());
}

#[test]
fn validation_errors_render_usage() {
    let err = ValidationError::MissingThreadUrl {
        command: "/create-canvas".to_string(),
    };
    assert!(err.to_string().contains("/create-canvas https://"));

    let busy = AlreadyInFlight(ThreadRef::new("C1", "1.1"));
    assert!(busy.to_string().contains("already being generated"));
}
