use slack_morphism::errors::SlackClientError;
use thiserror::Error;

/// Low-level failure talking to Slack or the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlackError {
    #[error("Failed to parse Slack event: {0}")]
    ParseError(String),

    #[error("Failed to access Slack API: {0}")]
    ApiError(String),

    #[error("Slack API method {method} returned error: {code}")]
    MethodError { method: String, code: String },

    #[error("Failed to access OpenAI API: {0}")]
    OpenAIError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    /// The connection was never established, so the request did not reach Slack.
    #[error("Failed to connect: {0}")]
    ConnectError(String),

    #[error("{0}")]
    GeneralError(String),
}

impl SlackError {
    /// The Slack error code, when Slack answered with `ok: false`.
    #[must_use]
    pub fn slack_code(&self) -> Option<&str> {
        match self {
            Self::MethodError { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

impl SlackError {
    /// Convert a slack-morphism session failure for `method`.
    #[must_use]
    pub fn from_client(method: &str, error: SlackClientError) -> Self {
        match error {
            SlackClientError::ApiError(api) => SlackError::MethodError {
                method: method.to_string(),
                code: api.code,
            },
            SlackClientError::RateLimitError(_) => SlackError::MethodError {
                method: method.to_string(),
                code: "ratelimited".to_string(),
            },
            SlackClientError::HttpError(_) | SlackClientError::HttpProtocolError(_) => {
                SlackError::HttpError(format!("{method}: {error}"))
            }
            other => SlackError::ApiError(format!("{method}: {other}")),
        }
    }

    /// Convert a raw HTTP failure for `method`, keeping connect failures apart.
    #[must_use]
    pub fn from_reqwest(method: &str, error: &reqwest::Error) -> Self {
        if error.is_connect() {
            SlackError::ConnectError(format!("{method}: {error}"))
        } else {
            SlackError::HttpError(format!("{method} request failed: {error}"))
        }
    }
}

/// A trigger that was understood but cannot be acted on; shown to the actor as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please pass a thread link, e.g. `{command} https://your-team.slack.com/archives/C0123/p1700000000123456`.")]
    MissingThreadUrl { command: String },

    #[error("`{0}` doesn't look like a Slack thread link. Copy the link from the thread's \"Copy link\" menu and try again.")]
    InvalidThreadUrl(String),

    #[error("Slash commands can't be used inside threads. Mention me in the thread instead.")]
    SlashCommandInThread,

    #[error("Mention me inside a thread to turn it into a canvas, or use `{command} <thread link>`.")]
    MentionOutsideThread { command: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("thread not found: {0}")]
    NotFound(String),

    #[error("no permission to read thread: {0}")]
    Permission(String),

    #[error("transport error while fetching thread: {0}")]
    Transport(String),
}

impl FetchError {
    /// Classify a Slack failure from `conversations.replies`.
    #[must_use]
    pub fn from_slack(error: &SlackError) -> Self {
        match error.slack_code() {
            Some("channel_not_found" | "thread_not_found" | "message_not_found") => {
                Self::NotFound(error.to_string())
            }
            Some(
                "not_in_channel" | "missing_scope" | "access_denied" | "not_authed"
                | "invalid_auth" | "account_inactive" | "no_permission",
            ) => Self::Permission(error.to_string()),
            _ => Self::Transport(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummarizeError {
    #[error("summary response did not match the expected shape: {0}")]
    Malformed(String),

    #[error("transport error while summarizing: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("native documents are unavailable: {0}")]
    FeatureUnavailable(String),

    #[error("no permission to publish: {0}")]
    Permission(String),

    #[error("transport error while publishing: {0}")]
    Transport(String),
}

impl PublishError {
    /// Classify a Slack failure from `canvases.create`.
    #[must_use]
    pub fn from_slack(error: &SlackError) -> Self {
        match error.slack_code() {
            Some(
                "not_allowed"
                | "feature_not_enabled"
                | "canvas_disabled_user_team"
                | "free_teams_cannot_create_non_tabbed_canvases"
                | "team_tier_cannot_create_canvases"
                | "unknown_method",
            ) => Self::FeatureUnavailable(error.to_string()),
            Some(
                "missing_scope" | "not_authed" | "invalid_auth" | "access_denied"
                | "no_permission" | "not_in_channel",
            ) => Self::Permission(error.to_string()),
            _ => Self::Transport(error.to_string()),
        }
    }
}

/// Why a generation run failed. Each cause maps to its own user-visible text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("thread has no messages to summarize")]
    EmptyThread,

    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl RunError {
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::NotFound(_)) => {
                "I couldn't find that thread. It may have been deleted, or the link may be wrong."
            }
            Self::Fetch(FetchError::Permission(_)) => {
                "I don't have access to that thread. Invite me to the channel and try again."
            }
            Self::EmptyThread => "There are no messages in this thread to summarize.",
            Self::Summarize(SummarizeError::Malformed(_)) => {
                "I couldn't turn this thread into a structured summary. Please try again."
            }
            Self::Publish(PublishError::Permission(_)) => {
                "I don't have permission to create a canvas or upload files here. Ask a workspace admin to check my scopes."
            }
            Self::Publish(PublishError::FeatureUnavailable(_)) => {
                "Canvases aren't available in this workspace and the file fallback failed."
            }
            Self::Fetch(FetchError::Transport(_))
            | Self::Summarize(SummarizeError::Transport(_))
            | Self::Publish(PublishError::Transport(_)) => {
                "Something went wrong while creating the canvas. Please try again."
            }
        }
    }
}

/// A run for this thread is already active; informational, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("a canvas is already being generated for thread {0}")]
pub struct AlreadyInFlight(pub crate::core::models::ThreadRef);
