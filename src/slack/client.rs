//! Slack API client module
//!
//! Encapsulates all Slack Web API interactions with retry logic and error handling,
//! and implements the collaborator traits the generation pipeline depends on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::{
    SlackApiAuthTestResponse, SlackApiChatPostMessageRequest, SlackApiChatUpdateRequest,
    SlackApiConversationsRepliesRequest, SlackApiToken, SlackApiTokenValue, SlackBlock,
    SlackChannelId, SlackCursorId, SlackHistoryMessage, SlackMessageContent,
    SlackMessageEventType, SlackTs,
};
use tokio::sync::OnceCell;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::core::document::Document;
use crate::core::models::{
    DocumentRef, FileRef, Message, MessageRef, ThreadContext, ThreadRef,
};
use crate::core::ports::{FallbackPublisher, Notifier, PrimaryPublisher, ThreadRetriever};
use crate::errors::{FetchError, PublishError, SlackError};
use crate::utils::links::{canvas_url, fallback_thread_permalink};

const SLACK_API_BASE: &str = "https://slack.com/api";
const REPLIES_PAGE_LIMIT: u16 = 200;

/// Retries after the first attempt.
const MAX_RETRIES: usize = 5;
/// Upper bound for a single backoff delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(2);

// Build the Slack client connector without panicking; call sites surface a
// SlackError when it is missing.
static SLACK_CLIENT: std::sync::LazyLock<Option<SlackHyperClient>> =
    std::sync::LazyLock::new(|| match SlackClientHyperConnector::new() {
        Ok(connector) => Some(SlackHyperClient::new(connector)),
        Err(e) => {
            warn!("Failed to create Slack HTTP connector: {}", e);
            None
        }
    });

static HTTP_CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Workspace identity resolved once through `auth.test`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceInfo {
    pub bot_user_id: String,
    pub team_id: String,
    /// Workspace base URL without trailing slash, e.g. `https://acme.slack.com`.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    upload_url: String,
    file_id: String,
}

/// Which failures a call may be repeated after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryPolicy {
    /// Reads and overwrites: any transient failure is retried.
    Idempotent,
    /// Creates and posts: retried only when Slack cannot have acted on the request.
    NonIdempotent,
}

impl RetryPolicy {
    fn allows(self, error: &SlackError) -> bool {
        match self {
            Self::Idempotent => is_transient(error),
            Self::NonIdempotent => is_unprocessed(error),
        }
    }
}

/// Backoff delays: 100ms doubling up to [`MAX_RETRY_DELAY`], jittered, [`MAX_RETRIES`] of them.
pub(crate) fn retry_delays() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(50)
        .max_delay(MAX_RETRY_DELAY)
        .map(jitter)
        .take(MAX_RETRIES)
}

fn slack_client() -> Result<&'static SlackHyperClient, SlackError> {
    SLACK_CLIENT.as_ref().ok_or_else(|| {
        SlackError::GeneralError("Slack HTTP connector not initialized".to_string())
    })
}

/// Slack API client with retry logic and error handling
pub struct SlackClient {
    token: SlackApiToken,
    workspace: OnceCell<WorkspaceInfo>,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
            workspace: OnceCell::new(),
        }
    }

    /// Run `operation`, repeating it on the failures `policy` allows.
    pub(crate) async fn with_retry<F, Fut, T>(
        &self,
        policy: RetryPolicy,
        operation: F,
    ) -> Result<T, SlackError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, SlackError>> + Send,
        T: Send,
    {
        RetryIf::start(retry_delays(), operation, |e: &SlackError| policy.allows(e)).await
    }

    /// Resolve (once) the bot user, team and workspace URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `auth.test` fails.
    pub async fn workspace(&self) -> Result<&WorkspaceInfo, SlackError> {
        self.workspace
            .get_or_try_init(|| {
                self.with_retry(RetryPolicy::Idempotent, || async {
                    let session = slack_client()?.open_session(&self.token);
                    let resp = session
                        .auth_test()
                        .await
                        .map_err(|e| SlackError::from_client("auth.test", e))?;
                    Ok(workspace_from_auth_test(resp))
                })
            })
            .await
    }

    /// # Errors
    ///
    /// Returns an error if `auth.test` fails.
    pub async fn get_bot_user_id(&self) -> Result<String, SlackError> {
        Ok(self.workspace().await?.bot_user_id.clone())
    }

    /// Call a Slack method with a JSON body.
    async fn api_json(
        &self,
        method: &str,
        payload: &Value,
        policy: RetryPolicy,
    ) -> Result<Value, SlackError> {
        self.with_retry(policy, || async {
            let resp = HTTP_CLIENT
                .post(format!("{SLACK_API_BASE}/{method}"))
                .bearer_auth(&self.token.token_value.0)
                .json(payload)
                .send()
                .await
                .map_err(|e| SlackError::from_reqwest(method, &e))?;
            check_response(method, resp).await
        })
        .await
    }

    /// Call a Slack read method with form-encoded arguments.
    async fn api_form(&self, method: &str, params: &[(&str, String)]) -> Result<Value, SlackError> {
        self.with_retry(RetryPolicy::Idempotent, || async {
            let resp = HTTP_CLIENT
                .post(format!("{SLACK_API_BASE}/{method}"))
                .bearer_auth(&self.token.token_value.0)
                .form(params)
                .send()
                .await
                .map_err(|e| SlackError::from_reqwest(method, &e))?;
            check_response(method, resp).await
        })
        .await
    }

    /// Every message of a thread (root included), oldest first, following cursors.
    ///
    /// # Errors
    ///
    /// Returns an error if any `conversations.replies` page fails.
    pub async fn get_thread_replies(&self, thread: &ThreadRef) -> Result<Vec<Message>, SlackError> {
        let bot_user_id = self
            .workspace()
            .await
            .map(|w| w.bot_user_id.clone())
            .ok();
        let mut messages = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;

        loop {
            let mut request = SlackApiConversationsRepliesRequest::new(
                SlackChannelId(thread.channel_id.clone()),
                SlackTs(thread.thread_ts.clone()),
            )
            .with_inclusive(true)
            .with_limit(REPLIES_PAGE_LIMIT);
            if let Some(c) = &cursor {
                request = request.with_cursor(c.clone());
            }

            let page = self
                .with_retry(RetryPolicy::Idempotent, || async {
                    let session = slack_client()?.open_session(&self.token);
                    session
                        .conversations_replies(&request)
                        .await
                        .map_err(|e| SlackError::from_client("conversations.replies", e))
                })
                .await?;

            messages.extend(
                page.messages
                    .into_iter()
                    .filter(is_conversation_message)
                    .map(|m| to_message(m, bot_user_id.as_deref())),
            );

            cursor = page
                .response_metadata
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.0.is_empty());
            if cursor.is_none() {
                break;
            }
        }

        debug!(thread = %thread, count = messages.len(), "Fetched thread replies");
        Ok(messages)
    }

    /// # Errors
    ///
    /// Returns an error if the Slack API request or response parsing fails.
    pub async fn get_message_permalink(
        &self,
        channel: &str,
        message_ts: &str,
    ) -> Result<String, SlackError> {
        let body = self
            .api_form(
                "chat.getPermalink",
                &[
                    ("channel", channel.to_string()),
                    ("message_ts", message_ts.to_string()),
                ],
            )
            .await?;

        body.get("permalink")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SlackError::GeneralError("No permalink in response".to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if `canvases.create` fails or its response carries no id.
    pub async fn create_canvas(&self, title: &str, markdown: &str) -> Result<String, SlackError> {
        let payload = json!({
            "title": title,
            "document_content": { "type": "markdown", "markdown": markdown },
        });
        let body = self
            .api_json("canvases.create", &payload, RetryPolicy::NonIdempotent)
            .await?;

        body.get("canvas_id")
            .and_then(Value::as_str)
            .or_else(|| {
                body.get("canvas")
                    .and_then(|c| c.get("id"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string)
            .ok_or_else(|| SlackError::ParseError("canvases.create response missing canvas id".to_string()))
    }

    /// Grant `user_id` write access to a canvas.
    ///
    /// # Errors
    ///
    /// Returns an error if `canvases.access.set` fails.
    pub async fn grant_canvas_access(&self, canvas_id: &str, user_id: &str) -> Result<(), SlackError> {
        let payload = json!({
            "canvas_id": canvas_id,
            "access_level": "write",
            "user_ids": [user_id],
        });
        self.api_json("canvases.access.set", &payload, RetryPolicy::Idempotent)
            .await?;
        Ok(())
    }

    /// Upload `content` as a file reply in `thread` using the external upload flow.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three upload steps fails.
    pub async fn upload_thread_file(
        &self,
        thread: &ThreadRef,
        content: &str,
        file_name: &str,
        title: &str,
    ) -> Result<FileRef, SlackError> {
        let body = self
            .api_form(
                "files.getUploadURLExternal",
                &[
                    ("filename", file_name.to_string()),
                    ("length", content.len().to_string()),
                ],
            )
            .await?;
        let target: UploadUrlResponse = serde_json::from_value(body).map_err(|e| {
            SlackError::ParseError(format!("files.getUploadURLExternal response: {e}"))
        })?;

        // The upload URL is single-purpose; sending the same bytes again overwrites them.
        self.with_retry(RetryPolicy::Idempotent, || async {
            let resp = HTTP_CLIENT
                .post(target.upload_url.as_str())
                .body(content.to_string())
                .send()
                .await
                .map_err(|e| SlackError::from_reqwest("file upload", &e))?;
            if resp.status().is_success() {
                Ok(())
            } else {
                Err(SlackError::HttpError(format!(
                    "File upload HTTP {}",
                    resp.status()
                )))
            }
        })
        .await?;

        let payload = json!({
            "files": [{ "id": target.file_id, "title": title }],
            "channel_id": thread.channel_id,
            "thread_ts": thread.thread_ts,
        });
        let body = self
            .api_json(
                "files.completeUploadExternal",
                &payload,
                RetryPolicy::NonIdempotent,
            )
            .await?;

        let permalink = body
            .get("files")
            .and_then(Value::as_array)
            .and_then(|files| files.first())
            .and_then(|f| f.get("permalink"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(FileRef {
            file_id: target.file_id,
            permalink,
        })
    }

    /// Post a reply into a thread and return its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the blocks are not valid Block Kit, or Slack rejects the post.
    pub async fn post_message_in_thread(
        &self,
        thread: &ThreadRef,
        text: &str,
        blocks: Option<&Value>,
    ) -> Result<MessageRef, SlackError> {
        let mut content = SlackMessageContent::new().with_text(text.to_string());
        if let Some(b) = blocks {
            content = content.with_blocks(to_blocks(b)?);
        }
        let request = SlackApiChatPostMessageRequest::new(
            SlackChannelId(thread.channel_id.clone()),
            content,
        )
        .with_thread_ts(SlackTs(thread.thread_ts.clone()));

        let resp = self
            .with_retry(RetryPolicy::NonIdempotent, || async {
                let session = slack_client()?.open_session(&self.token);
                session
                    .chat_post_message(&request)
                    .await
                    .map_err(|e| SlackError::from_client("chat.postMessage", e))
            })
            .await?;

        Ok(MessageRef {
            channel_id: resp.channel.0,
            ts: resp.ts.0,
        })
    }

    /// Update an existing message via Slack's `chat.update` API.
    ///
    /// Passing `Some(json!([]))` as `blocks` strips interactive elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the blocks are not valid Block Kit, or Slack rejects the update.
    pub async fn update_message(
        &self,
        message: &MessageRef,
        text: &str,
        blocks: Option<&Value>,
    ) -> Result<(), SlackError> {
        let mut content = SlackMessageContent::new().with_text(text.to_string());
        if let Some(b) = blocks {
            content = content.with_blocks(to_blocks(b)?);
        }
        let request = SlackApiChatUpdateRequest::new(
            SlackChannelId(message.channel_id.clone()),
            content,
            SlackTs(message.ts.clone()),
        );

        self.with_retry(RetryPolicy::Idempotent, || async {
            let session = slack_client()?.open_session(&self.token);
            session
                .chat_update(&request)
                .await
                .map_err(|e| SlackError::from_client("chat.update", e))
        })
        .await?;
        Ok(())
    }
}

fn workspace_from_auth_test(resp: SlackApiAuthTestResponse) -> WorkspaceInfo {
    let url = resp.url.0.as_str().trim_end_matches('/').to_string();
    WorkspaceInfo {
        bot_user_id: resp.user_id.0,
        team_id: resp.team_id.0,
        url: (!url.is_empty()).then_some(url),
    }
}

fn to_blocks(blocks: &Value) -> Result<Vec<SlackBlock>, SlackError> {
    serde_json::from_value(blocks.clone())
        .map_err(|e| SlackError::ParseError(format!("invalid Block Kit blocks: {e}")))
}

/// Failures worth repeating for calls that are safe to send twice.
fn is_transient(error: &SlackError) -> bool {
    match error {
        SlackError::HttpError(_) | SlackError::ConnectError(_) => true,
        SlackError::MethodError { code, .. } => matches!(
            code.as_str(),
            "ratelimited" | "rate_limited" | "internal_error" | "fatal_error" | "service_unavailable"
        ),
        _ => false,
    }
}

/// Failures where Slack never processed the request: no connection, or a rate-limit rejection.
fn is_unprocessed(error: &SlackError) -> bool {
    match error {
        SlackError::ConnectError(_) => true,
        SlackError::MethodError { code, .. } => matches!(code.as_str(), "ratelimited" | "rate_limited"),
        _ => false,
    }
}

/// Map an HTTP response to the Slack payload or a typed error.
///
/// A 429 becomes `ratelimited` and is paced by the retry backoff.
async fn check_response(method: &str, resp: Response) -> Result<Value, SlackError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(method, "Slack rate limited (429)");
        return Err(SlackError::MethodError {
            method: method.to_string(),
            code: "ratelimited".to_string(),
        });
    }
    if !status.is_success() {
        return Err(SlackError::HttpError(format!("{method} HTTP {status}")));
    }

    let body: Value = resp
        .json()
        .await
        .map_err(|e| SlackError::ParseError(format!("{method} JSON parse error: {e}")))?;
    ensure_ok(method, body)
}

/// Check Slack's `ok` flag and turn `ok: false` into [`SlackError::MethodError`].
fn ensure_ok(method: &str, body: Value) -> Result<Value, SlackError> {
    if body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(body);
    }
    Err(SlackError::MethodError {
        method: method.to_string(),
        code: body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
    })
}

/// Joins, leaves, topic changes and similar system posts are not part of the discussion.
fn is_conversation_message(message: &SlackHistoryMessage) -> bool {
    matches!(
        message.subtype,
        None | Some(
            SlackMessageEventType::ThreadBroadcast
                | SlackMessageEventType::FileShare
                | SlackMessageEventType::BotMessage
                | SlackMessageEventType::MeMessage
        )
    )
}

fn to_message(message: SlackHistoryMessage, bot_user_id: Option<&str>) -> Message {
    let user = message.sender.user.map(|u| u.0);
    let bot_id = message.sender.bot_id.map(|b| b.0);
    let is_from_bot = bot_id.is_some()
        || matches!(message.subtype, Some(SlackMessageEventType::BotMessage))
        || (bot_user_id.is_some() && user.as_deref() == bot_user_id);
    Message {
        author_id: user.or(bot_id).unwrap_or_else(|| "unknown".to_string()),
        text: message.content.text.unwrap_or_default(),
        ts: message.origin.ts.0,
        is_from_bot,
    }
}

#[async_trait]
impl ThreadRetriever for SlackClient {
    async fn fetch_thread(&self, thread: &ThreadRef) -> Result<ThreadContext, FetchError> {
        let messages = self
            .get_thread_replies(thread)
            .await
            .map_err(|e| FetchError::from_slack(&e))?;
        if messages.is_empty() {
            return Err(FetchError::NotFound(format!("no messages in {thread}")));
        }

        let permalink = match self
            .get_message_permalink(&thread.channel_id, &thread.thread_ts)
            .await
        {
            Ok(link) => link,
            Err(e) => {
                warn!(thread = %thread, error = %e, "Permalink lookup failed, building it locally");
                let workspace_url = self.workspace().await.ok().and_then(|w| w.url.clone());
                fallback_thread_permalink(workspace_url.as_deref(), thread)
            }
        };

        Ok(ThreadContext {
            thread: thread.clone(),
            permalink,
            messages,
        })
    }
}

#[async_trait]
impl PrimaryPublisher for SlackClient {
    async fn publish(
        &self,
        document: &Document,
        thread: &ThreadRef,
        requested_by: &str,
    ) -> Result<DocumentRef, PublishError> {
        let canvas_id = self
            .create_canvas(&document.title, &document.render_markdown())
            .await
            .map_err(|e| PublishError::from_slack(&e))?;
        info!(thread = %thread, canvas_id = %canvas_id, "Canvas created");

        if let Err(e) = self.grant_canvas_access(&canvas_id, requested_by).await {
            warn!(canvas_id = %canvas_id, user = requested_by, error = %e, "Failed to share canvas");
        }

        let url = match self.workspace().await {
            Ok(WorkspaceInfo {
                url: Some(base),
                team_id,
                ..
            }) => Some(canvas_url(base, team_id, &canvas_id)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Could not resolve workspace for canvas URL");
                None
            }
        };

        Ok(DocumentRef { canvas_id, url })
    }
}

#[async_trait]
impl FallbackPublisher for SlackClient {
    async fn upload_file(
        &self,
        content: &str,
        file_name: &str,
        title: &str,
        thread: &ThreadRef,
    ) -> Result<FileRef, PublishError> {
        self.upload_thread_file(thread, content, file_name, title)
            .await
            .map_err(|e| match PublishError::from_slack(&e) {
                PublishError::FeatureUnavailable(reason) => PublishError::Transport(reason),
                other => other,
            })
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn post_message(&self, thread: &ThreadRef, text: &str) -> Result<MessageRef, SlackError> {
        self.post_message_in_thread(thread, text, None).await
    }

    async fn update_message(&self, message: &MessageRef, text: &str) -> Result<(), SlackError> {
        SlackClient::update_message(self, message, text, None).await
    }

    async fn post_prompt(
        &self,
        thread: &ThreadRef,
        text: &str,
        blocks: &Value,
    ) -> Result<MessageRef, SlackError> {
        self.post_message_in_thread(thread, text, Some(blocks)).await
    }

    async fn replace_prompt(&self, message: &MessageRef, text: &str) -> Result<(), SlackError> {
        SlackClient::update_message(self, message, text, Some(&json!([]))).await
    }
}
