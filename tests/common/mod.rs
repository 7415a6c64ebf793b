#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thread_canvas::api::App;
use thread_canvas::core::classifier::{KeywordSet, TriggerClassifier};
use thread_canvas::core::confirmation::ConfirmationGate;
use thread_canvas::core::document::Document;
use thread_canvas::core::models::{
    DocumentRef, FileRef, Message, MessageRef, SummaryResult, ThreadContext, ThreadRef,
    TriggerEvent, TriggerSource,
};
use thread_canvas::core::ports::{
    FallbackPublisher, Notifier, PrimaryPublisher, Summarizer, ThreadRetriever,
};
use thread_canvas::errors::{FetchError, PublishError, SlackError, SummarizeError};
use thread_canvas::worker::deliver::DocumentAssembler;
use thread_canvas::worker::{GenerationCoordinator, RunRegistry};
use tokio::sync::Notify;

pub const PERMALINK: &str = "https://acme.slack.com/archives/C1/p1700000000000100";

pub fn thread() -> ThreadRef {
    ThreadRef::new("C1", "1700000000.000100")
}

pub fn human(ts: &str, text: &str) -> Message {
    Message {
        author_id: "U1".to_string(),
        text: text.to_string(),
        ts: ts.to_string(),
        is_from_bot: false,
    }
}

pub fn bot(ts: &str, text: &str) -> Message {
    Message {
        author_id: "UBOT".to_string(),
        text: text.to_string(),
        ts: ts.to_string(),
        is_from_bot: true,
    }
}

pub fn context(messages: Vec<Message>) -> ThreadContext {
    ThreadContext {
        thread: thread(),
        permalink: PERMALINK.to_string(),
        messages,
    }
}

pub fn summary() -> SummaryResult {
    SummaryResult {
        title: "Release planning".to_string(),
        overview: "The team agreed on the release date.".to_string(),
        key_points: vec!["Ship on Friday".to_string()],
        decisions: None,
        action_items: None,
        follow_ups: vec!["Confirm QA capacity".to_string()],
        references: None,
    }
}

pub fn event(source: TriggerSource, thread_ts: Option<&str>, text: &str) -> TriggerEvent {
    TriggerEvent {
        source,
        channel_id: "C1".to_string(),
        thread_ts: thread_ts.map(str::to_string),
        text: text.to_string(),
        actor_id: "U1".to_string(),
        action_id: None,
        message_ts: Some("1700000500.000900".to_string()),
    }
}

pub struct FakeRetriever {
    pub result: Mutex<Result<ThreadContext, FetchError>>,
    /// When set, `fetch_thread` waits for a notification before answering.
    pub hold: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
}

impl FakeRetriever {
    pub fn returning(result: Result<ThreadContext, FetchError>) -> Self {
        Self {
            result: Mutex::new(result),
            hold: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn held(result: Result<ThreadContext, FetchError>, hold: Arc<Notify>) -> Self {
        Self {
            hold: Some(hold),
            ..Self::returning(result)
        }
    }
}

#[async_trait]
impl ThreadRetriever for FakeRetriever {
    async fn fetch_thread(&self, _thread: &ThreadRef) -> Result<ThreadContext, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.result.lock().unwrap().clone()
    }
}

pub struct FakeSummarizer {
    pub result: Result<SummaryResult, SummarizeError>,
    pub seen: Mutex<Vec<Vec<Message>>>,
}

impl FakeSummarizer {
    pub fn returning(result: Result<SummaryResult, SummarizeError>) -> Self {
        Self {
            result,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, transcript: &[Message]) -> Result<SummaryResult, SummarizeError> {
        self.seen.lock().unwrap().push(transcript.to_vec());
        self.result.clone()
    }
}

pub struct FakePrimary {
    pub result: Result<DocumentRef, PublishError>,
    pub published: Mutex<Vec<Document>>,
}

impl FakePrimary {
    pub fn returning(result: Result<DocumentRef, PublishError>) -> Self {
        Self {
            result,
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::returning(Ok(DocumentRef {
            canvas_id: "F0CANVAS".to_string(),
            url: Some("https://acme.slack.com/docs/T1/F0CANVAS".to_string()),
        }))
    }
}

#[async_trait]
impl PrimaryPublisher for FakePrimary {
    async fn publish(
        &self,
        document: &Document,
        _thread: &ThreadRef,
        _requested_by: &str,
    ) -> Result<DocumentRef, PublishError> {
        self.published.lock().unwrap().push(document.clone());
        self.result.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub content: String,
    pub file_name: String,
    pub title: String,
}

pub struct FakeFallback {
    pub result: Result<FileRef, PublishError>,
    pub uploads: Mutex<Vec<Upload>>,
}

impl FakeFallback {
    pub fn ok() -> Self {
        Self {
            result: Ok(FileRef {
                file_id: "F0FILE".to_string(),
                permalink: Some("https://acme.slack.com/files/U1/F0FILE".to_string()),
            }),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl FallbackPublisher for FakeFallback {
    async fn upload_file(
        &self,
        content: &str,
        file_name: &str,
        title: &str,
        _thread: &ThreadRef,
    ) -> Result<FileRef, PublishError> {
        self.uploads.lock().unwrap().push(Upload {
            content: content.to_string(),
            file_name: file_name.to_string(),
            title: title.to_string(),
        });
        self.result.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Post { thread: ThreadRef, text: String },
    Update { message: MessageRef, text: String },
    Prompt { thread: ThreadRef, blocks: Value },
    Replace { message: MessageRef, text: String },
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Sent>>,
    pub fail_prompts: bool,
    next_ts: AtomicUsize,
}

impl RecordingNotifier {
    pub fn failing_prompts() -> Self {
        Self {
            fail_prompts: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Post { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Update { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn replacements(&self) -> Vec<(MessageRef, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Replace { message, text } => Some((message, text)),
                _ => None,
            })
            .collect()
    }

    pub fn prompt_count(&self) -> usize {
        self.sent()
            .iter()
            .filter(|s| matches!(s, Sent::Prompt { .. }))
            .count()
    }

    fn next_message(&self, thread: &ThreadRef) -> MessageRef {
        let n = self.next_ts.fetch_add(1, Ordering::SeqCst);
        MessageRef {
            channel_id: thread.channel_id.clone(),
            ts: format!("1800000000.{n:06}"),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post_message(&self, thread: &ThreadRef, text: &str) -> Result<MessageRef, SlackError> {
        self.sent.lock().unwrap().push(Sent::Post {
            thread: thread.clone(),
            text: text.to_string(),
        });
        Ok(self.next_message(thread))
    }

    async fn update_message(&self, message: &MessageRef, text: &str) -> Result<(), SlackError> {
        self.sent.lock().unwrap().push(Sent::Update {
            message: message.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn post_prompt(
        &self,
        thread: &ThreadRef,
        _text: &str,
        blocks: &Value,
    ) -> Result<MessageRef, SlackError> {
        if self.fail_prompts {
            return Err(SlackError::MethodError {
                method: "chat.postMessage".to_string(),
                code: "not_in_channel".to_string(),
            });
        }
        self.sent.lock().unwrap().push(Sent::Prompt {
            thread: thread.clone(),
            blocks: blocks.clone(),
        });
        Ok(self.next_message(thread))
    }

    async fn replace_prompt(&self, message: &MessageRef, text: &str) -> Result<(), SlackError> {
        self.sent.lock().unwrap().push(Sent::Replace {
            message: message.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// All collaborators wired into a coordinator and an [`App`].
pub struct Harness {
    pub retriever: Arc<FakeRetriever>,
    pub summarizer: Arc<FakeSummarizer>,
    pub primary: Arc<FakePrimary>,
    pub fallback: Arc<FakeFallback>,
    pub notifier: Arc<RecordingNotifier>,
    pub coordinator: Arc<GenerationCoordinator>,
}

impl Harness {
    pub fn new(
        retriever: FakeRetriever,
        summarizer: FakeSummarizer,
        primary: FakePrimary,
        notifier: RecordingNotifier,
    ) -> Self {
        let retriever = Arc::new(retriever);
        let summarizer = Arc::new(summarizer);
        let primary = Arc::new(primary);
        let fallback = Arc::new(FakeFallback::ok());
        let notifier = Arc::new(notifier);
        let coordinator = Arc::new(GenerationCoordinator::new(
            RunRegistry::new(),
            retriever.clone(),
            summarizer.clone(),
            DocumentAssembler::new(primary.clone(), fallback.clone()),
            notifier.clone(),
        ));
        Self {
            retriever,
            summarizer,
            primary,
            fallback,
            notifier,
            coordinator,
        }
    }

    /// Happy-path collaborators around a two-message thread.
    pub fn happy() -> Self {
        Self::new(
            FakeRetriever::returning(Ok(context(vec![
                human("1700000000.000100", "When do we ship?"),
                human("1700000001.000100", "Friday works."),
            ]))),
            FakeSummarizer::returning(Ok(summary())),
            FakePrimary::ok(),
            RecordingNotifier::default(),
        )
    }

    pub fn app(&self, ttl: Duration) -> App {
        App::new(
            TriggerClassifier::new(KeywordSet::new(["summary", "まとめて"]), "/create-canvas"),
            Arc::new(ConfirmationGate::new(ttl)),
            self.coordinator.clone(),
            self.notifier.clone(),
        )
    }
}
