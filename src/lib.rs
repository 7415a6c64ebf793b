/// Thread Canvas - a Slack bot that turns a discussion thread into a structured canvas.
///
/// A thread is summarized when someone asks for it explicitly (slash command with a
/// thread link, or a mention containing a skip keyword) or confirms a Yes/No prompt
/// posted after an ambiguous mention.
///
/// # Architecture
///
/// - `api`: normalizes Socket Mode payloads into `TriggerEvent`s and routes them
/// - `core`: classifier, confirmation gate, document model and collaborator traits
/// - `worker`: run registry, generation coordinator, summarizer and publishing
/// - `slack` / `ai`: Slack Web API and `OpenAI` clients behind those traits
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use thread_canvas::core::classifier::{KeywordSet, TriggerClassifier};
/// use thread_canvas::core::confirmation::ConfirmationGate;
/// use thread_canvas::core::models::{TriggerEvent, TriggerSource};
/// use thread_canvas::api::App;
/// use thread_canvas::ai::LlmClient;
/// use thread_canvas::slack::SlackClient;
/// use thread_canvas::worker::deliver::DocumentAssembler;
/// use thread_canvas::worker::summarize::LlmSummarizer;
/// use thread_canvas::worker::{GenerationCoordinator, RunRegistry};
///
/// #[tokio::main]
/// async fn main() {
///     thread_canvas::setup_logging();
///
///     let slack = Arc::new(SlackClient::new("xoxb-...".to_string()));
///     let llm = Arc::new(LlmClient::new("sk-...".into(), None, "gpt-4o-mini".into()));
///     let coordinator = Arc::new(GenerationCoordinator::new(
///         RunRegistry::new(),
///         slack.clone(),
///         Arc::new(LlmSummarizer::new(llm)),
///         DocumentAssembler::new(slack.clone(), slack.clone()),
///         slack.clone(),
///     ));
///     let app = App::new(
///         TriggerClassifier::new(KeywordSet::default_set(), "/create-canvas"),
///         Arc::new(ConfirmationGate::new(Duration::from_secs(600))),
///         coordinator,
///         slack,
///     );
///
///     let outcome = app
///         .handle_event(TriggerEvent {
///             source: TriggerSource::Mention,
///             channel_id: "C12345678".into(),
///             thread_ts: Some("1700000000.000100".into()),
///             text: "summary".into(),
///             actor_id: "U123".into(),
///             action_id: None,
///             message_ts: Some("1700000100.000200".into()),
///         })
///         .await;
///     println!("{:?}", outcome.reply_text());
/// }
/// ```
// Module declarations
pub mod ai;
pub mod api;
pub mod core;
pub mod errors;
pub mod slack;
pub mod utils;
pub mod worker;

pub use errors::SlackError;

/// Configure structured logging with JSON output.
///
/// Verbosity follows `RUST_LOG` and defaults to `info`. Safe to call more than
/// once; later calls are no-ops.
///
/// # Example
///
/// ```
/// thread_canvas::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
