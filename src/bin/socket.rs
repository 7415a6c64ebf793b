#![allow(clippy::missing_errors_doc)]

//! Socket Mode entry point: connects to Slack and feeds events to the handler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use slack_morphism::prelude::*;
use thread_canvas::ai::LlmClient;
use thread_canvas::api::{App, EventNormalizer};
use thread_canvas::core::classifier::TriggerClassifier;
use thread_canvas::core::config::AppConfig;
use thread_canvas::core::confirmation::ConfirmationGate;
use thread_canvas::slack::SlackClient;
use thread_canvas::worker::deliver::DocumentAssembler;
use thread_canvas::worker::summarize::LlmSummarizer;
use thread_canvas::worker::{GenerationCoordinator, RunRegistry};
use tracing::{debug, error, info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared with the socket mode callbacks through `SlackClientEventsUserState`.
struct BotState {
    app: Arc<App>,
    normalizer: EventNormalizer,
}

async fn bot_state(states: &SlackClientEventsUserState) -> Option<Arc<BotState>> {
    states.read().await.get_user_state::<Arc<BotState>>().cloned()
}

async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    let Some(state) = bot_state(&states).await else {
        error!("Bot state missing from listener environment");
        return Ok(());
    };

    let payload = serde_json::to_value(&event)?;
    let Some(trigger) = state.normalizer.from_push_event(&payload) else {
        return Ok(());
    };

    // Acknowledge the envelope right away; prompt posting happens off the socket loop.
    tokio::spawn(async move {
        let outcome = state.app.handle_event(trigger).await;
        debug!(outcome = ?outcome, "Push event handled");
    });
    Ok(())
}

async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<SlackCommandEventResponse> {
    let ephemeral = |text: String| SlackCommandEventResponse {
        content: SlackMessageContent::new().with_text(text),
        response_type: Some(SlackMessageResponseType::Ephemeral),
    };

    let Some(state) = bot_state(&states).await else {
        error!("Bot state missing from listener environment");
        return Ok(ephemeral("The bot is not ready yet. Please try again.".to_string()));
    };

    let payload = serde_json::to_value(&event)?;
    let trigger = match state.normalizer.from_slash_command(&payload) {
        Ok(trigger) => trigger,
        Err(e) => {
            warn!(error = %e, "Unreadable slash command");
            return Ok(ephemeral("I couldn't read that command.".to_string()));
        }
    };

    let outcome = state.app.handle_event(trigger).await;
    Ok(ephemeral(outcome.reply_text().unwrap_or_default()))
}

async fn handle_interaction_event(
    event: SlackInteractionEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    let Some(state) = bot_state(&states).await else {
        error!("Bot state missing from listener environment");
        return Ok(());
    };

    let payload = serde_json::to_value(&event)?;
    let Some((action_id, action)) = state.normalizer.from_interaction(&payload) else {
        debug!("Ignoring interaction event");
        return Ok(());
    };

    tokio::spawn(async move {
        let outcome = state.app.handle_interactive_action(&action_id, action).await;
        debug!(outcome = ?outcome, "Interaction handled");
    });
    Ok(())
}

fn slack_error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    warn!(error = %err, "Slack socket mode error");
    HttpStatusCode::OK
}

async fn build_app(config: &AppConfig, slack: Arc<SlackClient>) -> Result<(Arc<App>, EventNormalizer)> {
    let bot_user_id = match slack.get_bot_user_id().await {
        Ok(id) => {
            info!(bot_user_id = %id, "Slack bot user resolved");
            Some(id)
        }
        Err(e) => {
            warn!(error = %e, "Could not resolve bot user id; mention filtering disabled");
            None
        }
    };

    let llm = Arc::new(LlmClient::new(
        config.openai_api_key.clone(),
        config.openai_org_id.clone(),
        config.openai_model.clone(),
    ));
    let coordinator = Arc::new(GenerationCoordinator::new(
        RunRegistry::new(),
        slack.clone(),
        Arc::new(LlmSummarizer::new(llm)),
        DocumentAssembler::new(slack.clone(), slack.clone()),
        slack.clone(),
    ));
    let app = App::new(
        TriggerClassifier::new(config.skip_keywords.clone(), config.slash_command.clone()),
        Arc::new(ConfirmationGate::new(config.confirmation_ttl)),
        coordinator,
        slack,
    );

    Ok((Arc::new(app), EventNormalizer::new(bot_user_id)))
}

#[tokio::main]
async fn main() -> Result<()> {
    thread_canvas::setup_logging();

    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("failed to load configuration")?;
    info!(
        model = %config.openai_model,
        slash_command = %config.slash_command,
        skip_keywords = config.skip_keywords.len(),
        ttl_secs = config.confirmation_ttl.as_secs(),
        "Configuration loaded"
    );

    let slack = Arc::new(SlackClient::new(config.slack_bot_token.clone()));
    let (app, normalizer) = build_app(&config, slack).await?;

    let sweeper = {
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let expired = app.sweep_expired_prompts(Utc::now()).await;
                if expired > 0 {
                    info!(expired, "Expired confirmation prompts swept");
                }
            }
        })
    };

    let callbacks = SlackSocketModeListenerCallbacks::new()
        .with_push_events(handle_push_event)
        .with_command_events(handle_command_event)
        .with_interaction_events(handle_interaction_event);

    let listener_client = Arc::new(SlackHyperClient::new(
        SlackClientHyperConnector::new().context("failed to create slack socket mode connector")?,
    ));
    let listener_environment = Arc::new(
        SlackClientEventsListenerEnvironment::new(listener_client)
            .with_error_handler(slack_error_handler)
            .with_user_state(Arc::new(BotState { app, normalizer })),
    );
    let listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_environment,
        callbacks,
    );

    let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
    listener
        .listen_for(&app_token)
        .await
        .context("failed to start slack socket mode listener")?;
    info!("Slack socket mode connected");

    tokio::select! {
        exit_code = listener.serve() => {
            info!(exit_code, "Slack socket mode listener stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            listener.shutdown().await;
        }
    }

    sweeper.abort();
    Ok(())
}
