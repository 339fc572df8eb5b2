//! Chat bridge: channel messages in, Dialogflow replies out.
//!
//! One processor task drains inbound messages in arrival order. Each message is routed to the
//! conversation's Dialogflow session, sent to the agent, and the normalized reply is delivered
//! item by item. Agent actions are applied after the items: a handoff request sends the handoff
//! notice, a close request sends the closing notice and drops the session binding.

use crate::channels::{ChannelHandle, ChannelRegistry, InboundMessage, TelegramChannel};
use crate::config::{self, Config, FileSettings};
use crate::dialogflow::{Action, Dialogflow, DialogflowRequest, ParsedMessage, RestConnector};
use crate::routing::SessionBindingStore;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Typing this drops the conversation's session and starts over.
pub const NEW_SESSION_TRIGGER: &str = "/restart";
const START_COMMAND: &str = "/start";

const DEFAULT_HANDOFF_MESSAGE: &str = "Transferring you to a human agent.";
const DEFAULT_CLOSE_MESSAGE: &str = "This conversation has been closed. Send a message to start a new one.";
const RESTART_MESSAGE: &str = "Session restarted. Your next message starts a new conversation.";
const UNAVAILABLE_MESSAGE: &str = "Sorry, the assistant is unavailable right now. Please try again later.";

/// Shared state for inbound processing.
#[derive(Clone)]
pub struct BridgeState {
    pub dialogflow: Dialogflow,
    pub channel_registry: Arc<ChannelRegistry>,
    pub bindings: Arc<SessionBindingStore>,
    pub start_event: Option<String>,
    pub handoff_message: String,
    pub close_message: String,
}

impl BridgeState {
    pub fn new(dialogflow: Dialogflow, config: &Config) -> Self {
        let telegram = &config.channels.telegram;
        Self {
            dialogflow,
            channel_registry: Arc::new(ChannelRegistry::new()),
            bindings: Arc::new(SessionBindingStore::new()),
            start_event: non_empty(&telegram.start_event),
            handoff_message: non_empty(&telegram.handoff_message)
                .unwrap_or_else(|| DEFAULT_HANDOFF_MESSAGE.to_string()),
            close_message: non_empty(&telegram.close_message)
                .unwrap_or_else(|| DEFAULT_CLOSE_MESSAGE.to_string()),
        }
    }

    fn request_for(&self, text: &str) -> DialogflowRequest {
        if text.trim().eq_ignore_ascii_case(START_COMMAND) && self.dialogflow.capabilities().events {
            if let Some(ref event) = self.start_event {
                return DialogflowRequest::event(event.clone());
            }
        }
        DialogflowRequest::message(text)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Process one inbound channel message: resolve the session, ask the agent, deliver the reply.
pub async fn process_inbound_message(state: &BridgeState, msg: InboundMessage) {
    let Some(handle) = state.channel_registry.get(&msg.channel_id).await else {
        log::warn!("inbound: no channel registered for {}", msg.channel_id);
        return;
    };

    if msg.text.trim().eq_ignore_ascii_case(NEW_SESSION_TRIGGER) {
        state
            .bindings
            .unbind(&msg.channel_id, &msg.conversation_id)
            .await;
        let _ = handle
            .send_message(&msg.conversation_id, RESTART_MESSAGE)
            .await;
        return;
    }

    let session_id = state
        .bindings
        .get_or_create(&msg.channel_id, &msg.conversation_id)
        .await;
    let request = state.request_for(&msg.text);
    let parsed = match state.dialogflow.send_request(&session_id, &request).await {
        Ok(p) => p,
        Err(e) => {
            log::warn!("inbound: dialogflow request failed: {}", e);
            let _ = handle
                .send_message(&msg.conversation_id, UNAVAILABLE_MESSAGE)
                .await;
            return;
        }
    };
    deliver_reply(state, &msg, &session_id, &parsed).await;
}

async fn deliver_reply(state: &BridgeState, msg: &InboundMessage, session_id: &str, parsed: &ParsedMessage) {
    let Some(handle) = state.channel_registry.get(&msg.channel_id).await else {
        return;
    };
    for item in parsed.messages() {
        if let Err(e) = handle.send_item(&msg.conversation_id, item).await {
            log::warn!("inbound: send_item failed: {}", e);
        }
    }
    match parsed.action {
        Some(Action::LivechatTransfer) => {
            log::info!(
                "session {} ({}/{}) requested a live agent",
                session_id,
                msg.channel_id,
                msg.conversation_id
            );
            let _ = handle
                .send_message(&msg.conversation_id, &state.handoff_message)
                .await;
        }
        Some(Action::CloseChat) => {
            log::info!("session {} closed by the agent", session_id);
            state
                .bindings
                .unbind(&msg.channel_id, &msg.conversation_id)
                .await;
            let _ = handle
                .send_message(&msg.conversation_id, &state.close_message)
                .await;
        }
        None => {}
    }
}

/// Run the Telegram bridge until Ctrl+C / SIGTERM. Settings are re-read from `config_path`
/// on every Dialogflow call.
pub async fn run_bridge(config: Config, config_path: PathBuf) -> Result<()> {
    let token = config::resolve_telegram_token(&config)
        .context("telegram bot token not configured (channels.telegram.botToken or TELEGRAM_BOT_TOKEN)")?;
    let dialogflow = Dialogflow::new(
        Arc::new(FileSettings::new(Some(config_path))),
        Arc::new(RestConnector::new()),
        config.dialogflow.capabilities,
    );
    let state = BridgeState::new(dialogflow, &config);

    let telegram = Arc::new(TelegramChannel::new(Some(token)));
    if let Err(e) = telegram.delete_webhook().await {
        log::warn!("telegram delete_webhook failed: {}", e);
    }
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<InboundMessage>(64);
    state
        .channel_registry
        .register("telegram".to_string(), telegram.clone())
        .await;
    let poller = telegram.start_inbound(inbound_tx);
    log::info!("telegram channel registered and getUpdates loop started");

    let processor_state = state.clone();
    let processor = tokio::spawn(async move {
        while let Some(msg) = inbound_rx.recv().await {
            process_inbound_message(&processor_state, msg).await;
        }
    });

    shutdown_signal().await;
    log::info!("shutdown signal received, stopping channels");
    state.channel_registry.stop_all().await;
    // The poller exits after its current long poll; do not wait the full timeout.
    poller.abort();
    let _ = poller.await;
    let _ = processor.await;
    log::info!("bridge stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
