//! Telegram channel: long-poll getUpdates and deliver replies via the Bot API.
//!
//! Info cards become a photo (or message) with an inline URL button; quick replies become
//! a one-time reply keyboard so tapping an option sends it back as the next utterance.

use crate::channels::inbound::InboundMessage;
use crate::channels::registry::{ChannelError, ChannelHandle};
use crate::dialogflow::{InfoCard, MessageItem, QuickReplies};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

/// Telegram update payload (getUpdates result item).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Telegram channel connector: long-polls for updates and sends replies.
pub struct TelegramChannel {
    id: String,
    token: Option<String>,
    api_base: String,
    running: AtomicBool,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: Option<String>) -> Self {
        Self {
            id: "telegram".to_string(),
            token,
            api_base: TELEGRAM_API_BASE.to_string(),
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different Bot API host (local Bot API server, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn method_url(&self, method: &str) -> Result<String, ChannelError> {
        let token = self
            .token
            .as_ref()
            .ok_or(ChannelError::MissingToken("telegram"))?;
        Ok(format!("{}/bot{}/{}", self.api_base, token, method))
    }

    /// Start the getUpdates long-poll loop and forward messages to the bridge. Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), ChannelError> {
        let url = format!(
            "{}?timeout={}",
            self.method_url("getUpdates")?,
            LONG_POLL_TIMEOUT
        );
        let url = if let Some(off) = offset {
            format!("{}&offset={}", url, off)
        } else {
            url
        };
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api {
                method: "getUpdates",
                detail: format!("{} {}", status, body),
            });
        }
        let data: GetUpdatesResponse = res.json().await?;
        if !data.ok {
            return Err(ChannelError::Api {
                method: "getUpdates",
                detail: data
                    .description
                    .unwrap_or_else(|| "ok: false".to_string()),
            });
        }
        let next_offset = data
            .result
            .iter()
            .map(|u| u.update_id)
            .max()
            .map(|id| id + 1);
        Ok((data.result, next_offset))
    }

    /// Remove any webhook so getUpdates can be used.
    pub async fn delete_webhook(&self) -> Result<(), ChannelError> {
        self.call("deleteWebhook", json!({})).await
    }

    /// POST a Bot API method with a JSON body.
    async fn call(&self, method: &'static str, body: Value) -> Result<(), ChannelError> {
        let url = self.method_url(method)?;
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api {
                method,
                detail: format!("{} {}", status, body),
            });
        }
        Ok(())
    }

    /// Plain text via sendMessage. A reply keyboard shown just before stays up until used.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        self.call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await
    }

    async fn send_card(&self, chat_id: &str, card: &InfoCard) -> Result<(), ChannelError> {
        let caption = [card.title.as_str(), card.subtitle.as_str()]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        // Telegram rejects empty text; fall back to the button so the card is not lost.
        let caption = if caption.is_empty() && card.image_url.is_empty() {
            match card.buttons.first() {
                Some(b) if !b.text.trim().is_empty() => b.text.clone(),
                Some(b) => b.postback.clone(),
                None => String::new(),
            }
        } else {
            caption
        };
        if caption.trim().is_empty() && card.image_url.is_empty() {
            log::debug!("telegram: skipping empty info card");
            return Ok(());
        }
        let mut body = if card.image_url.is_empty() {
            json!({ "chat_id": chat_id, "text": caption })
        } else {
            json!({ "chat_id": chat_id, "photo": card.image_url, "caption": caption })
        };
        if let Some(markup) = card_markup(card) {
            body["reply_markup"] = markup;
        }
        let method = if card.image_url.is_empty() {
            "sendMessage"
        } else {
            "sendPhoto"
        };
        self.call(method, body).await
    }

    async fn send_quick_replies(&self, chat_id: &str, q: &QuickReplies) -> Result<(), ChannelError> {
        let keyboard: Vec<Vec<Value>> = q
            .labels()
            .into_iter()
            .map(|label| vec![json!({ "text": label })])
            .collect();
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": q.text,
                "reply_markup": {
                    "keyboard": keyboard,
                    "one_time_keyboard": true,
                    "resize_keyboard": true
                }
            }),
        )
        .await
    }
}

/// URL postbacks become inline link buttons; anything else becomes a reply-keyboard button.
fn card_markup(card: &InfoCard) -> Option<Value> {
    let button = card.buttons.first()?;
    let label = if button.text.is_empty() {
        button.postback.as_str()
    } else {
        button.text.as_str()
    };
    if button.postback.starts_with("https://") || button.postback.starts_with("http://") {
        Some(json!({ "inline_keyboard": [[{ "text": label, "url": button.postback }]] }))
    } else {
        Some(json!({
            "keyboard": [[{ "text": label }]],
            "one_time_keyboard": true,
            "resize_keyboard": true
        }))
    }
}

async fn run_get_updates_loop(channel: Arc<TelegramChannel>, inbound_tx: mpsc::Sender<InboundMessage>) {
    let mut offset: Option<i64> = None;
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                offset = next.or(offset);
                for u in updates {
                    let Some(msg) = u.message else { continue };
                    let Some(text) = msg.text else { continue };
                    let inbound = InboundMessage {
                        channel_id: channel.id.clone(),
                        conversation_id: msg.chat.id.to_string(),
                        text,
                    };
                    if inbound_tx.send(inbound).await.is_err() {
                        log::debug!("telegram: inbound channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::debug!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl ChannelHandle for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), ChannelError> {
        TelegramChannel::send_message(self, conversation_id, text).await
    }

    async fn send_item(&self, conversation_id: &str, item: &MessageItem) -> Result<(), ChannelError> {
        match item {
            MessageItem::Text(text) => TelegramChannel::send_message(self, conversation_id, text).await,
            MessageItem::Card(card) => self.send_card(conversation_id, card).await,
            MessageItem::QuickReplies(q) => self.send_quick_replies(conversation_id, q).await,
        }
    }
}
