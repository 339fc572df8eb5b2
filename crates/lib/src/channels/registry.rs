//! Channel registry: register and lookup channels by id.

use super::render::render_plain;
use crate::dialogflow::MessageItem;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("send not implemented")]
    Unsupported,
    #[error("{0} bot token not configured")]
    MissingToken(&'static str),
    #[error("channel request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{method} failed: {detail}")]
    Api { method: &'static str, detail: String },
}

/// Handle to a running channel (stop, send message).
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;
    /// Stop the channel connector.
    fn stop(&self);
    /// Send a text message to a conversation (e.g. Telegram chat_id). Default returns error.
    async fn send_message(&self, _conversation_id: &str, _text: &str) -> Result<(), ChannelError> {
        Err(ChannelError::Unsupported)
    }
    /// Deliver one agent reply item. Default renders it as plain text.
    async fn send_item(&self, conversation_id: &str, item: &MessageItem) -> Result<(), ChannelError> {
        self.send_message(conversation_id, &render_plain(item)).await
    }
}

/// Registry of channel ids to handles. Shared across the bridge.
pub struct ChannelRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<dyn ChannelHandle>>>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a handle; a previous handle under the same id is stopped.
    pub async fn register(&self, id: String, handle: Arc<dyn ChannelHandle>) {
        let mut g = self.inner.write().await;
        if let Some(old) = g.insert(id, handle) {
            old.stop();
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn ChannelHandle>> {
        let g = self.inner.read().await;
        g.get(id).cloned()
    }

    pub async fn ids(&self) -> Vec<String> {
        let g = self.inner.read().await;
        g.keys().cloned().collect()
    }

    /// Stop every registered channel.
    pub async fn stop_all(&self) {
        for handle in self.inner.read().await.values() {
            handle.stop();
        }
    }
}
