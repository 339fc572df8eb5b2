//! Channel-session binding: (channel_id, conversation_id) -> Dialogflow session id.
//!
//! Session ids are random UUIDs (36 chars, the longest id Dialogflow accepts). A binding is
//! dropped when the agent closes the conversation so the next message starts a new session.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key for channel-side of the binding (channel id + conversation id, e.g. telegram chat_id).
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ChannelConvKey {
    pub channel_id: String,
    pub conversation_id: String,
}

impl ChannelConvKey {
    fn new(channel_id: &str, conversation_id: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            conversation_id: conversation_id.to_string(),
        }
    }
}

/// In-memory store of channel conversations to session ids.
pub struct SessionBindingStore {
    to_session: Arc<RwLock<HashMap<ChannelConvKey, String>>>,
}

impl Default for SessionBindingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBindingStore {
    pub fn new() -> Self {
        Self {
            to_session: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve the session for a conversation, binding a fresh one if there is none.
    pub async fn get_or_create(&self, channel_id: &str, conversation_id: &str) -> String {
        let key = ChannelConvKey::new(channel_id, conversation_id);
        if let Some(id) = self.to_session.read().await.get(&key) {
            return id.clone();
        }
        self.to_session
            .write()
            .await
            .entry(key)
            .or_insert_with(new_session_id)
            .clone()
    }

    /// Resolve session_id for a channel conversation without creating one.
    pub async fn get_session_id(&self, channel_id: &str, conversation_id: &str) -> Option<String> {
        let key = ChannelConvKey::new(channel_id, conversation_id);
        self.to_session.read().await.get(&key).cloned()
    }

    /// Drop the binding; returns the session id that was bound.
    pub async fn unbind(&self, channel_id: &str, conversation_id: &str) -> Option<String> {
        let key = ChannelConvKey::new(channel_id, conversation_id);
        self.to_session.write().await.remove(&key)
    }
}

/// Fresh random session id.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
