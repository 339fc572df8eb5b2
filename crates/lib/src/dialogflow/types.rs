//! Dialogflow CX REST wire types (v3 `sessions.detectIntent`).
//!
//! Reply records are deliberately loose: every field is optional so an unexpected shape
//! is skipped by the normalizer instead of failing the turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /v3/{session}:detectIntent`. The session travels in the URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentRequest {
    #[serde(skip)]
    pub session: String,
    pub query_input: QueryInput,
}

/// Exactly one of `text` / `event` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventInput>,
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextInput {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventInput {
    pub event: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetectIntentResponse {
    #[serde(default)]
    pub query_result: Option<QueryResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResult {
    /// Kept raw so one malformed entry does not hide the others.
    #[serde(default)]
    pub response_messages: Option<Vec<Value>>,
}

/// One `responseMessages` entry. Other kinds (endInteraction, liveAgentHandoff, ...) are ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub text: Option<TextMessage>,
    #[serde(default)]
    pub payload: Option<Payload>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TextMessage {
    #[serde(default)]
    pub text: Vec<String>,
}

/// Custom payload. Fields are read in this order: richContent, quickReplies, livechat, closeChat.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Payload {
    #[serde(default)]
    pub rich_content: Option<Value>,
    #[serde(default)]
    pub quick_replies: Option<Value>,
    #[serde(default)]
    pub livechat: Option<Value>,
    #[serde(default)]
    pub close_chat: Option<Value>,
}

impl Payload {
    /// Items of every row, row by row. Non-array rows and undecodable items are skipped.
    pub fn rich_content_items(&self) -> impl Iterator<Item = RichContentItem> + '_ {
        self.rich_content
            .iter()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(|item| RichContentItem::deserialize(item).ok())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RichContentItem {
    #[serde(rename = "type", default)]
    pub typ: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image: Option<RichImage>,
    #[serde(default)]
    pub action_link: Option<ActionLink>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActionLink {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RichImage {
    #[serde(default)]
    pub src: Option<ImageSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageSource {
    #[serde(default)]
    pub raw_url: Option<String>,
}
