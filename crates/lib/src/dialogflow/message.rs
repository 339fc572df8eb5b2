//! Flat reply model handed to chat channels.

use serde::{Deserialize, Serialize};

/// Normalized agent reply for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    /// Reserved for no-match detection; always false today.
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Renderable items in reply order. `None` rather than empty when nothing was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<MessageItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl ParsedMessage {
    pub fn messages(&self) -> &[MessageItem] {
        self.messages.as_deref().unwrap_or(&[])
    }
}

/// Side effect requested by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    LivechatTransfer,
    CloseChat,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::LivechatTransfer => "livechat-transfer",
            Action::CloseChat => "close-chat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageItem {
    Text(String),
    Card(InfoCard),
    QuickReplies(QuickReplies),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoCard {
    pub title: String,
    pub subtitle: String,
    /// Empty when the item had no image.
    pub image_url: String,
    /// Zero or one button.
    pub buttons: Vec<CardButton>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardButton {
    pub text: String,
    pub postback: String,
}

/// Quick replies exactly as the agent's payload carried them; unknown fields are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickReplies {
    pub text: String,
    pub options: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl QuickReplies {
    /// Option labels: plain strings as-is, objects by their `text` field.
    pub fn labels(&self) -> Vec<String> {
        self.options
            .iter()
            .filter_map(|o| match o {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Object(m) => {
                    m.get("text").and_then(|t| t.as_str()).map(str::to_string)
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_message_serializes_only_fallback_flag() {
        let json = serde_json::to_value(ParsedMessage::default()).unwrap();
        assert_eq!(json, json!({ "isFallback": false }));
    }

    #[test]
    fn action_uses_wire_names() {
        let msg = ParsedMessage {
            action: Some(Action::CloseChat),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&msg).unwrap()["action"], "close-chat");
        assert_eq!(Action::LivechatTransfer.as_str(), "livechat-transfer");
    }

    #[test]
    fn items_round_trip_untagged() {
        let items = json!([
            "hello",
            { "title": "T", "subtitle": "S", "image_url": "", "buttons": [] },
            { "text": "Pick", "options": ["a", "b"], "style": "compact" }
        ]);
        let parsed: Vec<MessageItem> = serde_json::from_value(items.clone()).unwrap();
        assert!(matches!(parsed[0], MessageItem::Text(_)));
        assert!(matches!(parsed[1], MessageItem::Card(_)));
        match &parsed[2] {
            MessageItem::QuickReplies(q) => {
                assert_eq!(q.extra.get("style"), Some(&json!("compact")));
            }
            other => panic!("expected quick replies, got {:?}", other),
        }
        assert_eq!(serde_json::to_value(&parsed).unwrap(), items);
    }

    #[test]
    fn quick_reply_labels_accept_strings_and_objects() {
        let q: QuickReplies = serde_json::from_value(json!({
            "text": "Pick",
            "options": ["yes", { "text": "no", "actionId": "n" }, 3]
        }))
        .unwrap();
        assert_eq!(q.labels(), vec!["yes".to_string(), "no".to_string()]);
    }
}
