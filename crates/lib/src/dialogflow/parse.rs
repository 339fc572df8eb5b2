//! Reply normalizer: raw `detectIntent` JSON to [`ParsedMessage`].

use super::capabilities::Capabilities;
use super::message::{Action, CardButton, InfoCard, MessageItem, ParsedMessage, QuickReplies};
use super::types::{DetectIntentResponse, Payload, ResponseMessage, RichContentItem};
use serde::Deserialize;
use serde_json::Value;

/// Flatten one agent reply. Never fails: unrecognized or malformed entries are skipped.
///
/// Entries are visited in order; within a payload the order is rich content rows, then quick
/// replies, then the `livechat` and `closeChat` signals. The last signal seen sets `action`.
pub fn parse_request(reply: &Value, session_id: &str, capabilities: Capabilities) -> ParsedMessage {
    let mut parsed = ParsedMessage {
        is_fallback: false,
        session_id: capabilities.echo_session.then(|| session_id.to_string()),
        messages: None,
        action: None,
    };

    let response = DetectIntentResponse::deserialize(reply).unwrap_or_default();
    let Some(entries) = response.query_result.and_then(|q| q.response_messages) else {
        return parsed;
    };

    let mut messages = Vec::new();
    for entry in &entries {
        let message = match ResponseMessage::deserialize(entry) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("dialogflow: skipping response message: {}", e);
                continue;
            }
        };
        if let Some(text) = message.text {
            match text.text.into_iter().next() {
                Some(first) => messages.push(MessageItem::Text(first)),
                None => log::debug!("dialogflow: text message without alternatives"),
            }
        }
        if let Some(payload) = message.payload {
            apply_payload(&payload, capabilities, &mut messages, &mut parsed.action);
        }
    }

    if !messages.is_empty() {
        parsed.messages = Some(messages);
    }
    parsed
}

fn apply_payload(
    payload: &Payload,
    capabilities: Capabilities,
    messages: &mut Vec<MessageItem>,
    action: &mut Option<Action>,
) {
    if capabilities.rich_cards {
        messages.extend(
            payload
                .rich_content_items()
                .filter(|item| item.typ.as_deref() == Some("info"))
                .map(|item| MessageItem::Card(info_card(item))),
        );
    }
    if let Some(quick_replies) = payload.quick_replies.as_ref().and_then(quick_replies) {
        messages.push(MessageItem::QuickReplies(quick_replies));
    }
    if payload.livechat.as_ref().is_some_and(is_truthy) {
        *action = Some(Action::LivechatTransfer);
    }
    if payload.close_chat.as_ref().is_some_and(is_truthy) {
        *action = Some(Action::CloseChat);
    }
}

fn info_card(item: RichContentItem) -> InfoCard {
    InfoCard {
        title: item.title.unwrap_or_default(),
        subtitle: item.subtitle.unwrap_or_default(),
        image_url: item
            .image
            .and_then(|i| i.src)
            .and_then(|s| s.raw_url)
            .unwrap_or_default(),
        buttons: item
            .action_link
            .map(|link| CardButton {
                text: link.text.unwrap_or_default(),
                postback: link.link.unwrap_or_default(),
            })
            .into_iter()
            .collect(),
    }
}

/// Quick replies count only with a non-empty prompt and at least one option.
fn quick_replies(value: &Value) -> Option<QuickReplies> {
    let q = QuickReplies::deserialize(value).ok()?;
    if q.text.is_empty() || q.options.is_empty() {
        return None;
    }
    Some(q)
}

/// JSON truthiness: null, false, 0, and "" are false; everything else, including `{}` and `[]`, is true.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(reply: Value) -> ParsedMessage {
        parse_request(&reply, "sess-1", Capabilities::base())
    }

    fn parse_ext(reply: Value) -> ParsedMessage {
        parse_request(&reply, "sess-1", Capabilities::extended())
    }

    fn reply(messages: Value) -> Value {
        json!({ "queryResult": { "responseMessages": messages } })
    }

    #[test]
    fn empty_reply_is_minimal() {
        for raw in [json!({}), json!({ "queryResult": {} }), json!(null), json!("junk")] {
            let parsed = parse(raw);
            assert_eq!(parsed, ParsedMessage::default());
            assert_eq!(serde_json::to_value(&parsed).unwrap(), json!({ "isFallback": false }));
        }
    }

    #[test]
    fn extended_echoes_session_even_when_empty() {
        let parsed = parse_ext(json!({}));
        assert_eq!(parsed.session_id.as_deref(), Some("sess-1"));
        assert!(parsed.messages.is_none());
        assert!(!parsed.is_fallback);
    }

    #[test]
    fn text_uses_first_alternative() {
        let parsed = parse(reply(json!([{ "text": { "text": ["hi", "hello"] } }])));
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!({ "isFallback": false, "messages": ["hi"] })
        );
    }

    #[test]
    fn text_without_alternatives_is_skipped() {
        let parsed = parse(reply(json!([{ "text": { "text": [] } }])));
        assert!(parsed.messages.is_none());
    }

    #[test]
    fn info_card_defaults() {
        let parsed = parse_ext(reply(json!([{
            "payload": { "richContent": [[{ "type": "info", "title": "T", "subtitle": "S" }]] }
        }])));
        assert_eq!(
            parsed.messages(),
            &[MessageItem::Card(InfoCard {
                title: "T".into(),
                subtitle: "S".into(),
                image_url: String::new(),
                buttons: vec![],
            })]
        );
    }

    #[test]
    fn info_card_with_image_and_link() {
        let parsed = parse_ext(reply(json!([{
            "payload": { "richContent": [[
                { "type": "description", "title": "ignored" },
                {
                    "type": "info",
                    "title": "Docs",
                    "subtitle": "Read more",
                    "image": { "src": { "rawUrl": "https://img/x.png" } },
                    "actionLink": { "text": "Open", "link": "https://docs" }
                }
            ]] }
        }])));
        let card = match parsed.messages() {
            [MessageItem::Card(card)] => card.clone(),
            other => panic!("unexpected items: {:?}", other),
        };
        assert_eq!(card.image_url, "https://img/x.png");
        assert_eq!(
            card.buttons,
            vec![CardButton {
                text: "Open".into(),
                postback: "https://docs".into()
            }]
        );
    }

    #[test]
    fn base_capabilities_ignore_rich_content() {
        let parsed = parse(reply(json!([{
            "payload": { "richContent": [[{ "type": "info", "title": "T" }]] }
        }])));
        assert!(parsed.messages.is_none());
        assert!(parsed.session_id.is_none());
    }

    #[test]
    fn quick_replies_pass_through_unchanged() {
        let qr = json!({ "text": "Pick one", "options": ["a", "b"], "buttonStyle": "pill" });
        let parsed = parse(reply(json!([{ "payload": { "quickReplies": qr.clone() } }])));
        assert_eq!(serde_json::to_value(parsed.messages()).unwrap(), json!([qr]));
    }

    #[test]
    fn quick_replies_require_text_and_options() {
        for qr in [
            json!({ "text": "Pick one" }),
            json!({ "options": ["a"] }),
            json!({ "text": "", "options": ["a"] }),
            json!({ "text": "Pick one", "options": [] }),
        ] {
            let parsed = parse(reply(json!([{ "payload": { "quickReplies": qr } }])));
            assert!(parsed.messages.is_none());
        }
    }

    #[test]
    fn signals_last_one_wins() {
        let parsed = parse(reply(json!([
            { "payload": { "livechat": true } },
            { "payload": { "closeChat": true } }
        ])));
        assert_eq!(parsed.action, Some(Action::CloseChat));

        let parsed = parse(reply(json!([
            { "payload": { "closeChat": true } },
            { "payload": { "livechat": { "department": "sales" } } }
        ])));
        assert_eq!(parsed.action, Some(Action::LivechatTransfer));
        assert!(parsed.messages.is_none());
    }

    #[test]
    fn close_chat_wins_within_one_payload() {
        let parsed = parse(reply(json!([{ "payload": { "livechat": 1, "closeChat": "yes" } }])));
        assert_eq!(parsed.action, Some(Action::CloseChat));
    }

    #[test]
    fn falsy_signals_are_ignored() {
        let parsed = parse(reply(json!([
            { "payload": { "livechat": false, "closeChat": 0 } },
            { "payload": { "livechat": "", "closeChat": null } }
        ])));
        assert!(parsed.action.is_none());
    }

    #[test]
    fn order_is_preserved_across_entries() {
        let parsed = parse_ext(reply(json!([
            { "text": { "text": ["A"] } },
            { "payload": { "richContent": [[{ "type": "info", "title": "B", "subtitle": "" }]] } },
            { "text": { "text": ["C"] } }
        ])));
        let items = parsed.messages();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], MessageItem::Text("A".into()));
        assert!(matches!(&items[1], MessageItem::Card(c) if c.title == "B"));
        assert_eq!(items[2], MessageItem::Text("C".into()));
    }

    #[test]
    fn cards_come_before_quick_replies_in_one_payload() {
        let parsed = parse_ext(reply(json!([{
            "payload": {
                "quickReplies": { "text": "Q", "options": ["x"] },
                "richContent": [[{ "type": "info", "title": "R1" }], [{ "type": "info", "title": "R2" }]]
            }
        }])));
        let items = parsed.messages();
        assert!(matches!(&items[0], MessageItem::Card(c) if c.title == "R1"));
        assert!(matches!(&items[1], MessageItem::Card(c) if c.title == "R2"));
        assert!(matches!(&items[2], MessageItem::QuickReplies(q) if q.text == "Q"));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let parsed = parse_ext(reply(json!([
            { "text": { "text": [42] } },
            { "payload": { "richContent": "nope" } },
            { "payload": { "richContent": [["not an item", { "type": "info", "title": 5 }]] } },
            { "conversationSuccess": {} },
            { "text": { "text": ["ok"] } }
        ])));
        assert_eq!(parsed.messages(), &[MessageItem::Text("ok".into())]);
    }

    #[test]
    fn parse_is_deterministic() {
        let raw = reply(json!([
            { "text": { "text": ["A"] } },
            { "payload": { "quickReplies": { "text": "Q", "options": ["x"] }, "livechat": true } }
        ]));
        let before = raw.clone();
        let first = parse_ext(raw.clone());
        let second = parse_ext(raw.clone());
        assert_eq!(first, second);
        assert_eq!(raw, before);
    }
}
