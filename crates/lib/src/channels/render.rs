//! Plain-text rendering of reply items for channels without rich widgets.

use crate::dialogflow::MessageItem;

/// Render one item as text. Cards become title/subtitle/image/link lines; quick replies
/// become the prompt followed by numbered options.
pub fn render_plain(item: &MessageItem) -> String {
    match item {
        MessageItem::Text(text) => text.clone(),
        MessageItem::Card(card) => {
            let mut lines: Vec<String> = [&card.title, &card.subtitle, &card.image_url]
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .collect();
            for b in &card.buttons {
                if b.text.is_empty() {
                    lines.push(b.postback.clone());
                } else {
                    lines.push(format!("{}: {}", b.text, b.postback));
                }
            }
            lines.join("\n")
        }
        MessageItem::QuickReplies(q) => {
            let mut out = q.text.clone();
            for (i, label) in q.labels().iter().enumerate() {
                out.push_str(&format!("\n  {}) {}", i + 1, label));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogflow::{CardButton, InfoCard, QuickReplies};

    #[test]
    fn card_skips_empty_fields() {
        let card = MessageItem::Card(InfoCard {
            title: "Opening hours".into(),
            subtitle: String::new(),
            image_url: String::new(),
            buttons: vec![CardButton {
                text: "See more".into(),
                postback: "https://example.com/hours".into(),
            }],
        });
        assert_eq!(
            render_plain(&card),
            "Opening hours\nSee more: https://example.com/hours"
        );
    }

    #[test]
    fn quick_replies_are_numbered() {
        let q = MessageItem::QuickReplies(QuickReplies {
            text: "Pick".into(),
            options: vec!["yes".into(), "no".into()],
            extra: Default::default(),
        });
        assert_eq!(render_plain(&q), "Pick\n  1) yes\n  2) no");
    }
}
