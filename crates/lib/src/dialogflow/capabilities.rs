//! Optional dispatcher behaviors.

use serde::{Deserialize, Serialize};

/// Feature switches for one dispatcher. The base set sends plain utterances and maps text
/// and quick replies only; the extended set adds named events, info cards, and session echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Capabilities {
    /// Allow `DialogflowRequest::Event`.
    pub events: bool,
    /// Map `richContent` info items to cards.
    pub rich_cards: bool,
    /// Copy the caller's session id into `ParsedMessage::session_id`.
    pub echo_session: bool,
}

impl Capabilities {
    pub const fn base() -> Self {
        Self {
            events: false,
            rich_cards: false,
            echo_session: false,
        }
    }

    pub const fn extended() -> Self {
        Self {
            events: true,
            rich_cards: true,
            echo_session: true,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::extended()
    }
}
