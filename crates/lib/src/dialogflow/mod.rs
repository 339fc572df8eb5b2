//! Dialogflow CX: request dispatch and reply normalization.
//!
//! The dispatcher builds a session path and query input from settings, opens a transient
//! client through a [`SessionsConnector`], and hands the single reply to [`parse_request`],
//! which flattens it into a [`ParsedMessage`] a chat channel can render.

mod capabilities;
mod dispatcher;
mod message;
mod parse;
mod rest;
mod transport;
mod types;

pub use capabilities::Capabilities;
pub use dispatcher::{
    api_endpoint, build_query_input, session_path, Dialogflow, DialogflowError, DialogflowEvent,
    DialogflowRequest, REMOTE_ERROR_PREFIX,
};
pub use message::{Action, CardButton, InfoCard, MessageItem, ParsedMessage, QuickReplies};
pub use parse::parse_request;
pub use rest::RestConnector;
pub use transport::{ServiceAccount, SessionsClient, SessionsConnector, TransportError};
pub use types::{DetectIntentRequest, EventInput, QueryInput, TextInput};
