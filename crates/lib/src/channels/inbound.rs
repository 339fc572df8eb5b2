//! Inbound message from a channel: delivered to the bridge for session routing and dispatch.

/// A message from a channel to be routed to a Dialogflow session and answered.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel_id: String,
    pub conversation_id: String,
    pub text: String,
}
