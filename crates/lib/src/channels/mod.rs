//! Communication channels (e.g. Telegram).
//!
//! Channel trait and registry so the bridge can start/stop channel connectors
//! and deliver normalized agent replies. Inbound messages are sent to the bridge for dispatch.

mod inbound;
mod registry;
mod render;
mod telegram;

pub use inbound::InboundMessage;
pub use registry::{ChannelError, ChannelHandle, ChannelRegistry};
pub use render::render_plain;
pub use telegram::TelegramChannel;
