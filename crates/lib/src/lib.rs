//! dfbridge: Dialogflow CX dispatcher, reply normalizer, and chat channel bridge
//! used by the `dfbridge` CLI.

pub mod bridge;
pub mod channels;
pub mod config;
pub mod dialogflow;
pub mod init;
pub mod language;
pub mod routing;
