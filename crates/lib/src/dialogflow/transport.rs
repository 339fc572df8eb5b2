//! Seam between the dispatcher and whatever actually talks to Dialogflow.

use super::types::DetectIntentRequest;
use async_trait::async_trait;
use std::fmt;

/// Service account credentials for one call.
#[derive(Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    /// PEM-encoded RSA key with real newlines.
    pub private_key: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("{0}")]
    Api(String),
}

/// A connected sessions client. Lives for one call.
#[async_trait]
pub trait SessionsClient: Send + Sync {
    /// Run one `detectIntent` and return the reply JSON.
    async fn detect_intent(
        &self,
        request: &DetectIntentRequest,
    ) -> Result<serde_json::Value, TransportError>;
}

/// Opens a client for a regional endpoint host (e.g. `europe-west2-dialogflow.googleapis.com`).
pub trait SessionsConnector: Send + Sync {
    fn connect(
        &self,
        api_endpoint: &str,
        account: ServiceAccount,
    ) -> Result<Box<dyn SessionsClient>, TransportError>;
}
