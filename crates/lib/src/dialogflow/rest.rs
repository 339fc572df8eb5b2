//! Dialogflow CX REST client (https://{location}-dialogflow.googleapis.com/v3).
//!
//! Each connected client signs a service-account JWT, exchanges it for an access token,
//! and then issues `detectIntent`. Nothing is cached between calls.

use super::transport::{ServiceAccount, SessionsClient, SessionsConnector, TransportError};
use super::types::DetectIntentRequest;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const API_VERSION: &str = "v3";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Connector for the public REST API. Base URL and token URI can be pointed elsewhere for tests.
#[derive(Clone)]
pub struct RestConnector {
    http: reqwest::Client,
    base_url: Option<String>,
    token_uri: String,
}

impl Default for RestConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl RestConnector {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: None,
            token_uri: TOKEN_URI.to_string(),
        }
    }

    /// Use this base URL instead of `https://{api_endpoint}`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }
}

impl SessionsConnector for RestConnector {
    fn connect(
        &self,
        api_endpoint: &str,
        account: ServiceAccount,
    ) -> Result<Box<dyn SessionsClient>, TransportError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| TransportError::Auth(format!("invalid private key: {}", e)))?;
        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", api_endpoint));
        Ok(Box::new(RestSessionsClient {
            http: self.http.clone(),
            base_url,
            token_uri: self.token_uri.clone(),
            client_email: account.client_email,
            key,
        }))
    }
}

struct RestSessionsClient {
    http: reqwest::Client,
    base_url: String,
    token_uri: String,
    client_email: String,
    key: EncodingKey,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
}

impl RestSessionsClient {
    /// POST the signed assertion to the token endpoint.
    async fn access_token(&self) -> Result<String, TransportError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| TransportError::Auth(format!("signing assertion: {}", e)))?;
        let res = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(e) => match e.error_description {
                    Some(d) => format!("{}: {}", e.error, d),
                    None => e.error,
                },
                Err(_) => body,
            };
            return Err(TransportError::Auth(format!("{} {}", status, detail)));
        }
        let token: TokenResponse = res.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl SessionsClient for RestSessionsClient {
    /// POST /v3/{session}:detectIntent
    async fn detect_intent(
        &self,
        request: &DetectIntentRequest,
    ) -> Result<serde_json::Value, TransportError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/{}/{}:detectIntent",
            self.base_url, API_VERSION, request.session
        );
        let res = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(request)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<GoogleErrorResponse>(&body)
                .ok()
                .map(|e| e.error.message)
                .filter(|m| !m.is_empty())
                .unwrap_or(body);
            return Err(TransportError::Api(format!("{} {}", status, detail)));
        }
        Ok(res.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_malformed_key() {
        let account = ServiceAccount {
            client_email: "bot@example.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
        };
        let err = match RestConnector::new().connect("global-dialogflow.googleapis.com", account) {
            Ok(_) => panic!("expected an error for a malformed key"),
            Err(e) => e,
        };
        assert!(matches!(err, TransportError::Auth(_)));
        assert!(err.to_string().contains("invalid private key"));
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let c = RestConnector::new().with_base_url("http://127.0.0.1:9/");
        assert_eq!(c.base_url.as_deref(), Some("http://127.0.0.1:9"));
    }
}
