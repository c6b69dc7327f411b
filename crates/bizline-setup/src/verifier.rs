//! Live credential verification against the messaging API.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

/// Bot identity returned by a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotInfo {
    pub display_name: String,
    pub id: String,
}

/// Why a candidate token was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The API answered and refused the token.
    #[error("token rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The API could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with something unexpected.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for VerifyError {
    fn from(e: reqwest::Error) -> Self {
        VerifyError::Network(e.to_string())
    }
}

/// Confirms a bearer token is currently valid.
#[async_trait]
pub trait AccountVerifier: Send + Sync + std::fmt::Debug {
    async fn get_account_info(&self, token: &str) -> Result<BotInfo, VerifyError>;
}

/// Shared verifier for use across async contexts.
pub type SharedVerifier = Arc<dyn AccountVerifier>;

// ============================================================================
// HttpVerifier
// ============================================================================

/// Path of the bot-info endpoint relative to the API base.
const BOT_INFO_PATH: &str = "/v2/bot/info";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BotInfoResponse {
    display_name: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    basic_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Verifier calling the messaging API's bot-info endpoint.
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVerifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AccountVerifier for HttpVerifier {
    async fn get_account_info(&self, token: &str) -> Result<BotInfo, VerifyError> {
        let url = format!("{}{}", self.base_url, BOT_INFO_PATH);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| VerifyError::Network(format!("bot info request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or_else(|_| {
                    if text.is_empty() {
                        status.canonical_reason().unwrap_or("unknown error").to_string()
                    } else {
                        text
                    }
                });
            tracing::debug!(status = status.as_u16(), "Bot info request rejected");
            return Err(VerifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let info: BotInfoResponse = response
            .json()
            .await
            .map_err(|e| VerifyError::InvalidResponse(format!("bot info: {}", e)))?;

        let id = info.user_id.or(info.basic_id).unwrap_or_default();
        Ok(BotInfo {
            display_name: info.display_name,
            id,
        })
    }
}

// ============================================================================
// MockVerifier (for testing)
// ============================================================================

/// In-memory verifier accepting a fixed set of tokens.
#[derive(Debug, Default)]
pub struct MockVerifier {
    accepted: HashMap<String, BotInfo>,
    calls: AtomicU32,
}

impl MockVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as belonging to the named bot.
    pub fn accept(mut self, token: &str, display_name: &str, id: &str) -> Self {
        self.accepted.insert(
            token.to_string(),
            BotInfo {
                display_name: display_name.to_string(),
                id: id.to_string(),
            },
        );
        self
    }

    /// Number of verification round trips performed.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountVerifier for MockVerifier {
    async fn get_account_info(&self, token: &str) -> Result<BotInfo, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accepted
            .get(token)
            .cloned()
            .ok_or_else(|| VerifyError::Rejected {
                status: 401,
                message: "Authentication failed".to_string(),
            })
    }
}
