//! Request and response bodies for the linking endpoints.
//!
//! Request bodies reject unknown fields and are validated by
//! [`ValidJson`] before any handler runs.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use bizline_credentials::AccountInfo;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::ApiError;
use crate::verifier::BotInfo;

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Boundary validation for request bodies.
pub trait Validate: Sized {
    /// Normalize and check the body, returning an operator-facing message on failure.
    fn validate(self) -> Result<Self, String>;
}

fn required(field: &str, value: String) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("'{}' is required", field));
    }
    Ok(trimmed.to_string())
}

/// JSON body extractor that maps every decode failure to a 400.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        body.validate().map(ValidJson).map_err(ApiError::Validation)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// POST /validate
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateRequest {
    #[serde(default)]
    pub account_name: Option<String>,
    pub access_token: String,
}

impl Validate for ValidateRequest {
    fn validate(self) -> Result<Self, String> {
        Ok(Self {
            account_name: self
                .account_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            access_token: required("access_token", self.access_token)?,
        })
    }
}

/// POST /submit
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitRequest {
    pub account_name: String,
    pub access_token: String,
}

impl Validate for SubmitRequest {
    fn validate(self) -> Result<Self, String> {
        Ok(Self {
            account_name: required("account_name", self.account_name)?,
            access_token: required("access_token", self.access_token)?,
        })
    }
}

/// POST /set-primary and POST /remove-account
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountNameRequest {
    pub name: String,
}

impl Validate for AccountNameRequest {
    fn validate(self) -> Result<Self, String> {
        Ok(Self {
            name: required("name", self.name)?,
        })
    }
}

/// GET /success query string.
#[derive(Debug, Default, Deserialize)]
pub struct SuccessQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bot: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// One row of GET /accounts. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    pub name: String,
    pub is_primary: bool,
    /// RFC 3339; absent for records that could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub bot_name: String,
}

impl From<AccountInfo> for AccountEntry {
    fn from(info: AccountInfo) -> Self {
        Self {
            name: info.name,
            is_primary: info.is_primary,
            created_at: info.created_at.map(|t| t.to_rfc3339()),
            bot_name: info.bot_label,
        }
    }
}

/// GET /accounts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountsResponse {
    pub accounts: Vec<AccountEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /validate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}

impl ValidateResponse {
    pub fn valid(info: BotInfo) -> Self {
        Self {
            success: true,
            message: Some(format!("Token is valid for {}", info.display_name)),
            error: None,
            bot_name: Some(info.display_name),
            bot_id: Some(info.id),
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            bot_name: None,
            bot_id: None,
        }
    }
}

/// POST /submit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn saved(account_name: String, bot_name: String) -> Self {
        Self {
            success: true,
            account_name: Some(account_name),
            bot_name: Some(bot_name),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            account_name: None,
            bot_name: None,
            error: Some(error.into()),
        }
    }
}

/// POST /set-primary, /remove-account and /complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
