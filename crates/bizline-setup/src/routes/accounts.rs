//! Account listing and management handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use super::Authorized;
use crate::api::{AccountNameRequest, AccountsResponse, ActionResponse, ValidJson};
use crate::state::SetupState;

/// GET /accounts
pub(super) async fn list_accounts_handler(
    State(state): State<Arc<SetupState>>,
) -> Json<AccountsResponse> {
    match state.store.list().await {
        Ok(accounts) => Json(AccountsResponse {
            accounts: accounts.into_iter().map(Into::into).collect(),
            error: None,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list accounts");
            Json(AccountsResponse {
                accounts: Vec::new(),
                error: Some(format!("Failed to list accounts: {}", e)),
            })
        }
    }
}

/// POST /set-primary
pub(super) async fn set_primary_handler(
    _auth: Authorized,
    State(state): State<Arc<SetupState>>,
    ValidJson(req): ValidJson<AccountNameRequest>,
) -> Json<ActionResponse> {
    let Some(_open) = state.writes.enter().await else {
        return Json(ActionResponse::failed("Setup server is shutting down"));
    };
    match state.store.set_primary(&req.name).await {
        Ok(()) => Json(ActionResponse::ok()),
        Err(e) => Json(ActionResponse::failed(e.to_string())),
    }
}

/// POST /remove-account
pub(super) async fn remove_account_handler(
    _auth: Authorized,
    State(state): State<Arc<SetupState>>,
    ValidJson(req): ValidJson<AccountNameRequest>,
) -> Json<ActionResponse> {
    let Some(_open) = state.writes.enter().await else {
        return Json(ActionResponse::failed("Setup server is shutting down"));
    };
    match state.store.delete(&req.name).await {
        Ok(()) => Json(ActionResponse::ok()),
        Err(e) => Json(ActionResponse::failed(e.to_string())),
    }
}
