//! Credential verification, submission and completion handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use bizline_credentials::{Credentials, normalize_name};

use super::Authorized;
use crate::api::{
    ActionResponse, SubmitRequest, SubmitResponse, ValidJson, ValidateRequest, ValidateResponse,
};
use crate::state::{SetupResult, SetupState};

/// POST /validate
///
/// Checks the token against the live API. Never writes to the store.
///
/// When an account name is given and already linked, the message warns that
/// submitting will replace it.
pub(super) async fn validate_handler(
    _auth: Authorized,
    State(state): State<Arc<SetupState>>,
    ValidJson(req): ValidJson<ValidateRequest>,
) -> Json<ValidateResponse> {
    match state.verifier.get_account_info(&req.access_token).await {
        Ok(info) => {
            tracing::debug!(bot = %info.display_name, "Token verified");
            let mut response = ValidateResponse::valid(info);
            if let Some(name) = &req.account_name
                && state.store.get_record(name).await.is_ok()
                && let Some(message) = response.message.as_mut()
            {
                message.push_str(&format!(
                    ". Saving will replace the existing account '{}'",
                    normalize_name(name)
                ));
            }
            Json(response)
        }
        Err(e) => {
            tracing::info!(error = %e, "Token verification failed");
            Json(ValidateResponse::invalid(format!(
                "Token verification failed: {}",
                e
            )))
        }
    }
}

/// POST /submit
///
/// Re-verifies the token, then saves it and records the pending result.
pub(super) async fn submit_handler(
    _auth: Authorized,
    State(state): State<Arc<SetupState>>,
    ValidJson(req): ValidJson<SubmitRequest>,
) -> Json<SubmitResponse> {
    let info = match state.verifier.get_account_info(&req.access_token).await {
        Ok(info) => info,
        Err(e) => {
            tracing::info!(error = %e, "Token verification failed on submit");
            return Json(SubmitResponse::failed(format!(
                "Token verification failed: {}",
                e
            )));
        }
    };

    let Some(_open) = state.writes.enter().await else {
        return Json(SubmitResponse::failed("Setup server is shutting down"));
    };

    let credentials = Credentials::bearer(req.access_token.clone());
    if let Err(e) = state
        .store
        .set(&req.account_name, credentials, &info.display_name)
        .await
    {
        tracing::error!(error = %e, "Failed to save account");
        return Json(SubmitResponse::failed(format!(
            "Failed to save credentials: {}",
            e
        )));
    }

    let account_name = normalize_name(&req.account_name);
    state.set_pending(SetupResult {
        account_name: account_name.clone(),
        bearer_token: req.access_token,
        bot_label: info.display_name.clone(),
    });

    tracing::info!(account = %account_name, bot = %info.display_name, "Account linked");
    Json(SubmitResponse::saved(account_name, info.display_name))
}

/// POST /complete
///
/// Hands any pending result to the caller and shuts the server down.
pub(super) async fn complete_handler(State(state): State<Arc<SetupState>>) -> Json<ActionResponse> {
    let delivered = state.complete();
    tracing::debug!(delivered, "Setup completion requested");
    Json(ActionResponse::ok())
}
