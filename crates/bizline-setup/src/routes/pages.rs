//! Page handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse},
};

use crate::api::SuccessQuery;
use crate::error::ApiError;
use crate::state::SetupState;

/// GET /
pub(super) async fn index_handler(State(state): State<Arc<SetupState>>) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Html(state.index_html.clone()),
    )
}

/// GET /success
pub(super) async fn success_handler(
    State(state): State<Arc<SetupState>>,
    Query(query): Query<SuccessQuery>,
) -> Result<Html<String>, ApiError> {
    state
        .pages
        .render_success(&query.name, &query.bot)
        .map(Html)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to render success page");
            ApiError::Internal("failed to render page".to_string())
        })
}
