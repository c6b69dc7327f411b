//! HTTP surface of the setup server.
//!
//! | Route | Guard |
//! |---|---|
//! | `GET /`, `GET /accounts`, `GET /success` | none |
//! | `POST /complete` | none |
//! | `POST /validate`, `/submit`, `/set-primary`, `/remove-account` | handshake token |

mod accounts;
mod handshake;
mod pages;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::state::SetupState;
use crate::token::TOKEN_HEADER;

/// Build the router for one server instance.
pub(crate) fn router(state: Arc<SetupState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(pages::index_handler))
        .route("/success", get(pages::success_handler))
        .route("/accounts", get(accounts::list_accounts_handler))
        .route("/set-primary", post(accounts::set_primary_handler))
        .route("/remove-account", post(accounts::remove_account_handler))
        .route("/validate", post(handshake::validate_handler))
        .route("/submit", post(handshake::submit_handler))
        .route("/complete", post(handshake::complete_handler))
        .layer(middleware::from_fn_with_state(state.clone(), halt_middleware))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Drops the request once the server has been halted.
///
/// Dropping the handler future abandons any pending verification or store
/// write at its next await point.
async fn halt_middleware(
    State(state): State<Arc<SetupState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    tokio::select! {
        biased;
        _ = state.halt.cancelled() => {
            tracing::debug!(path = %path, "Request dropped by forced shutdown");
            ApiError::Unavailable.into_response()
        }
        response = next.run(request) => response,
    }
}

/// Extractor that admits only requests carrying this instance's token.
///
/// Runs before the body is read, so a rejected request has no effects.
pub(crate) struct Authorized;

impl FromRequestParts<Arc<SetupState>> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<SetupState>,
    ) -> Result<Self, Self::Rejection> {
        let candidate = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if state.token.verify(candidate) {
            Ok(Authorized)
        } else {
            tracing::warn!(path = %parts.uri.path(), "Rejected request with bad setup token");
            Err(ApiError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bizline_credentials::{CredentialStore, Credentials, MemoryVault};
    use serde_json::{Value, json};
    use tokio::sync::oneshot;
    use tower::ServiceExt;

    use crate::pages::Pages;
    use crate::state::SetupResult;
    use crate::token::HandshakeToken;
    use crate::verifier::MockVerifier;

    struct Harness {
        state: Arc<SetupState>,
        store: CredentialStore,
        verifier: Arc<MockVerifier>,
        result_rx: oneshot::Receiver<SetupResult>,
    }

    impl Harness {
        fn new() -> Self {
            let store = CredentialStore::new(Arc::new(MemoryVault::new()));
            let verifier = Arc::new(
                MockVerifier::new()
                    .accept("tok-A", "Shop Bot", "U-A")
                    .accept("tok-B", "Other Bot", "U-B"),
            );
            let token = HandshakeToken::generate();
            let pages = Pages::new().unwrap();
            let index_html = pages.render_index(token.expose()).unwrap();
            let (tx, result_rx) = oneshot::channel();
            let state = Arc::new(SetupState::new(
                store.clone(),
                verifier.clone(),
                token,
                pages,
                index_html,
                tx,
            ));
            Self {
                state,
                store,
                verifier,
                result_rx,
            }
        }

        fn token(&self) -> String {
            self.state.token.expose().to_string()
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = router(self.state.clone(), Duration::from_secs(5))
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }

        async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
            let mut builder = Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json");
            if let Some(token) = token {
                builder = builder.header(TOKEN_HEADER, token);
            }
            self.send(builder.body(Body::from(body.to_string())).unwrap())
                .await
        }

        async fn get(&self, path: &str) -> (StatusCode, Value) {
            self.send(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
        }
    }

    #[tokio::test]
    async fn test_submit_on_empty_store_creates_primary() {
        let h = Harness::new();
        let token = h.token();
        let (status, body) = h
            .post(
                "/submit",
                Some(&token),
                json!({"account_name": "shop1", "access_token": "tok-A"}),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "account_name": "shop1", "bot_name": "Shop Bot"})
        );
        let accounts = h.store.list().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert!(accounts[0].is_primary);
        assert_eq!(h.store.get("shop1").await.unwrap().bearer_token, "tok-A");
    }

    #[tokio::test]
    async fn test_second_submit_keeps_existing_primary() {
        let h = Harness::new();
        h.store
            .set("shop1", Credentials::bearer("tok-A"), "Shop Bot")
            .await
            .unwrap();

        let token = h.token();
        let (_, body) = h
            .post(
                "/submit",
                Some(&token),
                json!({"account_name": "shop2", "access_token": "tok-B"}),
            )
            .await;
        assert_eq!(body["success"], true);

        let accounts = h.store.list().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert!(accounts.iter().find(|a| a.name == "shop1").unwrap().is_primary);
        assert!(!accounts.iter().find(|a| a.name == "shop2").unwrap().is_primary);
    }

    #[tokio::test]
    async fn test_submit_verifies_even_after_validate() {
        let h = Harness::new();
        let token = h.token();
        let body = json!({"account_name": "shop", "access_token": "tok-A"});
        h.post("/validate", Some(&token), body.clone()).await;
        h.post("/submit", Some(&token), body).await;
        assert_eq!(h.verifier.call_count(), 2);
    }

    #[tokio::test]
    async fn test_submit_normalizes_account_name() {
        let h = Harness::new();
        let token = h.token();
        let (_, body) = h
            .post(
                "/submit",
                Some(&token),
                json!({"account_name": "  Shop1 ", "access_token": "tok-A"}),
            )
            .await;
        assert_eq!(body["account_name"], "shop1");
    }

    #[tokio::test]
    async fn test_mutating_endpoints_require_token() {
        let h = Harness::new();
        h.store
            .set("keep", Credentials::bearer("tok-A"), "Shop Bot")
            .await
            .unwrap();
        let before = h.store.list().await.unwrap();

        let cases = [
            ("/submit", json!({"account_name": "evil", "access_token": "tok-A"})),
            ("/validate", json!({"account_name": "evil", "access_token": "tok-A"})),
            ("/set-primary", json!({"name": "keep"})),
            ("/remove-account", json!({"name": "keep"})),
        ];

        for (path, body) in cases {
            for header in [None, Some("wrong-token")] {
                let (status, resp) = h.post(path, header, body.clone()).await;
                assert_eq!(status, StatusCode::FORBIDDEN, "{path} with {header:?}");
                assert_eq!(resp["success"], false);
            }
        }

        assert_eq!(h.store.list().await.unwrap(), before);
        assert_eq!(h.verifier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_token_checked_before_body() {
        let h = Harness::new();
        let request = Request::builder()
            .method("POST")
            .uri("/submit")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = h.send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_rejected() {
        let h = Harness::new();
        let token = h.token();

        let request = Request::builder()
            .method("POST")
            .uri("/submit")
            .header("content-type", "application/json")
            .header(TOKEN_HEADER, &token)
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = h.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = h
            .post("/submit", Some(&token), json!({"access_token": "tok-A"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = h
            .post(
                "/submit",
                Some(&token),
                json!({"account_name": "   ", "access_token": "tok-A"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("account_name"));

        let (status, _) = h
            .post("/set-primary", Some(&token), json!({"name": "a", "extra": true}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(h.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let h = Harness::new();
        let (status, _) = h.get("/submit").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let request = Request::builder()
            .method("POST")
            .uri("/accounts")
            .body(Body::empty())
            .unwrap();
        let (status, _) = h.send(request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_validate_rejection_is_body_level() {
        let h = Harness::new();
        let token = h.token();
        let (status, body) = h
            .post(
                "/validate",
                Some(&token),
                json!({"account_name": "shop", "access_token": "revoked"}),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("verification failed"));
        assert!(h.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validate_never_creates_accounts() {
        let h = Harness::new();
        let token = h.token();
        for access_token in ["tok-A", "bad", "tok-B", "tok-A"] {
            let (status, _) = h
                .post(
                    "/validate",
                    Some(&token),
                    json!({"account_name": "shop", "access_token": access_token}),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        assert!(h.store.list().await.unwrap().is_empty());
        assert_eq!(h.verifier.call_count(), 4);
    }

    #[tokio::test]
    async fn test_validate_success_shape() {
        let h = Harness::new();
        let token = h.token();
        let (_, body) = h
            .post("/validate", Some(&token), json!({"access_token": "tok-A"}))
            .await;
        assert_eq!(body["success"], true);
        assert_eq!(body["bot_name"], "Shop Bot");
        assert_eq!(body["bot_id"], "U-A");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_submit_with_rejected_token_saves_nothing() {
        let h = Harness::new();
        let token = h.token();
        let (status, body) = h
            .post(
                "/submit",
                Some(&token),
                json!({"account_name": "shop", "access_token": "revoked"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(h.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accounts_listing_shape() {
        let h = Harness::new();
        h.store
            .set("shop1", Credentials::bearer("tok-A"), "Shop Bot")
            .await
            .unwrap();

        let (status, body) = h.get("/accounts").await;
        assert_eq!(status, StatusCode::OK);
        let entry = &body["accounts"][0];
        assert_eq!(entry["name"], "shop1");
        assert_eq!(entry["isPrimary"], true);
        assert_eq!(entry["botName"], "Shop Bot");
        assert!(entry["createdAt"].as_str().unwrap().contains('T'));
        assert!(!body.to_string().contains("tok-A"));
    }

    #[tokio::test]
    async fn test_set_primary_and_remove() {
        let h = Harness::new();
        let token = h.token();
        h.store.set("a", Credentials::bearer("1"), "").await.unwrap();
        h.store.set("b", Credentials::bearer("2"), "").await.unwrap();

        let (_, body) = h.post("/set-primary", Some(&token), json!({"name": "b"})).await;
        assert_eq!(body, json!({"success": true}));
        assert_eq!(h.store.get_primary().await.unwrap().as_deref(), Some("b"));

        let (status, body) = h
            .post("/set-primary", Some(&token), json!({"name": "ghost"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("not found"));

        let (_, body) = h
            .post("/remove-account", Some(&token), json!({"name": "a"}))
            .await;
        assert_eq!(body, json!({"success": true}));
        let (_, body) = h
            .post("/remove-account", Some(&token), json!({"name": "a"}))
            .await;
        assert_eq!(body, json!({"success": true}));
        assert_eq!(h.store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_delivers_submitted_result() {
        let mut h = Harness::new();
        let token = h.token();
        h.post(
            "/submit",
            Some(&token),
            json!({"account_name": "shop1", "access_token": "tok-A"}),
        )
        .await;

        let (status, body) = h.post("/complete", None, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
        assert!(h.state.abort.is_cancelled());

        let result = h.result_rx.try_recv().unwrap();
        assert_eq!(result.account_name, "shop1");
        assert_eq!(result.bearer_token, "tok-A");
        assert_eq!(result.bot_label, "Shop Bot");

        let (_, body) = h.post("/complete", None, json!({})).await;
        assert_eq!(body, json!({"success": true}));
    }

    #[tokio::test]
    async fn test_index_page_embeds_token() {
        let h = Harness::new();
        let response = router(h.state.clone(), Duration::from_secs(5))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(&h.token()));
    }

    #[tokio::test]
    async fn test_success_page_renders_query() {
        let h = Harness::new();
        let response = router(h.state.clone(), Duration::from_secs(5))
            .oneshot(
                Request::builder()
                    .uri("/success?name=shop1&bot=Shop%20Bot")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("shop1"));
        assert!(html.contains("Shop Bot"));
    }

    #[tokio::test]
    async fn test_halted_server_drops_requests() {
        let h = Harness::new();
        h.state.halt.cancel();

        let token = h.token();
        let (status, body) = h
            .post(
                "/submit",
                Some(&token),
                json!({"account_name": "late", "access_token": "tok-A"}),
            )
            .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert!(h.store.list().await.unwrap().is_empty());
        assert_eq!(h.verifier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_write_gate_refuses_mutations() {
        let h = Harness::new();
        h.store.set("a", Credentials::bearer("1"), "").await.unwrap();
        h.store.set("b", Credentials::bearer("2"), "").await.unwrap();
        h.state.writes.close().await;

        let token = h.token();
        let (status, body) = h
            .post(
                "/submit",
                Some(&token),
                json!({"account_name": "c", "access_token": "tok-A"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);

        let (_, body) = h.post("/set-primary", Some(&token), json!({"name": "b"})).await;
        assert_eq!(body["success"], false);
        let (_, body) = h
            .post("/remove-account", Some(&token), json!({"name": "a"}))
            .await;
        assert_eq!(body["success"], false);

        assert_eq!(h.store.list().await.unwrap().len(), 2);
        assert_eq!(h.store.get_primary().await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_validate_warns_before_replacing_account() {
        let h = Harness::new();
        h.store
            .set("shop1", Credentials::bearer("old"), "Shop Bot")
            .await
            .unwrap();

        let token = h.token();
        let (_, body) = h
            .post(
                "/validate",
                Some(&token),
                json!({"account_name": "SHOP1", "access_token": "tok-A"}),
            )
            .await;
        assert_eq!(body["success"], true);
        assert!(body["message"].as_str().unwrap().contains("replace the existing account 'shop1'"));

        let (_, body) = h
            .post(
                "/validate",
                Some(&token),
                json!({"account_name": "new-shop", "access_token": "tok-A"}),
            )
            .await;
        assert!(!body["message"].as_str().unwrap().contains("replace"));
        assert_eq!(h.store.get("shop1").await.unwrap().bearer_token, "old");
    }
}
