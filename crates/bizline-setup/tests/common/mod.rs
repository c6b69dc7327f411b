//! Common test utilities for setup server integration tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bizline_credentials::{CredentialStore, MemoryVault};
use bizline_setup::{
    MockVerifier, SetupConfig, SetupResult, SetupServer, SharedVerifier, TOKEN_HEADER,
};
use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A setup server running in the background.
pub struct TestSetup {
    /// Root URL, with trailing slash.
    pub url: String,
    /// Handshake token for this instance.
    pub token: String,
    /// Store the server writes to.
    pub store: CredentialStore,
    pub client: Client,
    /// Cancels the caller's wait.
    pub cancel: CancellationToken,
    handle: JoinHandle<bizline_setup::Result<SetupResult>>,
}

impl TestSetup {
    /// Start a server whose verifier accepts `tok-A` and `tok-B`.
    pub async fn start() -> Result<Self> {
        Self::start_with_store(CredentialStore::new(Arc::new(MemoryVault::new()))).await
    }

    pub async fn start_with_store(store: CredentialStore) -> Result<Self> {
        let verifier = Arc::new(
            MockVerifier::new()
                .accept("tok-A", "Shop Bot", "U-A")
                .accept("tok-B", "Other Bot", "U-B"),
        );
        Self::start_with(store, verifier, Duration::from_secs(2)).await
    }

    /// Start a server with a custom verifier and grace period.
    pub async fn start_with(
        store: CredentialStore,
        verifier: SharedVerifier,
        grace_period: Duration,
    ) -> Result<Self> {
        let config = SetupConfig::default()
            .with_open_browser(false)
            .with_grace_period(grace_period);

        let bound = SetupServer::new(store.clone(), verifier)
            .with_config(config)
            .bind()
            .await?;
        let url = bound.url();
        let token = bound.token().expose().to_string();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(bound.run(cancel.clone()));

        Ok(Self {
            url,
            token,
            store,
            client: Client::new(),
            cancel,
            handle,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path.trim_start_matches('/'))
    }

    /// POST a JSON body carrying the handshake token.
    pub async fn post(&self, path: &str, body: Value) -> Result<(u16, Value)> {
        let resp = self
            .client
            .post(self.endpoint(path))
            .header(TOKEN_HEADER, &self.token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status().as_u16();
        Ok((status, resp.json().await?))
    }

    pub async fn get_json(&self, path: &str) -> Result<Value> {
        Ok(self.client.get(self.endpoint(path)).send().await?.json().await?)
    }

    /// Wait for the handshake outcome.
    pub async fn finish(self) -> Result<bizline_setup::Result<SetupResult>> {
        Ok(tokio::time::timeout(Duration::from_secs(10), self.handle).await??)
    }
}
