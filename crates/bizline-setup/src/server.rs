//! Setup server lifecycle.
//!
//! One [`SetupServer`] drives one handshake: bind a loopback port, serve the
//! linking page, wait for the browser to finish (or the caller to give up),
//! then shut the listener down within a bounded grace period.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bizline_credentials::CredentialStore;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::browser;
use crate::error::{Result, SetupError};
use crate::pages::Pages;
use crate::routes;
use crate::state::{SetupResult, SetupState};
use crate::token::HandshakeToken;
use crate::verifier::SharedVerifier;

/// Configuration for the setup server.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    /// Loopback address to bind; the port is always OS-assigned.
    pub bind_host: IpAddr,
    /// Time in-flight requests get after the handshake ends.
    pub grace_period: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Launch the default browser at the linking page.
    pub open_browser: bool,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            grace_period: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            open_browser: true,
        }
    }
}

impl SetupConfig {
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }
}

/// Browser-mediated account-linking server.
#[derive(Debug)]
pub struct SetupServer {
    store: CredentialStore,
    verifier: SharedVerifier,
    config: SetupConfig,
    token: HandshakeToken,
}

impl SetupServer {
    /// Create a server with a fresh handshake token.
    pub fn new(store: CredentialStore, verifier: SharedVerifier) -> Self {
        Self {
            store,
            verifier,
            config: SetupConfig::default(),
            token: HandshakeToken::generate(),
        }
    }

    pub fn with_config(mut self, config: SetupConfig) -> Self {
        self.config = config;
        self
    }

    pub fn token(&self) -> &HandshakeToken {
        &self.token
    }

    /// Bind the listener and render the linking page without serving yet.
    pub async fn bind(self) -> Result<BoundSetupServer> {
        if !self.config.bind_host.is_loopback() {
            return Err(SetupError::Bind(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a loopback address", self.config.bind_host),
            )));
        }

        let pages = Pages::new()?;
        let index_html = pages.render_index(self.token.expose())?;

        let listener = TcpListener::bind(SocketAddr::new(self.config.bind_host, 0))
            .await
            .map_err(SetupError::Bind)?;
        let local_addr = listener.local_addr().map_err(SetupError::Bind)?;

        let (result_tx, result_rx) = oneshot::channel();
        let state = Arc::new(SetupState::new(
            self.store,
            self.verifier,
            self.token,
            pages,
            index_html,
            result_tx,
        ));

        Ok(BoundSetupServer {
            listener,
            local_addr,
            state,
            config: self.config,
            result_rx,
        })
    }

    /// Run a complete handshake.
    ///
    /// Returns the saved account, or a cancellation error when `cancel`
    /// fires or the browser finishes without saving anything.
    pub async fn start(self, cancel: CancellationToken) -> Result<SetupResult> {
        self.bind().await?.run(cancel).await
    }
}

/// A setup server whose port is bound but not yet serving.
#[derive(Debug)]
pub struct BoundSetupServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<SetupState>,
    config: SetupConfig,
    result_rx: oneshot::Receiver<SetupResult>,
}

/// What woke the waiting caller.
enum Wake {
    Delivered(SetupResult),
    Cancelled,
    Aborted,
    ServerExited(std::result::Result<std::io::Result<()>, JoinError>),
}

impl BoundSetupServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Root URL of the linking page.
    pub fn url(&self) -> String {
        format!("http://{}/", self.local_addr)
    }

    pub fn token(&self) -> &HandshakeToken {
        &self.state.token
    }

    /// Serve until the handshake completes or is cancelled.
    pub async fn run(self, cancel: CancellationToken) -> Result<SetupResult> {
        let url = self.url();
        let BoundSetupServer {
            listener,
            state,
            config,
            mut result_rx,
            ..
        } = self;

        let abort = state.abort.clone();
        let router = routes::router(state.clone(), config.request_timeout);
        let shutdown = abort.clone();
        let mut serve_task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        });
        tracing::info!(url = %url, "Account setup server listening");

        if config.open_browser {
            let target = url.clone();
            // The opener may block until the browser hands off.
            tokio::task::spawn_blocking(move || {
                if let Err(e) = browser::open_url(&target) {
                    tracing::warn!(error = %e, url = %target, "Could not open a browser; open the URL manually");
                }
            });
        }

        let wake = tokio::select! {
            biased;
            delivered = &mut result_rx => match delivered {
                Ok(result) => Wake::Delivered(result),
                Err(_) => Wake::Aborted,
            },
            _ = cancel.cancelled() => Wake::Cancelled,
            _ = abort.cancelled() => Wake::Aborted,
            joined = &mut serve_task => Wake::ServerExited(joined),
        };

        let (outcome, server_running) = match wake {
            Wake::Delivered(result) => (Ok(result), true),
            Wake::Cancelled => {
                tracing::info!("Account setup cancelled by caller");
                (Err(SetupError::Cancelled), true)
            }
            // The result is sent before the abort fires, so it may already be queued.
            Wake::Aborted => match result_rx.try_recv() {
                Ok(result) => (Ok(result), true),
                Err(_) => {
                    tracing::info!("Account setup closed without saving an account");
                    (Err(SetupError::Aborted), true)
                }
            },
            Wake::ServerExited(joined) => {
                let message = match joined {
                    Ok(Ok(())) => "server stopped unexpectedly".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(e) => e.to_string(),
                };
                (Err(SetupError::Server(message)), false)
            }
        };

        abort.cancel();
        if server_running {
            match tokio::time::timeout(config.grace_period, &mut serve_task).await {
                Ok(Ok(Ok(()))) => tracing::debug!("Account setup server stopped"),
                Ok(Ok(Err(e))) => tracing::warn!(error = %e, "Account setup server error during shutdown"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Account setup server task failed"),
                Err(_) => {
                    tracing::warn!(
                        grace_secs = config.grace_period.as_secs_f64(),
                        "Grace period elapsed; forcing setup server closed"
                    );
                    serve_task.abort();
                }
            }
        }

        // Connections run on their own tasks and can outlive the serve loop.
        // Halting drops their handlers; closing the gate waits out any write
        // already under way so none starts after this returns.
        state.halt.cancel();
        state.writes.close().await;

        outcome
    }
}
