//! State shared between the HTTP handlers and the waiting caller.

use bizline_credentials::CredentialStore;
use parking_lot::Mutex;
use tokio::sync::{RwLock, RwLockReadGuard, oneshot};
use tokio_util::sync::CancellationToken;

use crate::pages::Pages;
use crate::token::HandshakeToken;
use crate::verifier::SharedVerifier;

/// Outcome of a completed handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct SetupResult {
    /// Normalized account name the credentials were saved under.
    pub account_name: String,
    pub bearer_token: String,
    pub bot_label: String,
}

impl std::fmt::Debug for SetupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupResult")
            .field("account_name", &self.account_name)
            .field("bearer_token", &"***")
            .field("bot_label", &self.bot_label)
            .finish()
    }
}

/// Shared state for the setup server.
#[derive(Debug)]
pub(crate) struct SetupState {
    pub store: CredentialStore,
    pub verifier: SharedVerifier,
    pub token: HandshakeToken,
    pub pages: Pages,
    /// Pre-rendered linking page.
    pub index_html: String,
    /// Last successfully saved account, awaiting `/complete`.
    pending: Mutex<Option<SetupResult>>,
    /// One-slot delivery to the waiting caller; taken at most once.
    result_tx: Mutex<Option<oneshot::Sender<SetupResult>>>,
    /// Fired by `/complete` (and by shutdown). Cancelling twice is a no-op.
    pub abort: CancellationToken,
    /// Fired when the grace period runs out; in-flight requests are dropped.
    pub halt: CancellationToken,
    /// Store mutations run inside this gate.
    pub writes: WriteGate,
}

impl SetupState {
    pub fn new(
        store: CredentialStore,
        verifier: SharedVerifier,
        token: HandshakeToken,
        pages: Pages,
        index_html: String,
        result_tx: oneshot::Sender<SetupResult>,
    ) -> Self {
        Self {
            store,
            verifier,
            token,
            pages,
            index_html,
            pending: Mutex::new(None),
            result_tx: Mutex::new(Some(result_tx)),
            abort: CancellationToken::new(),
            halt: CancellationToken::new(),
            writes: WriteGate::default(),
        }
    }

    /// Remember a saved account. A later submission replaces an earlier one.
    pub fn set_pending(&self, result: SetupResult) {
        *self.pending.lock() = Some(result);
    }

    /// Deliver the pending result (if any) and fire the abort signal.
    ///
    /// Returns whether a result was handed to the caller.
    pub fn complete(&self) -> bool {
        let pending = self.pending.lock().take();
        let delivered = match pending {
            Some(result) => match self.result_tx.lock().take() {
                Some(tx) => tx.send(result).is_ok(),
                None => false,
            },
            None => false,
        };
        self.abort.cancel();
        delivered
    }
}

/// Admits store writes until closed.
///
/// Writers hold a read guard for the duration of their write; `close` waits
/// for those to finish, so no write is running or can start once it returns.
#[derive(Debug, Default)]
pub(crate) struct WriteGate {
    closed: RwLock<bool>,
}

impl WriteGate {
    /// Enter the gate, or `None` once it has been closed.
    pub async fn enter(&self) -> Option<RwLockReadGuard<'_, bool>> {
        let guard = self.closed.read().await;
        if *guard { None } else { Some(guard) }
    }

    pub async fn close(&self) {
        *self.closed.write().await = true;
    }
}
