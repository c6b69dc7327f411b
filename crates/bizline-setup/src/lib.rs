//! Browser-based account linking for the bizline messaging CLI.
//!
//! Runs a short-lived loopback HTTP server that lets the operator paste a
//! channel access token into a local page, checks it live against the
//! messaging API, and saves it to the credential store.
//!
//! # Components
//!
//! - [`server`]: bind, serve and shut down one handshake
//! - `routes`: the HTTP surface and its handshake-token guard
//! - [`token`]: per-instance handshake token
//! - [`verifier`]: live token verification against the messaging API
//! - [`api`]: typed request and response bodies
//! - [`pages`]: HTML templates

pub mod api;
pub mod browser;
pub mod error;
pub mod pages;
mod routes;
pub mod server;
mod state;
pub mod token;
pub mod verifier;

pub use error::{ApiError, Result, SetupError};
pub use server::{BoundSetupServer, SetupConfig, SetupServer};
pub use state::SetupResult;
pub use token::{HandshakeToken, TOKEN_HEADER};
pub use verifier::{AccountVerifier, BotInfo, HttpVerifier, MockVerifier, SharedVerifier, VerifyError};
