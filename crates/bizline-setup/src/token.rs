//! Per-instance handshake token.
//!
//! Every mutating request must echo this token in the [`TOKEN_HEADER`]
//! header. It is generated once per server, embedded only in the page that
//! server renders, and never persisted.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Header carrying the handshake token.
pub const TOKEN_HEADER: &str = "x-setup-token";

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Random secret authorizing mutating requests for one server instance.
#[derive(Clone)]
pub struct HandshakeToken(String);

impl HandshakeToken {
    /// Generate a fresh token from the thread CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// The encoded token, for embedding in the linking page.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compare a candidate against this token in constant time.
    pub fn verify(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();
        if expected.len() != candidate.len() {
            return false;
        }
        expected.ct_eq(candidate).into()
    }
}

impl std::fmt::Debug for HandshakeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HandshakeToken(***)")
    }
}
