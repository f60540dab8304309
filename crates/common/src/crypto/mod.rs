//! Cryptographic primitives for loam
//!
//! A single concern lives here: the authenticated token envelope used for
//! session cookies and WWW-Authenticate nonces.
//!
//! # Security Model
//!
//! Tokens are ChaCha20-Poly1305 AEAD ciphertexts over a small JSON map. The
//! token type string is supplied as associated data, so a "Session" token
//! can never be presented where a "WWW-Authenticate" nonce is expected. The
//! `valid` field bounds the lifetime; tampering with any byte fails the
//! Poly1305 tag check.

pub mod envelope;

pub use envelope::{EnvelopeError, Keyring};
