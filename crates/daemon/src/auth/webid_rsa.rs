//! WebID-RSA challenge-response
//!
//! The engine's 401 challenge hands out a nonce token. The client answers
//! with `Authorization: WebID-RSA source="...", username="...",
//! nonce="...", sig="..."` where `sig` is an RSA-PKCS#1v1.5 signature over
//! SHA-1(source + username + nonce), made with a key declared in the
//! claimed WebID profile (`cert:modulus`/`cert:exponent`).

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::ns::cert;
use common::prelude::Graph;
use oxrdf::{NamedNode, Subject, Term};
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};

use crate::service_state::State;

const CHALLENGE_TOKEN_TYPE: &str = "WWW-Authenticate";

#[derive(Debug, thiserror::Error)]
pub enum RsaAuthError {
    #[error("malformed Authorization header")]
    Malformed,
    #[error("bad source URI for auth token")]
    BadSource,
    #[error("invalid or expired nonce")]
    BadNonce,
    #[error("no usable RSA key in profile")]
    NoKeys,
    #[error("signature verification failed")]
    BadSignature,
}

#[derive(Debug, PartialEq)]
pub struct RsaAuthorization {
    pub source: String,
    pub username: String,
    pub nonce: String,
    pub signature: String,
}

/// Parse a `WebID-RSA` Authorization header into its fields.
pub fn parse_authorization(header: &str) -> Option<RsaAuthorization> {
    let (scheme, rest) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("WebID-RSA") {
        return None;
    }
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for part in rest.split(", ") {
        let (key, value) = part.split_once('=')?;
        fields.insert(key.trim(), value.trim().trim_matches(|c| c == '"' || c == ','));
    }
    let field = |name: &str| fields.get(name).copied().unwrap_or("").to_string();
    Some(RsaAuthorization {
        source: field("source"),
        username: field("username"),
        nonce: field("nonce"),
        signature: field("sig"),
    })
}

/// Verify a challenge response and return the proven WebID.
pub async fn authenticate(
    state: &State,
    base_uri: &str,
    header: &str,
) -> Result<String, RsaAuthError> {
    let auth = parse_authorization(header).ok_or(RsaAuthError::Malformed)?;
    if auth.username.is_empty() || auth.nonce.is_empty() || auth.signature.is_empty() {
        return Err(RsaAuthError::Malformed);
    }
    // a claimed source must be us, not a relaying attacker
    if !auth.source.is_empty() && auth.source != base_uri {
        return Err(RsaAuthError::BadSource);
    }
    state
        .keyring()
        .open(CHALLENGE_TOKEN_TYPE, &auth.nonce)
        .map_err(|_| RsaAuthError::BadNonce)?;

    let profile = state.profiles().load(&auth.username).await;
    let keys = profile_rsa_keys(&profile, &auth.username);
    if keys.is_empty() {
        return Err(RsaAuthError::NoKeys);
    }

    let claim = Sha1::digest(format!("{}{}{}", auth.source, auth.username, auth.nonce));
    let signature = BASE64
        .decode(auth.signature.as_bytes())
        .map_err(|_| RsaAuthError::Malformed)?;

    for key in keys {
        if key
            .verify(Pkcs1v15Sign::new::<Sha1>(), &claim, &signature)
            .is_ok()
        {
            return Ok(auth.username);
        }
    }
    Err(RsaAuthError::BadSignature)
}

/// RSA public keys declared by `webid`'s profile.
pub(super) fn profile_rsa_keys(profile: &Graph, webid: &str) -> Vec<RsaPublicKey> {
    let Ok(agent) = NamedNode::new(webid) else {
        return Vec::new();
    };

    let mut keys = Vec::new();
    for t in profile.all(Some(agent.as_ref().into()), Some(cert::KEY), None) {
        let key_node: Subject = match t.object {
            Term::NamedNode(n) => n.into(),
            Term::BlankNode(b) => b.into(),
            _ => continue,
        };
        let Some((modulus, exponent)) = key_parameters(profile, &key_node) else {
            continue;
        };
        if let Ok(key) = RsaPublicKey::new(
            BigUint::from_bytes_be(&modulus),
            BigUint::from(exponent),
        ) {
            keys.push(key);
        }
    }
    keys
}

/// `cert:modulus` (hex literal) and `cert:exponent` (integer literal) of a
/// key node.
pub(super) fn key_parameters(profile: &Graph, key_node: &Subject) -> Option<(Vec<u8>, u64)> {
    let modulus = profile.one(Some(key_node.as_ref()), Some(cert::MODULUS), None)?;
    let Term::Literal(modulus) = modulus.object else {
        return None;
    };
    let hex_digits: String = modulus
        .value()
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect();
    let modulus = hex::decode(&hex_digits).ok()?;

    let exponent = profile.one(Some(key_node.as_ref()), Some(cert::EXPONENT), None)?;
    let Term::Literal(exponent) = exponent.object else {
        return None;
    };
    let exponent: u64 = exponent.value().trim().parse().ok()?;

    Some((modulus, exponent))
}
