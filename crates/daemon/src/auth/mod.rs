//! Multi-mechanism WebID authentication
//!
//! Mechanisms are tried in order: session cookie, WebID-RSA challenge
//! response, WebID-TLS client certificate. The first that produces a WebID
//! wins. Authentication never fails a request: every fallthrough is the
//! anonymous user (empty WebID), and the access control engine decides what
//! anonymity may do.

mod session;
mod webid_rsa;
mod webid_tls;

pub use session::{session_cookie, user_from_cookie, SESSION_COOKIE};
pub use webid_rsa::{parse_authorization, RsaAuthorization};
pub use webid_tls::PeerCertificates;

use http::{Extensions, HeaderMap};

use crate::service_state::State;

/// Result of the authentication pass.
#[derive(Debug, Default)]
pub struct AuthOutcome {
    /// proven WebID; empty for anonymous
    pub user: String,
    /// `Set-Cookie` value re-issuing the session (TLS success only)
    pub set_cookie: Option<String>,
}

/// Resolve the request's WebID.
pub async fn authenticate(
    state: &State,
    headers: &HeaderMap,
    extensions: &Extensions,
    base_uri: &str,
) -> AuthOutcome {
    if let Some(user) = session::user_from_cookie(state.keyring(), headers) {
        tracing::debug!(%user, "cookie authentication successful");
        return AuthOutcome {
            user,
            set_cookie: None,
        };
    }

    if let Some(header) = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        match webid_rsa::authenticate(state, base_uri, header).await {
            Ok(user) => {
                tracing::debug!(%user, "WebID-RSA authentication successful");
                return AuthOutcome {
                    user,
                    set_cookie: None,
                };
            }
            Err(e) => tracing::debug!(error = %e, "WebID-RSA authentication failed"),
        }
    }

    if let Some(peer) = extensions.get::<PeerCertificates>() {
        if let Some(user) = webid_tls::authenticate(state, peer).await {
            tracing::debug!(%user, "WebID-TLS authentication successful");
            let set_cookie =
                session::session_cookie(state.keyring(), &user, state.config().cookie_age);
            return AuthOutcome { user, set_cookie };
        }
    }

    tracing::debug!("unauthenticated user");
    AuthOutcome::default()
}
