//! Session cookie handling
//!
//! The `Session` cookie is an envelope token carrying the authenticated
//! WebID. It is (re-)issued after a successful TLS authentication and
//! honored first by the authenticator on later requests.

use std::collections::BTreeMap;
use std::time::Duration;

use common::prelude::Keyring;
use http::HeaderMap;

pub const SESSION_COOKIE: &str = "Session";

/// WebID from a valid, unexpired session cookie.
pub fn user_from_cookie(keyring: &Keyring, headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(http::header::COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for cookie in cookie::Cookie::split_parse(header).flatten() {
            if cookie.name() != SESSION_COOKIE {
                continue;
            }
            if let Ok(values) = keyring.open(SESSION_COOKIE, cookie.value()) {
                if let Some(user) = values.get("user") {
                    if !user.is_empty() {
                        return Some(user.clone());
                    }
                }
            }
        }
    }
    None
}

/// `Set-Cookie` value binding `user` to a fresh session.
pub fn session_cookie(keyring: &Keyring, user: &str, age: Duration) -> Option<String> {
    let mut values = BTreeMap::new();
    values.insert("user".to_string(), user.to_string());
    let token = keyring.seal(SESSION_COOKIE, &values, age).ok()?;

    let cookie = cookie::Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .max_age(cookie::time::Duration::seconds(age.as_secs() as i64))
        .build();
    Some(cookie.to_string())
}
