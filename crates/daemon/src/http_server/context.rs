//! Per-request context and response assembly

use axum::body::Body;
use axum::response::Response;
use http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};

use crate::resource::PathInfo;

/// Facts the prologue establishes for every verb handler.
#[derive(Debug)]
pub struct RequestContext {
    /// absolute URI of the request (scheme://host[:port]/path)
    pub base_uri: String,
    /// `Origin` header, empty when absent
    pub origin: String,
    /// request body media type (parameters stripped), empty when absent
    pub data_mime: String,
    /// a graph parser exists for `data_mime`
    pub data_has_parser: bool,
    /// negotiated response serialization
    pub content_type: String,
    /// authenticated WebID, empty for anonymous
    pub user: String,
    /// the addressed resource
    pub resource: PathInfo,
}

/// Absolute request URI from the Host header and path, honoring
/// `X-Forwarded-Proto` for the scheme.
pub fn base_uri<B>(req: &Request<B>) -> String {
    let scheme = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|v| *v == "https")
        .unwrap_or("http");
    let mut host = req
        .headers()
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string();
    if let Some(stripped) = host.strip_suffix(match scheme {
        "https" => ":443",
        _ => ":80",
    }) {
        host = stripped.to_string();
    }
    format!("{}://{}{}", scheme, host, req.uri().path())
}

/// Accumulated response headers plus terminal constructors.
#[derive(Debug, Default, Clone)]
pub struct Reply {
    headers: HeaderMap,
}

impl Reply {
    pub fn set(&mut self, name: HeaderName, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
    }

    pub fn add(&mut self, name: HeaderName, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
    }

    pub fn remove(&mut self, name: HeaderName) {
        self.headers.remove(name);
    }

    pub fn get(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Headers only.
    pub fn status(self, status: StatusCode) -> Response {
        self.body(status, Body::empty())
    }

    /// Plain text body.
    pub fn text(self, status: StatusCode, text: impl Into<String>) -> Response {
        self.body(status, Body::from(text.into()))
    }

    /// Body with an explicit content type.
    pub fn data(mut self, status: StatusCode, content_type: &str, data: Vec<u8>) -> Response {
        self.set(http::header::CONTENT_TYPE, content_type);
        self.body(status, Body::from(data))
    }

    /// 303 redirect.
    pub fn see_other(mut self, location: &str) -> Response {
        self.set(http::header::LOCATION, location);
        self.status(StatusCode::SEE_OTHER)
    }

    fn body(self, status: StatusCode, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Response body line for an error status, in the `HTTP <code> - <reason>`
/// format every status-bearing body uses.
pub fn status_text(status: StatusCode, message: &str) -> String {
    let line = match status {
        StatusCode::OK => return "HTTP 200 - OK".to_string(),
        StatusCode::UNAUTHORIZED => "HTTP 401 - Unauthorized",
        StatusCode::FORBIDDEN => "HTTP 403 - Forbidden",
        StatusCode::NOT_FOUND => "HTTP 404 - Not found",
        StatusCode::INTERNAL_SERVER_ERROR => "HTTP 500 - Internal Server Error",
        StatusCode::NOT_IMPLEMENTED => "HTTP 501 - Not implemented",
        other => {
            return format!(
                "HTTP {} - {}\n\n{}",
                other.as_u16(),
                other.canonical_reason().unwrap_or(""),
                message
            )
        }
    };
    format!("{}\n\n{}", line, message)
}
