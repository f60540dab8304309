//! The HTTP protocol state machine
//!
//! One fallback handler receives every request (the verb set includes
//! MKCOL and the WebDAV verbs, which method routers do not model), runs the
//! shared prologue, and dispatches per verb. The prologue order is
//! load-bearing: CORS and identity headers are set before the 415/406
//! gates, which run before any verb logic.

mod dav;
mod delete;
mod get;
mod mkcol;
mod options;
mod patch;
mod post;
mod put;

use std::io::Write;
use std::path::Path;

use axum::extract::{Request, State as AxumState};
use axum::response::Response;
use common::prelude::{Graph, RdfError};
use http::{header, HeaderName, Method, StatusCode};

use super::context::{base_uri, status_text, Reply, RequestContext};
use super::negotiate;
use crate::resource::resolve;
use crate::service_state::State;
use crate::wac::{AccessControl, AccessDecision, Mode};

pub(crate) const METHODS_ALL: &str =
    "OPTIONS, HEAD, GET, PATCH, POST, PUT, MKCOL, DELETE, COPY, MOVE, LOCK, UNLOCK";

const EXPOSED_HEADERS: &str = "User, Location, Link, Vary, Last-Modified, Content-Length";

pub(crate) const USER_HEADER: HeaderName = HeaderName::from_static("user");
const MS_AUTHOR_VIA: HeaderName = HeaderName::from_static("ms-author-via");
const UPDATES_VIA: HeaderName = HeaderName::from_static("updates-via");
const ACCEPT_PATCH: HeaderName = HeaderName::from_static("accept-patch");
const ACCEPT_POST: HeaderName = HeaderName::from_static("accept-post");

/// Entry point for every request.
pub async fn dispatch(AxumState(state): AxumState<State>, req: Request) -> Response {
    let base_uri = base_uri(&req);
    let (ctx, mut reply) = match prologue(
        &state,
        req.method().clone(),
        req.headers().clone(),
        req.extensions().clone(),
        base_uri,
    )
    .await
    {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    let on_behalf_of = req
        .headers()
        .get("on-behalf-of")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let acl = AccessControl::new(
        &state,
        ctx.user.clone(),
        ctx.origin.clone(),
        on_behalf_of.as_deref(),
    )
    .await;

    match req.method().clone() {
        Method::OPTIONS => options::handle(&ctx, req.headers(), reply),
        Method::GET => get::handle(&state, &acl, ctx, req.headers().clone(), reply, false).await,
        Method::HEAD => get::handle(&state, &acl, ctx, req.headers().clone(), reply, true).await,
        Method::PATCH => patch::handle(&state, &acl, ctx, req, reply).await,
        Method::POST => post::handle(&state, &acl, ctx, req, reply).await,
        Method::PUT => put::handle(&state, &acl, ctx, req, reply).await,
        Method::DELETE => delete::handle(&state, &acl, ctx, reply).await,
        method => match method.as_str() {
            "MKCOL" => mkcol::handle(&state, &acl, ctx, reply).await,
            "COPY" | "MOVE" | "LOCK" | "UNLOCK" => {
                dav::handle(&state, &acl, ctx, req, reply).await
            }
            other => {
                reply.set(header::ALLOW, METHODS_ALL);
                reply.text(
                    StatusCode::METHOD_NOT_ALLOWED,
                    format!("HTTP 405 - Method Not Allowed: {}", other),
                )
            }
        },
    }
}

/// Shared request prologue: CORS and identity headers, authentication, path
/// resolution, the 415 body gate and Accept negotiation.
async fn prologue(
    state: &State,
    method: Method,
    headers: http::HeaderMap,
    extensions: http::Extensions,
    base_uri: String,
) -> Result<(RequestContext, Reply), Response> {
    let mut reply = Reply::default();

    tracing::debug!(method = %method, uri = %base_uri, "incoming request");

    // CORS
    reply.set(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
    reply.set(header::ACCESS_CONTROL_EXPOSE_HEADERS, EXPOSED_HEADERS);
    reply.set(header::ACCESS_CONTROL_MAX_AGE, "1728000");

    // RWW
    reply.set(MS_AUTHOR_VIA, "DAV, SPARQL");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    reply.set(UPDATES_VIA, &format!("wss://{}/", host));

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !origin.is_empty() {
        reply.set(header::ACCESS_CONTROL_ALLOW_ORIGIN, &origin);
    }

    // Authentication
    let auth = crate::auth::authenticate(state, &headers, &extensions, &base_uri).await;
    reply.set(USER_HEADER, &auth.user);
    if let Some(cookie) = &auth.set_cookie {
        reply.set(header::SET_COOKIE, cookie);
    }

    let resource = match resolve(state.config(), state.media(), &base_uri) {
        Ok(resource) => resource,
        Err(e) => {
            return Err(reply.text(
                StatusCode::INTERNAL_SERVER_ERROR,
                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            ))
        }
    };

    // request body media type and the 415 gate
    let data_mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap_or("")
        .trim()
        .to_string();
    let data_has_parser = negotiate::has_body_parser(&data_mime);
    if !data_mime.is_empty()
        && data_mime != "multipart/form-data"
        && !data_has_parser
        && !matches!(method, Method::PUT | Method::HEAD | Method::OPTIONS)
    {
        tracing::debug!(%data_mime, "unsupported media type");
        return Err(reply.text(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("HTTP 415 - Unsupported Media Type: {}", data_mime),
        ));
    }

    // content negotiation
    let Some(content_type) = negotiate::response_type(&headers) else {
        return Err(reply.text(
            StatusCode::NOT_ACCEPTABLE,
            "HTTP 406 - Accept type not acceptable",
        ));
    };

    reply.set(
        header::LINK,
        &format!(
            "<{}>; rel=\"acl\", <{}>; rel=\"meta\"",
            resource.acl_uri, resource.meta_uri
        ),
    );
    reply.set(ACCEPT_PATCH, "application/json, application/sparql-update");
    reply.set(ACCEPT_POST, "text/turtle, application/ld+json, application/json");
    reply.set(header::ALLOW, METHODS_ALL);

    Ok((
        RequestContext {
            base_uri,
            origin,
            data_mime,
            data_has_parser,
            content_type,
            user: auth.user,
            resource,
        },
        reply,
    ))
}

/// Gate a verb on one access mode. `None` means allowed; otherwise the
/// short-circuit response (401 with a fresh challenge, 403, or 500).
pub(crate) async fn require(
    acl: &AccessControl,
    mode: Mode,
    uri: &str,
    reply: &mut Reply,
) -> Option<Response> {
    decide(acl.allow(mode, uri).await, reply)
}

/// The Append-then-Write widening used by POST, PATCH and PUT: allowed if
/// either mode is granted, decided before any challenge is emitted.
pub(crate) async fn require_append_or_write(
    acl: &AccessControl,
    uri: &str,
    reply: &mut Reply,
) -> Option<Response> {
    if let Ok(AccessDecision::Allow) = acl.allow(Mode::Append, uri).await {
        return None;
    }
    decide(acl.allow(Mode::Write, uri).await, reply)
}

fn decide(
    result: Result<AccessDecision, crate::wac::WacError>,
    reply: &mut Reply,
) -> Option<Response> {
    match result {
        Ok(AccessDecision::Allow) => None,
        Ok(AccessDecision::AuthRequired { challenge, message }) => {
            reply.set(header::WWW_AUTHENTICATE, &challenge);
            Some(reply.clone().text(
                StatusCode::UNAUTHORIZED,
                status_text(StatusCode::UNAUTHORIZED, &message),
            ))
        }
        Ok(AccessDecision::Denied { message }) => Some(reply.clone().text(
            StatusCode::FORBIDDEN,
            status_text(StatusCode::FORBIDDEN, &message),
        )),
        Err(e) => Some(reply.clone().text(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        )),
    }
}

/// Apply a request body to a graph per its media type.
pub(crate) fn apply_body(graph: &mut Graph, data: &[u8], media_type: &str) -> Result<(), RdfError> {
    match media_type {
        "application/json" => graph.json_patch(data),
        "application/sparql-update" => {
            let body = std::str::from_utf8(data).map_err(|_| RdfError::Encoding)?;
            graph.sparql_update(body)
        }
        other => graph.parse(data, other),
    }
}

/// Atomic raw write (temp file + rename), same commit discipline as graph
/// writes.
pub(crate) fn write_raw(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::other("destination has no parent directory"))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Quoted current ETag, or empty when the file does not exist yet.
pub(crate) fn current_etag(path: &Path) -> String {
    crate::resource::etag(path)
        .map(|tag| format!("\"{}\"", tag))
        .unwrap_or_default()
}
