//! PATCH: graph mutation in place
//!
//! The stored graph is loaded, mutated per the body's media type (turtle
//! merge, triple-level JSON patch, or the SPARQL-Update subset), and
//! written back as canonical turtle under the resource lock.

use axum::extract::Request;
use axum::response::Response;
use http::StatusCode;

use super::{apply_body, current_etag, require_append_or_write};
use crate::http_server::context::{status_text, Reply, RequestContext};
use crate::http_server::negotiate;
use crate::service_state::State;
use crate::wac::AccessControl;
use common::prelude::Graph;

pub async fn handle(
    state: &State,
    acl: &AccessControl,
    ctx: RequestContext,
    req: Request,
    mut reply: Reply,
) -> Response {
    let _lock = state.locks().lock(&ctx.resource.file).await;

    if let Some(response) = require_append_or_write(acl, &ctx.resource.uri, &mut reply).await {
        return response;
    }

    let etag = current_etag(&ctx.resource.file);
    let headers = req.headers().clone();
    if !negotiate::if_match(&headers, &etag) || !negotiate::if_none_match(&headers, &etag) {
        return reply.text(StatusCode::PRECONDITION_FAILED, "412 - Precondition Failed");
    }

    let body = match axum::body::to_bytes(req.into_body(), state.config().body_limit).await {
        Ok(body) => body,
        Err(e) => {
            return reply.text(
                StatusCode::INTERNAL_SERVER_ERROR,
                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            )
        }
    };

    let mut graph = Graph::new(ctx.resource.uri.clone());
    graph.read_file(&ctx.resource.file);
    if let Err(e) = apply_body(&mut graph, &body, &ctx.data_mime) {
        return reply.text(
            StatusCode::BAD_REQUEST,
            format!("HTTP 400 - Bad Request\n\n{}", e),
        );
    }

    if let Err(e) = graph.write_file(&ctx.resource.file, "text/turtle") {
        tracing::debug!(error = %e, "PATCH write failed");
        return reply.text(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        );
    }

    state.events().updated(&ctx.resource.uri);
    reply.status(StatusCode::OK)
}
