//! MKCOL: create a collection

use axum::response::Response;
use http::StatusCode;

use super::require;
use crate::http_server::context::{status_text, Reply, RequestContext};
use crate::service_state::State;
use crate::wac::{AccessControl, Mode};

pub async fn handle(
    state: &State,
    acl: &AccessControl,
    ctx: RequestContext,
    mut reply: Reply,
) -> Response {
    let _lock = state.locks().lock(&ctx.resource.file).await;

    if let Some(response) = require(acl, Mode::Write, &ctx.resource.uri, &mut reply).await {
        return response;
    }

    if ctx.resource.exists && !ctx.resource.is_dir {
        return reply.text(
            StatusCode::CONFLICT,
            status_text(StatusCode::CONFLICT, "a resource with that name exists"),
        );
    }

    // creation failures here are path conflicts (a leaf in the way)
    if let Err(e) = std::fs::create_dir_all(&ctx.resource.file) {
        return reply.text(
            StatusCode::CONFLICT,
            status_text(StatusCode::CONFLICT, &e.to_string()),
        );
    }
    if !ctx.resource.file.is_dir() {
        return reply.text(
            StatusCode::CONFLICT,
            status_text(StatusCode::CONFLICT, "collection was not created"),
        );
    }

    state.events().updated(&ctx.resource.uri);
    reply.status(StatusCode::CREATED)
}
