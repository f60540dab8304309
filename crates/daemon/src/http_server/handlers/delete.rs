//! DELETE: unlink a resource
//!
//! The root cannot be deleted. Shadow `.acl`/`.meta` files are left in
//! place; they are addressable on their own and inert until the primary is
//! recreated.

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

    if ctx.resource.path.is_empty() {
        return reply.text(StatusCode::INTERNAL_SERVER_ERROR, "500 - Cannot DELETE /");
    }

    let removed = if ctx.resource.is_dir {
        std::fs::remove_dir(&ctx.resource.file)
    } else {
        std::fs::remove_file(&ctx.resource.file)
    };
    if let Err(e) = removed {
        if e.kind() == std::io::ErrorKind::NotFound {
            return reply.text(
                StatusCode::NOT_FOUND,
                status_text(StatusCode::NOT_FOUND, "resource not found"),
            );
        }
        return reply.text(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        );
    }

    // a concurrent writer may have recreated it mid-flight
    if ctx.resource.file.exists() {
        return reply.text(
            StatusCode::CONFLICT,
            status_text(StatusCode::CONFLICT, "resource still present after delete"),
        );
    }

    state.events().deleted(&ctx.resource.uri);
    reply.status(StatusCode::OK)
}
