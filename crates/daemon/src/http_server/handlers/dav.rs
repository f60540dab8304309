//! COPY / MOVE / LOCK / UNLOCK: WebDAV delegation after the ACL gate

use axum::extract::Request;
use axum::response::Response;

use super::require;
use crate::http_server::context::{Reply, RequestContext};
use crate::service_state::State;
use crate::wac::{AccessControl, Mode};
use crate::webdav;

pub async fn handle(
    state: &State,
    acl: &AccessControl,
    ctx: RequestContext,
    req: Request,
    mut reply: Reply,
) -> Response {
    if let Some(response) = require(acl, Mode::Write, &ctx.resource.uri, &mut reply).await {
        return response;
    }
    webdav::serve(state.webdav(), req).await
}
