//! OPTIONS: CORS preflight and capability discovery

use axum::response::Response;
use common::ns::ldp;
use http::{header, HeaderMap, StatusCode};

use super::METHODS_ALL;
use crate::http_server::context::{Reply, RequestContext};

pub fn handle(ctx: &RequestContext, headers: &HeaderMap, mut reply: Reply) -> Response {
    let requested_headers: Vec<&str> = headers
        .get_all(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if !requested_headers.is_empty() {
        reply.set(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            &requested_headers.join(", "),
        );
    }

    let requested_methods: Vec<&str> = headers
        .get_all(header::ACCESS_CONTROL_REQUEST_METHOD)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if !requested_methods.is_empty() {
        reply.set(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            &requested_methods.join(", "),
        );
    } else {
        reply.set(header::ACCESS_CONTROL_ALLOW_METHODS, METHODS_ALL);
    }

    if ctx.origin.is_empty() {
        reply.set(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
    }

    if ctx.resource.exists && ctx.resource.is_dir {
        reply.add(
            header::LINK,
            &format!("<{}>; rel=\"type\"", ldp::BASIC_CONTAINER.as_str()),
        );
    }
    reply.add(
        header::LINK,
        &format!("<{}>; rel=\"type\"", ldp::RESOURCE.as_str()),
    );

    reply.status(StatusCode::OK)
}
