//! PUT: whole-resource writes and container creation
//!
//! RDF bodies are canonicalized to turtle on the way down; anything else is
//! stored verbatim. `Link: <ldp#BasicContainer>; rel="type"` creates the
//! target as a container instead. PUT on an existing directory cannot work
//! and answers 406 with a `describedby` pointer.

use axum::extract::Request;
use axum::response::Response;
use common::ns::ldp;
use common::prelude::Graph;
use http::{header, StatusCode};

use super::{current_etag, require_append_or_write, write_raw};
use crate::http_server::context::{status_text, Reply, RequestContext};
use crate::http_server::negotiate;
use crate::resource::resolve;
use crate::service_state::State;
use crate::wac::AccessControl;

pub async fn handle(
    state: &State,
    acl: &AccessControl,
    ctx: RequestContext,
    req: Request,
    mut reply: Reply,
) -> Response {
    let _lock = state.locks().lock(&ctx.resource.file).await;

    reply.add(
        header::LINK,
        &format!("<{}>; rel=\"type\"", ldp::RESOURCE.as_str()),
    );

    if let Some(response) = require_append_or_write(acl, &ctx.resource.uri, &mut reply).await {
        return response;
    }

    let etag = current_etag(&ctx.resource.file);
    let headers = req.headers().clone();
    if !negotiate::if_match(&headers, &etag) || !negotiate::if_none_match(&headers, &etag) {
        return reply.text(StatusCode::PRECONDITION_FAILED, "412 - Precondition Failed");
    }

    // container creation
    if negotiate::link_rel(&headers, "type").as_deref() == Some(ldp::BASIC_CONTAINER.as_str()) {
        if let Err(e) = std::fs::create_dir_all(&ctx.resource.file) {
            return reply.text(
                StatusCode::INTERNAL_SERVER_ERROR,
                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            );
        }
        if let Ok(resource) = resolve(state.config(), state.media(), &ctx.resource.uri) {
            reply.set(
                header::LINK,
                &format!(
                    "<{}>; rel=\"meta\", <{}>; rel=\"acl\"",
                    resource.meta_uri, resource.acl_uri
                ),
            );
            reply.add(
                header::LINK,
                &format!("<{}>; rel=\"type\"", ldp::RESOURCE.as_str()),
            );
        }
        state.events().updated(&ctx.resource.uri);
        return reply.status(StatusCode::CREATED);
    }

    if let Some(parent) = ctx.resource.file.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return reply.text(
                StatusCode::INTERNAL_SERVER_ERROR,
                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            );
        }
    }

    if ctx.resource.exists && ctx.resource.is_dir {
        reply.add(
            header::LINK,
            &format!("<{}>; rel=\"describedby\"", ctx.resource.uri),
        );
        return reply.text(
            StatusCode::NOT_ACCEPTABLE,
            "406 - Cannot use PUT on a directory.",
        );
    }

    let is_new = !ctx.resource.exists;

    let body = match axum::body::to_bytes(req.into_body(), state.config().body_limit).await {
        Ok(body) => body,
        Err(e) => {
            return reply.text(
                StatusCode::INTERNAL_SERVER_ERROR,
                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            )
        }
    };

    if common::rdf::PARSEABLE.contains(&ctx.data_mime.as_str()) {
        // canonicalize: parse whatever came in, store turtle
        let mut graph = Graph::new(ctx.resource.uri.clone());
        if let Err(e) = graph.parse(&body, &ctx.data_mime) {
            return reply.text(
                StatusCode::BAD_REQUEST,
                format!("HTTP 400 - Bad Request\n\n{}", e),
            );
        }
        if let Err(e) = graph.write_file(&ctx.resource.file, "text/turtle") {
            return reply.text(
                StatusCode::INTERNAL_SERVER_ERROR,
                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            );
        }
    } else if let Err(e) = write_raw(&ctx.resource.file, &body) {
        return reply.text(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        );
    }

    reply.set(header::LOCATION, &ctx.resource.uri);
    state.events().updated(&ctx.resource.uri);
    if is_new {
        reply.status(StatusCode::CREATED)
    } else {
        reply.status(StatusCode::OK)
    }
}
