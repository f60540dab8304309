//! POST: LDP creation in containers, merge on leaves, multipart uploads
//!
//! POST to a container allocates a child slot (Slug or short UUID) and
//! creates a leaf or a nested container; POST to anything else merges like
//! PATCH, creating the resource on first write. Multipart bodies fan out
//! one file per part.

use axum::extract::{FromRequest, Multipart, Request};
use axum::response::Response;
use common::ns::ldp;
use common::prelude::Graph;
use http::{header, StatusCode};
use oxrdf::NamedNode;

use super::{apply_body, current_etag, require_append_or_write, write_raw};
use crate::http_server::context::{status_text, Reply, RequestContext};
use crate::http_server::negotiate;
use crate::resource::{allocate, AllocateError};
use crate::service_state::State;
use crate::wac::AccessControl;

pub async fn handle(
    state: &State,
    acl: &AccessControl,
    mut ctx: RequestContext,
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

    // LDP creation inside an existing container
    if ctx.resource.exists && ctx.resource.is_dir && ctx.data_mime != "multipart/form-data" {
        let link = negotiate::link_rel(&headers, "type");
        let slug = headers
            .get("slug")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty());
        let as_container = link.as_deref() == Some(ldp::BASIC_CONTAINER.as_str());

        let child = match allocate(state.config(), state.media(), &ctx.resource, slug, as_container)
        {
            Ok(child) => child,
            Err(AllocateError::SlugTaken) => {
                tracing::debug!(container = %ctx.resource.uri, "slug already taken");
                return reply.text(
                    StatusCode::CONFLICT,
                    "409 - Conflict! A resource with the same name already exists.",
                );
            }
            Err(e) => {
                return reply.text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
                )
            }
        };

        reply.set(header::LOCATION, &child.uri);
        reply.set(
            header::LINK,
            &format!(
                "<{}>; rel=\"meta\", <{}>; rel=\"acl\"",
                child.meta_uri, child.acl_uri
            ),
        );
        reply.add(
            header::LINK,
            &format!("<{}>; rel=\"type\"", ldp::RESOURCE.as_str()),
        );

        if as_container {
            reply.add(
                header::LINK,
                &format!("<{}>; rel=\"type\"", ldp::BASIC_CONTAINER.as_str()),
            );
            if let Err(e) = std::fs::create_dir_all(&child.file) {
                return reply.text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
                );
            }
            tracing::debug!(dir = %child.file.display(), "created container");

            if ctx.data_has_parser {
                let body =
                    match axum::body::to_bytes(req.into_body(), state.config().body_limit).await {
                        Ok(body) => body,
                        Err(e) => {
                            return reply.text(
                                StatusCode::INTERNAL_SERVER_ERROR,
                                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
                            )
                        }
                    };
                if !body.is_empty() {
                    let mut parsed = Graph::new(child.uri.clone());
                    if let Err(e) = parsed.parse(&body, &ctx.data_mime) {
                        return reply.text(
                            StatusCode::BAD_REQUEST,
                            format!("HTTP 400 - Bad Request\n\n{}", e),
                        );
                    }
                    // statements describe the new container, whatever
                    // subject the client wrote
                    let mut meta = Graph::new(child.meta_uri.clone());
                    if let Ok(container_node) = NamedNode::new(&child.uri) {
                        for triple in parsed.all(None, None, None) {
                            meta.add(container_node.clone(), triple.predicate, triple.object);
                        }
                    }
                    if !meta.is_empty() {
                        if let Err(e) = meta.write_file(&child.meta_file, "text/turtle") {
                            return reply.text(
                                StatusCode::INTERNAL_SERVER_ERROR,
                                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
                            );
                        }
                    }
                }
            }

            state.events().updated(&child.uri);
            return reply.status(StatusCode::CREATED);
        }

        ctx.resource = child;
        return write_leaf(state, ctx, req, reply, true).await;
    }

    if !ctx.resource.exists {
        if let Some(parent) = ctx.resource.file.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return reply.text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
                );
            }
        }
    }

    if ctx.data_mime == "multipart/form-data" {
        return upload_parts(state, ctx, req, reply).await;
    }

    let is_new = !ctx.resource.file.exists();
    write_leaf(state, ctx, req, reply, is_new).await
}

/// Write (or merge into) a leaf resource from the request body.
async fn write_leaf(
    state: &State,
    ctx: RequestContext,
    req: Request,
    reply: Reply,
    is_new: bool,
) -> Response {
    let body = match axum::body::to_bytes(req.into_body(), state.config().body_limit).await {
        Ok(body) => body,
        Err(e) => {
            return reply.text(
                StatusCode::INTERNAL_SERVER_ERROR,
                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            )
        }
    };

    if ctx.data_has_parser {
        let mut graph = Graph::new(ctx.resource.uri.clone());
        graph.read_file(&ctx.resource.file);
        if let Err(e) = apply_body(&mut graph, &body, &ctx.data_mime) {
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
        tracing::debug!(file = %ctx.resource.file.display(), "wrote resource");
    } else if let Err(e) = write_raw(&ctx.resource.file, &body) {
        return reply.text(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        );
    }

    state.events().updated(&ctx.resource.uri);
    if is_new {
        reply.status(StatusCode::CREATED)
    } else {
        reply.status(StatusCode::OK)
    }
}

/// Store each file part of a multipart body under the container.
async fn upload_parts(
    state: &State,
    ctx: RequestContext,
    req: Request,
    mut reply: Reply,
) -> Response {
    let mut multipart = match Multipart::from_request(req, &()).await {
        Ok(multipart) => multipart,
        Err(e) => {
            return reply.text(
                StatusCode::BAD_REQUEST,
                format!("HTTP 400 - Bad Request\n\n{}", e),
            )
        }
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return reply.text(
                    StatusCode::BAD_REQUEST,
                    format!("HTTP 400 - Bad Request\n\n{}", e),
                )
            }
        };
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                return reply.text(
                    StatusCode::BAD_REQUEST,
                    format!("HTTP 400 - Bad Request\n\n{}", e),
                )
            }
        };
        let target = if ctx.resource.is_dir {
            ctx.resource.file.join(&name)
        } else {
            ctx.resource.file.clone()
        };
        if let Err(e) = write_raw(&target, &data) {
            return reply.text(
                StatusCode::INTERNAL_SERVER_ERROR,
                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            );
        }
        reply.add(header::LOCATION, &format!("{}{}", ctx.resource.uri, name));
        tracing::debug!(file = %target.display(), "stored upload");
    }

    state.events().updated(&ctx.resource.uri);
    reply.status(StatusCode::CREATED)
}
