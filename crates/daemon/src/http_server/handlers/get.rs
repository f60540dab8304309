//! GET and HEAD: representations, containers, globs, skins
//!
//! Directories render as LDP basic containers (or serve a configured index
//! file to browsers); extension-less text resources are parsed and
//! re-serialized in the negotiated type; everything else streams verbatim.
//! A `*` in the path turns the request into a glob over the parent
//! container.

use axum::response::Response;
use common::ns::ldp;
use common::prelude::Graph;
use http::{header, HeaderMap, HeaderName, StatusCode};

use super::{current_etag, require};
use crate::http_server::context::{status_text, Reply, RequestContext};
use crate::http_server::negotiate;
use crate::resource::container::{self, ListingOptions};
use crate::resource::{media, resolve};
use crate::service_state::State;
use crate::wac::{AccessControl, Mode};

/// Minimal data viewer served to browsers for RDF resources; the skin
/// system proper lives outside this server.
const DATA_VIEWER: &str = "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Linked data resource</title></head>\n<body>\n<p>This is a linked data resource. Request it as <code>text/turtle</code>\nor another RDF serialization to read it.</p>\n</body>\n</html>\n";

pub async fn handle(
    state: &State,
    acl: &AccessControl,
    mut ctx: RequestContext,
    headers: HeaderMap,
    mut reply: Reply,
    is_head: bool,
) -> Response {
    let config = state.config();

    // a glob pattern addresses the parent container
    let mut glob_pattern = None;
    if ctx.resource.path.contains('*') {
        glob_pattern = Some(ctx.resource.file.to_string_lossy().into_owned());
        let parent = ctx
            .resource
            .parent()
            .unwrap_or_else(|| format!("{}/", ctx.resource.base));
        match resolve(config, state.media(), &parent) {
            Ok(resource) => ctx.resource = resource,
            Err(e) => {
                return reply.text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
                )
            }
        }
        reply.set(
            header::LINK,
            &format!(
                "<{}>; rel=\"acl\", <{}>; rel=\"meta\"",
                ctx.resource.acl_uri, ctx.resource.meta_uri
            ),
        );
    }

    if !ctx.resource.exists {
        // vhost mode sends browsers of unclaimed hosts to the sign-up skin
        if config.vhosts
            && !is_head
            && ctx.content_type == "text/html"
            && ctx.resource.base == ctx.base_uri.trim_end_matches('/')
        {
            if let Some(skin) = &config.signup_skin {
                let callback: String =
                    url::form_urlencoded::byte_serialize(ctx.resource.base.as_bytes()).collect();
                reply.set(header::CONTENT_TYPE, "text/html");
                return reply.see_other(&format!("{}{}", skin, callback));
            }
        }
        return reply.text(
            StatusCode::NOT_FOUND,
            status_text(StatusCode::NOT_FOUND, "resource not found"),
        );
    }

    if ctx.resource.is_dir {
        reply.add(
            header::LINK,
            &format!("<{}>; rel=\"type\"", ldp::BASIC_CONTAINER.as_str()),
        );
    }
    if is_head {
        reply.set(header::CONTENT_LENGTH, &ctx.resource.size.to_string());
    }
    reply.add(
        header::LINK,
        &format!("<{}>; rel=\"type\"", ldp::RESOURCE.as_str()),
    );

    if let Some(response) = require(acl, Mode::Read, &ctx.resource.uri, &mut reply).await {
        return response;
    }

    let _lock = state.locks().lock(&ctx.resource.file).await;

    let etag = current_etag(&ctx.resource.file);
    if etag.is_empty() {
        return reply.text(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_text(StatusCode::INTERNAL_SERVER_ERROR, "cannot stat resource"),
        );
    }
    reply.set(header::ETAG, &etag);

    if !negotiate::if_match(&headers, &etag) {
        return reply.text(StatusCode::PRECONDITION_FAILED, "412 - Precondition Failed");
    }
    if !negotiate::if_none_match(&headers, &etag)
        && !ctx.resource.is_dir
        && ctx.content_type != "text/html"
    {
        // directory views are not served from cache for browsers
        return reply.text(StatusCode::NOT_MODIFIED, "304 - Not Modified");
    }

    if ctx.resource.is_dir {
        serve_container(state, acl, ctx, &headers, reply, is_head, glob_pattern).await
    } else {
        serve_file(state, ctx, reply, is_head)
    }
}

async fn serve_container(
    state: &State,
    acl: &AccessControl,
    mut ctx: RequestContext,
    headers: &HeaderMap,
    mut reply: Reply,
    is_head: bool,
    glob_pattern: Option<String>,
) -> Response {
    let config = state.config();

    if ctx.content_type == "text/html" && !config.dir_indexes.is_empty() {
        for index in &config.dir_indexes {
            let candidate = ctx.resource.file.join(index);
            if candidate.is_file() {
                let index_uri = format!("{}{}", ctx.resource.uri, index);
                if let Ok(resource) = resolve(config, state.media(), &index_uri) {
                    reply.set(
                        header::LINK,
                        &format!(
                            "<{}>; rel=\"meta\", <{}>; rel=\"acl\"",
                            resource.meta_uri, resource.acl_uri
                        ),
                    );
                    ctx.resource = resource;
                }
                if is_head {
                    reply.set(header::CONTENT_TYPE, "text/html");
                    return reply.status(StatusCode::OK);
                }
                return match std::fs::read(&ctx.resource.file) {
                    Ok(data) => reply.data(StatusCode::OK, "text/html", data),
                    Err(e) => reply.text(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
                    ),
                };
            }
        }
        if !is_head {
            if let Some(skin) = &config.dir_skin {
                reply.set(header::CONTENT_TYPE, "text/html");
                return reply.see_other(&format!("{}{}", skin, ctx.resource.uri));
            }
        }
        reply.set(header::CONTENT_TYPE, "text/html");
        return reply.status(StatusCode::OK);
    }

    reply.add(
        header::LINK,
        &format!("<{}>; rel=\"meta\"", ctx.resource.meta_uri),
    );

    let graph = if let Some(pattern) = glob_pattern {
        container::render_glob(config, state.media(), &ctx.resource, &pattern, acl).await
    } else {
        let prefs = negotiate::preferences(headers);
        if prefs.applied {
            reply.set(
                HeaderName::from_static("preference-applied"),
                "return=representation",
            );
        }
        container::render_listing(
            config,
            state.media(),
            &ctx.resource,
            ListingOptions {
                containment: prefs.containment,
                empty_container: prefs.empty_container,
            },
        )
    };

    respond_graph(&graph, &ctx, reply, is_head)
}

fn serve_file(state: &State, ctx: RequestContext, mut reply: Reply, is_head: bool) -> Response {
    let mut magic_type = ctx
        .resource
        .file_type
        .clone()
        .unwrap_or_else(|| media::OCTET_STREAM.to_string());
    let mut maybe_rdf = magic_type == "text/plain";

    if !is_head && ctx.content_type.contains("text/html") {
        // the browser path is served by the skin; do not hand it a cached
        // view
        reply.remove(header::ETAG);
        reply.set(
            header::LINK,
            &format!(
                "<{}>; rel=\"meta\", <{}>; rel=\"acl\"",
                ctx.resource.meta_uri, ctx.resource.acl_uri
            ),
        );
        if maybe_rdf {
            return reply.data(StatusCode::OK, "text/html", DATA_VIEWER.as_bytes().to_vec());
        }
        return match std::fs::read(&ctx.resource.file) {
            Ok(data) => reply.data(StatusCode::OK, &magic_type, data),
            Err(e) => reply.text(
                StatusCode::INTERNAL_SERVER_ERROR,
                status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            ),
        };
    } else if !maybe_rdf && !ctx.content_type.contains("text/html") {
        // unknown types may still hold triples; try before streaming
        maybe_rdf = true;
    }

    // files with an RDF extension are served verbatim under the mapped type
    if let Some(mapped) = state.media().rdf_extension(&ctx.resource.file) {
        magic_type = mapped.to_string();
        maybe_rdf = false;
    }

    if is_head {
        reply.set(header::CONTENT_TYPE, &magic_type);
        return reply.status(StatusCode::OK);
    }

    if maybe_rdf {
        let mut graph = Graph::new(ctx.resource.uri.clone());
        graph.read_file(&ctx.resource.file);
        // an empty parse means it was not RDF after all; fall back to bytes
        if !graph.is_empty() {
            return respond_graph(&graph, &ctx, reply, is_head);
        }
    }

    match std::fs::read(&ctx.resource.file) {
        Ok(data) => reply.data(StatusCode::OK, &magic_type, data),
        Err(e) => reply.text(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        ),
    }
}

fn respond_graph(graph: &Graph, ctx: &RequestContext, mut reply: Reply, is_head: bool) -> Response {
    if ctx.content_type == "text/html" {
        if is_head {
            reply.set(header::CONTENT_TYPE, "text/html");
            return reply.status(StatusCode::OK);
        }
        return reply.data(StatusCode::OK, "text/html", DATA_VIEWER.as_bytes().to_vec());
    }
    match graph.serialize(&ctx.content_type) {
        Ok(data) => {
            if is_head {
                reply.set(header::CONTENT_TYPE, &ctx.content_type);
                return reply.status(StatusCode::OK);
            }
            reply.data(StatusCode::OK, &ctx.content_type, data.into_bytes())
        }
        Err(e) => reply.text(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_text(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        ),
    }
}
