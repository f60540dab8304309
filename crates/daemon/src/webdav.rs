//! WebDAV delegation
//!
//! COPY, MOVE, LOCK and UNLOCK are handed to `dav-server` over the same
//! storage root, after the router's ACL Write gate. Only the wiring lives
//! here; the verbs' semantics are the handler's.

use std::path::Path;

use axum::body::Body;
use axum::response::Response;
use dav_server::{localfs::LocalFs, memls::MemLs, DavHandler};
use http::Request;

/// Build the delegate over the storage root.
pub fn handler(data_root: &Path) -> DavHandler {
    DavHandler::builder()
        .filesystem(LocalFs::new(data_root, false, false, false))
        .locksystem(MemLs::new())
        .build_handler()
}

/// Run one request through the delegate.
pub async fn serve(dav: &DavHandler, req: Request<Body>) -> Response {
    let response = dav.handle(req).await;
    response.map(Body::new)
}
