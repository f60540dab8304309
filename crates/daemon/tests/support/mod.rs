//! Shared test utilities for server integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::Router;
use http::{Request, Response};
use tempfile::TempDir;
use tower::ServiceExt;

use loam_daemon::auth::session_cookie;
use loam_daemon::profiles::StaticProfiles;
use loam_daemon::{http_server, ServiceConfig, ServiceState};

pub const HOST: &str = "example.org";

pub struct TestServer {
    pub state: ServiceState,
    pub router: Router,
    pub tmp: TempDir,
}

/// Server over a fresh storage root, profiles preloaded.
pub fn setup_with(profiles: StaticProfiles) -> TestServer {
    let tmp = TempDir::new().unwrap();
    let config = ServiceConfig {
        data_root: tmp.path().to_path_buf(),
        ..ServiceConfig::default()
    };
    let state = ServiceState::with_profiles(config, Arc::new(profiles));
    let router = http_server::router(state.clone());
    TestServer { state, router, tmp }
}

pub fn setup() -> TestServer {
    setup_with(StaticProfiles::new())
}

impl TestServer {
    pub async fn request(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// `Cookie` value authenticating as `user`.
    pub fn cookie_for(&self, user: &str) -> String {
        let header =
            session_cookie(self.state.keyring(), user, Duration::from_secs(600)).unwrap();
        header.split(';').next().unwrap().to_string()
    }
}

/// Request builder with the test host preset.
pub fn req(method: &str, path: &str) -> http::request::Builder {
    Request::builder()
        .method(method)
        .uri(path)
        .header("host", HOST)
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse a response body as a graph in the given media type.
pub async fn body_graph(response: Response<Body>, uri: &str, media_type: &str) -> common::rdf::Graph {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let mut graph = common::rdf::Graph::new(uri.to_string());
    graph.parse(&bytes, media_type).unwrap();
    graph
}
