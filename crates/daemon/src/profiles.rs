//! Remote WebID profile and group graphs
//!
//! The ACL engine and the authenticator dereference agent URIs during
//! request handling. Fetches are bounded by the configured timeout and any
//! failure degrades to the empty graph: no membership, no keys, no
//! delegation. The source is a trait so tests can preload profiles instead
//! of standing up a second server.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use common::prelude::*;

/// Where agent profile graphs come from.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Dereference `uri` and parse the result. Must not fail: errors and
    /// timeouts return an empty graph.
    async fn load(&self, uri: &str) -> Graph;
}

/// HTTP profile source.
pub struct WebProfileSource {
    client: reqwest::Client,
}

impl WebProfileSource {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl ProfileSource for WebProfileSource {
    async fn load(&self, uri: &str) -> Graph {
        let mut graph = Graph::new(uri.to_string());
        // the fragment is identifier-only; fetch the document
        let document = uri.split('#').next().unwrap_or(uri);

        let response = match self
            .client
            .get(document)
            .header(reqwest::header::ACCEPT, "text/turtle")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(uri, error = %e, "profile fetch failed");
                return graph;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(uri, status = %response.status(), "profile fetch rejected");
            return graph;
        }
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(uri, error = %e, "profile body read failed");
                return graph;
            }
        };
        if let Err(e) = graph.parse(&body, "text/turtle") {
            tracing::debug!(uri, error = %e, "profile parse failed");
        }
        graph
    }
}

/// In-memory profile source, for preloaded identities and tests.
#[derive(Default)]
pub struct StaticProfiles {
    graphs: HashMap<String, Graph>,
}

impl StaticProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the graph served for `uri` (fragment ignored on lookup).
    pub fn insert(&mut self, uri: impl Into<String>, graph: Graph) {
        let uri = uri.into();
        let document = uri.split('#').next().unwrap_or(&uri).to_string();
        self.graphs.insert(document, graph);
    }
}

#[async_trait]
impl ProfileSource for StaticProfiles {
    async fn load(&self, uri: &str) -> Graph {
        let document = uri.split('#').next().unwrap_or(uri);
        self.graphs
            .get(document)
            .cloned()
            .unwrap_or_else(|| Graph::new(uri.to_string()))
    }
}
