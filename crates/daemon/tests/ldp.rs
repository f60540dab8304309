//! LDP protocol integration tests: slot allocation, container creation,
//! representation round-trips, ETags and preconditions.

mod support;

use axum::body::Body;
use http::StatusCode;
use oxrdf::NamedNode;
use support::{body_graph, body_string, req, setup};

#[tokio::test]
async fn test_slug_allocation_and_conflict() {
    let server = setup();
    std::fs::create_dir(server.tmp.path().join("box")).unwrap();

    let post = || {
        req("POST", "/box/")
            .header("content-type", "text/turtle")
            .header("slug", "ldpr")
            .header("link", "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\"")
            .body(Body::from("<> <http://example.org/p> \"v\" ."))
            .unwrap()
    };

    let response = server.request(post()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("http://example.org/box/ldpr")
    );
    assert!(server.tmp.path().join("box/ldpr").is_file());

    // same slug again: at most one 201 per name
    let response = server.request(post()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_post_without_slug_generates_slot() {
    let server = setup();
    std::fs::create_dir(server.tmp.path().join("box")).unwrap();

    let response = server
        .request(
            req("POST", "/box/")
                .header("content-type", "text/turtle")
                .body(Body::from("<> <http://example.org/p> \"v\" ."))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    let name = location.rsplit('/').next().unwrap();
    assert_eq!(name.len(), 6);
    assert!(server.tmp.path().join("box").join(name).is_file());
}

#[tokio::test]
async fn test_post_creates_nested_container() {
    let server = setup();
    std::fs::create_dir(server.tmp.path().join("box")).unwrap();

    let response = server
        .request(
            req("POST", "/box/")
                .header("content-type", "text/turtle")
                .header("slug", "notes")
                .header(
                    "link",
                    "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\"",
                )
                .body(Body::from(
                    "<> <http://purl.org/dc/terms/title> \"My notes\" .",
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("http://example.org/box/notes/")
    );
    assert!(server.tmp.path().join("box/notes").is_dir());

    // body landed in the container's meta, re-rooted on the container
    let meta = std::fs::read_to_string(server.tmp.path().join("box/notes/.meta")).unwrap();
    assert!(meta.contains("My notes"));
    assert!(meta.contains("http://example.org/box/notes/"));
}

#[tokio::test]
async fn test_put_get_turtle_roundtrip() {
    let server = setup();
    std::fs::create_dir(server.tmp.path().join("store")).unwrap();

    let body = "<http://example.org/store/thing> <http://example.org/name> \"thing\" ;\n\
                <http://example.org/rel> <http://example.org/other> .\n";
    let response = server
        .request(
            req("PUT", "/store/thing")
                .header("content-type", "text/turtle")
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = server
        .request(
            req("GET", "/store/thing")
                .header("accept", "text/turtle")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/turtle")
    );

    let graph = body_graph(response, "http://example.org/store/thing", "text/turtle").await;
    assert_eq!(graph.len(), 2);
    let subject = NamedNode::new("http://example.org/store/thing").unwrap();
    assert!(graph
        .one(
            Some(subject.as_ref().into()),
            Some(NamedNode::new("http://example.org/rel").unwrap().as_ref()),
            Some(NamedNode::new("http://example.org/other").unwrap().as_ref().into()),
        )
        .is_some());
}

#[tokio::test]
async fn test_put_overwrite_is_200() {
    let server = setup();
    let put = |text: &str| {
        req("PUT", "/doc")
            .header("content-type", "text/turtle")
            .body(Body::from(format!(
                "<http://example.org/doc> <http://example.org/p> \"{}\" .",
                text
            )))
            .unwrap()
    };
    assert_eq!(server.request(put("one")).await.status(), StatusCode::CREATED);
    assert_eq!(server.request(put("two")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_etag_stability_and_preconditions() {
    let server = setup();
    std::fs::write(
        server.tmp.path().join("doc"),
        b"<http://example.org/doc> <http://example.org/p> \"original\" .\n",
    )
    .unwrap();

    let head = || req("HEAD", "/doc").body(Body::empty()).unwrap();
    let first = server.request(head()).await;
    let second = server.request(head()).await;
    let etag = first
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert_eq!(
        second.headers().get("etag").and_then(|v| v.to_str().ok()),
        Some(etag.as_str())
    );

    // a write conditioned on an obsolete tag fails and changes nothing
    let response = server
        .request(
            req("PUT", "/doc")
                .header("content-type", "text/turtle")
                .header("if-match", "\"0000000000000000\"")
                .body(Body::from(
                    "<http://example.org/doc> <http://example.org/p> \"clobbered\" .",
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    let content = std::fs::read_to_string(server.tmp.path().join("doc")).unwrap();
    assert!(content.contains("original"));

    // the current tag is accepted
    let response = server
        .request(
            req("PUT", "/doc")
                .header("content-type", "text/turtle")
                .header("if-match", etag)
                .body(Body::from(
                    "<http://example.org/doc> <http://example.org/p> \"updated\" .",
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_patch_sparql_update() {
    let server = setup();
    std::fs::write(
        server.tmp.path().join("doc"),
        b"<http://example.org/doc> <http://example.org/p> \"old\" .\n",
    )
    .unwrap();

    let response = server
        .request(
            req("PATCH", "/doc")
                .header("content-type", "application/sparql-update")
                .body(Body::from(
                    "DELETE DATA { <http://example.org/doc> <http://example.org/p> \"old\" . } ;\n\
                     INSERT DATA { <http://example.org/doc> <http://example.org/p> \"new\" . }",
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let content = std::fs::read_to_string(server.tmp.path().join("doc")).unwrap();
    assert!(content.contains("new"));
    assert!(!content.contains("old"));
}

#[tokio::test]
async fn test_patch_json_triple_patch() {
    let server = setup();
    std::fs::write(
        server.tmp.path().join("doc"),
        b"<http://example.org/doc> <http://example.org/p> \"old\" .\n",
    )
    .unwrap();

    let response = server
        .request(
            req("PATCH", "/doc")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"http://example.org/doc": {"http://example.org/p": [{"value": "fresh", "type": "literal"}]}}"#,
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let content = std::fs::read_to_string(server.tmp.path().join("doc")).unwrap();
    assert!(content.contains("fresh"));
    assert!(!content.contains("old"));
}

#[tokio::test]
async fn test_container_listing() {
    let server = setup();
    let dir = server.tmp.path().join("box");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(dir.join("one"), b"<a> <b> <c> .\n").unwrap();
    std::fs::create_dir(dir.join("sub")).unwrap();

    let response = server
        .request(req("GET", "/box/").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let graph = body_graph(response, "http://example.org/box/", "text/turtle").await;

    let root = NamedNode::new("http://example.org/box/").unwrap();
    let contains = NamedNode::new("http://www.w3.org/ns/ldp#contains").unwrap();
    assert_eq!(
        graph
            .all(Some(root.as_ref().into()), Some(contains.as_ref()), None)
            .len(),
        2
    );

    // omitting containment leaves only the root description
    let response = server
        .request(
            req("GET", "/box/")
                .header(
                    "prefer",
                    "return=representation; omit=\"http://www.w3.org/ns/ldp#PreferContainment\"",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(
        response
            .headers()
            .get("preference-applied")
            .and_then(|v| v.to_str().ok()),
        Some("return=representation")
    );
    let graph = body_graph(response, "http://example.org/box/", "text/turtle").await;
    assert!(graph
        .all(Some(root.as_ref().into()), Some(contains.as_ref()), None)
        .is_empty());
}

#[tokio::test]
async fn test_delete_semantics() {
    let server = setup();
    std::fs::write(server.tmp.path().join("doc"), b"x\n").unwrap();

    let response = server
        .request(req("DELETE", "/doc").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!server.tmp.path().join("doc").exists());

    let response = server
        .request(req("DELETE", "/doc").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .request(req("DELETE", "/").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.contains("Cannot DELETE /"));
}

#[tokio::test]
async fn test_delete_leaves_shadows() {
    let server = setup();
    std::fs::write(server.tmp.path().join("doc"), b"x\n").unwrap();
    std::fs::write(server.tmp.path().join("doc.acl"), b"\n").unwrap();
    std::fs::write(server.tmp.path().join("doc.meta"), b"\n").unwrap();

    let response = server
        .request(req("DELETE", "/doc").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(server.tmp.path().join("doc.acl").exists());
    assert!(server.tmp.path().join("doc.meta").exists());
}

#[tokio::test]
async fn test_mkcol() {
    let server = setup();

    let response = server
        .request(req("MKCOL", "/fresh/deep").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(server.tmp.path().join("fresh/deep").is_dir());

    // an existing leaf under the same name conflicts
    std::fs::write(server.tmp.path().join("taken"), b"x\n").unwrap();
    let response = server
        .request(req("MKCOL", "/taken").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_put_on_directory_is_406() {
    let server = setup();
    std::fs::create_dir(server.tmp.path().join("box")).unwrap();

    let response = server
        .request(
            req("PUT", "/box/")
                .header("content-type", "text/turtle")
                .body(Body::from("<a> <b> <c> ."))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    let links: Vec<&str> = response
        .headers()
        .get_all("link")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(links.iter().any(|l| l.contains("describedby")));
}

#[tokio::test]
async fn test_put_with_container_link_creates_directory() {
    let server = setup();
    let response = server
        .request(
            req("PUT", "/boxes/new/")
                .header(
                    "link",
                    "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\"",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(server.tmp.path().join("boxes/new").is_dir());
}

#[tokio::test]
async fn test_post_merges_into_existing_leaf() {
    let server = setup();
    std::fs::write(
        server.tmp.path().join("doc"),
        b"<http://example.org/doc> <http://example.org/p> \"kept\" .\n",
    )
    .unwrap();

    let response = server
        .request(
            req("POST", "/doc")
                .header("content-type", "text/turtle")
                .body(Body::from(
                    "<http://example.org/doc> <http://example.org/q> \"added\" .",
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let content = std::fs::read_to_string(server.tmp.path().join("doc")).unwrap();
    assert!(content.contains("kept"));
    assert!(content.contains("added"));
}
