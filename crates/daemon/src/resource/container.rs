//! Container representation
//!
//! Builds the RDF view of a directory: POSIX stat facts, sidecar metadata,
//! and Prefer-filtered containment. The same root assembly serves plain
//! listings and glob responses; glob children are additionally filtered by
//! pattern and per-child ACL.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::UNIX_EPOCH;

use common::prelude::*;
use common::ns::{ldp, stat};
use oxrdf::vocab::rdf;
use oxrdf::{Literal, NamedNode};

use super::media::MediaTypes;
use super::pathinfo::{resolve, PathInfo};
use crate::service_config::Config;
use crate::wac::{AccessControl, AccessDecision, Mode};

/// Containment and annotation choices from the `Prefer` header.
#[derive(Debug, Clone, Copy)]
pub struct ListingOptions {
    pub containment: bool,
    pub empty_container: bool,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            containment: true,
            empty_container: false,
        }
    }
}

/// Root triples every container carries: its types, stat facts, and the
/// sidecar metadata (statements about the meta document itself are lifted
/// onto the container).
pub fn render_root(resource: &PathInfo) -> Graph {
    let mut g = Graph::new(resource.uri.clone());
    let Ok(root) = NamedNode::new(&resource.uri) else {
        return g;
    };

    g.add(root.clone(), rdf::TYPE, stat::DIRECTORY);
    g.add(root.clone(), rdf::TYPE, ldp::CONTAINER);
    g.add(root.clone(), rdf::TYPE, ldp::BASIC_CONTAINER);

    if let Ok(meta) = fs::metadata(&resource.file) {
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        g.add(
            root.clone(),
            stat::MTIME,
            Literal::new_simple_literal(mtime.to_string()),
        );
        g.add(
            root.clone(),
            stat::SIZE,
            Literal::new_simple_literal(meta.len().to_string()),
        );
    }

    let mut sidecar = Graph::new(resource.meta_uri.clone());
    sidecar.read_file(&resource.meta_file);
    if let Ok(meta_node) = NamedNode::new(&resource.meta_uri) {
        let meta_subject: oxrdf::Subject = meta_node.into();
        for triple in sidecar.all(None, None, None) {
            if triple.subject == meta_subject {
                g.add(root.clone(), triple.predicate, triple.object);
            } else {
                g.insert(&triple);
            }
        }
    }

    g
}

/// Full directory listing.
pub fn render_listing(
    config: &Config,
    media: &MediaTypes,
    resource: &PathInfo,
    opts: ListingOptions,
) -> Graph {
    let mut g = render_root(resource);
    let Ok(root) = NamedNode::new(&resource.uri) else {
        return g;
    };

    let Ok(entries) = fs::read_dir(&resource.file) else {
        return g;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let child_uri = if is_dir {
            format!("{}{}/", resource.uri, name)
        } else {
            format!("{}{}", resource.uri, name)
        };
        let Ok(child) = resolve(config, media, &child_uri) else {
            continue;
        };
        let Ok(node) = NamedNode::new(&child.uri) else {
            continue;
        };

        if !opts.empty_container {
            if is_dir {
                g.add(node.clone(), rdf::TYPE, stat::DIRECTORY);
                g.add(node.clone(), rdf::TYPE, ldp::BASIC_CONTAINER);
                g.add(node.clone(), rdf::TYPE, ldp::CONTAINER);

                let mut sidecar = Graph::new(child.uri.clone());
                sidecar.read_file(&child.meta_file);
                for t in sidecar.all(Some(node.as_ref().into()), Some(rdf::TYPE), None) {
                    g.add(node.clone(), rdf::TYPE, t.object);
                }
            } else {
                g.add(node.clone(), rdf::TYPE, stat::FILE);
                if child.file_type.as_deref() == Some("text/plain")
                    && starts_with_prefix_line(&child.file)
                {
                    let mut doc = Graph::new(child.uri.clone());
                    doc.read_file(&child.file);
                    for t in doc.all(Some(node.as_ref().into()), Some(rdf::TYPE), None) {
                        g.add(node.clone(), rdf::TYPE, t.object);
                    }
                }
            }

            if let Ok(meta) = entry.metadata() {
                let mtime = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                g.add(
                    node.clone(),
                    stat::MTIME,
                    Literal::new_simple_literal(mtime.to_string()),
                );
                g.add(
                    node.clone(),
                    stat::SIZE,
                    Literal::new_simple_literal(meta.len().to_string()),
                );
            }
        }

        if opts.containment {
            g.add(root.clone(), ldp::CONTAINS, node);
        }
    }

    g
}

/// Glob response: the container root plus every pattern-matched, readable
/// RDF child, with its triples inlined.
pub async fn render_glob(
    config: &Config,
    media: &MediaTypes,
    resource: &PathInfo,
    pattern: &str,
    acl: &AccessControl,
) -> Graph {
    let mut g = render_root(resource);
    let Ok(root) = NamedNode::new(&resource.uri) else {
        return g;
    };

    let Ok(matches) = glob::glob(pattern) else {
        return g;
    };
    for file in matches.filter_map(|m| m.ok()) {
        let Ok(stat) = fs::metadata(&file) else {
            continue;
        };
        if stat.is_dir() {
            continue;
        }
        if media.detect(&file) != "text/plain" {
            continue;
        }
        let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Ok(child) = resolve(config, media, &format!("{}{}", resource.uri, name)) else {
            continue;
        };
        if !matches!(
            acl.allow(Mode::Read, &child.uri).await,
            Ok(AccessDecision::Allow)
        ) {
            continue;
        }

        let mut doc = Graph::new(child.uri.clone());
        doc.read_file(&child.file);
        g.merge(&doc);
        if let Ok(node) = NamedNode::new(&child.uri) {
            g.add(root.clone(), ldp::CONTAINS, node);
        }
    }

    g
}

/// True when the file's first line opens with `@prefix` (the turtle tell
/// used to lift types from extension-less text files).
fn starts_with_prefix_line(path: &Path) -> bool {
    let Ok(file) = fs::File::open(path) else {
        return false;
    };
    let mut line = String::new();
    if BufReader::new(file).read_line(&mut line).is_err() {
        return false;
    }
    line.starts_with("@prefix")
}

#[cfg(test)]
mod test {
    use super::*;
    use oxrdf::NamedNodeRef;

    fn setup() -> (Config, MediaTypes, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("box");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("plain"), b"just text\n").unwrap();
        std::fs::write(
            dir.join("card"),
            b"@prefix foaf: <http://xmlns.com/foaf/0.1/> .\n<> a foaf:PersonalProfileDocument .\n",
        )
        .unwrap();
        std::fs::create_dir(dir.join("sub")).unwrap();
        let config = Config {
            data_root: tmp.path().to_path_buf(),
            ..Config::default()
        };
        (config, MediaTypes::default(), tmp)
    }

    fn node(uri: &str) -> NamedNode {
        NamedNode::new(uri).unwrap()
    }

    #[test]
    fn test_listing_contains_children() {
        let (config, media, _tmp) = setup();
        let resource = resolve(&config, &media, "https://example.org/box/").unwrap();
        let g = render_listing(&config, &media, &resource, ListingOptions::default());

        let root = node("https://example.org/box/");
        assert!(g
            .one(
                Some(root.as_ref().into()),
                Some(ldp::CONTAINS),
                Some(node("https://example.org/box/plain").as_ref().into()),
            )
            .is_some());
        assert!(g
            .one(
                Some(root.as_ref().into()),
                Some(ldp::CONTAINS),
                Some(node("https://example.org/box/sub/").as_ref().into()),
            )
            .is_some());
        // stat annotations present by default
        assert!(g
            .one(
                Some(node("https://example.org/box/plain").as_ref().into()),
                Some(stat::SIZE),
                None,
            )
            .is_some());
    }

    #[test]
    fn test_prefix_peek_lifts_types() {
        let (config, media, _tmp) = setup();
        let resource = resolve(&config, &media, "https://example.org/box/").unwrap();
        let g = render_listing(&config, &media, &resource, ListingOptions::default());

        let profile_doc =
            NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/PersonalProfileDocument");
        assert!(g
            .one(
                Some(node("https://example.org/box/card").as_ref().into()),
                Some(rdf::TYPE),
                Some(profile_doc.into()),
            )
            .is_some());
        // the non-turtle sibling only gets the stat type
        assert!(g
            .one(
                Some(node("https://example.org/box/plain").as_ref().into()),
                Some(rdf::TYPE),
                Some(stat::FILE.into()),
            )
            .is_some());
    }

    #[test]
    fn test_empty_container_preference() {
        let (config, media, _tmp) = setup();
        let resource = resolve(&config, &media, "https://example.org/box/").unwrap();
        let g = render_listing(
            &config,
            &media,
            &resource,
            ListingOptions {
                containment: true,
                empty_container: true,
            },
        );
        assert!(g
            .one(None, Some(ldp::CONTAINS), None)
            .is_some());
        assert!(g
            .one(
                Some(node("https://example.org/box/plain").as_ref().into()),
                Some(stat::SIZE),
                None,
            )
            .is_none());
    }

    #[test]
    fn test_containment_can_be_omitted() {
        let (config, media, _tmp) = setup();
        let resource = resolve(&config, &media, "https://example.org/box/").unwrap();
        let g = render_listing(
            &config,
            &media,
            &resource,
            ListingOptions {
                containment: false,
                empty_container: false,
            },
        );
        assert!(g.one(None, Some(ldp::CONTAINS), None).is_none());
        // root typing always present
        assert!(g
            .one(
                Some(node("https://example.org/box/").as_ref().into()),
                Some(rdf::TYPE),
                Some(ldp::BASIC_CONTAINER.into()),
            )
            .is_some());
    }

    #[test]
    fn test_sidecar_meta_merges_onto_root() {
        let (config, media, tmp) = setup();
        std::fs::write(
            tmp.path().join("box/.meta"),
            b"<https://example.org/box/.meta> <https://example.org/note> \"hello\" .\n",
        )
        .unwrap();
        let resource = resolve(&config, &media, "https://example.org/box/").unwrap();
        let g = render_root(&resource);
        assert!(g
            .one(
                Some(node("https://example.org/box/").as_ref().into()),
                Some(NamedNodeRef::new_unchecked("https://example.org/note")),
                None,
            )
            .is_some());
    }
}
