//! The RDF graph collaborator
//!
//! A `Graph` is an `oxrdf` triple set bound to the URI of the document it
//! represents. The server core only depends on the operations here: quad
//! pattern queries, tolerant file reads, mime-keyed parse/serialize, and the
//! two mutation formats accepted by PATCH (triple-level JSON patches and a
//! ground-data SPARQL-Update subset).
//!
//! Stored documents are canonical turtle; turtle is also the default wire
//! serialization.

mod jsonld;
mod patch;
mod sparql;

use std::fs;
use std::io::Write;
use std::path::Path;

use oxrdf::{NamedNode, NamedNodeRef, Subject, SubjectRef, Term, TermRef, Triple, TripleRef};

/// Media types this module can parse into a graph.
pub const PARSEABLE: &[&str] = &["text/turtle", "text/n3", "application/ld+json"];

/// Media types this module can serialize a graph into.
pub const SERIALIZABLE: &[&str] = &[
    "text/turtle",
    "text/n3",
    "application/ld+json",
    "application/n-triples",
];

#[derive(Debug, thiserror::Error)]
pub enum RdfError {
    #[error("invalid IRI: {0}")]
    Iri(#[from] oxrdf::IriParseError),
    #[error("turtle error: {0}")]
    Turtle(#[from] oxttl::TurtleParseError),
    #[error("JSON-LD error: {0}")]
    JsonLd(String),
    #[error("malformed patch document: {0}")]
    Patch(String),
    #[error("malformed SPARQL update: {0}")]
    SparqlUpdate(String),
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("serialized graph is not valid UTF-8")]
    Encoding,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A triple set bound to the URI of the document it represents
///
/// The URI doubles as the base IRI for parsing relative references.
#[derive(Debug)]
pub struct Graph {
    uri: String,
    triples: oxrdf::Graph,
}

impl Clone for Graph {
    fn clone(&self) -> Self {
        let mut triples = oxrdf::Graph::new();
        for triple in self.triples.iter() {
            triples.insert(triple);
        }
        Self {
            uri: self.uri.clone(),
            triples,
        }
    }
}

impl Graph {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            triples: oxrdf::Graph::new(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn add(
        &mut self,
        subject: impl Into<Subject>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
    ) {
        self.triples
            .insert(&Triple::new(subject, predicate, object));
    }

    pub fn insert(&mut self, triple: &Triple) {
        self.triples.insert(triple);
    }

    pub fn remove(&mut self, triple: &Triple) {
        self.triples.remove(triple);
    }

    pub fn iter(&self) -> impl Iterator<Item = TripleRef<'_>> {
        self.triples.iter()
    }

    /// Copy every triple of `other` into this graph.
    pub fn merge(&mut self, other: &Graph) {
        for triple in other.iter() {
            self.triples.insert(triple);
        }
    }

    /// Quad-pattern query: `None` positions are wildcards.
    pub fn all(
        &self,
        subject: Option<SubjectRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Vec<Triple> {
        self.triples
            .iter()
            .filter(|t| {
                subject.map_or(true, |s| t.subject == s)
                    && predicate.map_or(true, |p| t.predicate == p)
                    && object.map_or(true, |o| t.object == o)
            })
            .map(|t| t.into_owned())
            .collect()
    }

    /// First match for a quad pattern, if any.
    pub fn one(
        &self,
        subject: Option<SubjectRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Option<Triple> {
        self.triples
            .iter()
            .find(|t| {
                subject.map_or(true, |s| t.subject == s)
                    && predicate.map_or(true, |p| t.predicate == p)
                    && object.map_or(true, |o| t.object == o)
            })
            .map(|t| t.into_owned())
    }

    /// Read a stored turtle document into this graph.
    ///
    /// Tolerant by contract: a missing or unparseable file leaves the graph
    /// untouched, so an absent `.acl` reads as the empty policy.
    pub fn read_file(&mut self, path: &Path) {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(_) => return,
        };
        let mut staged = Graph::new(self.uri.clone());
        match staged.parse(&data, "text/turtle") {
            Ok(()) => self.merge(&staged),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unparseable document");
            }
        }
    }

    /// Parse `data` in the given media type, adding its triples.
    pub fn parse(&mut self, data: &[u8], media_type: &str) -> Result<(), RdfError> {
        match media_type {
            "text/turtle" | "text/n3" => {
                let parser = match oxttl::TurtleParser::new().with_base_iri(self.uri.clone()) {
                    Ok(parser) => parser,
                    Err(_) => oxttl::TurtleParser::new(),
                };
                for triple in parser.for_reader(data) {
                    self.triples.insert(&triple?);
                }
                Ok(())
            }
            "application/ld+json" => {
                for triple in jsonld::parse(data)? {
                    self.triples.insert(&triple);
                }
                Ok(())
            }
            other => Err(RdfError::UnsupportedMediaType(other.to_string())),
        }
    }

    /// Serialize the graph in the given media type.
    pub fn serialize(&self, media_type: &str) -> Result<String, RdfError> {
        match media_type {
            "text/turtle" | "text/n3" => {
                let mut serializer = oxttl::TurtleSerializer::new()
                    .with_prefix("ldp", "http://www.w3.org/ns/ldp#")?
                    .with_prefix("stat", "http://www.w3.org/ns/posix/stat#")?
                    .with_prefix("acl", "http://www.w3.org/ns/auth/acl#")?
                    .for_writer(Vec::new());
                for triple in self.triples.iter() {
                    serializer.serialize_triple(triple)?;
                }
                let buf = serializer.finish()?;
                String::from_utf8(buf).map_err(|_| RdfError::Encoding)
            }
            "application/ld+json" => jsonld::serialize(self),
            "application/n-triples" => Ok(self.triples.to_string()),
            other => Err(RdfError::UnsupportedMediaType(other.to_string())),
        }
    }

    /// Write the graph to `path` atomically (temp file + rename).
    pub fn write_file(&self, path: &Path, media_type: &str) -> Result<(), RdfError> {
        let data = self.serialize(media_type)?;
        let dir = path.parent().ok_or_else(|| {
            RdfError::Io(std::io::Error::other("destination has no parent directory"))
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(path).map_err(|e| RdfError::Io(e.error))?;
        Ok(())
    }

    /// Apply a triple-level JSON patch (`{s: {p: [{value, type}]}}`).
    pub fn json_patch(&mut self, data: &[u8]) -> Result<(), RdfError> {
        patch::apply(self, data)
    }

    /// Apply a SPARQL-Update document (ground `INSERT`/`DELETE` data only).
    pub fn sparql_update(&mut self, body: &str) -> Result<(), RdfError> {
        sparql::apply(self, body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use oxrdf::Literal;

    const DOC: &str = "https://example.org/doc";

    #[test]
    fn test_turtle_roundtrip() {
        let mut g = Graph::new(DOC);
        g.parse(
            b"<https://example.org/a> <https://example.org/p> \"v\" , <https://example.org/b> .",
            "text/turtle",
        )
        .unwrap();
        assert_eq!(g.len(), 2);

        let out = g.serialize("text/turtle").unwrap();
        let mut back = Graph::new(DOC);
        back.parse(out.as_bytes(), "text/turtle").unwrap();
        assert_eq!(back.len(), 2);
        for t in g.iter() {
            assert!(back.one(Some(t.subject), Some(t.predicate), Some(t.object)).is_some());
        }
    }

    #[test]
    fn test_relative_iris_resolve_against_uri() {
        let mut g = Graph::new("https://example.org/dir/doc");
        g.parse(b"<> <https://example.org/p> <other> .", "text/turtle")
            .unwrap();
        let t = g.iter().next().unwrap().into_owned();
        assert_eq!(t.subject.to_string(), "<https://example.org/dir/doc>");
        assert_eq!(t.object.to_string(), "<https://example.org/dir/other>");
    }

    #[test]
    fn test_pattern_queries() {
        let mut g = Graph::new(DOC);
        let s = NamedNode::new("https://example.org/s").unwrap();
        let p = NamedNode::new("https://example.org/p").unwrap();
        g.add(s.clone(), p.clone(), Literal::new_simple_literal("one"));
        g.add(s.clone(), p.clone(), Literal::new_simple_literal("two"));
        g.add(
            NamedNode::new("https://example.org/other").unwrap(),
            p.clone(),
            Literal::new_simple_literal("three"),
        );

        assert_eq!(g.all(Some(s.as_ref().into()), None, None).len(), 2);
        assert_eq!(g.all(None, Some(p.as_ref()), None).len(), 3);
        assert!(g
            .one(
                Some(s.as_ref().into()),
                Some(p.as_ref()),
                Some(Literal::new_simple_literal("two").as_ref().into()),
            )
            .is_some());
        assert!(g
            .one(
                Some(s.as_ref().into()),
                Some(p.as_ref()),
                Some(Literal::new_simple_literal("four").as_ref().into()),
            )
            .is_none());
    }

    #[test]
    fn test_read_file_missing_is_empty() {
        let mut g = Graph::new(DOC);
        g.read_file(Path::new("/nonexistent/file.ttl"));
        assert!(g.is_empty());
    }

    #[test]
    fn test_write_file_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc");

        let mut g = Graph::new(DOC);
        g.parse(
            b"<https://example.org/a> <https://example.org/p> \"v\" .",
            "text/turtle",
        )
        .unwrap();
        g.write_file(&path, "text/turtle").unwrap();

        let mut back = Graph::new(DOC);
        back.read_file(&path);
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn test_unsupported_media_type() {
        let mut g = Graph::new(DOC);
        assert!(matches!(
            g.parse(b"x", "application/zip"),
            Err(RdfError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            g.serialize("application/zip"),
            Err(RdfError::UnsupportedMediaType(_))
        ));
    }
}
