//! Triple-level JSON patch
//!
//! The `application/json` PATCH body is a two-level map:
//!
//! ```json
//! {"https://example.org/s": {"https://example.org/p": [{"value": "o", "type": "uri"}]}}
//! ```
//!
//! For each (subject, predicate) pair the existing objects are replaced by
//! the listed ones; `type` selects between `uri` and `literal` objects.

use std::collections::BTreeMap;

use oxrdf::{Literal, NamedNode, Term};
use serde::Deserialize;

use super::{Graph, RdfError};

#[derive(Debug, Deserialize)]
struct PatchValue {
    value: String,
    #[serde(rename = "type")]
    kind: String,
}

type PatchDocument = BTreeMap<String, BTreeMap<String, Vec<PatchValue>>>;

pub(super) fn apply(graph: &mut Graph, data: &[u8]) -> Result<(), RdfError> {
    let doc: PatchDocument =
        serde_json::from_slice(data).map_err(|e| RdfError::Patch(e.to_string()))?;

    for (subject, predicates) in doc {
        let subject = NamedNode::new(subject)?;
        for (predicate, values) in predicates {
            let predicate = NamedNode::new(predicate)?;
            for stale in graph.all(Some(subject.as_ref().into()), Some(predicate.as_ref()), None) {
                graph.remove(&stale);
            }
            for value in values {
                let object: Term = match value.kind.as_str() {
                    "uri" => NamedNode::new(value.value)?.into(),
                    "literal" => Literal::new_simple_literal(value.value).into(),
                    other => {
                        return Err(RdfError::Patch(format!("unknown value type: {}", other)))
                    }
                };
                graph.add(subject.clone(), predicate.clone(), object);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::super::Graph;

    #[test]
    fn test_patch_replaces_objects() {
        let mut g = Graph::new("https://example.org/doc");
        g.parse(
            b"<https://example.org/s> <https://example.org/p> \"old\" , \"older\" .",
            "text/turtle",
        )
        .unwrap();

        g.json_patch(
            br#"{"https://example.org/s": {"https://example.org/p": [
                {"value": "new", "type": "literal"},
                {"value": "https://example.org/o", "type": "uri"}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(g.len(), 2);
        let out = g.serialize("application/n-triples").unwrap();
        assert!(out.contains("\"new\""));
        assert!(out.contains("<https://example.org/o>"));
        assert!(!out.contains("\"old\""));
    }

    #[test]
    fn test_patch_rejects_unknown_type() {
        let mut g = Graph::new("https://example.org/doc");
        let res = g.json_patch(
            br#"{"https://example.org/s": {"https://example.org/p": [{"value": "x", "type": "bnode"}]}}"#,
        );
        assert!(res.is_err());
    }
}
