//! Flat node-object JSON-LD reader/writer
//!
//! Handles the expanded, flattened shape only: a document is a node object,
//! an array of node objects, or `{"@graph": [...]}`. Each node carries an
//! optional `@id` (blank node when absent or `_:` prefixed), an optional
//! `@type`, and predicate entries whose values are `{"@id"}` / `{"@value"}`
//! objects. Context processing and compaction stay with the out-of-scope
//! graph engine.

use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Literal, NamedNode, Subject, Term, Triple};
use serde_json::{Map, Value};

use super::{Graph, RdfError};

pub(super) fn parse(data: &[u8]) -> Result<Vec<Triple>, RdfError> {
    let doc: Value = serde_json::from_slice(data).map_err(|e| RdfError::JsonLd(e.to_string()))?;
    let nodes = match doc {
        Value::Array(nodes) => nodes,
        Value::Object(ref obj) if obj.contains_key("@graph") => match &obj["@graph"] {
            Value::Array(nodes) => nodes.clone(),
            other => vec![other.clone()],
        },
        node @ Value::Object(_) => vec![node],
        _ => return Err(RdfError::JsonLd("expected node object or array".to_string())),
    };

    let mut triples = Vec::new();
    for node in nodes {
        let Value::Object(node) = node else {
            return Err(RdfError::JsonLd("expected node object".to_string()));
        };
        let subject = node_subject(&node)?;
        for (key, value) in &node {
            match key.as_str() {
                "@id" => {}
                "@type" => {
                    for iri in as_list(value) {
                        let iri = iri
                            .as_str()
                            .ok_or_else(|| RdfError::JsonLd("@type must be an IRI".to_string()))?;
                        triples.push(Triple::new(
                            subject.clone(),
                            rdf::TYPE,
                            NamedNode::new(iri)?,
                        ));
                    }
                }
                predicate => {
                    let predicate = NamedNode::new(predicate)?;
                    for value in as_list(value) {
                        triples.push(Triple::new(
                            subject.clone(),
                            predicate.clone(),
                            object_term(&value)?,
                        ));
                    }
                }
            }
        }
    }
    Ok(triples)
}

fn node_subject(node: &Map<String, Value>) -> Result<Subject, RdfError> {
    match node.get("@id").and_then(Value::as_str) {
        Some(id) => {
            if let Some(label) = id.strip_prefix("_:") {
                Ok(BlankNode::new(label)
                    .map_err(|e| RdfError::JsonLd(e.to_string()))?
                    .into())
            } else {
                Ok(NamedNode::new(id)?.into())
            }
        }
        None => Ok(BlankNode::default().into()),
    }
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn object_term(value: &Value) -> Result<Term, RdfError> {
    match value {
        Value::Object(obj) => {
            if let Some(id) = obj.get("@id").and_then(Value::as_str) {
                if let Some(label) = id.strip_prefix("_:") {
                    return Ok(BlankNode::new(label)
                        .map_err(|e| RdfError::JsonLd(e.to_string()))?
                        .into());
                }
                return Ok(NamedNode::new(id)?.into());
            }
            let Some(v) = obj.get("@value") else {
                return Err(RdfError::JsonLd(
                    "value object needs @id or @value".to_string(),
                ));
            };
            if let Some(lang) = obj.get("@language").and_then(Value::as_str) {
                let text = v
                    .as_str()
                    .ok_or_else(|| RdfError::JsonLd("language-tagged @value must be a string".to_string()))?;
                return Ok(Literal::new_language_tagged_literal(text, lang)
                    .map_err(|e| RdfError::JsonLd(e.to_string()))?
                    .into());
            }
            if let Some(dt) = obj.get("@type").and_then(Value::as_str) {
                let text = scalar_text(v)?;
                return Ok(Literal::new_typed_literal(text, NamedNode::new(dt)?).into());
            }
            Ok(scalar_literal(v)?.into())
        }
        scalar => Ok(scalar_literal(scalar)?.into()),
    }
}

fn scalar_text(value: &Value) -> Result<String, RdfError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(RdfError::JsonLd("unsupported @value".to_string())),
    }
}

fn scalar_literal(value: &Value) -> Result<Literal, RdfError> {
    match value {
        Value::String(s) => Ok(Literal::new_simple_literal(s)),
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            Ok(Literal::new_typed_literal(n.to_string(), xsd::INTEGER))
        }
        Value::Number(n) => Ok(Literal::new_typed_literal(n.to_string(), xsd::DOUBLE)),
        Value::Bool(b) => Ok(Literal::new_typed_literal(b.to_string(), xsd::BOOLEAN)),
        _ => Err(RdfError::JsonLd("unsupported literal value".to_string())),
    }
}

pub(super) fn serialize(graph: &Graph) -> Result<String, RdfError> {
    // group triples by subject, preserving first-seen order
    let mut order: Vec<String> = Vec::new();
    let mut nodes: std::collections::HashMap<String, Map<String, Value>> =
        std::collections::HashMap::new();

    for triple in graph.iter() {
        let id = match &triple.subject {
            oxrdf::SubjectRef::NamedNode(n) => n.as_str().to_string(),
            oxrdf::SubjectRef::BlankNode(b) => format!("_:{}", b.as_str()),
            _ => continue,
        };
        let node = nodes.entry(id.clone()).or_insert_with(|| {
            order.push(id.clone());
            let mut node = Map::new();
            node.insert("@id".to_string(), Value::String(id.clone()));
            node
        });

        if triple.predicate == rdf::TYPE {
            if let oxrdf::TermRef::NamedNode(t) = triple.object {
                let types = node
                    .entry("@type".to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(types) = types {
                    types.push(Value::String(t.as_str().to_string()));
                }
                continue;
            }
        }

        let value = match triple.object {
            oxrdf::TermRef::NamedNode(n) => {
                let mut obj = Map::new();
                obj.insert("@id".to_string(), Value::String(n.as_str().to_string()));
                Value::Object(obj)
            }
            oxrdf::TermRef::BlankNode(b) => {
                let mut obj = Map::new();
                obj.insert("@id".to_string(), Value::String(format!("_:{}", b.as_str())));
                Value::Object(obj)
            }
            oxrdf::TermRef::Literal(l) => {
                let mut obj = Map::new();
                obj.insert(
                    "@value".to_string(),
                    Value::String(l.value().to_string()),
                );
                if let Some(lang) = l.language() {
                    obj.insert("@language".to_string(), Value::String(lang.to_string()));
                } else if l.datatype() != xsd::STRING {
                    obj.insert(
                        "@type".to_string(),
                        Value::String(l.datatype().as_str().to_string()),
                    );
                }
                Value::Object(obj)
            }
            _ => continue,
        };

        let values = node
            .entry(triple.predicate.as_str().to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(values) = values {
            values.push(value);
        }
    }

    let out: Vec<Value> = order
        .into_iter()
        .filter_map(|id| nodes.remove(&id).map(Value::Object))
        .collect();
    serde_json::to_string_pretty(&Value::Array(out)).map_err(|e| RdfError::JsonLd(e.to_string()))
}
