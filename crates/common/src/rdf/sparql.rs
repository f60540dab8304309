//! Ground-data SPARQL-Update subset
//!
//! Recognizes `INSERT [DATA] { ... }` and `DELETE [DATA] { ... }` operations
//! separated by `;`, with optional leading `PREFIX` declarations. Block
//! bodies must be ground triples; they are handed to the turtle parser with
//! the declared prefixes in scope. Pattern-based updates (`WHERE`,
//! variables) are rejected.

use super::{Graph, RdfError};

#[derive(Debug, PartialEq)]
enum Verb {
    Insert,
    Delete,
}

pub(super) fn apply(graph: &mut Graph, body: &str) -> Result<(), RdfError> {
    let mut prefixes = String::new();
    let mut rest = body.trim_start();

    // PREFIX foo: <iri> declarations, rewritten as turtle @prefix lines
    loop {
        let Some(after) = strip_keyword(rest, "PREFIX") else {
            break;
        };
        let Some(close) = after.find('>') else {
            return Err(RdfError::SparqlUpdate("unterminated PREFIX".to_string()));
        };
        prefixes.push_str("@prefix ");
        prefixes.push_str(after[..=close].trim());
        prefixes.push_str(" .\n");
        rest = after[close + 1..].trim_start();
    }

    let mut ops: Vec<(Verb, &str)> = Vec::new();
    while !rest.is_empty() {
        let (verb, after) = if let Some(after) = strip_keyword(rest, "INSERT") {
            (Verb::Insert, after)
        } else if let Some(after) = strip_keyword(rest, "DELETE") {
            (Verb::Delete, after)
        } else {
            return Err(RdfError::SparqlUpdate(format!(
                "expected INSERT or DELETE near: {}",
                truncated(rest)
            )));
        };
        let after = strip_keyword(after, "DATA").unwrap_or(after);

        let after = after.trim_start();
        if !after.starts_with('{') {
            return Err(RdfError::SparqlUpdate("expected data block".to_string()));
        }
        let (block, after) = take_block(after)?;
        ops.push((verb, block));

        rest = after.trim_start();
        if let Some(after) = rest.strip_prefix(';') {
            rest = after.trim_start();
        } else if !rest.is_empty() {
            return Err(RdfError::SparqlUpdate(format!(
                "trailing content after operation: {}",
                truncated(rest)
            )));
        }
    }

    // parse every block before mutating, so a bad op leaves the graph alone
    let mut staged: Vec<(Verb, Graph)> = Vec::new();
    for (verb, block) in ops {
        let mut data = Graph::new(graph.uri().to_string());
        data.parse(format!("{}{}", prefixes, block).as_bytes(), "text/turtle")?;
        staged.push((verb, data));
    }

    for (verb, data) in staged {
        for triple in data.all(None, None, None) {
            match verb {
                Verb::Insert => graph.insert(&triple),
                Verb::Delete => graph.remove(&triple),
            }
        }
    }
    Ok(())
}

/// Case-insensitive keyword at the head of `input`, returning the remainder.
fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let input = input.trim_start();
    let head = input.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword)
        && input[keyword.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric())
    {
        Some(&input[keyword.len()..])
    } else {
        None
    }
}

/// Split a `{ ... }` block (input must start with `{`), honoring quoted
/// strings so embedded braces do not end the block early.
fn take_block(input: &str) -> Result<(&str, &str), RdfError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[1..i], &input[i + 1..]));
                }
            }
            _ => {}
        }
    }
    Err(RdfError::SparqlUpdate("unterminated data block".to_string()))
}

fn truncated(s: &str) -> String {
    s.chars().take(32).collect()
}

#[cfg(test)]
mod test {
    use super::super::Graph;

    fn seeded() -> Graph {
        let mut g = Graph::new("https://example.org/doc");
        g.parse(
            b"<https://example.org/s> <https://example.org/p> \"old\" .",
            "text/turtle",
        )
        .unwrap();
        g
    }

    #[test]
    fn test_insert_data() {
        let mut g = seeded();
        g.sparql_update(
            "INSERT DATA { <https://example.org/s> <https://example.org/p> \"new\" . }",
        )
        .unwrap();
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_delete_then_insert() {
        let mut g = seeded();
        g.sparql_update(concat!(
            "DELETE DATA { <https://example.org/s> <https://example.org/p> \"old\" . } ;\n",
            "INSERT DATA { <https://example.org/s> <https://example.org/p> \"new\" . }",
        ))
        .unwrap();
        assert_eq!(g.len(), 1);
        assert!(g
            .serialize("application/n-triples")
            .unwrap()
            .contains("\"new\""));
    }

    #[test]
    fn test_prefix_declarations() {
        let mut g = Graph::new("https://example.org/doc");
        g.sparql_update(concat!(
            "PREFIX ex: <https://example.org/>\n",
            "INSERT DATA { ex:s ex:p ex:o . }",
        ))
        .unwrap();
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_braces_inside_literals() {
        let mut g = Graph::new("https://example.org/doc");
        g.sparql_update(
            "INSERT DATA { <https://example.org/s> <https://example.org/p> \"curly } brace\" . }",
        )
        .unwrap();
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_pattern_update_rejected() {
        let mut g = seeded();
        assert!(g
            .sparql_update("DELETE { ?s ?p ?o . } WHERE { ?s ?p ?o . }")
            .is_err());
        // the failed op must not have touched the graph
        assert_eq!(g.len(), 1);
    }
}
