//! Header mediation
//!
//! Accept negotiation, Prefer parsing, Link relation extraction, and the
//! If-Match / If-None-Match precondition gates. The truth tables here are
//! load-bearing: an absent header always passes, and a missing ETag (new
//! resource) passes everything.

use http::HeaderMap;

/// Serializations offered to Accept negotiation. Turtle is the default and
/// HTML selects the skin/index paths rather than a graph serialization.
pub const SERIALIZATIONS: &[&str] = &[
    "text/turtle",
    "text/n3",
    "application/ld+json",
    "application/n-triples",
    "text/html",
];

/// Media types a request body can be parsed from (the 415 gate).
pub const BODY_PARSERS: &[&str] = &[
    "text/turtle",
    "text/n3",
    "application/ld+json",
    "application/sparql-update",
    "application/json",
];

pub fn has_body_parser(media_type: &str) -> bool {
    BODY_PARSERS.contains(&media_type)
}

#[derive(Debug, Clone, PartialEq)]
struct AcceptItem {
    main: String,
    sub: String,
    q: f32,
}

fn parse_accept(header: &str) -> Vec<AcceptItem> {
    let mut items: Vec<AcceptItem> = Vec::new();
    for part in header.split(',') {
        let mut segments = part.split(';');
        let Some(range) = segments.next() else {
            continue;
        };
        let Some((main, sub)) = range.trim().split_once('/') else {
            continue;
        };
        let mut q = 1.0f32;
        for param in segments {
            if let Some((key, value)) = param.trim().split_once('=') {
                if key.trim() == "q" {
                    q = value.trim().parse().unwrap_or(0.0);
                }
            }
        }
        items.push(AcceptItem {
            main: main.trim().to_string(),
            sub: sub.trim().to_string(),
            q,
        });
    }
    // stable: equal q keeps header order
    items.sort_by(|a, b| b.q.partial_cmp(&a.q).unwrap_or(std::cmp::Ordering::Equal));
    items
}

/// Pick the response serialization. `None` means 406.
///
/// Absent Accept, or a leading `*/*`, defaults to turtle.
pub fn response_type(headers: &HeaderMap) -> Option<String> {
    let Some(header) = headers
        .get(http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
    else {
        return Some("text/turtle".to_string());
    };
    let items = parse_accept(header);
    let Some(first) = items.first() else {
        return Some("text/turtle".to_string());
    };
    if first.sub == "*" && first.main == "*" {
        return Some("text/turtle".to_string());
    }

    for item in &items {
        if item.q <= 0.0 {
            continue;
        }
        if item.main == "*" && item.sub == "*" {
            return Some(SERIALIZATIONS[0].to_string());
        }
        for supported in SERIALIZATIONS {
            let (main, sub) = supported.split_once('/').unwrap_or((supported, ""));
            if item.main == main && (item.sub == sub || item.sub == "*") {
                return Some(supported.to_string());
            }
        }
    }
    None
}

/// If-Match gate. Passes when the resource has no ETag yet, the header is
/// absent, or any listed tag is `*` or the current one.
pub fn if_match(headers: &HeaderMap, etag: &str) -> bool {
    if etag.is_empty() {
        return true;
    }
    let Some(header) = headers
        .get(http::header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return true;
    };
    header
        .split(',')
        .map(str::trim)
        .any(|tag| tag == "*" || tag == etag)
}

/// If-None-Match gate. Passes when the header is absent or some listed tag
/// is neither `*` nor the current one.
pub fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    if etag.is_empty() {
        return true;
    }
    let Some(header) = headers
        .get(http::header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return true;
    };
    header
        .split(',')
        .map(str::trim)
        .any(|tag| tag != "*" && tag != etag)
}

/// Container representation choices from `Prefer`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preferences {
    pub containment: bool,
    pub empty_container: bool,
    /// a recognized directive was seen; echo `Preference-Applied`
    pub applied: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            containment: true,
            empty_container: false,
            applied: false,
        }
    }
}

const PREFER_CONTAINMENT: &str = common::ns::ldp::PREFER_CONTAINMENT;
const PREFER_EMPTY: &str = common::ns::ldp::PREFER_EMPTY_CONTAINER;

pub fn preferences(headers: &HeaderMap) -> Preferences {
    let mut prefs = Preferences::default();
    let Some(header) = headers.get("prefer").and_then(|v| v.to_str().ok()) else {
        return prefs;
    };

    for part in header.split(',') {
        for segment in part.split(';') {
            let segment = segment.trim();
            let (include, tokens) = if let Some(rest) = segment.strip_prefix("include=") {
                (true, rest)
            } else if let Some(rest) = segment.strip_prefix("omit=") {
                (false, rest)
            } else {
                continue;
            };
            for token in tokens.trim_matches('"').split_whitespace() {
                match token {
                    PREFER_CONTAINMENT => {
                        prefs.containment = include;
                        prefs.applied = true;
                    }
                    PREFER_EMPTY => {
                        prefs.empty_container = include;
                        prefs.applied = true;
                    }
                    _ => {}
                }
            }
        }
    }
    prefs
}

/// First `Link` target carrying `rel="<rel>"`.
pub fn link_rel(headers: &HeaderMap, rel: &str) -> Option<String> {
    for header in headers.get_all(http::header::LINK) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for part in header.split(',') {
            let mut segments = part.split(';');
            let Some(target) = segments.next() else {
                continue;
            };
            let target = target.trim();
            let target = target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(target);
            for param in segments {
                let Some((key, value)) = param.trim().split_once('=') else {
                    continue;
                };
                if key.trim() == "rel" && value.trim().trim_matches('"') == rel {
                    return Some(target.to_string());
                }
            }
        }
    }
    None
}
