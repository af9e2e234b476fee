//! HAL-aware link lookup.
//!
//! Array selectors search `_embedded` before `_links`. An embedded resource
//! is followed through its own `_links.self.href`; when the embedded match
//! has none, the `_links` array of the same name is consulted. Plain
//! selectors read `_links` first and only then look at embedded resources.

use serde_json::Value;

use super::{embedded_entry, link_entry, link_href, self_href, LinkDiscoverer, LinkError, RelSelector};

/// Discoverer for `application/hal+json` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalLinkDiscoverer;

impl LinkDiscoverer for HalLinkDiscoverer {
    fn supports(&self, _selector: &RelSelector) -> bool {
        true
    }

    fn find_href(&self, document: &Value, selector: &RelSelector) -> Result<String, LinkError> {
        match selector {
            RelSelector::ArrayIndex { name, index } => by_index(document, name, *index),
            RelSelector::ArrayProperty { name, key, value } => {
                by_property(document, name, key, value)
            }
            RelSelector::Plain(name) => by_name(document, name),
        }
    }
}

/// Where a candidate element came from, which decides how its href is read.
#[derive(Debug, Clone, Copy)]
enum Source {
    Embedded,
    Links,
}

impl Source {
    fn href(self, element: &Value) -> Option<String> {
        match self {
            Source::Embedded => self_href(element),
            Source::Links => link_href(element),
        }
    }
}

/// Arrays named `name`, embedded first.
fn arrays<'a>(document: &'a Value, name: &str) -> impl Iterator<Item = (Source, &'a Vec<Value>)> {
    [
        (Source::Embedded, embedded_entry(document, name)),
        (Source::Links, link_entry(document, name)),
    ]
    .into_iter()
    .filter_map(|(source, entry)| Some((source, entry?.as_array()?)))
}

// The first failure seen is reported when no array yields an href.
fn by_index(document: &Value, name: &str, index: usize) -> Result<String, LinkError> {
    let mut failure = None;
    for (source, array) in arrays(document, name) {
        let Some(element) = array.get(index) else {
            failure.get_or_insert(LinkError::IndexOutOfRange {
                index,
                len: array.len(),
            });
            continue;
        };
        match source.href(element) {
            Some(href) => return Ok(href),
            None => {
                failure.get_or_insert(LinkError::MissingHref);
            }
        }
    }
    Err(failure.unwrap_or(LinkError::NotAnArray))
}

fn by_property(document: &Value, name: &str, key: &str, value: &str) -> Result<String, LinkError> {
    let mut failure = None;
    for (source, array) in arrays(document, name) {
        let matched = array
            .iter()
            .find(|element| element.get(key).and_then(coerce).as_deref() == Some(value));
        match matched.map(|element| source.href(element)) {
            Some(Some(href)) => return Ok(href),
            Some(None) => {
                failure.get_or_insert(LinkError::MissingHref);
            }
            None => {
                failure.get_or_insert(LinkError::NoMatchingElement {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }
    Err(failure.unwrap_or(LinkError::NotAnArray))
}

fn by_name(document: &Value, name: &str) -> Result<String, LinkError> {
    match link_entry(document, name) {
        Some(Value::Array(_)) => return Err(LinkError::Ambiguous),
        Some(link) => return link_href(link).ok_or(LinkError::MissingHref),
        None => {}
    }

    if let Some(embedded) = embedded_entry(document, name).filter(|e| e.is_object()) {
        return self_href(embedded).ok_or(LinkError::MissingHref);
    }

    // An embedded resource can also be addressed by its `name` field.
    document
        .get("_embedded")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|embedded| embedded.values())
        .flat_map(|entry| match entry {
            Value::Array(elements) => elements.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .find(|element| element.get("name").and_then(Value::as_str) == Some(name))
        .map(|element| self_href(element).ok_or(LinkError::MissingHref))
        .unwrap_or(Err(LinkError::NotFound))
}

/// String form of a scalar JSON value for property matching.
fn coerce(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
