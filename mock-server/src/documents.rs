//! HAL documents that lead a traversal to a chosen href.
//!
//! Each generator handles one selector form. Array forms put decoy links in
//! front of the real one so a client that ignores the index or the property
//! match ends up somewhere it should not.

use serde_json::{json, Value};
use traverson_core::RelSelector;

/// Number of decoy elements placed before a property match.
const PROPERTY_DECOYS: usize = 2;

/// Largest index an index document is generated for; every lower index is a
/// decoy link.
pub const MAX_INDEX: usize = 1024;

/// `{"_links": {"<rel>": {"href": "<href>"}}}`.
pub fn link_document(rel: &str, href: &str) -> Value {
    json!({ "_links": { rel: { "href": href } } })
}

/// A `_links` array whose element at `index` points at `href`, or `None`
/// when `index` exceeds [`MAX_INDEX`].
pub fn array_index_document(name: &str, index: usize, href: &str, base_url: &str) -> Option<Value> {
    if index > MAX_INDEX {
        return None;
    }
    let mut links: Vec<Value> = (0..index)
        .map(|i| json!({ "href": format!("{base_url}/do-not-follow-{i}") }))
        .collect();
    links.push(json!({ "href": href }));
    Some(json!({ "_links": { name: links } }))
}

/// An `_embedded` array whose first element with `key == value` points at
/// `href`, preceded by elements with near-miss values.
pub fn array_property_document(name: &str, key: &str, value: &str, href: &str, base_url: &str) -> Value {
    let mut elements: Vec<Value> = (0..PROPERTY_DECOYS)
        .map(|i| {
            embedded_element(
                key,
                &format!("{value} wrong {i}"),
                &format!("{base_url}/do-not-follow-{i}"),
            )
        })
        .collect();
    elements.push(embedded_element(key, value, href));
    json!({
        "_embedded": { name: elements },
        "_links": { "self": { "href": format!("{base_url}/") } }
    })
}

fn embedded_element(key: &str, value: &str, href: &str) -> Value {
    json!({
        key: value,
        "_links": { "self": { "href": href } }
    })
}

/// The document that resolves `rel` to `href`, or `None` if `rel` is
/// malformed or its index is too large.
pub fn document_for(rel: &str, href: &str, base_url: &str) -> Option<Value> {
    let document = match RelSelector::parse(rel)? {
        RelSelector::ArrayIndex { name, index } => array_index_document(&name, index, href, base_url)?,
        RelSelector::ArrayProperty { name, key, value } => {
            array_property_document(&name, &key, &value, href, base_url)
        }
        RelSelector::Plain(name) => link_document(&name, href),
    };
    Some(document)
}
