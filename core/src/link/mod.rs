//! Locating the next hyperlink inside a resource document.
//!
//! # Design
//! A rel string is parsed once into a [`RelSelector`]; a [`LinkDiscoverer`]
//! then looks the selector up in a parsed JSON document. Two discoverers
//! exist: [`BasicLinkDiscoverer`] for plain JSON (single links only) and
//! [`HalLinkDiscoverer`] which also understands `_embedded` resources and
//! the array selector forms.

mod basic;
mod hal;
mod selector;

use serde_json::Value;

pub use basic::BasicLinkDiscoverer;
pub use hal::HalLinkDiscoverer;
pub use selector::RelSelector;

/// Why a rel could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("selector is malformed")]
    Malformed,

    #[error("selector form is not supported for this content type")]
    Unsupported,

    #[error("no link with this rel")]
    NotFound,

    #[error("rel names an array of links; select one with [index] or [key:value]")]
    Ambiguous,

    #[error("no array with this name")]
    NotAnArray,

    #[error("index {index} is out of range for an array of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no element has {key} equal to `{value}`")]
    NoMatchingElement { key: String, value: String },

    #[error("selected element has no href")]
    MissingHref,
}

/// Resolves a selector against a parsed resource document.
pub trait LinkDiscoverer {
    /// Whether this discoverer can ever resolve selectors of this form.
    fn supports(&self, selector: &RelSelector) -> bool;

    fn find_href(&self, document: &Value, selector: &RelSelector) -> Result<String, LinkError>;
}

/// `document._links.<name>`.
pub(crate) fn link_entry<'a>(document: &'a Value, name: &str) -> Option<&'a Value> {
    document.get("_links")?.get(name)
}

/// `document._embedded.<name>`.
pub(crate) fn embedded_entry<'a>(document: &'a Value, name: &str) -> Option<&'a Value> {
    document.get("_embedded")?.get(name)
}

/// `href` of a `_links` entry.
pub(crate) fn link_href(link: &Value) -> Option<String> {
    link.get("href").and_then(Value::as_str).map(str::to_string)
}

/// `_links.self.href` of an embedded resource. A data field that happens to
/// be called `href` is not a link.
pub(crate) fn self_href(resource: &Value) -> Option<String> {
    link_entry(resource, "self").and_then(link_href)
}
