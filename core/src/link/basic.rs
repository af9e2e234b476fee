use serde_json::Value;

use super::{link_entry, link_href, LinkDiscoverer, LinkError, RelSelector};

/// Plain JSON links: `{"_links": {"<rel>": {"href": "..."}}}`.
///
/// Only plain selectors are supported; array selectors are rejected before
/// the traversal starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicLinkDiscoverer;

impl LinkDiscoverer for BasicLinkDiscoverer {
    fn supports(&self, selector: &RelSelector) -> bool {
        matches!(selector, RelSelector::Plain(_))
    }

    fn find_href(&self, document: &Value, selector: &RelSelector) -> Result<String, LinkError> {
        let RelSelector::Plain(name) = selector else {
            return Err(LinkError::Unsupported);
        };
        match link_entry(document, name) {
            Some(Value::Array(_)) => Err(LinkError::Ambiguous),
            Some(link) => link_href(link).ok_or(LinkError::MissingHref),
            None => Err(LinkError::NotFound),
        }
    }
}
