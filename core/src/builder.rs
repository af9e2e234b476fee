//! The traversal builder.
//!
//! # Design
//! [`Traverson`] is long-lived and shareable; it only holds the transport and
//! the template expander. Every traversal starts from [`Traverson::from`],
//! which hands out a fresh [`TraversonBuilder`] owning its own [`Request`]
//! and rel queue. Configuration methods and terminal methods take the builder
//! by value, so a traversal's state can be consumed exactly once and never
//! shared between concurrent calls.
//!
//! Every intermediate hop is a GET. Headers, params and credentials are
//! configured once and sent with every hop as well as with the terminal
//! request, which is the only one that uses the caller's method and body.

use std::collections::VecDeque;

use serde_json::Value;
use url::Url;

use crate::auth::AuthCredential;
use crate::client::Transport;
use crate::conversion::Conversion;
use crate::error::{Result, TraversonError};
use crate::http::{Body, HttpMethod, Request, Response};
use crate::link::{BasicLinkDiscoverer, HalLinkDiscoverer, LinkDiscoverer, LinkError, RelSelector};
use crate::template::{TemplateExpander, UriTemplate};

/// Media type requested from the server; also picks the link discoverer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    Json,
    #[default]
    Hal,
}

impl ContentType {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Hal => "application/hal+json",
        }
    }

    pub fn discoverer(&self) -> &'static dyn LinkDiscoverer {
        match self {
            ContentType::Json => &BasicLinkDiscoverer,
            ContentType::Hal => &HalLinkDiscoverer,
        }
    }
}

/// Entry point for hypermedia traversals over a transport.
pub struct Traverson<T> {
    transport: T,
    expander: Box<dyn TemplateExpander + Send + Sync>,
}

impl<T: Transport> Traverson<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            expander: Box::new(UriTemplate),
        }
    }

    /// Replaces the default RFC 6570 expander.
    pub fn with_template_expander(
        mut self,
        expander: impl TemplateExpander + Send + Sync + 'static,
    ) -> Self {
        self.expander = Box::new(expander);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Starts a new traversal at `starting_url`.
    pub fn from(&self, starting_url: &str) -> TraversonBuilder<'_> {
        TraversonBuilder {
            transport: &self.transport,
            expander: self.expander.as_ref(),
            content_type: ContentType::default(),
            rels: VecDeque::new(),
            request: Request::new(starting_url),
        }
    }
}

/// Configuration and execution of a single traversal. Not reusable.
pub struct TraversonBuilder<'a> {
    transport: &'a dyn Transport,
    expander: &'a dyn TemplateExpander,
    content_type: ContentType,
    rels: VecDeque<String>,
    request: Request,
}

/// A rel waiting to be followed.
struct Hop {
    position: usize,
    rel: String,
    selector: RelSelector,
}

impl<'a> TraversonBuilder<'a> {
    /// Request `application/json` and follow plain `_links` only.
    pub fn json(self) -> Self {
        self.content_type(ContentType::Json)
    }

    /// Request `application/hal+json` and use HAL lookup rules.
    pub fn json_hal(self) -> Self {
        self.content_type(ContentType::Hal)
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self.request.set_accept_mime_type(content_type.mime_type());
        self
    }

    /// Sets the rels to follow, replacing any set earlier.
    pub fn follow<I, S>(mut self, rels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rels = rels.into_iter().map(Into::into).collect();
        self
    }

    /// Adds query param values; earlier values for the same name are kept.
    pub fn with_query_param(mut self, name: &str, values: &[&str]) -> Self {
        self.request.add_query_param(name, values);
        self
    }

    /// Adds template param values; earlier values for the same name are kept.
    pub fn with_template_param(mut self, name: &str, values: &[&str]) -> Self {
        self.request.add_template_param(name, values);
        self
    }

    /// Sets a header, overwriting an earlier value with the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.request.add_header(name, value);
        self
    }

    /// Basic auth for every host.
    pub fn with_auth(self, username: &str, password: &str) -> Self {
        self.with_credential(AuthCredential::new(username, password))
    }

    /// Adds a credential, typically one scoped with [`AuthCredential::for_host`].
    pub fn with_credential(mut self, credential: AuthCredential) -> Self {
        self.request.add_auth_credential(credential);
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Follows the rels, then GETs the final resource.
    pub fn get<R>(self, handler: impl FnOnce(Response) -> Result<R>) -> Result<R> {
        self.traverse_and_perform(HttpMethod::Get, None, handler)
    }

    /// Follows the rels, then DELETEs the final resource.
    pub fn delete<R>(self, handler: impl FnOnce(Response) -> Result<R>) -> Result<R> {
        self.traverse_and_perform(HttpMethod::Delete, None, handler)
    }

    /// Follows the rels, then PUTs `body` to the final resource.
    pub fn put<R>(self, body: Body, handler: impl FnOnce(Response) -> Result<R>) -> Result<R> {
        self.traverse_and_perform(HttpMethod::Put, Some(body), handler)
    }

    /// Follows the rels, then POSTs `body` to the final resource.
    pub fn post<R>(self, body: Body, handler: impl FnOnce(Response) -> Result<R>) -> Result<R> {
        self.traverse_and_perform(HttpMethod::Post, Some(body), handler)
    }

    /// Follows the rels, then PATCHes `body` to the final resource.
    pub fn patch<R>(self, body: Body, handler: impl FnOnce(Response) -> Result<R>) -> Result<R> {
        self.traverse_and_perform(HttpMethod::Patch, Some(body), handler)
    }

    fn traverse_and_perform<R>(
        mut self,
        method: HttpMethod,
        body: Option<Body>,
        handler: impl FnOnce(Response) -> Result<R>,
    ) -> Result<R> {
        let discoverer = self.content_type.discoverer();
        let mut hops = plan_hops(std::mem::take(&mut self.rels), discoverer)?;

        while let Some(hop) = hops.pop_front() {
            self.request.set_method(HttpMethod::Get);
            let prepared = self.request.prepare(self.expander)?;
            tracing::debug!(rel = %hop.rel, position = hop.position, url = %prepared.url, "following rel");

            let response = self.transport.execute(prepared)?;
            if !response.is_successful() {
                tracing::warn!(
                    status = response.status_code(),
                    uri = %response.uri(),
                    "traversal stopped by unsuccessful hop"
                );
                return Err(TraversonError::IllegalHttpStatus {
                    status: response.status_code(),
                    uri: response.uri().clone(),
                });
            }

            let base = response.uri().clone();
            // A hop without content has no links rather than malformed JSON.
            let document = match response.resource::<Vec<u8>>()? {
                Some(bytes) if !bytes.is_empty() => Value::convert(bytes)?,
                _ => Value::Null,
            };
            let href = discoverer
                .find_href(&document, &hop.selector)
                .map_err(|source| TraversonError::UnknownRel {
                    rel: hop.rel,
                    position: hop.position,
                    source,
                })?;
            // An empty or fragment-only href names the document just fetched;
            // its URI already carries the appended query params.
            if !names_same_document(&href) {
                self.request.set_url(&resolve_href(&base, &href));
            }
        }

        self.request.set_method(method);
        self.request.set_body(body);
        let prepared = self.request.prepare(self.expander)?;
        tracing::debug!(%method, url = %prepared.url, "performing terminal request");
        let response = self.transport.execute(prepared)?;
        handler(response)
    }
}

/// Parses every rel up front so a bad selector fails before any request.
fn plan_hops(rels: VecDeque<String>, discoverer: &dyn LinkDiscoverer) -> Result<VecDeque<Hop>> {
    rels.into_iter()
        .enumerate()
        .map(|(position, rel)| {
            let failure = |source| TraversonError::UnknownRel {
                rel: rel.clone(),
                position,
                source,
            };
            let selector = RelSelector::parse(&rel).ok_or_else(|| failure(LinkError::Malformed))?;
            if !discoverer.supports(&selector) {
                return Err(failure(LinkError::Unsupported));
            }
            Ok(Hop {
                position,
                rel,
                selector,
            })
        })
        .collect()
}

fn names_same_document(href: &str) -> bool {
    href.is_empty() || href.starts_with('#')
}

/// Makes `href` absolute against the URI it was found at. Done on the string
/// so template expressions survive until the next expansion.
fn resolve_href(base: &Url, href: &str) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("{}://{rest}", base.scheme());
    }

    let origin = base.origin().ascii_serialization();
    if href.starts_with('/') {
        return format!("{origin}{href}");
    }
    if href.starts_with('?') {
        return format!("{origin}{}{href}", base.path());
    }

    let path = base.path();
    let directory = &path[..path.rfind('/').map_or(0, |i| i + 1)];
    format!("{origin}{directory}{href}")
}
