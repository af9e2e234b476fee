//! Hypermedia traversal core.
//!
//! # Overview
//! Starting from a URL, a traversal GETs each resource, finds the link for
//! the next rel in the document and moves on, then issues the terminal
//! request (GET, PUT, POST, PATCH or DELETE) against the last URL found.
//! The core performs no I/O of its own: requests are handed to a
//! [`Transport`] implementation (see the `traverson-ureq` crate).
//!
//! # Design
//! - [`Traverson`] holds the transport; [`Traverson::from`] starts a fresh
//!   [`TraversonBuilder`] per traversal, consumed by its terminal method.
//! - Rels are parsed into [`RelSelector`]s (`name`, `name[index]`,
//!   `name[key:value]`) and resolved by a [`LinkDiscoverer`] chosen through
//!   [`ContentType`].
//! - [`Request::prepare`] expands URI templates, appends query params and
//!   asserts the `Accept` header before every dispatch.
//! - Failures are reported as [`TraversonError`] so callers can tell a missing
//!   link from a bad status, a transport fault or an unconvertible body.
//!
//! ```ignore
//! use traverson_core::{Response, Traverson};
//!
//! let traverson = Traverson::new(transport);
//! let car = traverson
//!     .from("http://localhost:8080/")
//!     .json_hal()
//!     .follow(["cars", "cars[make:volvo]"])
//!     .with_query_param("colour", &["red"])
//!     .get(Response::into_typed::<String>)?;
//! ```

pub mod auth;
pub mod builder;
pub mod client;
pub mod conversion;
pub mod error;
pub mod http;
pub mod link;
pub mod template;

pub use auth::{AuthCredential, AuthCredentials, AuthScope};
pub use builder::{ContentType, Traverson, TraversonBuilder};
pub use client::{Transport, TransportError};
pub use conversion::{Conversion, ConversionError, Json};
pub use error::{Result, TraversonError};
pub use http::{Body, HttpMethod, PreparedRequest, Request, Response, TypedResponse};
pub use link::{BasicLinkDiscoverer, HalLinkDiscoverer, LinkDiscoverer, LinkError, RelSelector};
pub use template::{TemplateExpander, TemplateParams, UriTemplate};
