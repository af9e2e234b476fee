//! Blocking [`Transport`] for `traverson-core` built on `ureq`.
//!
//! # Design
//! The core hands over a fully prepared request; this crate only moves bytes.
//! Error statuses come back as responses (the traversal decides what they
//! mean), network faults become [`traverson_core::TransportError`]. Basic
//! credentials are applied here because whether to send them up front or
//! only after a challenge is an HTTP concern, not a traversal one.
//!
//! ```ignore
//! let traverson = traverson_ureq::traverson();
//! let name: Option<String> = traverson
//!     .from("http://localhost:3000/")
//!     .follow(["cars", "cars[make:volvo]"])
//!     .get(|response| Ok(response.resource()?))?;
//! ```

mod config;
mod transport;

pub use config::TransportConfig;
pub use transport::UreqTransport;

use traverson_core::Traverson;

/// A [`Traverson`] over a default [`UreqTransport`].
pub fn traverson() -> Traverson<UreqTransport> {
    Traverson::new(UreqTransport::new())
}

pub fn traverson_with_config(config: TransportConfig) -> Traverson<UreqTransport> {
    Traverson::new(UreqTransport::with_config(config))
}

