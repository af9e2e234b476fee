//! Error types for link traversal.
//!
//! # Design
//! Callers need to tell four failures apart because each calls for a
//! different fix: a rel that could not be found (fix the rel path), a hop that
//! answered with a non-2xx status, a transport fault (possibly transient,
//! retry outside this crate) and a body that did not convert (fix the target
//! type). Configuration mistakes such as an unparsable auth hostname or a
//! starting URL that is not absolute get their own variants and are reported
//! before any request is dispatched.

use url::Url;

use crate::client::TransportError;
use crate::conversion::ConversionError;
use crate::link::LinkError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = TraversonError> = std::result::Result<T, E>;

/// Errors returned by a traversal.
#[derive(Debug, thiserror::Error)]
pub enum TraversonError {
    /// A rel selector could not be resolved against the current resource.
    #[error("unknown rel `{rel}` at position {position}: {source}")]
    UnknownRel {
        rel: String,
        /// Zero-based position of the rel in the chain.
        position: usize,
        #[source]
        source: LinkError,
    },

    /// An intermediate hop returned a status outside 2xx.
    #[error("HTTP {status} returned by {uri} while traversing")]
    IllegalHttpStatus { status: u16, uri: Url },

    /// The transport could not complete a call.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response body could not be converted into the requested shape.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The expanded URL is not a valid absolute URL.
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The traversal was configured with a value that can never work.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl TraversonError {
    /// Whether retrying the whole traversal later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TraversonError::Transport(_))
    }
}
