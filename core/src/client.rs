//! The seam between the traversal and the network.
//!
//! # Design
//! The core never performs I/O itself. A [`Transport`] receives a fully
//! assembled [`PreparedRequest`] and returns a [`Response`]; how credentials
//! are applied, how connections are pooled and whether anything is retried
//! are the transport's concern. Keeping this a plain synchronous trait lets
//! tests script every response without a server.

use std::fmt;

use crate::http::{PreparedRequest, Response};

/// Executes one prepared request.
///
/// HTTP error statuses are not failures at this level: they come back as a
/// [`Response`] so the traversal can report them with the offending URI.
pub trait Transport {
    fn execute(&self, request: PreparedRequest) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: PreparedRequest) -> Result<Response, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: PreparedRequest) -> Result<Response, TransportError> {
        (**self).execute(request)
    }
}

/// A call could not be completed: connection refused, timeout, protocol error.
#[derive(Debug)]
pub struct TransportError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "transport error: {}: {source}", self.message),
            None => write!(f, "transport error: {}", self.message),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
