//! Conversion of response bodies into caller-chosen shapes.
//!
//! # Design
//! The target shape is chosen by type: anything implementing [`Conversion`]
//! can be pulled out of a [`crate::Response`]. The traversal itself uses the
//! `serde_json::Value` implementation to read intermediate documents, so the
//! same failure type covers internal parsing and the caller's final resource.

use serde::de::DeserializeOwned;

/// Errors produced while converting a body.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The body stream could not be read.
    #[error("failed to read response body: {0}")]
    Read(#[from] std::io::Error),

    /// The body is not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The body is not JSON of the requested shape.
    #[error("response body does not match {target}: {source}")]
    Json {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A shape a response body can be converted into.
pub trait Conversion: Sized {
    fn convert(bytes: Vec<u8>) -> Result<Self, ConversionError>;
}

impl Conversion for Vec<u8> {
    fn convert(bytes: Vec<u8>) -> Result<Self, ConversionError> {
        Ok(bytes)
    }
}

impl Conversion for String {
    fn convert(bytes: Vec<u8>) -> Result<Self, ConversionError> {
        Ok(String::from_utf8(bytes)?)
    }
}

impl Conversion for serde_json::Value {
    fn convert(bytes: Vec<u8>) -> Result<Self, ConversionError> {
        from_json(&bytes)
    }
}

/// Deserializes the body into `T` with serde.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned> Conversion for Json<T> {
    fn convert(bytes: Vec<u8>) -> Result<Self, ConversionError> {
        from_json(&bytes).map(Json)
    }
}

fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ConversionError> {
    serde_json::from_slice(bytes).map_err(|source| ConversionError::Json {
        target: std::any::type_name::<T>(),
        source,
    })
}
