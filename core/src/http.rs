//! Request and response values exchanged with the transport.
//!
//! # Design
//! [`Request`] is the mutable description a traversal builds up: URL
//! pattern, params, headers, body, credentials. Before each dispatch it is
//! turned into a [`PreparedRequest`] (template expanded, query appended,
//! `Accept` asserted) which is what a [`crate::Transport`] actually sends.
//! The transport answers with a [`Response`] whose body is a single-use
//! reader; converting or dropping the response releases it.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use serde::Serialize;
use url::Url;

use crate::auth::{AuthCredential, AuthCredentials};
use crate::conversion::{Conversion, ConversionError};
use crate::error::{Result, TraversonError};
use crate::template::{TemplateExpander, TemplateParams};

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a request body is sent with this method.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Put | HttpMethod::Post | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request payload and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub content: Vec<u8>,
    pub content_type: String,
}

impl Body {
    pub fn bytes(content: Vec<u8>, content_type: &str) -> Self {
        Self {
            content,
            content_type: content_type.to_string(),
        }
    }

    pub fn text(content: &str, content_type: &str) -> Self {
        Self::bytes(content.as_bytes().to_vec(), content_type)
    }

    /// Serializes `value` as `application/json`.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ConversionError> {
        let content = serde_json::to_vec(value).map_err(|source| ConversionError::Json {
            target: std::any::type_name::<T>(),
            source,
        })?;
        Ok(Self::bytes(content, "application/json"))
    }

    /// Encodes `pairs` as `application/x-www-form-urlencoded`.
    pub fn form<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        Self::bytes(encoded.into_bytes(), "application/x-www-form-urlencoded")
    }
}

/// One HTTP call as configured on a traversal.
///
/// The URL may still contain template expressions; they are expanded by
/// [`Request::prepare`].
#[derive(Debug, Clone)]
pub struct Request {
    url: String,
    method: HttpMethod,
    accept_mime_type: String,
    headers: Vec<(String, String)>,
    query_params: BTreeMap<String, Vec<String>>,
    template_params: TemplateParams,
    body: Option<Body>,
    auth_credentials: AuthCredentials,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: HttpMethod::Get,
            accept_mime_type: "application/hal+json".to_string(),
            headers: Vec::new(),
            query_params: BTreeMap::new(),
            template_params: TemplateParams::new(),
            body: None,
            auth_credentials: AuthCredentials::default(),
        }
    }
}

impl Request {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn set_method(&mut self, method: HttpMethod) {
        self.method = method;
    }

    pub fn accept_mime_type(&self) -> &str {
        &self.accept_mime_type
    }

    pub fn set_accept_mime_type(&mut self, mime_type: &str) {
        self.accept_mime_type = mime_type.to_string();
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Sets a header, replacing any earlier value with exactly the same name.
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    pub fn query_params(&self) -> &BTreeMap<String, Vec<String>> {
        &self.query_params
    }

    /// Appends values to a query param; earlier values are kept.
    pub fn add_query_param(&mut self, name: &str, values: &[&str]) {
        append_values(&mut self.query_params, name, values);
    }

    pub fn template_params(&self) -> &TemplateParams {
        &self.template_params
    }

    /// Appends values to a template param; earlier values are kept.
    pub fn add_template_param(&mut self, name: &str, values: &[&str]) {
        append_values(&mut self.template_params, name, values);
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: Option<Body>) {
        self.body = body;
    }

    pub fn auth_credentials(&self) -> &AuthCredentials {
        &self.auth_credentials
    }

    pub fn add_auth_credential(&mut self, credential: AuthCredential) {
        self.auth_credentials.push(credential);
    }

    /// Assembles the request for dispatch: expand the template, append query
    /// params, then assert the `Accept` header last.
    pub fn prepare(&self, expander: &dyn TemplateExpander) -> Result<PreparedRequest> {
        let expanded = expander.expand(&self.url, &self.template_params);
        let mut url = Url::parse(&expanded).map_err(|source| TraversonError::InvalidUrl {
            url: expanded.clone(),
            source,
        })?;

        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, values) in &self.query_params {
                for value in values {
                    pairs.append_pair(name, value);
                }
            }
        }

        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("accept"))
            .cloned()
            .collect();
        headers.push(("Accept".to_string(), self.accept_mime_type.clone()));

        let body = if self.method.allows_body() {
            self.body.clone()
        } else {
            None
        };

        Ok(PreparedRequest {
            method: self.method,
            url,
            headers,
            body,
            credentials: self.auth_credentials.clone(),
        })
    }
}

fn append_values(params: &mut BTreeMap<String, Vec<String>>, name: &str, values: &[&str]) {
    params
        .entry(name.to_string())
        .or_default()
        .extend(values.iter().map(|v| v.to_string()));
}

/// A request ready to be sent by a transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub credentials: AuthCredentials,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The answer to a dispatched request.
pub struct Response {
    status_code: u16,
    uri: Url,
    headers: BTreeMap<String, String>,
    body: Option<Box<dyn Read + Send>>,
}

impl Response {
    pub fn new(status_code: u16, uri: Url) -> Self {
        Self {
            status_code,
            uri,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Read + Send + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The URL the request was actually sent to.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_successful(&self) -> bool {
        (200..=299).contains(&self.status_code)
    }

    /// Reads the body and converts it. `None` when the response has no body.
    pub fn resource<T: Conversion>(mut self) -> Result<Option<T>, ConversionError> {
        self.take_resource()
    }

    /// Converts the body on success and keeps the body text as the error on
    /// any other status.
    pub fn into_typed<T: Conversion>(mut self) -> Result<TypedResponse<T>> {
        let (resource, error) = if self.is_successful() {
            (self.take_resource::<T>()?, None)
        } else {
            (None, self.take_resource::<String>()?)
        };
        Ok(TypedResponse {
            status_code: self.status_code,
            uri: self.uri,
            headers: self.headers,
            resource,
            error,
        })
    }

    fn take_resource<T: Conversion>(&mut self) -> Result<Option<T>, ConversionError> {
        let Some(mut body) = self.body.take() else {
            return Ok(None);
        };
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)?;
        T::convert(bytes).map(Some)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status_code", &self.status_code)
            .field("uri", &self.uri.as_str())
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// A response whose body has been converted into `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedResponse<T> {
    pub status_code: u16,
    pub uri: Url,
    pub headers: BTreeMap<String, String>,
    /// The converted body of a 2xx response.
    pub resource: Option<T>,
    /// The body text of a non-2xx response.
    pub error: Option<String>,
}

impl<T> TypedResponse<T> {
    pub fn is_successful(&self) -> bool {
        (200..=299).contains(&self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::UriTemplate;
    use std::io::Cursor;

    fn prepare(request: &Request) -> PreparedRequest {
        request.prepare(&UriTemplate).unwrap()
    }

    #[test]
    fn new_request_defaults_to_get_without_body() {
        let request = Request::new("http://localhost:8080/");
        assert_eq!(request.method(), HttpMethod::Get);
        assert!(request.body().is_none());
        assert!(request.headers().is_empty());
    }

    #[test]
    fn headers_overwrite_by_name() {
        let mut request = Request::new("http://localhost/");
        request.add_header("X-Trace", "one");
        request.add_header("X-Other", "x");
        request.add_header("X-Trace", "two");
        assert_eq!(
            request.headers(),
            &[
                ("X-Trace".to_string(), "two".to_string()),
                ("X-Other".to_string(), "x".to_string())
            ]
        );
    }

    #[test]
    fn header_names_are_case_sensitive_in_the_model() {
        let mut request = Request::new("http://localhost/");
        request.add_header("x-trace", "one");
        request.add_header("X-Trace", "two");
        assert_eq!(request.headers().len(), 2);
    }

    #[test]
    fn query_params_are_additive() {
        let mut request = Request::new("http://localhost/");
        request.add_query_param("make", &["volvo"]);
        request.add_query_param("make", &["saab"]);
        request.add_query_param("doors", &["5"]);
        assert_eq!(request.query_params()["make"], vec!["volvo", "saab"]);
        assert_eq!(
            prepare(&request).url.as_str(),
            "http://localhost/?doors=5&make=volvo&make=saab"
        );
    }

    #[test]
    fn template_params_are_additive() {
        let mut request = Request::new("http://localhost/cars{?make*}");
        request.add_template_param("make", &["volvo"]);
        request.add_template_param("make", &["saab"]);
        assert_eq!(
            prepare(&request).url.as_str(),
            "http://localhost/cars?make=volvo&make=saab"
        );
    }

    #[test]
    fn template_is_expanded_before_query_params_are_appended() {
        let mut request = Request::new("http://localhost:8080/{tmp1}/stuff{?tmp2}");
        request.add_template_param("tmp1", &["abc"]);
        request.add_template_param("tmp2", &["123"]);
        request.add_query_param("key1", &["value 1"]);
        assert_eq!(
            prepare(&request).url.as_str(),
            "http://localhost:8080/abc/stuff?tmp2=123&key1=value+1"
        );
    }

    #[test]
    fn accept_header_is_asserted_last() {
        let mut request = Request::new("http://localhost/");
        request.add_header("accept", "text/html");
        request.add_header("X-One", "1");
        request.set_accept_mime_type("application/json");
        let prepared = prepare(&request);
        assert_eq!(
            prepared.headers,
            vec![
                ("X-One".to_string(), "1".to_string()),
                ("Accept".to_string(), "application/json".to_string())
            ]
        );
        assert_eq!(prepared.header("ACCEPT"), Some("application/json"));
    }

    #[test]
    fn body_is_only_sent_with_methods_that_allow_it() {
        let mut request = Request::new("http://localhost/");
        request.set_body(Some(Body::text("payload", "text/plain")));
        assert!(prepare(&request).body.is_none());

        request.set_method(HttpMethod::Patch);
        assert_eq!(prepare(&request).body.unwrap().content, b"payload");
    }

    #[test]
    fn setting_a_body_replaces_the_previous_one() {
        let mut request = Request::new("http://localhost/");
        request.set_body(Some(Body::text("first", "text/plain")));
        request.set_body(Some(Body::text("second", "text/plain")));
        assert_eq!(request.body().unwrap().content, b"second");
    }

    #[test]
    fn relative_url_cannot_be_prepared() {
        let request = Request::new("/relative");
        let err = request.prepare(&UriTemplate).unwrap_err();
        assert!(matches!(err, TraversonError::InvalidUrl { .. }));
    }

    #[test]
    fn json_body() {
        let body = Body::json(&serde_json::json!({"make": "volvo"})).unwrap();
        assert_eq!(body.content_type, "application/json");
        assert_eq!(body.content, br#"{"make":"volvo"}"#);
    }

    #[test]
    fn form_body() {
        let body = Body::form([("make", "volvo"), ("model", "v 70")]);
        assert_eq!(body.content_type, "application/x-www-form-urlencoded");
        assert_eq!(body.content, b"make=volvo&model=v+70");
    }

    #[test]
    fn success_range() {
        let uri = Url::parse("http://localhost/").unwrap();
        assert!(Response::new(200, uri.clone()).is_successful());
        assert!(Response::new(299, uri.clone()).is_successful());
        assert!(!Response::new(199, uri.clone()).is_successful());
        assert!(!Response::new(300, uri).is_successful());
    }

    #[test]
    fn resource_without_body_is_none() {
        let response = Response::new(204, Url::parse("http://localhost/").unwrap());
        assert_eq!(response.resource::<String>().unwrap(), None);
    }

    #[test]
    fn typed_response_keeps_error_text_for_failures() {
        let response = Response::new(500, Url::parse("http://localhost/").unwrap())
            .with_header("Content-Type", "text/plain")
            .with_body(Cursor::new(b"error".to_vec()));
        let typed = response.into_typed::<serde_json::Value>().unwrap();
        assert!(!typed.is_successful());
        assert_eq!(typed.resource, None);
        assert_eq!(typed.error.as_deref(), Some("error"));
        assert_eq!(typed.headers["Content-Type"], "text/plain");
    }

    #[test]
    fn typed_response_converts_success_body() {
        let response = Response::new(200, Url::parse("http://localhost/").unwrap())
            .with_body(Cursor::new(b"response".to_vec()));
        let typed = response.into_typed::<String>().unwrap();
        assert_eq!(typed.resource.as_deref(), Some("response"));
        assert_eq!(typed.error, None);
    }
}
