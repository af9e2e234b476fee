use traverson_core::{Body, HttpMethod, PreparedRequest, Response, Transport, TransportError};
use ureq::typestate::WithBody;
use ureq::{RequestBuilder, ResponseExt};
use url::Url;

use crate::config::TransportConfig;

/// Sends prepared requests with a shared `ureq` agent.
///
/// Connections are pooled by the agent, so one transport should be reused
/// across traversals.
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: Option<String>,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Self {
        // Statuses are data here; the traversal interprets them.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: config.user_agent,
        }
    }

    fn send(&self, request: &PreparedRequest, authorization: Option<&str>) -> Result<Response, TransportError> {
        let url = request.url.as_str();
        let headers = self.headers_for(request, authorization);
        tracing::debug!(method = %request.method, %url, authorized = authorization.is_some(), "dispatching");

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), &headers).call(),
            HttpMethod::Post => send_body(with_headers(self.agent.post(url), &headers), request.body.as_ref()),
            HttpMethod::Put => send_body(with_headers(self.agent.put(url), &headers), request.body.as_ref()),
            HttpMethod::Patch => send_body(with_headers(self.agent.patch(url), &headers), request.body.as_ref()),
        };
        let response =
            result.map_err(|err| TransportError::with_source(format!("{} {url}", request.method), err))?;

        // After redirects the final URI is the base for relative links.
        let uri = Url::parse(&response.get_uri().to_string()).unwrap_or_else(|_| request.url.clone());
        let mut captured = Response::new(response.status().as_u16(), uri);
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                captured = captured.with_header(name.as_str(), value);
            }
        }

        // The body is streamed to whoever converts it, without a size cap.
        if has_body(&response) {
            captured = captured.with_body(response.into_body().into_reader());
        }
        Ok(captured)
    }

    fn headers_for(&self, request: &PreparedRequest, authorization: Option<&str>) -> Vec<(String, String)> {
        let mut headers = request.headers.clone();
        if let Some(user_agent) = &self.user_agent {
            if request.header("user-agent").is_none() {
                headers.push(("User-Agent".to_string(), user_agent.clone()));
            }
        }
        if let Some(authorization) = authorization {
            headers.push(("Authorization".to_string(), authorization.to_string()));
        }
        headers
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: PreparedRequest) -> Result<Response, TransportError> {
        // An explicit Authorization header wins over configured credentials.
        let credential = match request.header("authorization") {
            Some(_) => None,
            None => request.credentials.select(&request.url),
        };

        if let Some(credential) = credential.filter(|c| c.is_preemptive()) {
            return self.send(&request, Some(&credential.basic_authorization()));
        }

        let response = self.send(&request, None)?;
        match credential {
            Some(credential) if is_basic_challenge(&response) => {
                tracing::debug!(url = %request.url, username = credential.username(), "answering basic auth challenge");
                self.send(&request, Some(&credential.basic_authorization()))
            }
            _ => Ok(response),
        }
    }
}

fn is_basic_challenge(response: &Response) -> bool {
    response.status_code() == 401
        && response
            .header("www-authenticate")
            .is_some_and(|challenge| challenge.trim_start().to_ascii_lowercase().starts_with("basic"))
}

fn has_body(response: &ureq::http::Response<ureq::Body>) -> bool {
    let status = response.status().as_u16();
    let declared_empty = response
        .headers()
        .get(ureq::http::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|length| length.trim() == "0");
    !(status == 204 || status == 304 || declared_empty)
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: RequestBuilder<WithBody>,
    body: Option<&Body>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder
            .content_type(body.content_type.as_str())
            .send(&body.content[..]),
        None => builder.send_empty(),
    }
}
