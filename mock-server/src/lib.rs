//! Stub HTTP server for exercising traversals over the network.
//!
//! # Design
//! Every request falls through to a single handler that looks up a [`Stub`]
//! by method and path and records what it received. Tests register stubs up
//! front (or a whole rel chain with [`MockState::follow`]) and afterwards
//! inspect the recorded requests to check which hops were made and with
//! which headers. State sits behind a `parking_lot` lock so it can be driven
//! from synchronous test code while the server runs on its own thread.

pub mod documents;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::net::TcpListener;
use traverson_core::AuthCredential;

/// A canned response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub headers: Vec<(String, String)>,
    /// Expected `Authorization` value; anything else gets a 401 challenge.
    pub required_authorization: Option<String>,
}

impl Stub {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: String::new(),
            headers: Vec::new(),
            required_authorization: None,
        }
    }

    pub fn json(body: &str) -> Self {
        Self::with_content(body, "application/json")
    }

    pub fn hal(body: &str) -> Self {
        Self::with_content(body, "application/hal+json")
    }

    pub fn text(body: &str) -> Self {
        Self::with_content(body, "text/plain")
    }

    fn with_content(body: &str, content_type: &str) -> Self {
        Self {
            content_type: Some(content_type.to_string()),
            body: body.to_string(),
            ..Self::status(200)
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Answer 401 with a Basic challenge unless the request carries these
    /// credentials.
    pub fn require_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.required_authorization = Some(AuthCredential::new(username, password).basic_authorization());
        self
    }
}

/// A request as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A rel passed to [`MockState::follow`] that is not a valid selector.
#[derive(Debug, thiserror::Error)]
#[error("rel `{0}` cannot be stubbed; it must be a valid selector with an index of at most {max}", max = documents::MAX_INDEX)]
pub struct InvalidRel(pub String);

#[derive(Default)]
struct Inner {
    stubs: HashMap<(String, String), Stub>,
    requests: Vec<RecordedRequest>,
}

/// Stub table and request log shared between the server and the test.
#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<RwLock<Inner>>,
}

impl MockState {
    pub fn stub(&self, method: &str, path: &str, stub: Stub) {
        self.inner
            .write()
            .stubs
            .insert((method.to_ascii_uppercase(), path.to_string()), stub);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.read().requests.clone()
    }

    pub fn was_requested(&self, method: &str, path: &str) -> bool {
        self.inner
            .read()
            .requests
            .iter()
            .any(|r| r.method.eq_ignore_ascii_case(method) && r.path == path)
    }

    /// Forgets all stubs and recorded requests.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.stubs.clear();
        inner.requests.clear();
    }

    /// Stubs a HAL chain for `rels`: `/` links to `/1` through the first
    /// rel, `/1` to `/2` through the second, and the last one to
    /// `/resource`, which is left for the test to stub. Returns the stubbed
    /// paths in order.
    pub fn follow<S: AsRef<str>>(&self, base_url: &str, rels: &[S]) -> Result<Vec<String>, InvalidRel> {
        let base_url = base_url.trim_end_matches('/');
        let mut paths = Vec::with_capacity(rels.len());

        for (i, rel) in rels.iter().enumerate() {
            let rel = rel.as_ref();
            let path = chain_path(i);
            let next = if i + 1 == rels.len() {
                "/resource".to_string()
            } else {
                chain_path(i + 1)
            };
            let document = documents::document_for(rel, &format!("{base_url}{next}"), base_url)
                .ok_or_else(|| InvalidRel(rel.to_string()))?;
            self.stub("GET", &path, Stub::hal(&document.to_string()));
            paths.push(path);
        }
        Ok(paths)
    }

    /// Whether every path of a chain of `length` rels was requested.
    pub fn follows_called(&self, length: usize) -> bool {
        (0..length).all(|i| self.was_requested("GET", &chain_path(i)))
    }

    fn record(&self, request: RecordedRequest) -> Option<Stub> {
        let mut inner = self.inner.write();
        let stub = inner
            .stubs
            .get(&(request.method.clone(), request.path.clone()))
            .cloned();
        inner.requests.push(request);
        stub
    }
}

fn chain_path(i: usize) -> String {
    if i == 0 {
        "/".to_string()
    } else {
        format!("/{i}")
    }
}

/// Path under which the recorded requests are listed as JSON.
pub const REQUESTS_PATH: &str = "/__requests";

pub fn app(state: MockState) -> Router {
    Router::new()
        .route(REQUESTS_PATH, get(list_requests))
        .fallback(serve_stub)
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn list_requests(State(state): State<MockState>) -> Json<Vec<RecordedRequest>> {
    Json(state.requests())
}

async fn serve_stub(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect(),
        body: body.to_vec(),
    };
    let authorization = recorded.header("authorization").map(str::to_string);

    let Some(stub) = state.record(recorded) else {
        tracing::debug!(%method, path = uri.path(), "no stub registered");
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(expected) = &stub.required_authorization {
        if authorization.as_deref() != Some(expected.as_str()) {
            tracing::debug!(%method, path = uri.path(), "challenging for credentials");
            return (
                StatusCode::UNAUTHORIZED,
                [("www-authenticate", "Basic realm=\"hal-mock-server\"")],
            )
                .into_response();
        }
    }

    tracing::debug!(%method, path = uri.path(), status = stub.status, "serving stub");
    let status = StatusCode::from_u16(stub.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response_headers = HeaderMap::new();
    if let Some(content_type) = &stub.content_type {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            response_headers.insert(axum::http::header::CONTENT_TYPE, value);
        }
    }
    for (name, value) in &stub.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            response_headers.insert(name, value);
        }
    }
    (status, response_headers, stub.body).into_response()
}

/// A running server on a random local port.
///
/// The server runs on a dedicated thread with its own runtime and lives for
/// the rest of the process.
pub struct MockServer {
    addr: SocketAddr,
    state: MockState,
}

impl MockServer {
    pub fn start() -> Result<Self, std::io::Error> {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = std_listener.local_addr()?;
        std_listener.set_nonblocking(true)?;

        let state = MockState::default();
        let served = state.clone();
        std::thread::spawn(move || {
            let result = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .and_then(|rt| {
                    rt.block_on(async {
                        let listener = TcpListener::from_std(std_listener)?;
                        run(listener, served).await
                    })
                });
            if let Err(err) = result {
                tracing::error!(%err, "mock server stopped");
            }
        });

        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    pub fn state(&self) -> &MockState {
        &self.state
    }

    pub fn stub(&self, method: &str, path: &str, stub: Stub) {
        self.state.stub(method, path, stub);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests()
    }

    pub fn was_requested(&self, method: &str, path: &str) -> bool {
        self.state.was_requested(method, path)
    }

    pub fn reset(&self) {
        self.state.reset();
    }

    pub fn follow<S: AsRef<str>>(&self, rels: &[S]) -> Result<Vec<String>, InvalidRel> {
        self.state.follow(&self.base_url(), rels)
    }

    pub fn follows_called(&self, length: usize) -> bool {
        self.state.follows_called(length)
    }
}
