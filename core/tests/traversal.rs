//! Traversal behaviour against a scripted in-memory transport.
//!
//! # Design
//! `ScriptedTransport` answers by URL from a fixed table and records every
//! `PreparedRequest` it receives, so each test can assert exactly which
//! calls were made, in which order and with which headers, params and body.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use traverson_core::{
    AuthCredential, Body, ConversionError, HttpMethod, LinkError, PreparedRequest, Response, Transport,
    TransportError, Traverson, TraversonError,
};

const BASE: &str = "http://localhost:8089";

#[derive(Clone)]
struct Scripted {
    status: u16,
    body: Option<String>,
}

#[derive(Default)]
struct ScriptedTransport {
    responses: HashMap<String, Scripted>,
    requests: RefCell<Vec<PreparedRequest>>,
    fail_with: Option<String>,
    released: RefCell<Vec<Arc<AtomicBool>>>,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self::default()
    }

    fn respond(mut self, path: &str, status: u16, body: &str) -> Self {
        self.responses.insert(
            format!("{BASE}{path}"),
            Scripted {
                status,
                body: Some(body.to_string()),
            },
        );
        self
    }

    fn respond_empty(mut self, path: &str, status: u16) -> Self {
        self.responses
            .insert(format!("{BASE}{path}"), Scripted { status, body: None });
        self
    }

    fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    fn requested_urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.to_string()).collect()
    }

    fn requested_methods(&self) -> Vec<HttpMethod> {
        self.requests.borrow().iter().map(|r| r.method).collect()
    }

    fn all_bodies_released(&self) -> bool {
        self.released.borrow().iter().all(|flag| flag.load(Ordering::SeqCst))
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: PreparedRequest) -> Result<Response, TransportError> {
        let url = request.url.clone();
        self.requests.borrow_mut().push(request);
        if let Some(message) = &self.fail_with {
            return Err(TransportError::new(message.clone()));
        }

        // Match without the query string so param tests can reuse the table.
        let mut key = url.clone();
        key.set_query(None);
        let scripted = self
            .responses
            .get(key.as_str())
            .cloned()
            .unwrap_or(Scripted {
                status: 404,
                body: None,
            });

        let mut response = Response::new(scripted.status, url);
        if let Some(body) = scripted.body {
            let released = Arc::new(AtomicBool::new(false));
            self.released.borrow_mut().push(released.clone());
            response = response.with_body(TrackedBody {
                inner: Cursor::new(body.into_bytes()),
                released,
            });
        }
        Ok(response)
    }
}

/// Flags its release when dropped.
struct TrackedBody {
    inner: Cursor<Vec<u8>>,
    released: Arc<AtomicBool>,
}

impl Read for TrackedBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

fn hal_link(rel: &str, href: &str) -> String {
    format!(r#"{{"_links":{{"{rel}":{{"href":"{href}"}}}}}}"#)
}

fn text(response: Response) -> traverson_core::Result<String> {
    Ok(response.resource::<String>()?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Hop counting and order
// ---------------------------------------------------------------------------

#[test]
fn single_rel_makes_two_calls() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, &hal_link("one", "/1"))
        .respond("/1", 200, "success");
    let traverson = Traverson::new(&transport);

    let body = traverson
        .from(&format!("{BASE}/"))
        .json_hal()
        .follow(["one"])
        .get(text)
        .unwrap();

    assert_eq!(body, "success");
    assert_eq!(
        transport.requested_urls(),
        vec![format!("{BASE}/"), format!("{BASE}/1")]
    );
}

#[test]
fn no_rels_calls_starting_url_once() {
    let transport = ScriptedTransport::new().respond("/start", 200, "start");
    let traverson = Traverson::new(&transport);

    let body = traverson.from(&format!("{BASE}/start")).get(text).unwrap();

    assert_eq!(body, "start");
    assert_eq!(transport.requested_urls(), vec![format!("{BASE}/start")]);
}

#[test]
fn chain_of_n_rels_makes_n_gets_before_terminal_call() {
    for n in 0..5 {
        let mut transport = ScriptedTransport::new();
        let mut rels = Vec::new();
        for i in 0..n {
            let rel = format!("rel{i}");
            transport = transport.respond(&format!("/{i}"), 200, &hal_link(&rel, &format!("/{}", i + 1)));
            rels.push(rel);
        }
        transport = transport.respond(&format!("/{n}"), 204, "");
        let traverson = Traverson::new(&transport);

        let status = traverson
            .from(&format!("{BASE}/0"))
            .follow(rels)
            .delete(|response| Ok(response.status_code()))
            .unwrap();

        assert_eq!(status, 204, "n = {n}");
        let methods = transport.requested_methods();
        assert_eq!(methods.len(), n + 1, "n = {n}");
        assert!(methods[..n].iter().all(|m| *m == HttpMethod::Get), "n = {n}");
        assert_eq!(methods[n], HttpMethod::Delete, "n = {n}");
        assert_eq!(
            transport.requested_urls().last().unwrap(),
            &format!("{BASE}/{n}"),
            "n = {n}"
        );
    }
}

#[test]
fn three_rels_are_followed_in_order() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, &hal_link("one", "/1"))
        .respond("/1", 200, &hal_link("two", "/2"))
        .respond("/2", 200, &hal_link("three", "/3"))
        .respond("/3", 201, "created");
    let traverson = Traverson::new(&transport);

    let status = traverson
        .from(&format!("{BASE}/"))
        .follow(["one", "two", "three"])
        .post(Body::text("payload", "text/plain"), |response| Ok(response.status_code()))
        .unwrap();

    assert_eq!(status, 201);
    assert_eq!(
        transport.requested_urls(),
        vec![
            format!("{BASE}/"),
            format!("{BASE}/1"),
            format!("{BASE}/2"),
            format!("{BASE}/3")
        ]
    );
    let requests = transport.requests.borrow();
    assert!(requests[..3].iter().all(|r| r.body.is_none()));
    assert_eq!(requests[3].method, HttpMethod::Post);
    assert_eq!(requests[3].body.as_ref().unwrap().content, b"payload");
}

#[test]
fn embedded_array_property_is_followed() {
    let transport = ScriptedTransport::new()
        .respond(
            "/",
            200,
            r#"{"_embedded":{"array":[{"prop":"one","_links":{"self":{"href":"/1"}}}]}}"#,
        )
        .respond("/1", 200, "success");
    let traverson = Traverson::new(&transport);

    let body = traverson
        .from(&format!("{BASE}/"))
        .follow(["array[prop:one]"])
        .get(text)
        .unwrap();

    assert_eq!(body, "success");
    assert_eq!(transport.requested_urls()[1], format!("{BASE}/1"));
}

#[test]
fn follow_replaces_previous_rels() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, &hal_link("two", "/2"))
        .respond("/2", 200, "two");
    let traverson = Traverson::new(&transport);

    let body = traverson
        .from(&format!("{BASE}/"))
        .follow(["one", "ignored"])
        .follow(["two"])
        .get(text)
        .unwrap();

    assert_eq!(body, "two");
    assert_eq!(transport.requested_urls().len(), 2);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn unsuccessful_hop_aborts_traversal() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, &hal_link("one", "/1"))
        .respond("/1", 404, "not here")
        .respond("/2", 200, "never");
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .follow(["one", "two"])
        .get(text)
        .unwrap_err();

    match err {
        TraversonError::IllegalHttpStatus { status, uri } => {
            assert_eq!(status, 404);
            assert_eq!(uri.as_str(), format!("{BASE}/1"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.requested_urls().len(), 2);
    assert!(transport.all_bodies_released());
}

#[test]
fn unknown_rel_aborts_traversal() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, &hal_link("one", "/1"))
        .respond("/1", 200, &hal_link("two", "/2"));
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .follow(["one", "missing", "two"])
        .get(text)
        .unwrap_err();

    match err {
        TraversonError::UnknownRel { rel, position, source } => {
            assert_eq!(rel, "missing");
            assert_eq!(position, 1);
            assert_eq!(source, LinkError::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.requested_urls().len(), 2);
}

#[test]
fn array_index_past_the_end_is_unknown_rel() {
    let transport = ScriptedTransport::new().respond(
        "/",
        200,
        r#"{"_links":{"array":[{"href":"/1"},{"href":"/2"}]}}"#,
    );
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .follow(["array[2]"])
        .get(text)
        .unwrap_err();

    assert!(matches!(
        err,
        TraversonError::UnknownRel {
            source: LinkError::IndexOutOfRange { index: 2, len: 2 },
            ..
        }
    ));
}

#[test]
fn malformed_rel_fails_before_any_request() {
    let transport = ScriptedTransport::new().respond("/", 200, &hal_link("one", "/1"));
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .follow(["one", "two["])
        .get(text)
        .unwrap_err();

    assert!(matches!(err, TraversonError::UnknownRel { position: 1, .. }));
    assert!(transport.requested_urls().is_empty());
}

#[test]
fn plain_json_rejects_array_selectors_before_any_request() {
    let transport = ScriptedTransport::new();
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .json()
        .follow(["array[0]"])
        .get(text)
        .unwrap_err();

    assert!(matches!(
        err,
        TraversonError::UnknownRel {
            source: LinkError::Unsupported,
            ..
        }
    ));
    assert!(transport.requested_urls().is_empty());
}

#[test]
fn intermediate_body_that_is_not_json_is_a_conversion_error() {
    let transport = ScriptedTransport::new().respond("/", 200, "<html></html>");
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .follow(["one"])
        .get(text)
        .unwrap_err();

    assert!(matches!(
        err,
        TraversonError::Conversion(ConversionError::Json { .. })
    ));
}

#[test]
fn intermediate_without_body_has_no_links() {
    let transport = ScriptedTransport::new().respond_empty("/", 204);
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .follow(["one"])
        .get(text)
        .unwrap_err();

    assert!(matches!(
        err,
        TraversonError::UnknownRel {
            source: LinkError::NotFound,
            ..
        }
    ));
}

#[test]
fn intermediate_with_empty_stream_has_no_links() {
    let transport = ScriptedTransport::new().respond("/", 200, "");
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .follow(["one"])
        .get(text)
        .unwrap_err();

    assert!(matches!(
        err,
        TraversonError::UnknownRel {
            source: LinkError::NotFound,
            ..
        }
    ));
    assert!(transport.all_bodies_released());
}

#[test]
fn transport_failure_is_propagated() {
    let transport = ScriptedTransport::new().failing("connection refused");
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .follow(["one"])
        .get(text)
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(transport.requested_urls().len(), 1);
}

#[test]
fn invalid_starting_url_is_rejected() {
    let transport = ScriptedTransport::new();
    let traverson = Traverson::new(&transport);

    let err = traverson.from("not a url").get(text).unwrap_err();

    assert!(matches!(err, TraversonError::InvalidUrl { .. }));
    assert!(transport.requested_urls().is_empty());
}

#[test]
fn handler_error_is_returned_and_body_released() {
    let transport = ScriptedTransport::new().respond("/", 200, "not json");
    let traverson = Traverson::new(&transport);

    let err = traverson
        .from(&format!("{BASE}/"))
        .get(|response| Ok(response.resource::<serde_json::Value>()?))
        .unwrap_err();

    assert!(matches!(err, TraversonError::Conversion(_)));
    assert!(transport.all_bodies_released());
}

#[test]
fn terminal_response_is_released_after_handler() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, &hal_link("one", "/1"))
        .respond("/1", 200, "unread");
    let traverson = Traverson::new(&transport);

    let status = traverson
        .from(&format!("{BASE}/"))
        .follow(["one"])
        .get(|response| Ok(response.status_code()))
        .unwrap();

    assert_eq!(status, 200);
    assert!(transport.all_bodies_released());
}

// ---------------------------------------------------------------------------
// Configuration applied to every hop
// ---------------------------------------------------------------------------

#[test]
fn headers_params_and_credentials_are_sent_on_every_hop() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, &hal_link("one", "/1"))
        .respond("/1", 200, "done");
    let traverson = Traverson::new(&transport);

    traverson
        .from(&format!("{BASE}/"))
        .follow(["one"])
        .with_header("X-Trace", "first")
        .with_header("X-Trace", "second")
        .with_query_param("make", &["volvo"])
        .with_query_param("make", &["saab"])
        .with_auth("user", "password")
        .get(text)
        .unwrap();

    let requests = transport.requests.borrow();
    assert_eq!(requests.len(), 2);
    for request in requests.iter() {
        assert_eq!(request.header("X-Trace"), Some("second"));
        assert_eq!(request.header("Accept"), Some("application/hal+json"));
        assert_eq!(request.url.query(), Some("make=volvo&make=saab"));
        assert_eq!(request.credentials.len(), 1);
    }
}

#[test]
fn self_referencing_href_keeps_query_params_single() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, r##"{"_links":{"here":{"href":""},"top":{"href":"#top"}}}"##);
    let traverson = Traverson::new(&transport);

    traverson
        .from(&format!("{BASE}/"))
        .follow(["here", "top"])
        .with_query_param("make", &["volvo"])
        .get(text)
        .unwrap();

    let urls = transport.requested_urls();
    assert_eq!(urls.len(), 3);
    for url in urls {
        assert_eq!(url, format!("{BASE}/?make=volvo"));
    }
}

#[test]
fn template_params_expand_resolved_hrefs() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, &hal_link("search", "/cars{?make}"))
        .respond("/cars", 200, "cars");
    let traverson = Traverson::new(&transport);

    traverson
        .from(&format!("{BASE}/"))
        .follow(["search"])
        .with_template_param("make", &["volvo"])
        .get(text)
        .unwrap();

    assert_eq!(transport.requested_urls()[1], format!("{BASE}/cars?make=volvo"));
}

#[test]
fn json_mode_requests_plain_json() {
    let transport = ScriptedTransport::new()
        .respond("/", 200, &hal_link("one", "/1"))
        .respond("/1", 200, "done");
    let traverson = Traverson::new(&transport);

    traverson
        .from(&format!("{BASE}/"))
        .json()
        .with_header("Accept", "text/html")
        .follow(["one"])
        .get(text)
        .unwrap();

    for request in transport.requests.borrow().iter() {
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.headers.iter().filter(|(n, _)| n == "Accept").count(), 1);
    }
}

#[test]
fn scoped_credentials_are_carried_for_the_transport() {
    let transport = ScriptedTransport::new().respond("/", 200, "done");
    let traverson = Traverson::new(&transport);

    traverson
        .from(&format!("{BASE}/"))
        .with_credential(
            AuthCredential::new("user", "password")
                .for_host("localhost:8089")
                .unwrap()
                .preemptive(),
        )
        .with_credential(AuthCredential::new("other", "password").for_host("elsewhere").unwrap())
        .get(text)
        .unwrap();

    let requests = transport.requests.borrow();
    let selected = requests[0].credentials.select(&requests[0].url).unwrap();
    assert_eq!(selected.username(), "user");
    assert!(selected.is_preemptive());
}

#[test]
fn typed_handler() {
    let transport = ScriptedTransport::new().respond("/", 200, r#"{"make":"volvo"}"#);
    let traverson = Traverson::new(&transport);

    let typed = traverson
        .from(&format!("{BASE}/"))
        .get(Response::into_typed::<serde_json::Value>)
        .unwrap();

    assert!(typed.is_successful());
    assert_eq!(typed.resource.unwrap()["make"], "volvo");
}
