//! Registry REST client against an in-process HTTP server.

use ankabuild_client::{ClientError, RegistryRestClient};
use ankabuild_schema::RegistryConfig;
use std::sync::{Arc, Mutex};
use tiny_http::{Method, Response, Server, StatusCode};

struct TestRegistry {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
    server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl TestRegistry {
    /// Serve fixed responses keyed by request path (including the query).
    fn start(routes: Vec<(&'static str, u16, &'static str)>) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let srv = Arc::clone(&server);
        let seen = Arc::clone(&requests);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                let method = match request.method() {
                    Method::Delete => "DELETE",
                    Method::Get => "GET",
                    _ => "OTHER",
                };
                seen.lock()
                    .unwrap()
                    .push(format!("{method} {}", request.url()));

                let (code, body) = routes
                    .iter()
                    .find(|(path, _, _)| *path == request.url())
                    .map_or((404, "not found"), |(_, code, body)| (*code, *body));
                let _ = request
                    .respond(Response::from_string(body).with_status_code(StatusCode(code)));
            }
        });

        Self {
            url: format!("http://127.0.0.1:{port}"),
            requests,
            server,
            _handle: handle,
        }
    }

    fn client(&self) -> RegistryRestClient {
        RegistryRestClient::new(&RegistryConfig {
            url: Some(self.url.clone()),
            insecure: true,
            ..RegistryConfig::default()
        })
        .unwrap()
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestRegistry {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

#[test]
fn revert_sends_delete_with_id() {
    let registry = TestRegistry::start(vec![(
        "/registry/revert?id=abc123",
        200,
        r#"{"status":"OK","body":null}"#,
    )]);

    registry.client().revert("abc123").unwrap();
    assert_eq!(
        registry.requests(),
        vec!["DELETE /registry/revert?id=abc123"]
    );
}

#[test]
fn revert_encodes_the_id() {
    let registry = TestRegistry::start(Vec::new());

    let _ = registry.client().revert("macos 14&tag=v2");

    let requests = registry.requests();
    assert_eq!(requests.len(), 1);
    let query = requests[0]
        .strip_prefix("DELETE /registry/revert?id=")
        .unwrap();
    assert!(!query.contains(' '));
    assert!(!query.contains('&'));
    assert!(query.contains("%26"));
}

#[test]
fn revert_rejects_non_200() {
    let registry = TestRegistry::start(vec![(
        "/registry/revert?id=abc123",
        500,
        r#"{"status":"OK"}"#,
    )]);

    let err = registry.client().revert("abc123").unwrap_err();
    assert!(matches!(err, ClientError::UnsupportedResponse(500)));

    let err = registry.client().revert("unknown").unwrap_err();
    assert!(matches!(err, ClientError::UnsupportedResponse(404)));
}

#[test]
fn revert_reports_in_band_failure() {
    let registry = TestRegistry::start(vec![(
        "/registry/revert?id=abc123",
        200,
        r#"{"status":"FAIL","message":"no previous version"}"#,
    )]);

    let err = registry.client().revert("abc123").unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to revert VM on registry: no previous version"
    );
}

#[test]
fn revert_with_garbage_body_is_malformed() {
    let registry = TestRegistry::start(vec![("/registry/revert?id=abc123", 200, "<html>")]);

    let err = registry.client().revert("abc123").unwrap_err();
    assert!(matches!(err, ClientError::MalformedOutput(_)));
}

#[test]
fn list_decodes_registry_entries() {
    let registry = TestRegistry::start(vec![(
        "/registry/vm",
        200,
        r#"{"status":"OK","body":[{"id":"1","name":"macos-14","latest":"v3"},{"id":"2","name":"macos-15"}]}"#,
    )]);

    let entries = registry.client().list().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "macos-14");
    assert_eq!(entries[0].latest, "v3");
    assert!(entries[1].latest.is_empty());
}
