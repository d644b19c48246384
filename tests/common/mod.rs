//! Shared test utilities and fixtures
//!
//! A wiremock backend speaking the `{success, error, message, data}`
//! envelope, and a storefront wired to it over real HTTP.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shopfront_api::HttpVerificationApi;
use shopfront_config::{ApiSettings, VerificationSettings};
use shopfront_engine::{FileSessionStore, Services, Storefront, Toast};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn start_backend() -> MockServer {
    MockServer::start().await
}

pub fn accepted(message: &str, data: Option<Value>) -> Value {
    let mut body = json!({
        "success": true,
        "error": false,
        "message": message,
    });
    if let Some(data) = data {
        body["data"] = data;
    }
    body
}

pub fn rejected(message: &str) -> Value {
    json!({
        "success": false,
        "error": true,
        "message": message,
    })
}

/// Answer every POST to `endpoint` with `status` and `body`, expecting
/// exactly `calls` requests by the time the server is dropped.
pub async fn mount_envelope(
    server: &MockServer,
    endpoint: &str,
    status: u16,
    body: Value,
    calls: u64,
) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .and(header_exists("X-Request-Id"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

pub fn api_settings(server: &MockServer) -> ApiSettings {
    ApiSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_secs(5),
        https_only: false,
    }
}

pub fn storefront(
    server: &MockServer,
    session_path: &Path,
    settings: VerificationSettings,
) -> Storefront {
    let api = HttpVerificationApi::new(&api_settings(server)).unwrap();
    let services = Services::new(
        Arc::new(api),
        Arc::new(FileSessionStore::new(session_path)),
    );
    Storefront::new(services, settings)
}

/// Tick the storefront until `done` holds, panicking after a few seconds.
pub async fn tick_until(storefront: &mut Storefront, mut done: impl FnMut(&Storefront) -> bool) {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        storefront.tick(Instant::now());
        if done(storefront) {
            return;
        }
        assert!(Instant::now() < deadline, "storefront did not settle");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn messages(toasts: &[Toast]) -> Vec<String> {
    toasts.iter().map(|toast| toast.message().to_string()).collect()
}
