//! Test helpers and utilities

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{redirect, Client, Response, StatusCode};

use golinks::config::Config;
use golinks::core::ApplicationContext;
use golinks::router::ConfigKey;
use golinks::server::{Server, ShutdownHandle};
use golinks::store::{LinkStore, MemoryStore};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret-pw";

/// Configuration used by every test server.
pub fn test_config(debug: bool) -> Config {
    let yaml = format!(
        "application:\n  secret: s\n  username: {}\n  password: {}\n  debug: {}\n\
         database:\n  driver: sqlite3\n\
         server:\n  listenAddr: 127.0.0.1:0\n  drainTimeoutSecs: 2\n  maxBodyBytes: 1024\n",
        USERNAME, PASSWORD, debug
    );
    Config::from_yaml(&yaml).expect("test config parses")
}

/// In-process server bound to an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    pub store: Arc<dyn LinkStore>,
    pub context: ApplicationContext,
    shutdown: ShutdownHandle,
    task: Option<tokio::task::JoinHandle<std::io::Result<()>>>,
}

#[allow(dead_code)]
impl TestServer {
    /// Start with an empty in-memory store and debug off.
    pub async fn start() -> Self {
        Self::start_with(Arc::new(MemoryStore::new()), false).await
    }

    /// Start with an empty in-memory store and error-body echo on.
    pub async fn start_debug() -> Self {
        Self::start_with(Arc::new(MemoryStore::new()), true).await
    }

    pub async fn start_with(store: Arc<dyn LinkStore>, debug: bool) -> Self {
        let config = test_config(debug);
        let server_config = config.server.clone();
        let context = ApplicationContext::new().with_value::<ConfigKey>(config);
        let router = golinks::routes::build_router(context.clone(), store.clone())
            .expect("router wiring");

        let server = Server::bind(&server_config, router, context.clone())
            .await
            .expect("bind ephemeral port");
        let addr: SocketAddr = server.local_addr().expect("local addr");
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(server.run());

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{}", addr),
            client,
            store,
            context,
            shutdown,
            task: Some(task),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// POST a raw body with the configured credentials
    pub async fn post_authed(&self, path: &str, body: &str) -> Response {
        self.post_as(path, USERNAME, PASSWORD, body).await
    }

    /// POST a raw body with the given credentials
    pub async fn post_as(&self, path: &str, user: &str, pass: &str, body: &str) -> Response {
        self.client
            .post(self.url(path))
            .basic_auth(user, Some(pass))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed")
    }

    /// Create a link through the API and assert success
    pub async fn create_link(&self, key: &str, url: &str) {
        let body = serde_json::json!({ "Key": key, "Url": url }).to_string();
        let resp = self.post_authed("/links", &body).await;
        assert_status(&resp, StatusCode::OK);
    }

    /// Trigger graceful shutdown and wait for the server task
    pub async fn stop(mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            task.await
                .expect("server task panicked")
                .expect("server run failed");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response contains header
pub fn assert_header(response: &Response, name: &str, expected: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert_eq!(value, expected, "Header '{}' mismatch", name);
}

/// Assert the four envelope headers every response carries
pub fn assert_envelope(response: &Response) {
    assert_header(response, "content-type", "application/json; charset=utf-8");
    assert_header(response, "x-content-type-options", "nosniff");
    assert_header(response, "x-frame-options", "sameorigin");
    assert_header(response, "cache-control", "no-cache");
}

/// Assert the exact response body
pub async fn assert_body(response: Response, expected: &str) {
    let body = response.text().await.expect("Failed to read body");
    assert_eq!(body, expected);
}
