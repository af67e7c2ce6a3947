//! Harness for black-box tests against a running relay server: spawns the
//! real server on an ephemeral port and exposes raw-HTTP, raw-SSE and
//! full-protocol clients against it.

use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use config::Config;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use rmcp::{RoleClient, ServiceExt, service::RunningService, transport::SseClientTransport};
use secrecy::SecretString;
use server::ServeConfig;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// A well-formed MCP initialize request, as a client would post it.
pub const INITIALIZE_REQUEST: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"integration-tests","version":"0.1.0"}}}"#;

/// Default configuration with an access token set, so the protocol server
/// initializes.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.upstream.access_token = Some(SecretString::from("test-token"));
    config
}

/// Test client for making HTTP requests to the test server.
#[derive(Clone)]
pub struct TestClient {
    pub base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL.
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Send a GET request to the given path.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.try_get(path).await.unwrap()
    }

    /// Send a GET request, returning connection errors to the caller.
    pub async fn try_get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(format!("{}{path}", self.base_url)).send().await
    }

    /// POST a protocol message to the given path and query.
    pub async fn post_message(&self, path_and_query: &str, body: &str) -> reqwest::Response {
        self.client
            .post(format!("{}{path_and_query}", self.base_url))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap()
    }
}

/// Test server that manages the lifecycle of a real server instance.
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    pub config: Config,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with the given configuration.
    pub async fn start(config: Config) -> Self {
        // Find an available port, then hand the address to the server.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let shutdown = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config: config.clone(),
            shutdown: Some(shutdown.clone()),
        };

        let handle = tokio::spawn(async move {
            if let Err(e) = server::serve(serve_config).await {
                eprintln!("Test server failed: {e}");
            }
        });

        let client = TestClient::new(format!("http://{address}"));

        // Wait for the server to answer; any status code counts.
        let mut retries = 20;
        while retries > 0 {
            if timeout(Duration::from_millis(100), client.try_get("/"))
                .await
                .map(|result| result.is_ok())
                .unwrap_or(false)
            {
                break;
            }

            retries -= 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestServer {
            client,
            address,
            config,
            shutdown,
            handle,
        }
    }

    /// Opens the SSE stream and consumes the initial endpoint event.
    pub async fn open_sse(&self) -> SseSession {
        let response = self.client.get(&self.config.mcp.sse_path).await;
        assert_eq!(response.status(), 200);

        let mut events: EventStream = Box::pin(response.bytes_stream().eventsource());

        let first = timeout(Duration::from_secs(5), events.next())
            .await
            .expect("timed out waiting for the endpoint event")
            .expect("the stream ended before the endpoint event")
            .expect("event stream error");

        assert_eq!(first.event, "endpoint");

        let (path, session_id) = first
            .data
            .split_once("?sessionId=")
            .expect("endpoint event without a sessionId");

        SseSession {
            messages_path: path.to_string(),
            session_id: session_id.to_string(),
            events,
        }
    }

    /// Creates an MCP client performing the full protocol handshake over SSE.
    pub async fn mcp_client(&self) -> McpTestClient {
        McpTestClient::connect(format!("http://{}{}", self.address, self.config.mcp.sse_path)).await
    }

    /// Triggers graceful shutdown and waits for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.cancel();

        timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("the server did not shut down in time")
            .unwrap();
    }
}

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, EventStreamError<reqwest::Error>>> + Send>>;

/// One open SSE stream, with its server-assigned session identifier.
pub struct SseSession {
    pub messages_path: String,
    pub session_id: String,
    events: EventStream,
}

impl SseSession {
    /// The path-and-query to POST this session's messages to.
    pub fn post_target(&self) -> String {
        format!("{}?sessionId={}", self.messages_path, self.session_id)
    }

    /// Waits for the next `message` event and returns its JSON payload.
    pub async fn next_message(&mut self) -> Option<serde_json::Value> {
        loop {
            let event = timeout(Duration::from_secs(5), self.events.next()).await.ok()??.ok()?;

            if event.event == "message" {
                return serde_json::from_str(&event.data).ok();
            }
        }
    }

    /// Waits for the stream to terminate, tolerating trailing events.
    pub async fn expect_end(mut self) {
        loop {
            let next = timeout(Duration::from_secs(5), self.events.next())
                .await
                .expect("the SSE stream did not end in time");

            if next.is_none() {
                return;
            }
        }
    }
}

/// MCP client driving the full protocol against the served endpoint.
pub struct McpTestClient {
    service: RunningService<RoleClient, ()>,
}

impl McpTestClient {
    /// Connects to the given SSE endpoint URL and performs the handshake.
    pub async fn connect(sse_url: String) -> Self {
        let transport = SseClientTransport::start(sse_url).await.unwrap();
        let service = ().serve(transport).await.unwrap();

        Self { service }
    }

    /// Server information exchanged in the handshake.
    pub fn server_info(&self) -> rmcp::model::InitializeResult {
        self.service.peer_info().unwrap().clone()
    }

    /// Disconnect the client.
    pub async fn disconnect(self) {
        self.service.cancel().await.unwrap();
    }
}
