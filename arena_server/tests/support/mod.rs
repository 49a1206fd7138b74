// Shared primitives for one-time server bootstrapping across integration tests.
#![allow(dead_code)]

// Sink/stream extensions give `send` and `next` on the client socket.
use futures_util::{SinkExt, StreamExt};
// Server messages are inspected as loose JSON so tests only pin the fields they care about.
use serde_json::Value;
use std::{
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    // Sleep durations are used in readiness polling loops.
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

// Client-side socket type returned by `connect_async` for plain `ws://` URLs.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// How long a test waits for one specific server message before failing.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    // Run initialization exactly once even if multiple tests call this function.
    SERVER_READY.get_or_init(|| {
        // Local one-time slot where the server thread publishes its selected URL.
        let published_url = Arc::new(OnceLock::<String>::new());
        // Clone so the spawned thread can write into the same shared slot.
        let published_url_thread = Arc::clone(&published_url);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            // Each server thread owns its own Tokio runtime.
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            // Run async server startup and serving on this dedicated runtime.
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                // Capture the exact address that was assigned by the OS.
                let addr = listener.local_addr().expect("get local addr");
                // Publish the final base URL so test code can target the right server.
                let _ = published_url_thread.set(format!("http://{}", addr));
                // Start serving requests until the test process exits.
                arena_server::run(listener).await.expect("server failed");
            });
        });
        // Block until URL is published and the bound port starts accepting connections.
        wait_for_server_url_and_readiness(published_url);
    });

    // Return the stable shared URL used by all tests in this binary.
    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    // Poll until the server thread publishes the base URL.
    let base_url = loop {
        // If the URL is published, clone it and stop waiting.
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        // Avoid a tight loop while waiting for the background thread.
        std::thread::sleep(Duration::from_millis(10));
    };

    // Persist the URL globally so every test gets the same endpoint.
    let _ = SERVER_URL.set(base_url.clone());

    // Strip the scheme so we can use host:port for raw TCP readiness checks.
    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        // Successful connect means the server socket is accepting connections.
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        // Wait briefly before the next connection attempt.
        std::thread::sleep(Duration::from_millis(20));
    }

    // Fail fast if startup never reached an accepting state.
    panic!("server did not become ready in time");
}

// Open a fresh WebSocket to the shared server without joining yet.
pub async fn connect() -> WsStream {
    // Make sure the server is up before dialing it.
    let base_url = ensure_server();
    // Same host and port, WebSocket scheme, game route.
    let ws_url = base_url.replacen("http://", "ws://", 1) + "/ws";
    // The HTTP upgrade response is not needed by the tests.
    let (ws, _response) = tokio_tungstenite::connect_async(ws_url)
        .await
        .expect("websocket upgrade should succeed");
    ws
}

// Serialize a JSON value and send it as one text frame.
pub async fn send_json(ws: &mut WsStream, value: Value) {
    send_text(ws, value.to_string()).await;
}

// Send raw text, including payloads that are deliberately not valid JSON.
pub async fn send_text(ws: &mut WsStream, text: String) {
    ws.send(Message::Text(text.into()))
        .await
        .expect("websocket send should succeed");
}

/// Skips frames until a server message with the given `type` satisfies `accept`; returns its `data`.
pub async fn next_matching(
    ws: &mut WsStream,
    kind: &str,
    mut accept: impl FnMut(&Value) -> bool,
) -> Value {
    // The server interleaves snapshots with notices, so keep reading until a match arrives.
    let wait = async {
        loop {
            // A closed socket or read error fails the test immediately.
            let msg = ws
                .next()
                .await
                .expect("socket closed while waiting")
                .expect("websocket read should succeed");
            // Ping/pong and other control frames carry no game data.
            let Message::Text(text) = msg else {
                continue;
            };
            // Every text frame is a `{"type", "data"}` envelope.
            let value: Value = serde_json::from_str(&text).expect("server sends JSON");
            if value["type"] == kind && accept(&value["data"]) {
                return value["data"].clone();
            }
        }
    };
    // Bound the wait so a missing message fails instead of hanging the suite.
    tokio::time::timeout(RECV_TIMEOUT, wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for `{kind}`"))
}

// First message of the given type, whatever its payload.
pub async fn next_of_type(ws: &mut WsStream, kind: &str) -> Value {
    next_matching(ws, kind, |_| true).await
}

/// Connects, joins under `name` and returns the socket with the `init` payload.
pub async fn join(name: &str) -> (WsStream, Value) {
    let mut ws = connect().await;
    // The handshake must be the first gameplay message on the socket.
    send_json(
        &mut ws,
        serde_json::json!({"type": "join", "data": {"name": name}}),
    )
    .await;
    // `init` is the first message the server sends after accepting the join.
    let init = next_of_type(&mut ws, "init").await;
    (ws, init)
}

// Look up a player entry by its string id inside a `players` array.
pub fn find_player<'a>(players: &'a Value, id: &str) -> Option<&'a Value> {
    players.as_array()?.iter().find(|p| p["id"] == id)
}
