#![allow(dead_code)]

use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use arcade_core::catalog::GameCatalog;
use arcade_gemini::GeminiConfig;
use arcade_server::config::ServerConfig;
use arcade_server::{build_app, spawn_view_reaper};

pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with the default catalog and chat disabled.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Start a test server whose chat talks to `base_url`.
    pub async fn with_chat(base_url: &str) -> Self {
        let config = ServerConfig {
            chat: GeminiConfig {
                api_key: Some("test-key".to_string()),
                base_url: base_url.to_string(),
                timeout_secs: 5,
                ..GeminiConfig::default()
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config, GameCatalog::default()).unwrap();
        spawn_view_reaper(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            client: reqwest::Client::new(),
            _shutdown: handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    /// Open a view on `game_id` and return its id.
    pub async fn open_view(&self, game_id: &str) -> (String, serde_json::Value) {
        let resp = self
            .client
            .post(self.url(&format!("/api/v1/views/{game_id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201, "opening {game_id}");
        let body: serde_json::Value = resp.json().await.unwrap();
        let id = body["view_id"].as_str().unwrap().to_string();
        (id, body)
    }

    /// Send a JSON game input and return the resulting snapshot.
    pub async fn input(&self, view_id: &str, input: serde_json::Value) -> serde_json::Value {
        let resp = self
            .post_json(&format!("/api/v1/views/{view_id}/input"), &input)
            .await;
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }
}

/// One parsed server-sent event.
#[derive(Debug, Clone)]
pub struct SseMessage {
    pub event: String,
    pub data: String,
}

impl SseMessage {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.data).unwrap()
    }
}

/// Minimal SSE reader over a reqwest response body.
pub struct SseReader {
    stream: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buf: String,
}

impl SseReader {
    pub fn new(resp: reqwest::Response) -> Self {
        Self {
            stream: Box::pin(resp.bytes_stream()),
            buf: String::new(),
        }
    }

    /// Next event with a name (keep-alive comments are skipped), or `None`
    /// when the stream ends. Panics after 5s.
    pub async fn next(&mut self) -> Option<SseMessage> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(end) = self.buf.find("\n\n") {
                    let raw: String = self.buf.drain(..end + 2).collect();
                    let mut event = String::new();
                    let mut data = Vec::new();
                    for line in raw.lines() {
                        if let Some(v) = line.strip_prefix("event:") {
                            event = v.trim().to_string();
                        } else if let Some(v) = line.strip_prefix("data:") {
                            data.push(v.strip_prefix(' ').unwrap_or(v).to_string());
                        }
                    }
                    if !event.is_empty() {
                        return Some(SseMessage {
                            event,
                            data: data.join("\n"),
                        });
                    }
                    continue;
                }
                match self.stream.next().await {
                    Some(Ok(bytes)) => {
                        self.buf
                            .push_str(&String::from_utf8_lossy(&bytes).replace('\r', ""));
                    },
                    _ => return None,
                }
            }
        })
        .await
        .expect("Timed out waiting for SSE event")
    }

    /// Read events until one named `name` arrives.
    pub async fn until(&mut self, name: &str) -> Vec<SseMessage> {
        let mut seen = Vec::new();
        while let Some(msg) = self.next().await {
            let done = msg.event == name;
            seen.push(msg);
            if done {
                return seen;
            }
        }
        panic!("SSE stream ended before a {name} event: {seen:?}");
    }
}

pub mod fake_gemini {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::Router;
    use axum::http::header;
    use axum::response::IntoResponse;

    /// A stand-in for the streaming chat API that always answers with
    /// `fragments`, waiting `delay` before the first one.
    pub async fn start(fragments: &'static [&'static str], delay: Duration) -> SocketAddr {
        let handler = move || async move {
            tokio::time::sleep(delay).await;
            let body: String = fragments
                .iter()
                .map(|text| {
                    let json = serde_json::json!({
                        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
                    });
                    format!("data: {json}\r\n\r\n")
                })
                .collect();
            ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
        };
        let app = Router::new().route("/v1beta/models/{*rest}", axum::routing::post(handler));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        addr
    }
}
