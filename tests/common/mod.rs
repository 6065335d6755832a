//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use damage_engine::config::EngineConfig;
use damage_engine::http::build_router;
use damage_engine::inference::{Detection, DetectionModel, InferenceBackend, LabelMap, PredictError};
use damage_engine::RequestDispatcher;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const TEST_KEY: &str = "integration-test-secret-0123456789";

/// Start a programmable detection runtime. `f` receives the request body and
/// returns the status and JSON body to send back.
pub async fn start_mock_runtime<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let body = read_request_body(&mut socket).await;
                        let (status, body) = f(body).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_body(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(split) = text.find("\r\n\r\n") {
            let content_length = text[..split]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= split + 4 + content_length {
                return String::from_utf8_lossy(&buf[split + 4..split + 4 + content_length])
                    .to_string();
            }
        }
    }
    String::new()
}

/// State of the mock key-value store. Script calls are evaluated the way the
/// limiter's counter script behaves: increment, then set the TTL when the
/// key is new or has none.
#[derive(Debug, Default)]
pub struct MockStore {
    pub counts: HashMap<String, i64>,
    pub ttls: HashMap<String, u64>,
    pub expirations_set: usize,
    pub script_calls: Vec<Vec<String>>,
    pub fail_scripts: bool,
}

impl MockStore {
    fn eval(&mut self, args: &[String]) -> String {
        // EVALSHA <sha> <numkeys> <key> <ttl>
        self.script_calls.push(args.to_vec());
        if self.fail_scripts {
            return "-ERR injected failure\r\n".to_string();
        }
        let (Some(key), Some(ttl)) = (args.get(3), args.get(4)) else {
            return "-ERR wrong number of arguments\r\n".to_string();
        };
        let count = self.counts.entry(key.clone()).or_insert(0);
        *count += 1;
        let count = *count;
        if count == 1 || !self.ttls.contains_key(key) {
            self.ttls.insert(key.clone(), ttl.parse().unwrap_or(0));
            self.expirations_set += 1;
        }
        format!(":{count}\r\n")
    }

    fn reply(&mut self, args: &[String]) -> String {
        match args.first().map(|c| c.to_ascii_uppercase()).as_deref() {
            Some("EVALSHA") | Some("EVAL") => self.eval(args),
            Some("SCRIPT") => "$40\r\n0000000000000000000000000000000000000000\r\n".to_string(),
            Some("PING") => "+PONG\r\n".to_string(),
            _ => "+OK\r\n".to_string(),
        }
    }
}

/// Start a minimal RESP responder standing in for the shared rate-limit store.
pub async fn start_mock_store() -> (SocketAddr, Arc<Mutex<MockStore>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = Arc::new(Mutex::new(MockStore::default()));
    let shared = store.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let store = shared.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    let n = match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);

                    let mut out = String::new();
                    while let Some((args, used)) = parse_resp_command(&buf) {
                        buf.drain(..used);
                        out.push_str(&store.lock().unwrap().reply(&args));
                    }
                    if !out.is_empty() && socket.write_all(out.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (addr, store)
}

fn parse_resp_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
    let mut pos = 0;
    let count: usize = read_resp_line(buf, &mut pos)?.strip_prefix('*')?.parse().ok()?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let len: usize = read_resp_line(buf, &mut pos)?.strip_prefix('$')?.parse().ok()?;
        if buf.len() < pos + len + 2 {
            return None;
        }
        args.push(String::from_utf8_lossy(&buf[pos..pos + len]).to_string());
        pos += len + 2;
    }
    Some((args, pos))
}

fn read_resp_line(buf: &[u8], pos: &mut usize) -> Option<String> {
    let rest = buf.get(*pos..)?;
    let end = rest.windows(2).position(|w| w == b"\r\n")?;
    let line = String::from_utf8_lossy(&rest[..end]).to_string();
    *pos += end + 2;
    Some(line)
}

/// Write a solid-color PNG.
pub fn write_png(path: &Path, rgb: [u8; 3]) {
    image::RgbImage::from_pixel(64, 64, image::Rgb(rgb))
        .save(path)
        .unwrap();
}

/// Write a model manifest pointing at `runtime`.
pub fn write_manifest(path: &Path, runtime: SocketAddr) {
    let manifest = serde_json::json!({
        "names": {"0": "crack", "2": "leakage", "5": "breakage"},
        "runtime_url": format!("http://{runtime}/predict"),
        "timeout_secs": 5,
    });
    std::fs::write(path, manifest.to_string()).unwrap();
}

/// Engine configuration with a strong key and `root` as the only allowed root.
pub fn test_config(root: &Path) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.auth.api_key = TEST_KEY.to_string();
    config.analyze.allowed_roots = vec![root.to_path_buf()];
    config.model.path = root.join("missing-model.json");
    config.model.allow_heuristic_fallback = false;
    config
}

/// In-process detector returning fixed class ids.
pub struct StubModel {
    pub classes: Vec<i64>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub labels: LabelMap,
    pub seen: Arc<Mutex<Vec<PathBuf>>>,
}

impl StubModel {
    pub fn detecting(classes: &[i64]) -> Self {
        Self {
            classes: classes.to_vec(),
            fail: false,
            delay: None,
            labels: LabelMap::from([(0, "crack"), (2, "leakage"), (5, "breakage")]),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::detecting(&[0])
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::detecting(&[])
        }
    }
}

#[async_trait]
impl DetectionModel for StubModel {
    fn class_label(&self, class_id: i64) -> String {
        self.labels.label(class_id)
    }

    async fn predict(&self, path: &Path, _confidence: f32) -> Result<Vec<Detection>, PredictError> {
        self.seen.lock().unwrap().push(path.to_path_buf());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(PredictError::Status(500));
        }
        Ok(self.classes.iter().copied().map(Detection::new).collect())
    }
}

pub fn router(config: &EngineConfig, backend: InferenceBackend) -> Router {
    let dispatcher = Arc::new(RequestDispatcher::new(config, backend));
    build_router(dispatcher, &config.listener)
}

pub fn model_router(config: &EngineConfig, model: StubModel) -> Router {
    router(config, InferenceBackend::from_model(Arc::new(model)))
}

pub fn analyze_request(key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post("/analyze").header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("x-engine-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Drive one request through the router and decode the JSON reply.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
