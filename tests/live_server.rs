//! End-to-end tests over a real listener and a mock detection runtime.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use damage_engine::config::EngineConfig;
use damage_engine::http::HttpServer;
use damage_engine::lifecycle::Shutdown;
use damage_engine::RequestDispatcher;
use serde_json::{json, Value};

mod common;
use common::{start_mock_runtime, test_config, write_manifest, write_png, TEST_KEY};

async fn start_engine(config: EngineConfig) -> (SocketAddr, Shutdown) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dispatcher = Arc::new(RequestDispatcher::from_config(&config));
    let server = HttpServer::new(config.listener.clone(), dispatcher);
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    (addr, shutdown)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn analyzes_through_runtime_model() {
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let recorder = seen.clone();
    let runtime = start_mock_runtime(move |body| {
        let recorder = recorder.clone();
        async move {
            recorder
                .lock()
                .unwrap()
                .push(serde_json::from_str(&body).unwrap_or(Value::Null));
            (
                200,
                r#"{"boxes": {"cls": [2.0, 2.0, 5.0, 0.0], "conf": [0.9, 0.8, 0.7, 0.6]}}"#.to_string(),
            )
        }
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("wall.png");
    write_png(&image, [120, 120, 120]);
    let mut config = test_config(dir.path());
    config.model.path = dir.path().join("model.json");
    config.model.confidence = 0.4;
    write_manifest(&config.model.path, runtime);

    let (addr, shutdown) = start_engine(config).await;
    let client = client();

    let health: Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("engine unreachable")
        .json()
        .await
        .unwrap();
    assert_eq!(health["ok"], true);
    assert_eq!(health["model_loaded"], true);
    assert_eq!(health["inference_mode"], "model");

    let res = client
        .post(format!("http://{addr}/analyze"))
        .header("x-engine-key", TEST_KEY)
        .json(&json!({"request_id": "live-1", "paths": [image.to_str().unwrap()]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["results"][0]["damage_types"], json!(["leakage", "breakage", "crack"]));

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["source"], image.to_str().unwrap());
    assert!((requests[0]["conf"].as_f64().unwrap() - 0.4).abs() < 1e-6);

    shutdown.trigger();
}

#[tokio::test]
async fn runtime_errors_fail_only_the_item() {
    let runtime = start_mock_runtime(|_| async { (503, r#"{"detail": "busy"}"#.to_string()) }).await;

    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("wall.png");
    write_png(&image, [120, 120, 120]);
    let mut config = test_config(dir.path());
    config.model.path = dir.path().join("model.json");
    write_manifest(&config.model.path, runtime);

    let (addr, shutdown) = start_engine(config).await;

    let body: Value = client()
        .post(format!("http://{addr}/analyze"))
        .header("x-engine-key", TEST_KEY)
        .json(&json!({"paths": [image.to_str().unwrap()]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["results"][0]["error"], "inference failed");
    assert_eq!(body["results"][0]["inference_mode"], "model");

    shutdown.trigger();
}

#[tokio::test]
async fn peer_address_is_the_default_rate_limit_identity() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.model.allow_heuristic_fallback = true;
    config.rate_limit.requests_per_minute = 1;

    let (addr, shutdown) = start_engine(config).await;
    let client = client();
    let call = || {
        client
            .post(format!("http://{addr}/analyze"))
            .header("x-engine-key", TEST_KEY)
            .json(&json!({"paths": []}))
            .send()
    };

    assert_eq!(call().await.unwrap().status(), 400);
    assert_eq!(call().await.unwrap().status(), 429);

    // An explicit identity header gets its own bucket.
    let res = client
        .post(format!("http://{addr}/analyze"))
        .header("x-engine-key", TEST_KEY)
        .header("x-ratelimit-key", "gateway-user-7")
        .json(&json!({"paths": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    shutdown.trigger();
}
