mod common;

use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;

use api_middleware::app::{self, AppState};
use api_middleware::{bootstrap, HttpServer, MiddlewareConfig, Shutdown};

use common::read_records;

#[tokio::test]
async fn test_server_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = MiddlewareConfig::default();
    config.logging.directory = dir.path().display().to_string();

    let state = bootstrap(&config).unwrap();
    let routes = app::routes(AppState::new(state.clone()));
    let server = HttpServer::new(config, state, routes);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_task = tokio::spawn(server.run(listener, None, shutdown.signalled()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let created = client
        .post(format!("http://{addr}/api/users"))
        .json(&json!({"name": "Ada", "email": "ada@example.com", "password": "secret123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);

    let listed = client
        .get(format!("http://{addr}/api/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(listed.status(), 200);
    let request_id = listed.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(listed.headers().contains_key("x-processing-time"));
    let body: serde_json::Value = listed.json().await.unwrap();
    assert_eq!(body["count"], 1);

    drop(client);
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let records = read_records(&dir.path().join("requests.log"));
    let started = records
        .iter()
        .find(|r| r["request_id"] == request_id.as_str() && r["event"] == "request_started")
        .unwrap();
    assert_eq!(started["request_data"]["remote_addr"], "127.0.0.1");
    assert!(started["request_data"]["url"]
        .as_str()
        .unwrap()
        .ends_with("/api/users"));
}
