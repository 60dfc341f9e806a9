mod common;

use std::collections::HashMap;

use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{events, header, TestApp};

#[tokio::test]
async fn test_successful_request_is_correlated() {
    let app = TestApp::new();
    let response = app.get("/api/users").await;

    assert_eq!(response.status, StatusCode::OK);
    let request_id = header(&response.headers, "x-request-id").to_string();
    assert!(Uuid::parse_str(&request_id).is_ok());
    let processing_time: f64 = header(&response.headers, "x-processing-time").parse().unwrap();
    assert!(processing_time >= 0.0);

    let records = app.request_records(&request_id);
    assert_eq!(events(&records), vec!["request_started", "request_completed"]);

    let started = &records[0];
    assert_eq!(started["level"], "INFO");
    assert_eq!(started["request_data"]["method"], "GET");
    assert_eq!(started["request_data"]["path"], "/api/users");
    assert_eq!(started["request_data"]["endpoint"], "/api/users");

    let completed = &records[1];
    assert_eq!(completed["level"], "INFO");
    assert_eq!(completed["status_code"], 200);
    let logged_time = completed["processing_time"].as_f64().unwrap();
    assert_eq!(format!("{logged_time:.3}"), format!("{processing_time:.3}"));
    assert_eq!(
        completed["response_data"]["headers"]["x-request-id"],
        request_id.as_str()
    );
    assert_eq!(completed["response_data"]["status"], "200 OK");
    // Bodies of successful responses are only logged in debug mode.
    assert!(completed["response_data"].get("body").is_none());

    let queries = app.records("database.log");
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["request_id"], request_id.as_str());
}

#[tokio::test]
async fn test_password_is_redacted_everywhere() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/users",
            json!({"name": "Ada", "email": "ada@example.com", "password": "secret123"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body.get("password").is_none());

    let request_id = header(&response.headers, "x-request-id").to_string();
    let records = app.request_records(&request_id);
    assert_eq!(
        records[0]["request_data"]["body"]["password"],
        "***REDACTED***"
    );
    assert_eq!(records[0]["request_data"]["body"]["name"], "Ada");

    for file in ["app.log", "error.log", "requests.log", "database.log"] {
        assert!(!app.raw(file).contains("secret123"), "{file} leaked the password");
    }
}

#[tokio::test]
async fn test_headers_and_query_are_redacted() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::get("/api/users?token=s3cr3t-tok&page=2")
                .header("authorization", "Bearer s3cr3t-tok")
                .header("x-trace", "visible")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let request_id = header(&response.headers, "x-request-id").to_string();
    let request_data = &app.request_records(&request_id)[0]["request_data"];
    assert_eq!(request_data["headers"]["authorization"], "***REDACTED***");
    assert_eq!(request_data["headers"]["x-trace"], "visible");
    assert_eq!(request_data["query_params"]["token"], "***REDACTED***");
    assert_eq!(request_data["query_params"]["page"], "2");
    assert!(!app.raw("requests.log").contains("s3cr3t-tok"));
}

#[tokio::test]
async fn test_substring_matching_is_opt_in() {
    let app = TestApp::with_config(|config| {
        config.redaction.match_mode = api_middleware::config::MatchMode::Substring;
    });
    let response = app
        .post_json(
            "/api/users",
            json!({"name": "Ada", "email": "ada@example.com", "user_password_hint": "cat"}),
        )
        .await;
    let request_id = header(&response.headers, "x-request-id").to_string();
    let body = &app.request_records(&request_id)[0]["request_data"]["body"];
    assert_eq!(body["user_password_hint"], "***REDACTED***");

    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/users",
            json!({"name": "Ada", "email": "ada@example.com", "user_password_hint": "cat"}),
        )
        .await;
    let request_id = header(&response.headers, "x-request-id").to_string();
    let body = &app.request_records(&request_id)[0]["request_data"]["body"];
    assert_eq!(body["user_password_hint"], "cat");
}

#[tokio::test]
async fn test_invalid_json_body_is_recorded_as_placeholder() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::post("/api/users")
                .header("content-type", "application/json")
                .body(Body::from("{broken"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"]["type"], "Bad Request");

    let request_id = header(&response.headers, "x-request-id").to_string();
    let records = app.request_records(&request_id);
    assert_eq!(records[0]["request_data"]["body"], "Invalid JSON");
    assert_eq!(events(&records), vec!["request_started", "request_failed"]);
}

#[tokio::test]
async fn test_form_data_is_captured() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::post("/api/users")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("name=Ada&secret=hunter2"))
                .unwrap(),
        )
        .await;
    // The endpoint only accepts JSON.
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let request_id = header(&response.headers, "x-request-id").to_string();
    let form = &app.request_records(&request_id)[0]["request_data"]["form_data"];
    assert_eq!(form["name"], "Ada");
    assert_eq!(form["secret"], "***REDACTED***");
}

#[tokio::test]
async fn test_debug_mode_logs_response_bodies() {
    let app = TestApp::with_config(|config| config.debug = true);
    let response = app.get("/api/example/data-sanitization").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["sanitized_data"]["user"]["api_key"],
        "***REDACTED***"
    );

    let request_id = header(&response.headers, "x-request-id").to_string();
    let completed = &app.request_records(&request_id)[1];
    assert_eq!(
        completed["response_data"]["body"]["message"],
        "Data sanitization example"
    );
}

#[tokio::test]
async fn test_instrumented_handler_logs_function_events() {
    let app = TestApp::with_config(|config| config.logging.level = "debug".into());
    let response = app.get("/api/example/function-logging").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["result"], "processed_data");

    let request_id = header(&response.headers, "x-request-id").to_string();
    let general: Vec<_> = app
        .records("app.log")
        .into_iter()
        .filter(|r| r["request_id"] == request_id.as_str())
        .collect();
    assert_eq!(
        events(&general),
        vec!["function_entry", "performance_metric", "function_exit"]
    );
}

#[tokio::test]
async fn test_concurrent_requests_produce_well_formed_records() {
    let app = TestApp::new();

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let router = app.router.clone();
            tokio::spawn(async move {
                use tower::ServiceExt;
                let request = if i % 2 == 0 {
                    Request::get("/api/users").body(Body::empty()).unwrap()
                } else {
                    Request::post("/api/users")
                        .header("content-type", "application/json")
                        .body(Body::from(
                            json!({"name": format!("user{i}"), "email": format!("user{i}@example.com")})
                                .to_string(),
                        ))
                        .unwrap()
                };
                let response = router.oneshot(request).await.unwrap();
                response.headers()["x-request-id"].to_str().unwrap().to_string()
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    let mut per_request: HashMap<String, Vec<String>> = HashMap::new();
    for record in app.records("requests.log") {
        let id = record["request_id"].as_str().unwrap().to_string();
        let event = record["event"].as_str().unwrap().to_string();
        per_request.entry(id).or_default().push(event);
    }

    assert_eq!(per_request.len(), 50);
    for id in ids {
        let events = &per_request[&id];
        assert_eq!(events.len(), 2, "{id}: {events:?}");
        assert_eq!(events[0], "request_started");
        assert_eq!(events[1], "request_completed");
    }
}
