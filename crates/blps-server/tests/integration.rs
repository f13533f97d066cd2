// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of BLPS.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use mockito::{Matcher, Server, ServerGuard};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use blps_server::build_state;
use blps_server::config::ServerConfig;
use blps_web::{SESSION_COOKIE, SessionService, UserId};

const TEST_SECRET: &str = "integration-secret-0123456789-abcdefghij";

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn test_config(backend_url: &str) -> ServerConfig {
    let config = ServerConfig::from_toml(&format!(
        r#"
[server]
bind_address = "127.0.0.1"
port = 0

[backend]
base_url = "{backend_url}"
timeout_secs = 5

[auth]
session_secret = "{TEST_SECRET}"
"#
    ))
    .expect("Failed to parse test config");
    config.validate().expect("Test config is invalid");
    config
}

struct TestServer {
    port: u16,
    backend: ServerGuard,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let backend = Server::new_async().await;
        let state = build_state(&test_config(&backend.url())).expect("Failed to build state");
        let app = blps_web::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().expect("No local addr").port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self {
            port,
            backend,
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Failed to build client"),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    fn cookie(user: i64) -> String {
        let token = SessionService::new(TEST_SECRET, 24)
            .issue(UserId::Number(user))
            .expect("Failed to issue token");
        format!("{SESSION_COOKIE}={token}")
    }

    async fn get(&self, path: &str, user: Option<i64>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(user) = user {
            request = request.header(COOKIE, Self::cookie(user));
        }
        request.send().await.expect("Failed to send request")
    }

    async fn submit(&self, user: Option<i64>, file_name: &str) -> reqwest::Response {
        let settings = json!({"company": {"name": "Acme", "address": "Taipei"}});
        let form = Form::new().text("settings", settings.to_string()).part(
            "file",
            Part::bytes(b"timestamp,kw\n2025-01-01 00:00,120\n".to_vec())
                .file_name(file_name.to_owned()),
        );
        let mut request = self
            .client
            .post(self.url("/api/optimizations"))
            .multipart(form);
        if let Some(user) = user {
            request = request.header(COOKIE, Self::cookie(user));
        }
        request.send().await.expect("Failed to send request")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let response = server.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_path_without_locale_redirects() {
    let server = TestServer::start().await;
    let response = server.get("/evaluation/new", Some(42)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[LOCATION], "/en/evaluation/new");
}

#[tokio::test]
async fn test_protected_page_redirects_to_sign_in() {
    let server = TestServer::start().await;
    let response = server.get("/zh-hant/evaluation", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[LOCATION], "/zh-hant/sign-in");
}

#[tokio::test]
async fn test_evaluation_list_from_backend_history() {
    let mut server = TestServer::start().await;
    let history = server
        .backend
        .mock("GET", "/v1/optimizations/42")
        .match_header("user-id", "42")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([{
                "job_id": "abcdef0123456789",
                "company_name": "Acme",
                "status": "processing",
                "progress_percent": 35,
                "created_at": "2025-03-01T10:30:00"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let response = server.get("/en/evaluation", Some(42)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(SET_COOKIE));
    let html = response.text().await.unwrap();
    assert!(html.contains("abcdef01..."));
    assert!(html.contains("Processing"));
    assert!(html.contains("2025-03-01 18:30"));
    history.assert_async().await;
}

#[tokio::test]
async fn test_result_page_renders_completed_job() {
    let mut server = TestServer::start().await;
    server
        .backend
        .mock("GET", "/v1/optimizations/job-1/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "job_id": "job-1",
                "status": "completed",
                "progress_percent": 100,
                "company_name": "Acme",
                "results": {
                    "load_kw": {"2025-01-01T00:00:00": 120.0, "2025-01-01T01:00:00": 130.0},
                    "soc_percent": {"2025-01-01T00:00:00": 0.5, "2025-01-01T01:00:00": 0.4},
                    "optimal_cabinet": {"cabinets": 2, "p_nom": 233.0, "e_nom": 466.0},
                    "financial_metrics": {"spv_npv": 150000, "spv_irr_value": 0.12, "spv_breakeven_year": 6.5}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = server.get("/en/evaluation/result/job-1", Some(42)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Acme Optimization Results"));
    assert!(html.contains("NT$150,000"));
    assert!(html.contains("12.00%"));
    assert!(html.contains("6.5"));
}

#[tokio::test]
async fn test_result_page_for_unknown_job() {
    let mut server = TestServer::start().await;
    server
        .backend
        .mock("GET", "/v1/optimizations/missing/status")
        .with_status(404)
        .with_body(r#"{"detail": "Job not found"}"#)
        .create_async()
        .await;

    let response = server.get("/en/evaluation/result/missing", Some(42)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("Job Not Found"));
}

#[tokio::test]
async fn test_viewport_api_does_not_call_backend() {
    let mut server = TestServer::start().await;
    let status = server
        .backend
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let response = server
        .client
        .post(server.url("/api/viewport"))
        .header(COOKIE, TestServer::cookie(42))
        .header(CONTENT_TYPE, "application/json")
        .body(
            json!({
                "state": {"range": {"start_index": 0, "end_index": 0}},
                "timestamps": [
                    "2025-01-01T00:00:00",
                    "2025-01-01T01:00:00",
                    "2025-01-01T02:00:00"
                ],
                "command": {"type": "reset"}
            })
            .to_string(),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["changed"], json!(true));
    assert_eq!(body["state"]["range"], json!({"start_index": 0, "end_index": 2}));
    status.assert_async().await;
}

#[tokio::test]
async fn test_submit_csv_goes_to_ami_endpoint() {
    let mut server = TestServer::start().await;
    let ami = server
        .backend
        .mock("POST", "/v1/optimizations/ami")
        .match_header("user-id", "7")
        .match_body(Matcher::Regex("Acme".to_owned()))
        .with_status(200)
        .with_body(r#"{"job_id": "job-9", "status": "processing"}"#)
        .create_async()
        .await;

    let response = server.submit(Some(7), "usage.csv").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["job_id"], json!("job-9"));
    ami.assert_async().await;
}

#[tokio::test]
async fn test_submit_html_goes_to_daily_pattern_endpoint() {
    let mut server = TestServer::start().await;
    let daily = server
        .backend
        .mock("POST", "/v1/optimizations/daily_pattern")
        .with_status(200)
        .with_body(r#"{"job_id": "job-10"}"#)
        .create_async()
        .await;

    let response = server.submit(Some(7), "Pattern.HTML").await;
    assert_eq!(response.status(), StatusCode::OK);
    daily.assert_async().await;
}

#[tokio::test]
async fn test_submit_backend_error_is_reported() {
    let mut server = TestServer::start().await;
    server
        .backend
        .mock("POST", "/v1/optimizations/ami")
        .with_status(500)
        .with_body(r#"{"detail": "bad input"}"#)
        .create_async()
        .await;

    let response = server.submit(Some(7), "usage.csv").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "error": "bad input"}));
}

#[tokio::test]
async fn test_submit_without_session_is_unauthorized() {
    let server = TestServer::start().await;
    let response = server.submit(None, "usage.csv").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "error": "Unauthorized"}));
}
