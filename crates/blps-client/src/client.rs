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

use crate::errors::{RelayError, RelayResult};
use blps_types::{JobStatusResponse, JobSummary, SubmissionAck};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error, info};

/// Identity forwarded with every backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    /// Session token, sent as a bearer credential when present
    pub token: Option<String>,
}

impl Caller {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("user-id", &self.user_id);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Uploaded usage file
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Backend ingestion route for an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionEndpoint {
    /// Interval meter readings (CSV)
    Ami,
    /// Daily load pattern exported as an HTML table
    DailyPattern,
}

impl IngestionEndpoint {
    /// `.html` and `.htm` files are daily patterns; everything else is AMI data
    #[must_use]
    pub fn for_file_name(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".html") || lower.ends_with(".htm") {
            Self::DailyPattern
        } else {
            Self::Ami
        }
    }

    #[must_use]
    pub fn segment(&self) -> &'static str {
        match self {
            Self::Ami => "ami",
            Self::DailyPattern => "daily_pattern",
        }
    }
}

/// Optimization backend REST client
#[derive(Debug, Clone)]
pub struct OptimizationClient {
    base_url: Url,
    client: Client,
}

impl OptimizationClient {
    pub fn new(base_url: &str, timeout: Duration) -> RelayResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RelayError::ConfigError(format!("Invalid backend URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::ConfigError(format!(
                "Backend URL cannot be used as a base: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        info!("Initializing optimization backend client: {}", base_url);
        Ok(Self { base_url, client })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send settings and usage file to the ingestion endpoint matching the file type
    pub async fn submit(
        &self,
        caller: &Caller,
        settings_json: String,
        file: Option<UploadFile>,
    ) -> RelayResult<SubmissionAck> {
        let file = file.ok_or(RelayError::MissingFile)?;
        let endpoint = IngestionEndpoint::for_file_name(&file.file_name);
        let url = self.url(&["v1", "optimizations", endpoint.segment()]);
        info!(
            endpoint = endpoint.segment(),
            file = %file.file_name,
            bytes = file.bytes.len(),
            "📤 Submitting optimization"
        );

        let mut part = Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().text("settings", settings_json).part("file", part);

        let response = caller
            .apply(self.client.post(url))
            .multipart(form)
            .send()
            .await?;
        let ack: SubmissionAck = decode(response).await?;
        debug!(job_id = ?ack.job_id, "Submission accepted");
        Ok(ack)
    }

    /// Jobs the caller has submitted
    pub async fn history(&self, caller: &Caller) -> RelayResult<Vec<JobSummary>> {
        let url = self.url(&["v1", "optimizations", &caller.user_id]);
        let response = caller.apply(self.client.get(url)).send().await?;

        match decode::<Value>(response).await? {
            value @ Value::Array(_) => Ok(serde_json::from_value(value)?),
            Value::Object(map) if map.is_empty() => Ok(Vec::new()),
            other => {
                error!("❌ Unexpected history payload: {}", other);
                Err(RelayError::InvalidResponse(
                    "job history is not a list".to_owned(),
                ))
            }
        }
    }

    /// Current status of one job, with results once it has completed
    pub async fn status(&self, caller: &Caller, job_id: &str) -> RelayResult<JobStatusResponse> {
        let url = self.url(&["v1", "optimizations", job_id, "status"]);
        let response = caller.apply(self.client.get(url)).send().await?;

        let mut status: JobStatusResponse = decode(response).await?;
        if status.job_id.is_empty() {
            job_id.clone_into(&mut status.job_id);
        }
        Ok(status)
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> RelayResult<T> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return Ok(serde_json::from_value(Value::Object(Map::new()))?);
    }

    let body = response.text().await?;
    if !status.is_success() {
        let message = error_message(status, &body);
        error!("❌ Backend returned {}: {}", status.as_u16(), message);
        return Err(RelayError::Backend {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

/// User-facing message for a failed backend response.
///
/// A JSON body's `detail` wins (structured details are shown as JSON text),
/// then `error`. Otherwise the status line, followed by the raw body when
/// it was not JSON.
#[must_use]
pub fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = format!(
        "API Error: {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );

    match serde_json::from_str::<Value>(body) {
        Ok(data) => {
            let field = |name: &str| data.get(name).filter(|v| is_present(v));
            match field("detail").or_else(|| field("error")) {
                Some(Value::String(message)) => message.clone(),
                Some(other) => other.to_string(),
                None => fallback,
            }
        }
        Err(_) if body.is_empty() => fallback,
        Err(_) => format!("{fallback} - {body}"),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(_) | Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(server: &Server) -> OptimizationClient {
        OptimizationClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    fn csv_upload(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_owned(),
            content_type: Some("text/csv".to_owned()),
            bytes: b"timestamp,load_kw\n2024-01-01 00:00:00,12.5\n".to_vec(),
        }
    }

    #[test]
    fn test_endpoint_by_extension() {
        assert_eq!(
            IngestionEndpoint::for_file_name("usage.csv"),
            IngestionEndpoint::Ami
        );
        assert_eq!(
            IngestionEndpoint::for_file_name("pattern.html"),
            IngestionEndpoint::DailyPattern
        );
        assert_eq!(
            IngestionEndpoint::for_file_name("PATTERN.HTM"),
            IngestionEndpoint::DailyPattern
        );
        assert_eq!(
            IngestionEndpoint::for_file_name("readings.xlsx"),
            IngestionEndpoint::Ami
        );
    }

    #[test]
    fn test_error_message_variants() {
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"bad input"}"#),
            "bad input"
        );
        assert_eq!(
            error_message(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"detail":[{"loc":["body","file"],"msg":"required"}]}"#
            ),
            r#"[{"loc":["body","file"],"msg":"required"}]"#
        );
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"error":"unsupported file"}"#),
            "unsupported file"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "API Error: 502 Bad Gateway - upstream down"
        );
        assert_eq!(
            error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
            "API Error: 503 Service Unavailable"
        );
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, r#"{"message":"nope"}"#),
            "API Error: 404 Not Found"
        );
    }

    #[tokio::test]
    async fn test_submit_csv_goes_to_ami() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/optimizations/ami")
            .match_header("user-id", "42")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="settings""#.to_owned()),
                Matcher::Regex(r#"filename="usage.csv""#.to_owned()),
                Matcher::Regex("Acme".to_owned()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"job_id": "job-1", "status": "processing"}).to_string())
            .create_async()
            .await;

        let ack = client(&server)
            .submit(
                &Caller::new("42"),
                json!({"company": {"name": "Acme"}}).to_string(),
                Some(csv_upload("usage.csv")),
            )
            .await
            .unwrap();

        assert_eq!(ack.job_id.as_deref(), Some("job-1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_html_goes_to_daily_pattern() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/optimizations/daily_pattern")
            .match_header("authorization", "Bearer session-token")
            .with_status(200)
            .with_body(json!({"job_id": "job-2"}).to_string())
            .create_async()
            .await;

        let upload = UploadFile {
            file_name: "pattern.html".to_owned(),
            content_type: None,
            bytes: b"<table></table>".to_vec(),
        };
        let ack = client(&server)
            .submit(
                &Caller::new("7").with_token("session-token"),
                "{}".to_owned(),
                Some(upload),
            )
            .await
            .unwrap();

        assert_eq!(ack.job_id.as_deref(), Some("job-2"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_without_file() {
        let server = Server::new_async().await;
        let result = client(&server)
            .submit(&Caller::new("42"), "{}".to_owned(), None)
            .await;
        assert!(matches!(result, Err(RelayError::MissingFile)));
        assert_eq!(result.unwrap_err().to_string(), "No file provided");
    }

    #[tokio::test]
    async fn test_submit_backend_detail() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/optimizations/ami")
            .with_status(500)
            .with_body(r#"{"detail":"bad input"}"#)
            .create_async()
            .await;

        let result = client(&server)
            .submit(
                &Caller::new("42"),
                "{}".to_owned(),
                Some(csv_upload("usage.csv")),
            )
            .await;

        match result {
            Err(RelayError::Backend { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "bad input");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_no_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/optimizations/ami")
            .with_status(204)
            .create_async()
            .await;

        let ack = client(&server)
            .submit(
                &Caller::new("42"),
                "{}".to_owned(),
                Some(csv_upload("usage.csv")),
            )
            .await
            .unwrap();
        assert_eq!(ack, SubmissionAck::default());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_history_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/optimizations/42")
            .match_header("user-id", "42")
            .with_status(200)
            .with_body(
                json!([
                    {"job_id": "0123456789", "company_name": "Acme", "status": "completed",
                     "progress_percent": 100, "created_at": "2025-03-01T08:30:00Z"},
                    {"job_id": "abcdef", "status": "processing", "progress_percent": 35}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let jobs = client(&server).history(&Caller::new("42")).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].company_name.as_deref(), Some("Acme"));
        assert_eq!(jobs[1].company_name, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_history_rejects_non_list() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/optimizations/42")
            .with_status(200)
            .with_body(r#"{"jobs": []}"#)
            .create_async()
            .await;

        let result = client(&server).history(&Caller::new("42")).await;
        assert!(matches!(result, Err(RelayError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_status_with_results() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/optimizations/job-1/status")
            .with_status(200)
            .with_body(
                json!({
                    "status": "completed",
                    "progress_percent": 100,
                    "results": {"load_kw": {"2024-01-01 00:00:00": 10.0}}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let status = client(&server)
            .status(&Caller::new("42"), "job-1")
            .await
            .unwrap();
        assert_eq!(status.job_id, "job-1");
        assert_eq!(status.results.unwrap().load_kw.len(), 1);
        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_base_url() {
        let result = OptimizationClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(RelayError::ConfigError(_))));
    }

    #[test]
    fn test_url_joins_segments_under_base_path() {
        let client =
            OptimizationClient::new("http://backend:8000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url(&["v1", "optimizations", "job 1", "status"]).as_str(),
            "http://backend:8000/api/v1/optimizations/job%201/status"
        );
    }
}
