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

//! Server-rendered evaluation dashboard.
//!
//! Pages live under a locale segment (`/en/...`, `/zh-hant/...`). The
//! [`context::request_context`] middleware resolves locale and session once
//! per request; handlers read the result from request extensions.

mod context;
mod db;
mod evaluation;
mod form;
mod pages;
mod result;
mod session;

pub use context::{RequestContext, is_absolute_url, localized_path, sign_in_target};
pub use db::{ActivityEntry, ActivityStore};
pub use form::{FormError, settings_from_fields};
pub use session::{SESSION_COOKIE, Session, SessionError, SessionService, UserId};

use askama::Template;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Router, middleware};
use blps_client::OptimizationBackend;
use blps_i18n::{Catalog, Language};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Web-layer settings
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub default_locale: Language,
    /// Timezone for dates shown in lists
    pub display_timezone: chrono_tz::Tz,
    /// Account-service sign-in page: a path under the locale prefix, or an
    /// absolute URL when the account service runs elsewhere
    pub sign_in_path: String,
    pub activity_limit: usize,
    pub max_upload_bytes: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            default_locale: Language::English,
            display_timezone: chrono_tz::Asia::Taipei,
            sign_in_path: "/sign-in".to_owned(),
            activity_limit: 20,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Application state for web handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub backend: Arc<dyn OptimizationBackend>,
    pub catalog: Catalog,
    pub sessions: Arc<SessionService>,
    /// Account database; the activity page shows an empty log without it
    pub activity: Option<Arc<ActivityStore>>,
    pub config: Arc<WebConfig>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/static/app.css", get(stylesheet_handler))
        .route("/static/viewport.js", get(script_handler))
        .route("/api/optimizations", post(evaluation::submit_action))
        .route(result::VIEWPORT_ENDPOINT, post(result::viewport_command))
        .route("/{locale}", get(pages::home))
        .route("/{locale}/dashboard", get(pages::dashboard))
        .route("/{locale}/dashboard/activity", get(pages::activity))
        .route("/{locale}/evaluation", get(evaluation::list))
        .route(
            "/{locale}/evaluation/new",
            get(evaluation::new_form).post(evaluation::submit_form),
        )
        .route(
            "/{locale}/evaluation/result/{job_id}",
            get(result::result_page),
        )
        .fallback(pages::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            context::request_context,
        ))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Serve the dashboard on `addr` until the process stops
///
/// # Errors
/// Returns error if server fails to bind or serve
pub async fn start_web_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);

    info!("🌐 Starting web server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub(crate) fn render<T: Template>(template: &T) -> Response {
    render_with_status(StatusCode::OK, template)
}

pub(crate) fn render_with_status<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template render error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!(
                    "<html><body><h1>Error</h1><p>Failed to render template: {e}</p></body></html>"
                )),
            )
                .into_response()
        }
    }
}

/// 303 to `location`, for form posts and page aliases
pub(crate) fn see_other(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::SEE_OTHER, [(LOCATION, value)]).into_response(),
        Err(e) => {
            error!("❌ Invalid redirect target {:?}: {}", location, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Health check endpoint
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn stylesheet_handler() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/css; charset=utf-8")],
        include_str!("../static/app.css"),
    )
}

async fn script_handler() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/javascript; charset=utf-8")],
        include_str!("../static/viewport.js"),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Router fixtures shared by handler tests

    use super::*;
    use async_trait::async_trait;
    use blps_client::{Caller, RelayError, RelayResult, UploadFile};
    use blps_types::{JobStatusResponse, JobSummary, SubmissionAck};
    use parking_lot::Mutex;

    pub const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    /// Backend double returning canned answers and recording submissions
    #[derive(Debug, Default)]
    pub struct StubBackend {
        pub history: Option<Vec<JobSummary>>,
        pub status: Option<JobStatusResponse>,
        pub ack: Option<SubmissionAck>,
        pub submitted: Mutex<Vec<(String, String, Option<String>)>>,
    }

    #[async_trait]
    impl OptimizationBackend for StubBackend {
        async fn submit(
            &self,
            caller: &Caller,
            settings_json: String,
            file: Option<UploadFile>,
        ) -> RelayResult<SubmissionAck> {
            let Some(file) = file else {
                return Err(RelayError::MissingFile);
            };
            self.submitted.lock().push((
                caller.user_id.clone(),
                settings_json,
                Some(file.file_name),
            ));
            self.ack.clone().ok_or_else(|| RelayError::Backend {
                status: 500,
                message: "bad input".to_owned(),
            })
        }

        async fn history(&self, _caller: &Caller) -> RelayResult<Vec<JobSummary>> {
            self.history
                .clone()
                .ok_or_else(|| RelayError::InvalidResponse("no history".to_owned()))
        }

        async fn status(&self, _caller: &Caller, job_id: &str) -> RelayResult<JobStatusResponse> {
            self.status
                .clone()
                .filter(|status| status.job_id == job_id)
                .ok_or_else(|| RelayError::Backend {
                    status: 404,
                    message: "Job not found".to_owned(),
                })
        }
    }

    pub fn state(backend: StubBackend) -> AppState {
        AppState {
            backend: Arc::new(backend),
            catalog: Catalog::load().unwrap(),
            sessions: Arc::new(SessionService::new(SECRET, 24)),
            activity: None,
            config: Arc::new(WebConfig::default()),
        }
    }

    /// `Cookie` header value for a signed-in user
    pub fn session_cookie(state: &AppState, user: i64) -> String {
        let token = state.sessions.issue(UserId::Number(user)).unwrap();
        format!("{SESSION_COOKIE}={token}")
    }

    pub async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
