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

//! Evaluation list, new-evaluation form and the submit action.

use crate::context::RequestContext;
use crate::form::{FormError, FormSectionView, FormState, Submission, form_sections, read_submission};
use crate::{AppState, render, render_with_status, see_other};
use askama::Template;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use blps_client::{Caller, RelayError};
use blps_types::{
    JobSummary, OptimizationSettings, SubmissionAck, ValidationReport, validate_settings,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Template)]
#[template(path = "evaluation_list.html")]
struct EvaluationListTemplate {
    ctx: RequestContext,
    rows: Vec<JobRow>,
}

struct JobRow {
    href: String,
    short_id: String,
    company: String,
    status: &'static str,
    status_label: String,
    progress: String,
    created_at: String,
}

impl JobRow {
    fn new(ctx: &RequestContext, job: &JobSummary, timezone: Tz) -> Self {
        Self {
            href: ctx.href(&format!("/evaluation/result/{}", job.job_id)),
            short_id: job.short_id(),
            company: job
                .company_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or("-")
                .to_owned(),
            status: job.status.code(),
            status_label: ctx.t(&format!("status-{}", job.status.code())),
            progress: format!("{:.0}", job.progress()),
            created_at: job
                .created_at
                .as_deref()
                .map_or_else(|| "-".to_owned(), |raw| format_created_at(raw, timezone)),
        }
    }
}

/// Backend timestamps are RFC 3339, or naive ISO 8601 in UTC
fn format_created_at(raw: &str, timezone: Tz) -> String {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
        });
    match parsed {
        Ok(dt) => dt.with_timezone(&timezone).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_owned(),
    }
}

#[derive(Template)]
#[template(path = "evaluation_new.html")]
struct EvaluationNewTemplate {
    ctx: RequestContext,
    sections: Vec<FormSectionView>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    let jobs = match ctx.caller() {
        Some(caller) => state.backend.history_or_empty(&caller).await,
        None => Vec::new(),
    };
    let timezone = state.config.display_timezone;
    let rows = jobs
        .iter()
        .map(|job| JobRow::new(&ctx, job, timezone))
        .collect();
    render(&EvaluationListTemplate { ctx, rows })
}

pub(crate) async fn new_form(Extension(ctx): Extension<RequestContext>) -> Response {
    form_page(ctx, &FormState::default(), Vec::new(), Vec::new(), StatusCode::OK)
}

fn form_page(
    ctx: RequestContext,
    state: &FormState,
    errors: Vec<String>,
    warnings: Vec<String>,
    status: StatusCode,
) -> Response {
    let sections = form_sections(&ctx, state);
    render_with_status(
        status,
        &EvaluationNewTemplate {
            ctx,
            sections,
            errors,
            warnings,
        },
    )
}

/// Why a submission did not reach the backend, or what the backend said
#[derive(Debug)]
enum SubmitFailure {
    Form(Vec<FormError>),
    Invalid(Box<OptimizationSettings>, ValidationReport),
    Relay(RelayError),
}

impl SubmitFailure {
    fn status(&self) -> StatusCode {
        match self {
            Self::Form(_) | Self::Invalid(..) | Self::Relay(RelayError::MissingFile) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Relay(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn messages(&self) -> Vec<String> {
        match self {
            Self::Form(errors) => errors.iter().map(ToString::to_string).collect(),
            Self::Invalid(_, report) => report
                .errors
                .iter()
                .map(|issue| format!("{}: {}", issue.field, issue.message))
                .collect(),
            Self::Relay(e) => vec![e.to_string()],
        }
    }
}

/// Parse, validate and relay one submission
async fn process(
    state: &AppState,
    caller: &Caller,
    submission: Submission,
) -> Result<SubmissionAck, SubmitFailure> {
    let settings = submission.settings().map_err(SubmitFailure::Form)?;
    let report = validate_settings(&settings);
    if !report.is_valid() {
        return Err(SubmitFailure::Invalid(Box::new(settings), report));
    }
    let settings_json =
        serde_json::to_string(&settings).map_err(|e| SubmitFailure::Form(vec![e.into()]))?;

    let ack = state
        .backend
        .submit(caller, settings_json, submission.file)
        .await
        .map_err(SubmitFailure::Relay)?;
    info!(
        user_id = %caller.user_id,
        job_id = ?ack.job_id,
        "📤 Evaluation submitted"
    );
    Ok(ack)
}

pub(crate) async fn submit_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    multipart: Multipart,
) -> Response {
    let Some(caller) = ctx.caller() else {
        return see_other(&ctx.href(&state.config.sign_in_path));
    };

    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(e) => {
            warn!("⚠️ Unreadable evaluation form: {}", e);
            return form_page(
                ctx,
                &FormState::default(),
                vec![e.to_string()],
                Vec::new(),
                StatusCode::BAD_REQUEST,
            );
        }
    };
    let raw = submission.fields.clone();

    match process(&state, &caller, submission).await {
        Ok(ack) => {
            let target = match ack.job_id.as_deref().filter(|id| !id.is_empty()) {
                Some(job_id) => ctx.href(&format!("/evaluation/result/{job_id}")),
                None => ctx.href("/evaluation"),
            };
            see_other(&target)
        }
        Err(failure) => {
            warn!("⚠️ Evaluation submission rejected: {:?}", failure.messages());
            let status = failure.status();
            let (form_state, warnings) = failed_form_state(&failure, raw);
            form_page(ctx, &form_state, failure.messages(), warnings, status)
        }
    }
}

/// What the form shows again after a failed submission
fn failed_form_state(
    failure: &SubmitFailure,
    raw: BTreeMap<String, String>,
) -> (FormState, Vec<String>) {
    match failure {
        SubmitFailure::Form(errors) => {
            let messages = errors
                .iter()
                .filter_map(|e| e.field().map(|field| (field.to_owned(), e.to_string())))
                .collect();
            (
                FormState {
                    document: None,
                    raw,
                    messages,
                },
                Vec::new(),
            )
        }
        SubmitFailure::Invalid(settings, report) => {
            let messages = report
                .errors
                .iter()
                .map(|issue| (issue.field.clone(), issue.message.clone()))
                .collect();
            let warnings = report
                .warnings
                .iter()
                .map(|issue| format!("{}: {}", issue.field, issue.message))
                .collect();
            (
                FormState {
                    document: serde_json::to_value(settings.as_ref()).ok(),
                    raw: BTreeMap::new(),
                    messages,
                },
                warnings,
            )
        }
        SubmitFailure::Relay(_) => (
            FormState {
                document: None,
                raw,
                messages: BTreeMap::new(),
            },
            Vec::new(),
        ),
    }
}

/// JSON answer of the submit action
#[derive(Debug, Serialize)]
pub(crate) struct ActionResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<SubmissionAck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ActionResponse {
    fn failure(status: StatusCode, error: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                success: false,
                data: None,
                error: Some(error.into()),
            }),
        )
            .into_response()
    }
}

/// `POST /api/optimizations`: multipart submit for script clients
pub(crate) async fn submit_action(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    multipart: Multipart,
) -> Response {
    let Some(caller) = ctx.caller() else {
        return ActionResponse::failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    };

    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(e) => return ActionResponse::failure(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match process(&state, &caller, submission).await {
        Ok(ack) => Json(ActionResponse {
            success: true,
            data: Some(ack),
            error: None,
        })
        .into_response(),
        Err(failure) => {
            warn!("⚠️ Optimization action failed: {:?}", failure.messages());
            ActionResponse::failure(failure.status(), failure.messages().join("; "))
        }
    }
}
