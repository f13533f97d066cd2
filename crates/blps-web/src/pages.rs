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

//! Home, activity log and error pages.

use crate::context::RequestContext;
use crate::db::ActivityEntry;
use crate::{AppState, render, render_with_status, see_other};
use askama::Template;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

/// Action codes written by the account service
const ACTION_CODES: [&str; 10] = [
    "SIGN_UP",
    "SIGN_IN",
    "SIGN_OUT",
    "UPDATE_PASSWORD",
    "DELETE_ACCOUNT",
    "UPDATE_ACCOUNT",
    "CREATE_TEAM",
    "REMOVE_TEAM_MEMBER",
    "INVITE_TEAM_MEMBER",
    "ACCEPT_INVITATION",
];

const SOLUTIONS: [&str; 4] = [
    "solutions-frequency-regulation",
    "solutions-edreg",
    "solutions-solar-storage",
    "solutions-re100",
];

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    ctx: RequestContext,
    solutions: Vec<String>,
}

#[derive(Template)]
#[template(path = "activity.html")]
struct ActivityTemplate {
    ctx: RequestContext,
    rows: Vec<ActivityRow>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub(crate) struct ErrorTemplate {
    pub ctx: RequestContext,
    pub title: String,
    pub description: String,
}

struct ActivityRow {
    label: String,
    /// Lowercase action code, used as a CSS modifier
    kind: String,
    when: String,
    ip_address: Option<String>,
}

pub(crate) async fn home(Extension(ctx): Extension<RequestContext>) -> Response {
    let solutions = SOLUTIONS.iter().map(|key| ctx.t(key)).collect();
    render(&HomeTemplate { ctx, solutions })
}

pub(crate) async fn dashboard(Extension(ctx): Extension<RequestContext>) -> Response {
    see_other(&ctx.href("/evaluation"))
}

pub(crate) async fn activity(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    let now = Utc::now();
    let timezone = state.config.display_timezone;
    let rows = load_activity(&state, &ctx)
        .into_iter()
        .map(|entry| ActivityRow {
            label: action_label(&ctx, &entry.action),
            kind: entry.action.to_ascii_lowercase().replace('_', "-"),
            when: relative_time(&ctx, now, entry.timestamp, timezone),
            ip_address: entry.ip_address,
        })
        .collect();
    render(&ActivityTemplate { ctx, rows })
}

fn load_activity(state: &AppState, ctx: &RequestContext) -> Vec<ActivityEntry> {
    let Some(store) = &state.activity else {
        debug!("No account database configured, activity log is empty");
        return Vec::new();
    };
    let Some(user_id) = ctx.session.as_ref().and_then(|s| s.user_id().as_number()) else {
        return Vec::new();
    };
    match store.recent_for_user(user_id, state.config.activity_limit) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("⚠️ Failed to read activity log for user {}: {}", user_id, e);
            Vec::new()
        }
    }
}

fn action_label(ctx: &RequestContext, action: &str) -> String {
    if ACTION_CODES.contains(&action) {
        ctx.t(&format!("activity-action-{action}"))
    } else {
        ctx.t("activity-action-UNKNOWN")
    }
}

/// How long ago something happened, in the largest whole unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Elapsed {
    JustNow,
    Minutes(i64),
    Hours(i64),
    Days(i64),
    /// A week or more; shown as a date
    LongAgo,
}

#[expect(
    clippy::integer_division,
    reason = "Whole minutes, hours and days are intended"
)]
fn elapsed(now: DateTime<Utc>, then: DateTime<Utc>) -> Elapsed {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        Elapsed::JustNow
    } else if seconds < 3600 {
        Elapsed::Minutes(seconds / 60)
    } else if seconds < 86_400 {
        Elapsed::Hours(seconds / 3600)
    } else if seconds < 7 * 86_400 {
        Elapsed::Days(seconds / 86_400)
    } else {
        Elapsed::LongAgo
    }
}

fn relative_time(
    ctx: &RequestContext,
    now: DateTime<Utc>,
    then: DateTime<Utc>,
    timezone: Tz,
) -> String {
    match elapsed(now, then) {
        Elapsed::JustNow => ctx.t("time-just-now"),
        Elapsed::Minutes(n) => ctx.t_count("time-minutes-ago", n),
        Elapsed::Hours(n) => ctx.t_count("time-hours-ago", n),
        Elapsed::Days(n) => ctx.t_count("time-days-ago", n),
        Elapsed::LongAgo => then.with_timezone(&timezone).format("%Y-%m-%d").to_string(),
    }
}

pub(crate) async fn not_found(ctx: Option<Extension<RequestContext>>) -> Response {
    let Some(Extension(ctx)) = ctx else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };
    let template = ErrorTemplate {
        title: ctx.t("error-not-found-title"),
        description: ctx.t("error-not-found-description"),
        ctx,
    };
    render_with_status(StatusCode::NOT_FOUND, &template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ActivityStore;
    use crate::test_support::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::header::COOKIE;
    use blps_i18n::{Catalog, Language};
    use chrono::TimeDelta;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn ctx(language: Language) -> RequestContext {
        RequestContext {
            locale: language,
            i18n: Catalog::load().unwrap().get(language).unwrap(),
            session: None,
            path: "/dashboard/activity".to_owned(),
        }
    }

    #[test]
    fn test_elapsed_units() {
        let now = Utc::now();
        assert_eq!(elapsed(now, now), Elapsed::JustNow);
        assert_eq!(elapsed(now, now + TimeDelta::minutes(5)), Elapsed::JustNow);
        assert_eq!(elapsed(now, now - TimeDelta::seconds(59)), Elapsed::JustNow);
        assert_eq!(elapsed(now, now - TimeDelta::seconds(61)), Elapsed::Minutes(1));
        assert_eq!(elapsed(now, now - TimeDelta::minutes(90)), Elapsed::Hours(1));
        assert_eq!(elapsed(now, now - TimeDelta::hours(49)), Elapsed::Days(2));
        assert_eq!(elapsed(now, now - TimeDelta::days(7)), Elapsed::LongAgo);
    }

    #[test]
    fn test_relative_time_text() {
        let ctx = ctx(Language::English);
        let now = Utc::now();
        assert_eq!(
            relative_time(&ctx, now, now - TimeDelta::hours(3), Tz::UTC),
            "3 hours ago"
        );
        let then = DateTime::parse_from_rfc3339("2024-12-31T20:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        // past midnight in Taipei
        assert_eq!(
            relative_time(&ctx, now, then, chrono_tz::Asia::Taipei),
            "2025-01-01"
        );
    }

    #[test]
    fn test_unknown_action_label() {
        let ctx = ctx(Language::English);
        assert_eq!(action_label(&ctx, "SIGN_IN"), ctx.t("activity-action-SIGN_IN"));
        assert_eq!(
            action_label(&ctx, "TELEPORT"),
            ctx.t("activity-action-UNKNOWN")
        );
    }

    #[tokio::test]
    async fn test_activity_page_lists_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ActivityStore::open(&dir.path().join("account.db")).unwrap();
        store
            .record(42, "SIGN_IN", Utc::now() - TimeDelta::minutes(5), Some("192.0.2.7"))
            .unwrap();
        store.record(42, "TELEPORT", Utc::now(), None).unwrap();

        let mut state = state(StubBackend::default());
        state.activity = Some(Arc::new(store));
        let cookie = session_cookie(&state, 42);

        let response = crate::build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/en/dashboard/activity")
                    .header(COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("5 minutes ago"));
        assert!(html.contains("192.0.2.7"));
        assert!(html.contains("Unknown action"));
    }

    #[tokio::test]
    async fn test_activity_page_without_database_is_empty() {
        let state = state(StubBackend::default());
        let cookie = session_cookie(&state, 42);
        let response = crate::build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/en/dashboard/activity")
                    .header(COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("activity-empty"));
    }
}
