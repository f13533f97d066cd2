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

//! Result page of one optimization job, and the chart viewport API behind it.
//!
//! The page embeds every chart point once. The viewport API is stateless and
//! never calls the backend: the browser sends the series timestamps and the
//! state it holds with every command, gets the new state back and slices the
//! points it already has.

use crate::context::RequestContext;
use crate::pages::ErrorTemplate;
use crate::{AppState, render, render_with_status};
use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use blps_core::format;
use blps_core::{
    AdrMonthSummary, CabinetRow, ChartPoint, ChartViewport, ConfigurationSummary,
    InteractionMode, KeyMetrics, NavigatorPoint, Preset, ViewportState, VisibleRange,
    adr_summaries, cabinet_rows, navigator_series, project_series,
};
use blps_types::{BreakevenYear, JobStatus, JobStatusResponse, OptimizationResults};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Translated strings the chart script needs
const CHART_LABELS: [&str; 24] = [
    "chart-base-case",
    "chart-project-case",
    "chart-battery-soc",
    "chart-operating-cost",
    "chart-navigator",
    "chart-no-data",
    "chart-mode-zoom",
    "chart-mode-pan",
    "chart-reset",
    "series-demand",
    "series-grid",
    "series-base-cap",
    "series-demand-original",
    "series-grid-original",
    "series-hard-cap",
    "series-total-grid-load",
    "series-total-load",
    "series-grid-to-load",
    "series-grid-to-battery",
    "series-battery-to-load",
    "series-soc",
    "series-cost-base",
    "series-cost-proj",
    "result-progress",
];

#[derive(Template)]
#[template(path = "result.html")]
struct ResultTemplate {
    ctx: RequestContext,
    title: String,
    job_id: String,
    back_href: String,
    metrics: Vec<MetricCard>,
    cabinets: Vec<CabinetView>,
    adr_months: Vec<AdrMonthView>,
    config: Option<ConfigView>,
    presets: Vec<PresetButton>,
    has_chart: bool,
    zoom_active: bool,
    /// Chart payload, already escaped for a `<script>` element
    chart_json: String,
}

#[derive(Template)]
#[template(path = "result_status.html")]
struct ResultStatusTemplate {
    ctx: RequestContext,
    title: String,
    description: String,
    job_id: String,
    status: &'static str,
    progress: String,
    back_href: String,
    failed: bool,
}

struct MetricCard {
    label: String,
    value: String,
    /// `positive`, `negative` or empty
    tone: &'static str,
}

struct CabinetView {
    cabinets: String,
    optimal: bool,
    irr: String,
    irr_tone: &'static str,
    npv: String,
    npv_tone: &'static str,
    breakeven: String,
}

struct AdrMonthView {
    month: String,
    revenue: String,
    has_revenue: bool,
    scenario: String,
    events_label: String,
    rules: Vec<AdrRuleView>,
}

struct AdrRuleView {
    name: String,
    days: Vec<AdrDayView>,
}

struct AdrDayView {
    date: String,
    time_window: String,
    duration: String,
    note: String,
}

struct LabeledValue {
    label: String,
    value: String,
}

struct CaseView {
    title: String,
    tariff: String,
    capacities: Vec<LabeledValue>,
}

struct ConfigView {
    cases: Vec<CaseView>,
    financial: Vec<LabeledValue>,
}

struct PresetButton {
    code: &'static str,
    label: String,
    active: bool,
}

fn tone(positive: bool) -> &'static str {
    if positive { "positive" } else { "negative" }
}

fn breakeven_text(ctx: &RequestContext, breakeven: Option<&BreakevenYear>) -> String {
    match breakeven {
        None => ctx.t("value-na"),
        Some(b) if b.is_never() => ctx.t("value-never"),
        Some(BreakevenYear::Years(years)) => format::fixed(*years, 1),
        Some(BreakevenYear::Label(label)) => label.clone(),
    }
}

/// Translated ADR program name; unknown codes show as sent
fn adr_name(ctx: &RequestContext, code: &str) -> String {
    let key = format!("adr-name-{code}");
    if ctx.i18n.contains(&key) {
        ctx.t(&key)
    } else {
        code.to_owned()
    }
}

fn metric_cards(ctx: &RequestContext, metrics: &KeyMetrics) -> Vec<MetricCard> {
    let plain = |key: &str, value: String| MetricCard {
        label: ctx.t(key),
        value,
        tone: "",
    };
    vec![
        plain("metrics-optimal-cabinets", format::number(metrics.cabinets, 0)),
        plain(
            "metrics-power-rating",
            format!("{} kW", format::number(metrics.power_rating_kw, 1)),
        ),
        plain(
            "metrics-energy-capacity",
            format!("{} kWh", format::number(metrics.energy_capacity_kwh, 1)),
        ),
        plain(
            "metrics-spv-breakeven",
            breakeven_text(ctx, metrics.breakeven.as_ref()),
        ),
        plain("metrics-upfront-cost", format::currency_twd(metrics.upfront_cost)),
        plain(
            "metrics-gross-annual-savings",
            format::currency_twd(metrics.gross_savings),
        ),
        MetricCard {
            label: ctx.t("metrics-spv-npv"),
            value: format::currency_twd(metrics.spv_npv),
            tone: tone(metrics.npv_positive()),
        },
        MetricCard {
            label: ctx.t("metrics-spv-irr"),
            value: format::percent(metrics.spv_irr, 2),
            tone: tone(metrics.irr_positive()),
        },
    ]
}

fn cabinet_view(ctx: &RequestContext, row: &CabinetRow) -> CabinetView {
    CabinetView {
        cabinets: format::number(row.cabinets, 0),
        optimal: row.is_optimal,
        irr: row
            .irr
            .map_or_else(|| ctx.t("value-na"), |irr| format::percent(irr, 2)),
        irr_tone: if row.irr.is_some() {
            tone(row.irr_positive())
        } else {
            ""
        },
        npv: format::currency_twd(row.npv),
        npv_tone: tone(row.npv >= 0.0),
        breakeven: breakeven_text(ctx, row.breakeven.as_ref()),
    }
}

fn adr_month_view(ctx: &RequestContext, month: &AdrMonthSummary) -> AdrMonthView {
    let has_revenue = month.revenue > 0.0;
    AdrMonthView {
        month: month.month.clone(),
        revenue: if has_revenue {
            format::currency_twd(month.revenue)
        } else {
            ctx.t("adr-no-revenue")
        },
        has_revenue,
        scenario: month
            .scenario_parts
            .iter()
            .map(|part| adr_name(ctx, part))
            .collect::<Vec<_>>()
            .join(" + "),
        events_label: ctx.t_count(
            "adr-view-events",
            i64::try_from(month.event_count).unwrap_or(i64::MAX),
        ),
        rules: month
            .rules
            .iter()
            .map(|rule| AdrRuleView {
                name: adr_name(ctx, &rule.rule),
                days: rule
                    .days
                    .iter()
                    .map(|day| AdrDayView {
                        date: day.date.clone(),
                        time_window: day.time_window.clone(),
                        duration: format!("{} h", format::number(day.duration_hours, 1)),
                        note: day.note.clone().unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn config_view(ctx: &RequestContext, summary: &ConfigurationSummary) -> ConfigView {
    let case_view = |title_key: &str, case: &blps_core::CaseSummary| CaseView {
        title: ctx.t(title_key),
        tariff: ctx.t(&format!("option-{}", case.tariff_type.code())),
        capacities: case
            .capacities
            .iter()
            .map(|(name, value)| LabeledValue {
                label: ctx.t(&format!("config-cap-{name}")),
                value: format!("{} kW", format::number(*value, 1)),
            })
            .collect(),
    };
    let esco = &summary.esco;
    let share = |key: &str, value: f64| LabeledValue {
        label: ctx.t(key),
        value: format::percent(value, 0),
    };
    ConfigView {
        cases: vec![
            case_view("config-base-case", &summary.base),
            case_view("config-project-case", &summary.project),
        ],
        financial: vec![
            LabeledValue {
                label: ctx.t("config-usd-per-kwh"),
                value: format::currency_usd(summary.usd_per_kwh),
            },
            share("config-esco-spv", esco.spv),
            share("config-esco-factory", esco.factory),
            share("config-esco-operation", esco.operation),
            share("config-esco-service", esco.service),
        ],
    }
}

/// Everything the chart script starts from
#[derive(Serialize)]
struct ChartPayload<'a> {
    endpoint: &'static str,
    state: ViewportState,
    /// The full series; the script shows the slice inside `state.range`
    points: &'a [ChartPoint],
    navigator: Vec<NavigatorPoint>,
    labels: BTreeMap<&'static str, String>,
}

/// JSON for an inline `<script>` element
fn script_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn timestamps(points: &[ChartPoint]) -> Vec<String> {
    points.iter().map(|p| p.timestamp.clone()).collect()
}

fn job_title(ctx: &RequestContext, job: &JobStatusResponse) -> String {
    match job.company_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => ctx.t_with("result-title", "company", name),
        _ => ctx.t("result-untitled"),
    }
}

pub(crate) async fn result_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((_locale, job_id)): Path<(String, String)>,
) -> Response {
    let job = match ctx.caller() {
        Some(caller) => state.backend.status_or_none(&caller, &job_id).await,
        None => None,
    };
    let Some(job) = job else {
        let template = ErrorTemplate {
            title: ctx.t("result-not-found-title"),
            description: ctx.t("result-not-found-description"),
            ctx,
        };
        return render_with_status(StatusCode::NOT_FOUND, &template);
    };

    let back_href = ctx.href("/evaluation");
    let Some(results) = job.results.as_ref() else {
        return status_page(ctx, &job, back_href);
    };
    completed_page(ctx, &job, results, back_href)
}

fn status_page(ctx: RequestContext, job: &JobStatusResponse, back_href: String) -> Response {
    let failed = job.status == JobStatus::Failed;
    let (title, description) = if failed {
        (
            ctx.t("result-failed-title"),
            job.error
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| ctx.t("error-title")),
        )
    } else {
        (
            ctx.t("result-pending-title"),
            ctx.t("result-pending-description"),
        )
    };
    render(&ResultStatusTemplate {
        title,
        description,
        job_id: job.job_id.clone(),
        status: job.status.code(),
        progress: format!("{:.0}", job.progress()),
        back_href,
        failed,
        ctx,
    })
}

fn completed_page(
    ctx: RequestContext,
    job: &JobStatusResponse,
    results: &OptimizationResults,
    back_href: String,
) -> Response {
    let points = project_series(results);
    let viewport = ChartViewport::initial(timestamps(&points));
    let active_preset = viewport.active_preset();

    let payload = ChartPayload {
        endpoint: VIEWPORT_ENDPOINT,
        state: viewport.state(),
        points: &points,
        navigator: navigator_series(&points),
        labels: CHART_LABELS.iter().map(|&key| (key, ctx.t(key))).collect(),
    };
    let chart_json = match script_json(&payload) {
        Ok(json) => json,
        Err(e) => {
            error!("❌ Failed to encode chart data for job {}: {}", job.job_id, e);
            "null".to_owned()
        }
    };

    let template = ResultTemplate {
        title: job_title(&ctx, job),
        job_id: job.job_id.clone(),
        back_href,
        metrics: metric_cards(&ctx, &KeyMetrics::from_results(results)),
        cabinets: cabinet_rows(results)
            .iter()
            .map(|row| cabinet_view(&ctx, row))
            .collect(),
        adr_months: adr_summaries(results)
            .iter()
            .map(|month| adr_month_view(&ctx, month))
            .collect(),
        config: job
            .settings
            .as_ref()
            .map(|settings| config_view(&ctx, &ConfigurationSummary::from_settings(settings))),
        presets: Preset::ALL
            .iter()
            .map(|preset| PresetButton {
                code: preset.code(),
                label: ctx.t(&format!("preset-{}", preset.code())),
                active: active_preset == Some(*preset),
            })
            .collect(),
        has_chart: !points.is_empty(),
        zoom_active: viewport.mode() == InteractionMode::Zoom,
        chart_json,
        ctx,
    };
    render(&template)
}

// ============= Viewport API =============

pub(crate) const VIEWPORT_ENDPOINT: &str = "/api/viewport";

/// One chart interaction, applied to the state the browser holds
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ViewportCommand {
    Preset { preset: Preset },
    /// Drag-select from one timestamp to another in zoom mode
    Select { from: String, to: String },
    /// Pan drag; without `from` the drag continues from the held anchor
    Pan {
        #[serde(default)]
        from: Option<String>,
        to: String,
    },
    /// Pan drag released
    EndPan,
    Brush { range: VisibleRange },
    Reset,
    Mode { mode: InteractionMode },
}

#[derive(Debug, Deserialize)]
pub(crate) struct ViewportRequest {
    #[serde(default)]
    state: ViewportState,
    /// Sorted timestamps of the series on the page
    #[serde(default)]
    timestamps: Vec<String>,
    command: ViewportCommand,
}

#[derive(Debug, Serialize)]
struct ViewportResponse<'a> {
    state: ViewportState,
    changed: bool,
    pan_anchor_timestamp: Option<&'a str>,
}

fn apply_command(viewport: &mut ChartViewport, command: ViewportCommand) -> bool {
    match command {
        ViewportCommand::Preset { preset } => viewport.apply_preset(preset),
        ViewportCommand::Select { from, to } => {
            viewport.begin_selection(&from);
            viewport.extend_selection(&to);
            viewport.commit_selection()
        }
        ViewportCommand::Pan { from, to } => {
            if let Some(from) = from {
                viewport.begin_pan(&from);
            }
            viewport.drag_pan(&to)
        }
        ViewportCommand::EndPan => {
            viewport.end_pan();
            false
        }
        ViewportCommand::Brush { range } => viewport.set_from_brush(range),
        ViewportCommand::Reset => viewport.reset_zoom(),
        ViewportCommand::Mode { mode } => {
            viewport.set_mode(mode);
            true
        }
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `POST /api/viewport`
pub(crate) async fn viewport_command(
    Extension(ctx): Extension<RequestContext>,
    Json(request): Json<ViewportRequest>,
) -> Response {
    if ctx.caller().is_none() {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let mut viewport = ChartViewport::restore(request.timestamps, &request.state);
    debug!(
        points = viewport.len(),
        command = ?request.command,
        "Viewport command"
    );
    let changed = apply_command(&mut viewport, request.command);

    Json(ViewportResponse {
        state: viewport.state(),
        changed,
        pan_anchor_timestamp: viewport.pan_anchor_timestamp(),
    })
    .into_response()
}
