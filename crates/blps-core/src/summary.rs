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

use blps_types::{
    BreakevenYear, EscoSplit, OptimizationResults, OptimizationSettings, TariffType,
};

/// Headline figures of a completed job; missing values read as 0
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMetrics {
    pub cabinets: f64,
    pub power_rating_kw: f64,
    pub energy_capacity_kwh: f64,
    pub breakeven: Option<BreakevenYear>,
    pub upfront_cost: f64,
    pub gross_savings: f64,
    pub spv_npv: f64,
    pub spv_irr: f64,
}

impl KeyMetrics {
    #[must_use]
    pub fn from_results(results: &OptimizationResults) -> Self {
        let financial = &results.financial_metrics;
        Self {
            cabinets: results.optimal_cabinet.cabinets,
            power_rating_kw: results.optimal_cabinet.p_nom,
            energy_capacity_kwh: results.optimal_cabinet.e_nom,
            breakeven: financial.spv_breakeven_year.clone(),
            upfront_cost: results.upfront_cost,
            gross_savings: results.gross_savings,
            spv_npv: financial.spv_npv,
            spv_irr: financial.spv_irr_value.unwrap_or(0.0),
        }
    }

    #[must_use]
    pub fn npv_positive(&self) -> bool {
        self.spv_npv >= 0.0
    }

    #[must_use]
    pub fn irr_positive(&self) -> bool {
        self.spv_irr >= 0.0
    }
}

/// One row of the per-cabinet-count comparison table
#[derive(Debug, Clone, PartialEq)]
pub struct CabinetRow {
    pub cabinets: f64,
    pub is_optimal: bool,
    pub irr: Option<f64>,
    pub npv: f64,
    pub breakeven: Option<BreakevenYear>,
}

impl CabinetRow {
    /// `None` IRR renders as N/A and is coloured as a loss
    #[must_use]
    pub fn irr_positive(&self) -> bool {
        self.irr.is_some_and(|irr| irr >= 0.0)
    }
}

/// Comparison rows ordered by cabinet count
#[must_use]
pub fn cabinet_rows(results: &OptimizationResults) -> Vec<CabinetRow> {
    let optimal = results.optimal_cabinet.cabinets;
    let mut rows: Vec<CabinetRow> = results
        .results_by_cabinet
        .values()
        .map(|r| CabinetRow {
            cabinets: r.cabinets,
            is_optimal: (r.cabinets - optimal).abs() < f64::EPSILON,
            irr: r.financial_metrics.spv_irr_value,
            npv: r.financial_metrics.spv_npv,
            breakeven: r.financial_metrics.spv_breakeven_year.clone(),
        })
        .collect();
    rows.sort_by(|a, b| a.cabinets.total_cmp(&b.cabinets));
    rows
}

/// ADR outcome for one month
#[derive(Debug, Clone, PartialEq)]
pub struct AdrMonthSummary {
    pub month: String,
    pub revenue: f64,
    /// Program codes that made up the month's scenario
    pub scenario_parts: Vec<String>,
    pub rules: Vec<AdrRuleEvents>,
    /// Event days across every rule
    pub event_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdrRuleEvents {
    pub rule: String,
    pub days: Vec<AdrDay>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdrDay {
    pub date: String,
    pub time_window: String,
    pub duration_hours: f64,
    pub note: Option<String>,
}

/// Monthly ADR summaries in month order, with each rule's days in date order
#[must_use]
pub fn adr_summaries(results: &OptimizationResults) -> Vec<AdrMonthSummary> {
    results
        .adr_results
        .iter()
        .map(|(month, data)| {
            let rules: Vec<AdrRuleEvents> = data
                .events
                .iter()
                .map(|event| AdrRuleEvents {
                    rule: event.rule.clone(),
                    days: event
                        .info
                        .iter()
                        .map(|(date, info)| AdrDay {
                            date: date.clone(),
                            time_window: info.time_window.clone(),
                            duration_hours: info.duration_hours,
                            note: info.note.clone().filter(|n| !n.is_empty()),
                        })
                        .collect(),
                })
                .collect();
            AdrMonthSummary {
                month: month.clone(),
                revenue: data.revenue,
                scenario_parts: data
                    .scenario
                    .split(" + ")
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(ToOwned::to_owned)
                    .collect(),
                event_count: rules.iter().map(|r| r.days.len()).sum(),
                rules,
            }
        })
        .collect()
}

/// Tariff and contract capacities of one case, zero capacities left out
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSummary {
    pub tariff_type: TariffType,
    pub capacities: Vec<(&'static str, f64)>,
}

/// What the job was submitted with
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationSummary {
    pub base: CaseSummary,
    pub project: CaseSummary,
    pub usd_per_kwh: f64,
    pub esco: EscoSplit,
}

impl ConfigurationSummary {
    #[must_use]
    pub fn from_settings(settings: &OptimizationSettings) -> Self {
        let case = |c: &blps_types::CaseSettings| CaseSummary {
            tariff_type: c.tariff_type,
            capacities: c
                .capacities()
                .into_iter()
                .filter(|(_, value)| *value > 0.0)
                .collect(),
        };
        Self {
            base: case(&settings.base_case),
            project: case(&settings.project_case),
            usd_per_kwh: settings.financial.system_cost.usd_per_kwh,
            esco: settings.financial.esco.clone(),
        }
    }
}
