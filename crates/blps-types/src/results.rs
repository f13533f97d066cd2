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

use crate::lenient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp-keyed values; keys iterate in sorted order
pub type Series = BTreeMap<String, f64>;

/// Result payload of a completed optimization job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResults {
    #[serde(default, deserialize_with = "lenient::series")]
    pub load_kw: Series,
    #[serde(default, deserialize_with = "lenient::series")]
    pub grid_base: Series,
    #[serde(default, deserialize_with = "lenient::series")]
    pub grid_proj: Series,
    #[serde(default, deserialize_with = "lenient::series")]
    pub base_cap: Series,
    #[serde(default, deserialize_with = "lenient::series")]
    pub proj_cap: Series,
    /// Positive values discharge the battery, negative values charge it
    #[serde(default, deserialize_with = "lenient::series")]
    pub battery_dispatch: Series,
    /// Either fractions (0-1) or percents (0-100), depending on the backend version
    #[serde(default, deserialize_with = "lenient::series")]
    pub soc_percent: Series,
    #[serde(default, deserialize_with = "lenient::optional_series")]
    pub base_tariff_rate: Option<Series>,
    #[serde(default, deserialize_with = "lenient::optional_series")]
    pub proj_tariff_rate: Option<Series>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub original_base: Option<OriginalBase>,

    #[serde(default, deserialize_with = "lenient::number")]
    pub upfront_cost: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub gross_savings: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub optimal_cabinet: OptimalCabinet,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub financial_metrics: FinancialMetrics,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub results_by_cabinet: BTreeMap<String, CabinetResult>,
    /// ADR outcome keyed by month (`YYYY-MM`)
    #[serde(default, alias = "adr", deserialize_with = "lenient::or_default")]
    pub adr_results: BTreeMap<String, AdrMonthResult>,
}

impl OptimizationResults {
    /// Parse a raw payload; malformed structure degrades to empty fields
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Load and grid series before any site adjustments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginalBase {
    #[serde(default, deserialize_with = "lenient::optional_series")]
    pub load_kw: Option<Series>,
    #[serde(default, deserialize_with = "lenient::optional_series")]
    pub grid_series: Option<Series>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimalCabinet {
    #[serde(default, deserialize_with = "lenient::number")]
    pub cabinets: f64,
    /// Power rating in kW
    #[serde(default, deserialize_with = "lenient::number")]
    pub p_nom: f64,
    /// Energy capacity in kWh
    #[serde(default, deserialize_with = "lenient::number")]
    pub e_nom: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    #[serde(default, deserialize_with = "lenient::number")]
    pub spv_npv: f64,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub spv_irr_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub spv_breakeven_year: Option<BreakevenYear>,
}

/// Breakeven is a year count, or a label such as "Never" when it is not reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakevenYear {
    Years(f64),
    Label(String),
}

impl BreakevenYear {
    /// Labels the backend uses for an investment that does not pay back
    #[must_use]
    pub fn is_never(&self) -> bool {
        match self {
            Self::Years(_) => false,
            Self::Label(label) => matches!(
                label.trim().to_ascii_lowercase().as_str(),
                "never" | "na" | "n/a" | "none"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CabinetResult {
    #[serde(default, deserialize_with = "lenient::number")]
    pub cabinets: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub p_nom: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub e_nom: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub financial_metrics: FinancialMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdrMonthResult {
    /// Program names joined with " + "
    #[serde(default, deserialize_with = "lenient::string")]
    pub scenario: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub revenue: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub events: Vec<AdrEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdrEvent {
    #[serde(default, deserialize_with = "lenient::string")]
    pub rule: String,
    /// Event details keyed by date
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub info: BTreeMap<String, AdrEventInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdrEventInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub time_window: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub duration_hours: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub hours: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub note: Option<String>,
}
