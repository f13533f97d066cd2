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

use blps_types::{OptimizationResults, Series};
use serde::Serialize;

/// One timestamp of the result charts, with derived energy flows and costs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: String,
    pub load_kw: f64,
    pub grid_base: f64,
    pub grid_proj: f64,
    pub base_cap: f64,
    pub proj_cap: f64,
    pub battery_dispatch: f64,
    pub soc_percent: f64,
    pub original_load_kw: Option<f64>,
    pub original_grid_series: Option<f64>,
    pub base_tariff_rate: f64,
    pub proj_tariff_rate: f64,
    pub battery_charge: f64,
    pub battery_discharge: f64,
    pub grid_to_battery: f64,
    pub grid_to_load: f64,
    pub battery_to_load: f64,
    pub cost_base: f64,
    pub cost_proj: f64,
}

/// Reduced point for the overview brush under the charts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigatorPoint {
    pub timestamp: String,
    pub load_kw: f64,
}

/// SOC arrives as fractions when its largest value lies in (0, 1].
///
/// A percent series that never exceeds 1% is misread as fractions; an
/// all-zero series is left alone.
#[must_use]
pub fn soc_needs_scaling(soc: &Series) -> bool {
    let max = soc.values().copied().fold(0.0_f64, f64::max);
    max > 0.0 && max <= 1.0
}

/// Build chart records for every timestamp of `load_kw`, in sorted order.
///
/// Absent values read as 0; absent `original_base` values stay `None`.
#[must_use]
pub fn project_series(results: &OptimizationResults) -> Vec<ChartPoint> {
    let scale_soc = soc_needs_scaling(&results.soc_percent);
    let value = |series: &Series, ts: &str| series.get(ts).copied().unwrap_or(0.0);
    let optional = |series: Option<&Series>, ts: &str| series.and_then(|s| s.get(ts).copied());

    let original_load = results
        .original_base
        .as_ref()
        .and_then(|b| b.load_kw.as_ref());
    let original_grid = results
        .original_base
        .as_ref()
        .and_then(|b| b.grid_series.as_ref());

    results
        .load_kw
        .iter()
        .map(|(timestamp, &load_kw)| {
            let ts = timestamp.as_str();
            let grid_base = value(&results.grid_base, ts);
            let grid_proj = value(&results.grid_proj, ts);
            let battery_dispatch = value(&results.battery_dispatch, ts);
            let mut soc_percent = value(&results.soc_percent, ts);
            if scale_soc {
                soc_percent *= 100.0;
            }
            let base_tariff_rate = optional(results.base_tariff_rate.as_ref(), ts).unwrap_or(0.0);
            let proj_tariff_rate = optional(results.proj_tariff_rate.as_ref(), ts).unwrap_or(0.0);

            let battery_discharge = battery_dispatch.max(0.0);
            let battery_charge = (-battery_dispatch).max(0.0);
            let grid_to_battery = battery_charge;

            ChartPoint {
                timestamp: timestamp.clone(),
                load_kw,
                grid_base,
                grid_proj,
                base_cap: value(&results.base_cap, ts),
                proj_cap: value(&results.proj_cap, ts),
                battery_dispatch,
                soc_percent,
                original_load_kw: optional(original_load, ts),
                original_grid_series: optional(original_grid, ts),
                base_tariff_rate,
                proj_tariff_rate,
                battery_charge,
                battery_discharge,
                grid_to_battery,
                grid_to_load: grid_proj - grid_to_battery,
                battery_to_load: battery_discharge,
                cost_base: grid_base * base_tariff_rate,
                cost_proj: grid_proj * proj_tariff_rate,
            }
        })
        .collect()
}

#[must_use]
pub fn navigator_series(points: &[ChartPoint]) -> Vec<NavigatorPoint> {
    points
        .iter()
        .map(|p| NavigatorPoint {
            timestamp: p.timestamp.clone(),
            load_kw: p.load_kw,
        })
        .collect()
}
