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

//! Settings submitted with an evaluation.
//!
//! The JSON shape is the backend's contract; field names must not change.
//! `Default` values are the ones the new-evaluation form starts from.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationSettings {
    pub company: CompanyInfo,
    /// Smallest cabinet count the optimizer evaluates
    pub start_n_cabinets: i64,
    /// Largest cabinet count the optimizer evaluates
    pub n_cabinets: i64,
    pub base_case: CaseSettings,
    #[serde(default = "CaseSettings::project")]
    pub project_case: CaseSettings,
    pub battery: BatterySettings,
    pub power_factor_tariff: PowerFactorTariff,
    pub financial: FinancialSettings,
    pub adr: AdrSettings,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            company: CompanyInfo::default(),
            start_n_cabinets: 1,
            n_cabinets: 5,
            base_case: CaseSettings::base(),
            project_case: CaseSettings::project(),
            battery: BatterySettings::default(),
            power_factor_tariff: PowerFactorTariff::default(),
            financial: FinancialSettings::default(),
            adr: AdrSettings::default(),
        }
    }
}

impl OptimizationSettings {
    /// Allowed values for enumerated fields, addressed by dotted path
    #[must_use]
    pub fn choice_options(path: &str) -> Option<&'static [&'static str]> {
        match path {
            "base_case.tariff_type" | "project_case.tariff_type" => Some(&TariffType::CODES),
            "adr.real_time_dr.guaranteed_response_type.notification_time" => {
                Some(&NotificationTime::CODES)
            }
            "adr.demand_bidding.economic_type.notification_type" => Some(&NotificationType::CODES),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: String,
    pub address: String,
}

/// Electricity tariff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TariffType {
    TwoTier,
    #[default]
    ThreeTier,
    Batch,
}

impl TariffType {
    pub const CODES: [&'static str; 3] = ["two_tier", "three_tier", "batch"];

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::TwoTier => "two_tier",
            Self::ThreeTier => "three_tier",
            Self::Batch => "batch",
        }
    }
}

/// Contract and tariff configuration for one side of the comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseSettings {
    pub tariff_type: TariffType,
    /// Regular contract capacity (kW)
    pub reg_cap_input: f64,
    pub half_peak_cap_input: f64,
    pub sat_half_peak_cap_input: f64,
    pub off_cap_input: f64,
    pub power_factor: f64,
    pub grid: GridSettings,
}

impl Default for CaseSettings {
    fn default() -> Self {
        Self::base()
    }
}

impl CaseSettings {
    /// The site as it operates today
    #[must_use]
    pub fn base() -> Self {
        Self {
            tariff_type: TariffType::ThreeTier,
            reg_cap_input: 0.0,
            half_peak_cap_input: 0.0,
            sat_half_peak_cap_input: 0.0,
            off_cap_input: 0.0,
            power_factor: 1.0,
            grid: GridSettings {
                is_excess_contract_capacity_allowed: true,
            },
        }
    }

    /// The site with storage installed
    #[must_use]
    pub fn project() -> Self {
        Self {
            tariff_type: TariffType::Batch,
            grid: GridSettings {
                is_excess_contract_capacity_allowed: false,
            },
            ..Self::base()
        }
    }

    /// Contract capacities in display order, keyed by their field name
    #[must_use]
    pub fn capacities(&self) -> [(&'static str, f64); 4] {
        [
            ("reg_cap", self.reg_cap_input),
            ("half_peak_cap", self.half_peak_cap_input),
            ("sat_half_peak_cap", self.sat_half_peak_cap_input),
            ("off_cap", self.off_cap_input),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub is_excess_contract_capacity_allowed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatterySettings {
    pub unit: BatteryUnit,
    pub costs: BatteryCosts,
}

/// One storage cabinet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryUnit {
    pub energy_capacity_kwh: f64,
    pub capacity_usable_fraction: f64,
    pub power_rating_kw: f64,
    pub rating_usable_fraction: f64,
    pub efficiency_store: f64,
    pub efficiency_dispatch: f64,
    pub decay_rate: f64,
    pub c_rate: f64,
    pub initial_soc: f64,
}

impl Default for BatteryUnit {
    fn default() -> Self {
        Self {
            energy_capacity_kwh: 233.0,
            capacity_usable_fraction: 1.0,
            power_rating_kw: 116.5,
            rating_usable_fraction: 0.8583690987,
            efficiency_store: 1.0,
            efficiency_dispatch: 0.95,
            decay_rate: 0.015,
            c_rate: 0.5,
            initial_soc: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryCosts {
    pub replacements: Vec<Replacement>,
    pub salvage_fraction: f64,
}

/// Scheduled battery replacement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    pub year: f64,
    pub fraction_of_energy_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerFactorTariff {
    pub base_threshold: f64,
    pub credit_cap: f64,
    pub adjustment_rate: f64,
}

impl Default for PowerFactorTariff {
    fn default() -> Self {
        Self {
            base_threshold: 0.8,
            credit_cap: 0.95,
            adjustment_rate: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialSettings {
    pub esco: EscoSplit,
    pub discount_rate: f64,
    pub spv_interest_rate: f64,
    pub lifetime_years: i64,
    pub system_cost: SystemCost,
}

impl Default for FinancialSettings {
    fn default() -> Self {
        Self {
            esco: EscoSplit::default(),
            discount_rate: 0.05,
            spv_interest_rate: 0.05,
            lifetime_years: 10,
            system_cost: SystemCost::default(),
        }
    }
}

/// Revenue split between the ESCO parties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscoSplit {
    pub spv: f64,
    pub factory: f64,
    pub operation: f64,
    pub service: f64,
}

impl Default for EscoSplit {
    fn default() -> Self {
        Self {
            spv: 0.63,
            factory: 0.15,
            operation: 0.16,
            service: 0.06,
        }
    }
}

impl EscoSplit {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.spv + self.factory + self.operation + self.service
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemCost {
    /// TWD per USD
    pub exchange_rate: f64,
    pub usd_per_kwh: f64,
    pub cabinet_kwh_capacity: f64,
    pub cost_cabinet_shipping: f64,
    pub cost_low_voltage_unit: f64,
    pub cost_ems_unit: f64,
    pub cost_transformer_unit: f64,
    pub cost_vcb_unit: f64,
    pub insurance_rate: f64,
    pub tax_rate: f64,
    pub eng_tier_1_6: f64,
    pub eng_tier_7_10: f64,
    pub eng_tier_11_20: f64,
    pub eng_tier_21_40: f64,
    pub eng_tier_41_60: f64,
    pub eng_tier_61_80: f64,
    pub eng_tier_81_100: f64,
    pub om_percent: f64,
}

impl Default for SystemCost {
    fn default() -> Self {
        Self {
            exchange_rate: 32.0,
            usd_per_kwh: 400.0,
            cabinet_kwh_capacity: 215.0,
            cost_cabinet_shipping: 5000.0,
            cost_low_voltage_unit: 10000.0,
            cost_ems_unit: 5000.0,
            cost_transformer_unit: 15000.0,
            cost_vcb_unit: 20000.0,
            insurance_rate: 0.01,
            tax_rate: 0.05,
            eng_tier_1_6: 50000.0,
            eng_tier_7_10: 40000.0,
            eng_tier_11_20: 30000.0,
            eng_tier_21_40: 20000.0,
            eng_tier_41_60: 15000.0,
            eng_tier_61_80: 10000.0,
            eng_tier_81_100: 5000.0,
            om_percent: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// Auto demand response programs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdrSettings {
    pub activate_all: bool,
    pub schedule_dr: ScheduleDr,
    pub real_time_dr: RealTimeDr,
    pub demand_bidding: DemandBidding,
    pub renewable_energy_obligations_type: RenewableObligations,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toggle {
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleDr {
    pub monthly_select_8_day: MonthlySelection,
    pub daily_select_time_block: TimeBlockSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthlySelection {
    pub is_active: bool,
    pub pledge_kw_ratio: f64,
}

impl Default for MonthlySelection {
    fn default() -> Self {
        Self {
            is_active: false,
            pledge_kw_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBlockSelection {
    pub pledge_kw_ratio: f64,
    pub options: TimeBlockOptions,
}

impl Default for TimeBlockSelection {
    fn default() -> Self {
        Self {
            pledge_kw_ratio: 0.5,
            options: TimeBlockOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBlockOptions {
    #[serde(rename = "2h")]
    pub two_hours: Toggle,
    #[serde(rename = "4h")]
    pub four_hours: Toggle,
    #[serde(rename = "6h")]
    pub six_hours: Toggle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealTimeDr {
    pub guaranteed_response_type: GuaranteedResponse,
    pub flexible_response_type: FlexibleResponse,
}

/// Lead time before a guaranteed-response event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NotificationTime {
    #[default]
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHours,
}

impl NotificationTime {
    pub const CODES: [&'static str; 3] = ["30m", "1h", "2h"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuaranteedResponse {
    pub is_active: bool,
    pub pledge_kw_ratio: f64,
    pub event_daily_probability: f64,
    pub event_duration_hours: f64,
    pub peak_month_multiplier: f64,
    pub notification_time: NotificationTime,
}

impl Default for GuaranteedResponse {
    fn default() -> Self {
        Self {
            is_active: false,
            pledge_kw_ratio: 0.5,
            event_daily_probability: 0.05,
            event_duration_hours: 1.0,
            peak_month_multiplier: 1.2,
            notification_time: NotificationTime::ThirtyMinutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexibleResponse {
    pub is_active: bool,
    pub pledge_kw_ratio: f64,
    pub event_daily_probability: f64,
    pub event_duration_hours: f64,
    pub peak_month_multiplier: f64,
}

impl Default for FlexibleResponse {
    fn default() -> Self {
        Self {
            is_active: false,
            pledge_kw_ratio: 0.5,
            event_daily_probability: 0.05,
            event_duration_hours: 1.0,
            peak_month_multiplier: 1.2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandBidding {
    pub economic_type: EconomicBidding,
    pub reliable_type: ReliableBidding,
    pub combined_type: Toggle,
}

/// When an economic demand-bidding event is announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NotificationType {
    #[default]
    #[serde(rename = "day_ahead")]
    DayAhead,
    #[serde(rename = "2h_before")]
    TwoHoursBefore,
}

impl NotificationType {
    pub const CODES: [&'static str; 2] = ["day_ahead", "2h_before"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicBidding {
    pub is_active: bool,
    pub pledge_kw_ratio: f64,
    pub bid_probability: f64,
    pub event_duration_hours: f64,
    pub bid_price: f64,
    pub notification_type: NotificationType,
}

impl Default for EconomicBidding {
    fn default() -> Self {
        Self {
            is_active: false,
            pledge_kw_ratio: 0.5,
            bid_probability: 0.5,
            event_duration_hours: 2.0,
            bid_price: 10.0,
            notification_type: NotificationType::DayAhead,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliableBidding {
    pub is_active: bool,
    pub pledge_kw_ratio: f64,
    pub bid_probability: f64,
    /// Only 2 or 4 hour events exist for this program
    pub event_duration_hours: f64,
    pub bid_price: f64,
}

impl Default for ReliableBidding {
    fn default() -> Self {
        Self {
            is_active: false,
            pledge_kw_ratio: 0.5,
            bid_probability: 0.5,
            event_duration_hours: 2.0,
            bid_price: 15.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewableObligations {
    pub obligated_hours_type: Toggle,
    pub progressive_incentive_type: Toggle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_match_form() {
        let settings = OptimizationSettings::default();
        assert_eq!(settings.n_cabinets, 5);
        assert_eq!(settings.base_case.tariff_type, TariffType::ThreeTier);
        assert_eq!(settings.project_case.tariff_type, TariffType::Batch);
        assert!(settings.base_case.grid.is_excess_contract_capacity_allowed);
        assert!(!settings.project_case.grid.is_excess_contract_capacity_allowed);
        assert!((settings.battery.unit.power_rating_kw - 116.5).abs() < f64::EPSILON);
        assert!((settings.financial.esco.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_wire_names() {
        let value = serde_json::to_value(OptimizationSettings::default()).unwrap();
        assert_eq!(
            value["adr"]["schedule_dr"]["daily_select_time_block"]["options"]["2h"]["is_active"],
            json!(false)
        );
        assert_eq!(
            value["adr"]["real_time_dr"]["guaranteed_response_type"]["notification_time"],
            json!("30m")
        );
        assert_eq!(
            value["adr"]["demand_bidding"]["economic_type"]["notification_type"],
            json!("day_ahead")
        );
        assert_eq!(value["start_n_cabinets"], json!(1));
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let settings: OptimizationSettings = serde_json::from_value(json!({
            "company": {"name": "Acme", "address": "Taipei"},
            "n_cabinets": 8
        }))
        .unwrap();
        assert_eq!(settings.company.name, "Acme");
        assert_eq!(settings.n_cabinets, 8);
        assert_eq!(settings.start_n_cabinets, 1);
        assert_eq!(settings.project_case.tariff_type, TariffType::Batch);
    }

    #[test]
    fn test_choice_options() {
        assert_eq!(
            OptimizationSettings::choice_options("base_case.tariff_type"),
            Some(&TariffType::CODES[..])
        );
        assert!(OptimizationSettings::choice_options("company.name").is_none());
    }
}
