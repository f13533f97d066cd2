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

use crate::settings::{CaseSettings, OptimizationSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A problem with one settings field, addressed by dotted path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    #[must_use]
    pub fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    #[must_use]
    pub fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Warnings never block a submission
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    /// First error reported for `field`
    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&ValidationIssue> {
        self.errors.iter().find(|issue| issue.field == field)
    }

    fn fraction(&mut self, field: &str, value: f64) {
        if !(0.0..=1.0).contains(&value) {
            self.push(ValidationIssue::error(field, "Must be between 0 and 1"));
        }
    }

    fn non_negative(&mut self, field: &str, value: f64) {
        if value.is_nan() || value < 0.0 {
            self.push(ValidationIssue::error(field, "Must be 0 or greater"));
        }
    }

    fn finite(&mut self, field: &str, value: f64) {
        if !value.is_finite() {
            self.push(ValidationIssue::error(field, "Must be a number"));
        }
    }
}

/// Validate submission settings before they are relayed to the backend
#[expect(clippy::too_many_lines)]
#[must_use]
pub fn validate_settings(settings: &OptimizationSettings) -> ValidationReport {
    let mut report = ValidationReport::default();

    // ============= Company =============
    if settings.company.name.trim().is_empty() {
        report.push(ValidationIssue::error(
            "company.name",
            "Company name is required",
        ));
    }
    if settings.company.address.trim().is_empty() {
        report.push(ValidationIssue::error(
            "company.address",
            "Address is required",
        ));
    }

    // ============= Cabinets =============
    if settings.start_n_cabinets < 1 {
        report.push(ValidationIssue::error(
            "start_n_cabinets",
            "Must be at least 1",
        ));
    }
    if settings.n_cabinets < 1 {
        report.push(ValidationIssue::error("n_cabinets", "Must be at least 1"));
    } else if settings.n_cabinets < settings.start_n_cabinets {
        report.push(ValidationIssue::warning(
            "n_cabinets",
            "Maximum cabinet count is below the starting count; only one size will be evaluated",
        ));
    }

    // ============= Tariff cases =============
    validate_case(&mut report, "base_case", &settings.base_case);
    validate_case(&mut report, "project_case", &settings.project_case);

    // ============= Battery =============
    let unit = &settings.battery.unit;
    report.non_negative("battery.unit.energy_capacity_kwh", unit.energy_capacity_kwh);
    report.fraction(
        "battery.unit.capacity_usable_fraction",
        unit.capacity_usable_fraction,
    );
    report.non_negative("battery.unit.power_rating_kw", unit.power_rating_kw);
    report.fraction(
        "battery.unit.rating_usable_fraction",
        unit.rating_usable_fraction,
    );
    report.fraction("battery.unit.efficiency_store", unit.efficiency_store);
    report.fraction("battery.unit.efficiency_dispatch", unit.efficiency_dispatch);
    report.non_negative("battery.unit.decay_rate", unit.decay_rate);
    report.non_negative("battery.unit.c_rate", unit.c_rate);
    report.fraction("battery.unit.initial_soc", unit.initial_soc);

    let costs = &settings.battery.costs;
    for (i, replacement) in costs.replacements.iter().enumerate() {
        report.finite(&format!("battery.costs.replacements.{i}.year"), replacement.year);
        report.non_negative(
            &format!("battery.costs.replacements.{i}.fraction_of_energy_cost"),
            replacement.fraction_of_energy_cost,
        );
    }
    report.fraction("battery.costs.salvage_fraction", costs.salvage_fraction);

    // ============= Power factor tariff =============
    let pf = &settings.power_factor_tariff;
    report.fraction("power_factor_tariff.base_threshold", pf.base_threshold);
    report.fraction("power_factor_tariff.credit_cap", pf.credit_cap);
    report.non_negative("power_factor_tariff.adjustment_rate", pf.adjustment_rate);

    // ============= Financial =============
    let financial = &settings.financial;
    report.fraction("financial.esco.spv", financial.esco.spv);
    report.fraction("financial.esco.factory", financial.esco.factory);
    report.fraction("financial.esco.operation", financial.esco.operation);
    report.fraction("financial.esco.service", financial.esco.service);
    if (financial.esco.total() - 1.0).abs() > 1e-6 {
        report.push(ValidationIssue::warning(
            "financial.esco",
            format!(
                "ESCO shares add up to {:.0}%, not 100%",
                financial.esco.total() * 100.0
            ),
        ));
    }
    report.non_negative("financial.discount_rate", financial.discount_rate);
    report.non_negative("financial.spv_interest_rate", financial.spv_interest_rate);
    if financial.lifetime_years < 1 {
        report.push(ValidationIssue::error(
            "financial.lifetime_years",
            "Must be at least 1",
        ));
    }

    let cost = &financial.system_cost;
    for (name, value) in [
        ("exchange_rate", cost.exchange_rate),
        ("usd_per_kwh", cost.usd_per_kwh),
        ("cabinet_kwh_capacity", cost.cabinet_kwh_capacity),
        ("cost_cabinet_shipping", cost.cost_cabinet_shipping),
        ("cost_low_voltage_unit", cost.cost_low_voltage_unit),
        ("cost_ems_unit", cost.cost_ems_unit),
        ("cost_transformer_unit", cost.cost_transformer_unit),
        ("cost_vcb_unit", cost.cost_vcb_unit),
        ("insurance_rate", cost.insurance_rate),
        ("tax_rate", cost.tax_rate),
        ("eng_tier_1_6", cost.eng_tier_1_6),
        ("eng_tier_7_10", cost.eng_tier_7_10),
        ("eng_tier_11_20", cost.eng_tier_11_20),
        ("eng_tier_21_40", cost.eng_tier_21_40),
        ("eng_tier_41_60", cost.eng_tier_41_60),
        ("eng_tier_61_80", cost.eng_tier_61_80),
        ("eng_tier_81_100", cost.eng_tier_81_100),
        ("om_percent", cost.om_percent),
    ] {
        report.non_negative(&format!("financial.system_cost.{name}"), value);
    }

    // ============= ADR =============
    let schedule = &settings.adr.schedule_dr;
    report.fraction(
        "adr.schedule_dr.monthly_select_8_day.pledge_kw_ratio",
        schedule.monthly_select_8_day.pledge_kw_ratio,
    );
    report.fraction(
        "adr.schedule_dr.daily_select_time_block.pledge_kw_ratio",
        schedule.daily_select_time_block.pledge_kw_ratio,
    );

    let guaranteed = &settings.adr.real_time_dr.guaranteed_response_type;
    let flexible = &settings.adr.real_time_dr.flexible_response_type;
    for (prefix, pledge, probability, duration, multiplier) in [
        (
            "adr.real_time_dr.guaranteed_response_type",
            guaranteed.pledge_kw_ratio,
            guaranteed.event_daily_probability,
            guaranteed.event_duration_hours,
            guaranteed.peak_month_multiplier,
        ),
        (
            "adr.real_time_dr.flexible_response_type",
            flexible.pledge_kw_ratio,
            flexible.event_daily_probability,
            flexible.event_duration_hours,
            flexible.peak_month_multiplier,
        ),
    ] {
        report.fraction(&format!("{prefix}.pledge_kw_ratio"), pledge);
        report.fraction(&format!("{prefix}.event_daily_probability"), probability);
        report.finite(&format!("{prefix}.event_duration_hours"), duration);
        if !(0.0..=2.0).contains(&multiplier) {
            report.push(ValidationIssue::error(
                &format!("{prefix}.peak_month_multiplier"),
                "Must be between 0 and 2",
            ));
        }
    }

    let economic = &settings.adr.demand_bidding.economic_type;
    report.fraction(
        "adr.demand_bidding.economic_type.pledge_kw_ratio",
        economic.pledge_kw_ratio,
    );
    report.fraction(
        "adr.demand_bidding.economic_type.bid_probability",
        economic.bid_probability,
    );
    report.finite(
        "adr.demand_bidding.economic_type.event_duration_hours",
        economic.event_duration_hours,
    );
    report.finite("adr.demand_bidding.economic_type.bid_price", economic.bid_price);

    let reliable = &settings.adr.demand_bidding.reliable_type;
    report.fraction(
        "adr.demand_bidding.reliable_type.pledge_kw_ratio",
        reliable.pledge_kw_ratio,
    );
    report.fraction(
        "adr.demand_bidding.reliable_type.bid_probability",
        reliable.bid_probability,
    );
    #[expect(clippy::float_cmp, reason = "durations are whole-hour literals")]
    let reliable_duration_ok =
        reliable.event_duration_hours == 2.0 || reliable.event_duration_hours == 4.0;
    if !reliable_duration_ok {
        report.push(ValidationIssue::error(
            "adr.demand_bidding.reliable_type.event_duration_hours",
            "Must be 2 or 4 hours",
        ));
    }
    report.finite("adr.demand_bidding.reliable_type.bid_price", reliable.bid_price);

    report
}

fn validate_case(report: &mut ValidationReport, prefix: &str, case: &CaseSettings) {
    report.non_negative(&format!("{prefix}.reg_cap_input"), case.reg_cap_input);
    report.non_negative(
        &format!("{prefix}.half_peak_cap_input"),
        case.half_peak_cap_input,
    );
    report.non_negative(
        &format!("{prefix}.sat_half_peak_cap_input"),
        case.sat_half_peak_cap_input,
    );
    report.non_negative(&format!("{prefix}.off_cap_input"), case.off_cap_input);
    report.fraction(&format!("{prefix}.power_factor"), case.power_factor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Replacement;

    fn valid_settings() -> OptimizationSettings {
        let mut settings = OptimizationSettings::default();
        settings.company.name = "Acme Manufacturing".to_owned();
        settings.company.address = "No. 1, Section 1, Taipei".to_owned();
        settings
    }

    #[test]
    fn test_defaults_with_company_are_valid() {
        let report = validate_settings(&valid_settings());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_company_required() {
        let report = validate_settings(&OptimizationSettings::default());
        assert!(!report.is_valid());
        assert_eq!(
            report.error_for("company.name").unwrap().message,
            "Company name is required"
        );
        assert!(report.error_for("company.address").is_some());
    }

    #[test]
    fn test_cabinet_counts() {
        let mut settings = valid_settings();
        settings.start_n_cabinets = 0;
        let report = validate_settings(&settings);
        assert!(report.error_for("start_n_cabinets").is_some());

        let mut settings = valid_settings();
        settings.start_n_cabinets = 6;
        settings.n_cabinets = 3;
        let report = validate_settings(&settings);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].field, "n_cabinets");
    }

    #[test]
    fn test_fraction_bounds() {
        let mut settings = valid_settings();
        settings.base_case.power_factor = 1.2;
        settings.battery.unit.initial_soc = -0.1;
        let report = validate_settings(&settings);
        assert!(report.error_for("base_case.power_factor").is_some());
        assert!(report.error_for("battery.unit.initial_soc").is_some());
    }

    #[test]
    fn test_reliable_duration_is_two_or_four() {
        let mut settings = valid_settings();
        settings.adr.demand_bidding.reliable_type.event_duration_hours = 3.0;
        let report = validate_settings(&settings);
        assert!(
            report
                .error_for("adr.demand_bidding.reliable_type.event_duration_hours")
                .is_some()
        );

        settings.adr.demand_bidding.reliable_type.event_duration_hours = 4.0;
        assert!(validate_settings(&settings).is_valid());
    }

    #[test]
    fn test_replacement_rows_are_checked() {
        let mut settings = valid_settings();
        settings.battery.costs.replacements = vec![Replacement {
            year: 8.0,
            fraction_of_energy_cost: -0.5,
        }];
        let report = validate_settings(&settings);
        assert!(
            report
                .error_for("battery.costs.replacements.0.fraction_of_energy_cost")
                .is_some()
        );
    }

    #[test]
    fn test_esco_split_warning() {
        let mut settings = valid_settings();
        settings.financial.esco.spv = 0.5;
        let report = validate_settings(&settings);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "financial.esco"));
    }
}
