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

//! Shared data model for the BLPS evaluation dashboard.
//!
//! Job projections and result payloads are owned by the optimization backend;
//! the types here only read them. Submission settings are owned by the form
//! and validated locally before they are relayed.

mod job;
mod lenient;
mod results;
mod settings;
mod validation;

pub use job::{JobStatus, JobStatusResponse, JobSummary, SubmissionAck};
pub use results::{
    AdrEvent, AdrEventInfo, AdrMonthResult, BreakevenYear, CabinetResult, FinancialMetrics,
    OptimalCabinet, OptimizationResults, OriginalBase, Series,
};
pub use settings::{
    AdrSettings, BatteryCosts, BatterySettings, BatteryUnit, CaseSettings, CompanyInfo,
    DemandBidding, EconomicBidding, EscoSplit, FinancialSettings, FlexibleResponse, GridSettings,
    GuaranteedResponse, NotificationTime, NotificationType, OptimizationSettings,
    PowerFactorTariff, RealTimeDr, ReliableBidding, RenewableObligations, Replacement,
    ScheduleDr, SystemCost, TariffType, TimeBlockOptions, TimeBlockSelection, Toggle,
    MonthlySelection,
};
pub use validation::{Severity, ValidationIssue, ValidationReport, validate_settings};
