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

//! Result-view logic for the BLPS evaluation dashboard.
//!
//! Everything in this crate is pure: it turns backend result payloads into
//! chart records and summaries, and tracks the visible chart window. No I/O.

pub mod format;
pub mod projection;
pub mod summary;
pub mod viewport;

pub use projection::{ChartPoint, NavigatorPoint, navigator_series, project_series};
pub use summary::{
    AdrDay, AdrMonthSummary, AdrRuleEvents, CabinetRow, CaseSummary, ConfigurationSummary,
    KeyMetrics, adr_summaries, cabinet_rows,
};
pub use viewport::{ChartViewport, InteractionMode, Preset, ViewportState, VisibleRange};
