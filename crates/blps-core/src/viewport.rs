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

//! Visible window over a sorted timestamp series.
//!
//! All four result charts and the navigator brush read the same
//! [`VisibleRange`]. Presets, drag-to-zoom, drag-to-pan, brush moves and
//! reset are the only ways to change it. Any input that does not resolve to
//! indices of the series leaves the range untouched.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Inclusive index window into the series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleRange {
    pub start_index: usize,
    pub end_index: usize,
}

impl VisibleRange {
    #[must_use]
    pub fn width(&self) -> usize {
        self.end_index - self.start_index
    }

    fn fits(&self, len: usize) -> bool {
        self.start_index <= self.end_index && self.end_index < len
    }
}

/// What a drag on the chart does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    #[default]
    Zoom,
    Pan,
}

/// Toolbar shortcut, measured back from the last timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "7D")]
    SevenDays,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "1Y")]
    OneYear,
}

impl Preset {
    pub const ALL: [Preset; 7] = [
        Preset::OneDay,
        Preset::SevenDays,
        Preset::OneMonth,
        Preset::ThreeMonths,
        Preset::SixMonths,
        Preset::YearToDate,
        Preset::OneYear,
    ];

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OneDay => "1D",
            Self::SevenDays => "7D",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::YearToDate => "YTD",
            Self::OneYear => "1Y",
        }
    }

    /// First instant covered by the preset when the series ends at `last`
    #[must_use]
    pub fn window_start(&self, last: NaiveDateTime) -> NaiveDateTime {
        let days = |n: i64| {
            last.checked_sub_signed(TimeDelta::days(n))
                .unwrap_or(NaiveDateTime::MIN)
        };
        let months = |n: u32| {
            last.checked_sub_months(Months::new(n))
                .unwrap_or(NaiveDateTime::MIN)
        };
        match self {
            Self::OneDay => days(1),
            Self::SevenDays => days(7),
            Self::OneMonth => months(1),
            Self::ThreeMonths => months(3),
            Self::SixMonths => months(6),
            Self::YearToDate => NaiveDate::from_ymd_opt(last.year(), 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or(NaiveDateTime::MIN),
            Self::OneYear => months(12),
        }
    }
}

/// Client-held viewport state, echoed back on every command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportState {
    #[serde(default)]
    pub range: Option<VisibleRange>,
    #[serde(default)]
    pub mode: InteractionMode,
    #[serde(default)]
    pub pan_anchor: Option<usize>,
    #[serde(default)]
    pub active_preset: Option<Preset>,
}

#[derive(Debug, Clone)]
struct Selection {
    anchor: String,
    pointer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChartViewport {
    timestamps: Vec<String>,
    instants: Vec<Option<NaiveDateTime>>,
    range: Option<VisibleRange>,
    mode: InteractionMode,
    selection: Option<Selection>,
    pan_anchor: Option<usize>,
    active_preset: Option<Preset>,
}

impl ChartViewport {
    /// Viewport showing the whole series
    #[must_use]
    pub fn new(timestamps: Vec<String>) -> Self {
        let instants = timestamps.iter().map(|ts| parse_timestamp(ts)).collect();
        let range = full_range(timestamps.len());
        Self {
            timestamps,
            instants,
            range,
            mode: InteractionMode::Zoom,
            selection: None,
            pan_anchor: None,
            active_preset: None,
        }
    }

    /// Viewport as first shown on the result page: the last seven days
    #[must_use]
    pub fn initial(timestamps: Vec<String>) -> Self {
        let mut viewport = Self::new(timestamps);
        viewport.apply_preset(Preset::SevenDays);
        viewport
    }

    /// Rebuild from state sent by the browser; a range that does not fit
    /// the series falls back to the full range.
    #[must_use]
    pub fn restore(timestamps: Vec<String>, state: &ViewportState) -> Self {
        let mut viewport = Self::new(timestamps);
        let len = viewport.len();
        if let Some(range) = state.range.filter(|r| r.fits(len)) {
            viewport.range = Some(range);
        }
        viewport.mode = state.mode;
        viewport.pan_anchor = state.pan_anchor.filter(|&i| i < len);
        viewport.active_preset = state.active_preset;
        viewport
    }

    #[must_use]
    pub fn state(&self) -> ViewportState {
        ViewportState {
            range: self.range,
            mode: self.mode,
            pan_anchor: self.pan_anchor,
            active_preset: self.active_preset,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// `None` only for an empty series
    #[must_use]
    pub fn range(&self) -> Option<VisibleRange> {
        self.range
    }

    #[must_use]
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    #[must_use]
    pub fn active_preset(&self) -> Option<Preset> {
        self.active_preset
    }

    /// Timestamp under the current pan anchor
    #[must_use]
    pub fn pan_anchor_timestamp(&self) -> Option<&str> {
        self.pan_anchor
            .and_then(|i| self.timestamps.get(i))
            .map(String::as_str)
    }

    /// Switching mode drops any drag in progress
    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
        self.selection = None;
        self.pan_anchor = None;
    }

    /// Show the window `preset` covers, ending at the last point
    pub fn apply_preset(&mut self, preset: Preset) -> bool {
        let Some(end_index) = self.len().checked_sub(1) else {
            return false;
        };
        let start_index = match self.instants[end_index] {
            Some(last) => {
                let start = preset.window_start(last);
                self.instants
                    .iter()
                    .position(|t| t.is_some_and(|t| t >= start))
                    .unwrap_or(0)
            }
            None => 0,
        };
        trace!(preset = preset.code(), start_index, end_index, "Preset applied");
        self.range = Some(VisibleRange {
            start_index,
            end_index,
        });
        self.active_preset = Some(preset);
        true
    }

    /// Press in zoom mode: remember where the selection starts
    pub fn begin_selection(&mut self, timestamp: &str) {
        if self.mode != InteractionMode::Zoom || timestamp.is_empty() {
            return;
        }
        self.selection = Some(Selection {
            anchor: timestamp.to_owned(),
            pointer: None,
        });
    }

    /// Move in zoom mode: track the far edge of the selection
    pub fn extend_selection(&mut self, timestamp: &str) {
        if timestamp.is_empty() {
            return;
        }
        if let Some(selection) = self.selection.as_mut() {
            selection.pointer = Some(timestamp.to_owned());
        }
    }

    /// Release: zoom to the selection. In pan mode this ends the drag.
    pub fn commit_selection(&mut self) -> bool {
        if self.mode == InteractionMode::Pan {
            self.pan_anchor = None;
            return false;
        }
        let Some(selection) = self.selection.take() else {
            return false;
        };
        let Some(pointer) = selection.pointer else {
            return false;
        };
        if pointer == selection.anchor {
            return false;
        }
        let (Some(a), Some(b)) = (self.index_of(&selection.anchor), self.index_of(&pointer))
        else {
            return false;
        };
        self.range = Some(VisibleRange {
            start_index: a.min(b),
            end_index: a.max(b),
        });
        self.active_preset = None;
        true
    }

    /// Press in pan mode: anchor the drag to the point under the pointer
    pub fn begin_pan(&mut self, timestamp: &str) {
        if self.mode != InteractionMode::Pan {
            return;
        }
        if let Some(index) = self.index_of(timestamp) {
            self.pan_anchor = Some(index);
        }
    }

    /// Move in pan mode.
    ///
    /// The window shifts by `anchor - pointer` points and keeps its width.
    /// Hitting either end shifts it back inside instead of shrinking it.
    /// The anchor then moves to the pointer, so each call applies only the
    /// movement since the previous one.
    pub fn drag_pan(&mut self, timestamp: &str) -> bool {
        if self.mode != InteractionMode::Pan {
            return false;
        }
        let (Some(anchor), Some(range)) = (self.pan_anchor, self.range) else {
            return false;
        };
        let Some(current) = self.index_of(timestamp) else {
            return false;
        };
        if current == anchor {
            return false;
        }

        let last = self.len() - 1;
        let width = range.width();
        let start_index = if anchor > current {
            let shifted = range.start_index + (anchor - current);
            shifted.min(last - width)
        } else {
            range.start_index.saturating_sub(current - anchor)
        };

        self.range = Some(VisibleRange {
            start_index,
            end_index: start_index + width,
        });
        self.pan_anchor = Some(current);
        self.active_preset = None;
        true
    }

    pub fn end_pan(&mut self) {
        self.pan_anchor = None;
    }

    /// Show the whole series
    pub fn reset_zoom(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.range = full_range(self.len());
        self.active_preset = None;
        true
    }

    /// Adopt a range picked on the navigator brush
    pub fn set_from_brush(&mut self, range: VisibleRange) -> bool {
        if !range.fits(self.len()) {
            return false;
        }
        self.range = Some(range);
        self.active_preset = None;
        true
    }

    /// The part of `series` inside the visible range
    #[must_use]
    pub fn visible<'a, T>(&self, series: &'a [T]) -> &'a [T] {
        match self.range {
            Some(r) if r.end_index < series.len() => &series[r.start_index..=r.end_index],
            _ => &[],
        }
    }

    fn index_of(&self, timestamp: &str) -> Option<usize> {
        self.timestamps.iter().position(|ts| ts == timestamp)
    }
}

fn full_range(len: usize) -> Option<VisibleRange> {
    len.checked_sub(1).map(|end_index| VisibleRange {
        start_index: 0,
        end_index,
    })
}

/// Read the timestamp formats the backend emits as series keys
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    const FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
