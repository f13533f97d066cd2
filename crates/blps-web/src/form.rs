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

//! New-evaluation form.
//!
//! The form is generated from [`OptimizationSettings::default`]: every leaf
//! of its JSON document becomes one input named by its dotted path. A
//! submission is applied leaf by leaf over the defaults, so a field the form
//! does not send keeps its default value, except checkboxes, where absence
//! means unchecked.

use crate::context::RequestContext;
use axum::extract::Multipart;
use blps_client::UploadFile;
use blps_types::OptimizationSettings;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Display order of form sections; top-level scalars belong to `cabinets`
const SECTION_ORDER: [&str; 8] = [
    "company",
    "cabinets",
    "base_case",
    "project_case",
    "battery",
    "power_factor_tariff",
    "financial",
    "adr",
];

/// Sections collapsed until the user asks for them
const ADVANCED_SECTIONS: [&str; 4] = ["battery", "power_factor_tariff", "financial", "adr"];

/// Ratios entered as percentages
const PERCENT_LEAVES: [&str; 18] = [
    "capacity_usable_fraction",
    "rating_usable_fraction",
    "efficiency_store",
    "efficiency_dispatch",
    "decay_rate",
    "initial_soc",
    "salvage_fraction",
    "base_threshold",
    "credit_cap",
    "adjustment_rate",
    "discount_rate",
    "spv_interest_rate",
    "insurance_rate",
    "tax_rate",
    "om_percent",
    "pledge_kw_ratio",
    "event_daily_probability",
    "bid_probability",
];

const REQUIRED_FIELDS: [&str; 2] = ["company.name", "company.address"];

#[derive(Debug, Error)]
pub enum FormError {
    #[error("{field}: not a number")]
    InvalidNumber { field: String },

    #[error("{field}: not a whole number")]
    InvalidInteger { field: String },

    #[error("{field}: unsupported option {value}")]
    InvalidChoice { field: String, value: String },

    #[error("{field}: expected a JSON list ({message})")]
    InvalidJson { field: String, message: String },

    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Invalid form data: {0}")]
    Multipart(String),
}

impl FormError {
    /// Dotted path of the offending input, when there is one
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidNumber { field }
            | Self::InvalidInteger { field }
            | Self::InvalidChoice { field, .. }
            | Self::InvalidJson { field, .. } => Some(field),
            Self::Settings(_) | Self::Multipart(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    /// Stored as a ratio, shown and entered as a percentage
    Percent,
    Checkbox,
    Choice(&'static [&'static str]),
    /// JSON array edited as text
    JsonList,
}

impl FieldKind {
    fn input(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer | Self::Number | Self::Percent => "number",
            Self::Checkbox => "checkbox",
            Self::Choice(_) => "select",
            Self::JsonList => "textarea",
        }
    }
}

/// One input of the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Dotted JSON path, also the input name
    pub path: String,
    pub kind: FieldKind,
    /// Path of the object the input is listed under
    pub group: String,
}

impl FieldSpec {
    fn new(path: String, value: &Value, lone_toggle: bool) -> Self {
        let kind = match value {
            Value::Bool(_) => FieldKind::Checkbox,
            Value::String(_) => OptimizationSettings::choice_options(&path)
                .map_or(FieldKind::Text, FieldKind::Choice),
            Value::Number(n) if n.is_i64() || n.is_u64() => FieldKind::Integer,
            Value::Number(_) if is_percent(&path) => FieldKind::Percent,
            Value::Number(_) => FieldKind::Number,
            Value::Array(_) => FieldKind::JsonList,
            Value::Null | Value::Object(_) => FieldKind::Text,
        };

        let parent = parent_path(&path);
        // `{"is_active": bool}` objects are listed under their own parent
        let group = if lone_toggle && leaf(&path) == "is_active" {
            parent_path(parent).to_owned()
        } else {
            parent.to_owned()
        };

        Self { path, kind, group }
    }

    #[must_use]
    pub fn section(&self) -> &str {
        match self.path.split_once('.') {
            Some((top, _)) => top,
            None => "cabinets",
        }
    }

    fn pointer(&self) -> String {
        format!("/{}", self.path.replace('.', "/"))
    }

    fn id(&self) -> String {
        self.path.replace('.', "-")
    }
}

fn parent_path(path: &str) -> &str {
    path.rsplit_once('.').map_or("", |(parent, _)| parent)
}

fn leaf(path: &str) -> &str {
    path.rsplit_once('.').map_or(path, |(_, leaf)| leaf)
}

fn is_percent(path: &str) -> bool {
    path.starts_with("financial.esco.") || PERCENT_LEAVES.contains(&leaf(path))
}

/// Default settings as a JSON document
#[must_use]
pub fn defaults_value() -> Value {
    serde_json::to_value(OptimizationSettings::default()).unwrap_or_default()
}

/// Every input of the form, in document order
#[must_use]
pub fn field_specs() -> Vec<FieldSpec> {
    let mut specs = Vec::new();
    collect_fields("", &defaults_value(), &mut specs);
    specs
}

fn collect_fields(prefix: &str, value: &Value, out: &mut Vec<FieldSpec>) {
    let Value::Object(map) = value else {
        return;
    };
    for (key, child) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if child.is_object() {
            collect_fields(&path, child, out);
        } else {
            out.push(FieldSpec::new(path, child, map.len() == 1));
        }
    }
}

/// Merge two JSON values recursively
/// `target` is modified in place with values from `source`
pub fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_obj), Value::Object(source_obj)) => {
            for (k, v) in source_obj {
                merge_json(target_obj.entry(k).or_insert(Value::Null), v);
            }
        }
        (target_val, source_val) => {
            *target_val = source_val;
        }
    }
}

fn is_checked(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "on" | "true" | "1")
}

fn parse_field(spec: &FieldSpec, raw: Option<&String>) -> Result<Option<Value>, FormError> {
    if spec.kind == FieldKind::Checkbox {
        return Ok(Some(Value::Bool(raw.is_some_and(|v| is_checked(v)))));
    }
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    let field = || spec.path.clone();

    let value = match spec.kind {
        FieldKind::Text => Value::String(trimmed.to_owned()),
        FieldKind::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| FormError::InvalidInteger { field: field() })?,
        FieldKind::Number | FieldKind::Percent => {
            let number = trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| FormError::InvalidNumber { field: field() })?;
            let number = if spec.kind == FieldKind::Percent {
                number / 100.0
            } else {
                number
            };
            Value::from(number)
        }
        FieldKind::Choice(options) => {
            if !options.contains(&trimmed) {
                return Err(FormError::InvalidChoice {
                    field: field(),
                    value: trimmed.to_owned(),
                });
            }
            Value::String(trimmed.to_owned())
        }
        FieldKind::JsonList if trimmed.is_empty() => Value::Array(Vec::new()),
        FieldKind::JsonList => match serde_json::from_str::<Value>(trimmed) {
            Ok(list @ Value::Array(_)) => list,
            Ok(_) => {
                return Err(FormError::InvalidJson {
                    field: field(),
                    message: "not a list".to_owned(),
                });
            }
            Err(e) => {
                return Err(FormError::InvalidJson {
                    field: field(),
                    message: e.to_string(),
                });
            }
        },
        FieldKind::Checkbox => return Ok(None),
    };
    Ok(Some(value))
}

/// Write submitted form values into `document`, collecting every bad input
pub fn apply_fields(
    document: &mut Value,
    fields: &BTreeMap<String, String>,
) -> Result<(), Vec<FormError>> {
    let mut errors = Vec::new();
    for spec in field_specs() {
        match parse_field(&spec, fields.get(&spec.path)) {
            Ok(Some(value)) => {
                if let Some(slot) = document.pointer_mut(&spec.pointer()) {
                    *slot = value;
                }
            }
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Settings from submitted form values over the defaults
pub fn settings_from_fields(
    fields: &BTreeMap<String, String>,
) -> Result<OptimizationSettings, Vec<FormError>> {
    let mut document = defaults_value();
    apply_fields(&mut document, fields)?;
    serde_json::from_value(document).map_err(|e| vec![FormError::Settings(e)])
}

/// Decoded multipart submission
#[derive(Debug, Default)]
pub struct Submission {
    pub fields: BTreeMap<String, String>,
    /// Complete settings document sent by API clients
    pub settings_json: Option<String>,
    pub file: Option<UploadFile>,
}

impl Submission {
    /// Defaults, then the `settings` part, then individual form fields
    pub fn settings(&self) -> Result<OptimizationSettings, Vec<FormError>> {
        let mut document = defaults_value();
        if let Some(json) = &self.settings_json {
            let part: Value =
                serde_json::from_str(json).map_err(|e| vec![FormError::Settings(e)])?;
            merge_json(&mut document, part);
        }
        if !self.fields.is_empty() {
            apply_fields(&mut document, &self.fields)?;
        }
        serde_json::from_value(document).map_err(|e| vec![FormError::Settings(e)])
    }
}

pub async fn read_submission(mut multipart: Multipart) -> Result<Submission, FormError> {
    let mut submission = Submission::default();
    let invalid = |e: axum::extract::multipart::MultipartError| FormError::Multipart(e.to_string());

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };
        let file_name = field.file_name().map(ToOwned::to_owned);

        if let Some(file_name) = file_name.filter(|_| name == "file") {
            let content_type = field.content_type().map(ToOwned::to_owned);
            let bytes = field.bytes().await.map_err(invalid)?;
            // Browsers send an empty part when no file was chosen
            if !file_name.is_empty() {
                submission.file = Some(UploadFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else if name == "settings" {
            submission.settings_json = Some(field.text().await.map_err(invalid)?);
        } else {
            let text = field.text().await.map_err(invalid)?;
            submission.fields.insert(name, text);
        }
    }

    Ok(submission)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct FieldView {
    pub name: String,
    pub id: String,
    pub label: String,
    /// `text`, `number`, `checkbox`, `select` or `textarea`
    pub input: &'static str,
    pub value: String,
    pub step: &'static str,
    pub checked: bool,
    pub required: bool,
    pub placeholder: String,
    pub options: Vec<SelectOption>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FieldGroupView {
    pub title: Option<String>,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone)]
pub struct FormSectionView {
    pub key: &'static str,
    pub title: String,
    pub description: Option<String>,
    pub advanced: bool,
    pub groups: Vec<FieldGroupView>,
}

/// What the form shows: a settings document plus the raw text of inputs
/// that failed to parse, and messages per input
#[derive(Debug, Default)]
pub struct FormState {
    pub document: Option<Value>,
    pub raw: BTreeMap<String, String>,
    pub messages: BTreeMap<String, String>,
}

fn humanize(key: &str) -> String {
    let words = key.replace('_', " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lookup(ctx: &RequestContext, prefix: &str, path: &str) -> String {
    let full = format!("{prefix}-{}", path.replace('.', "-"));
    if ctx.i18n.contains(&full) {
        return ctx.t(&full);
    }
    let short = format!("{prefix}-{}", leaf(path));
    if ctx.i18n.contains(&short) {
        return ctx.t(&short);
    }
    humanize(leaf(path))
}

fn display_number(value: f64) -> String {
    let rounded = (value * 1e10).round() / 1e10;
    format!("{rounded}")
}

fn display_value(kind: FieldKind, value: Option<&Value>) -> String {
    match (kind, value) {
        (_, None | Some(Value::Null)) => String::new(),
        (FieldKind::Percent, Some(v)) => v
            .as_f64()
            .map(|ratio| display_number(ratio * 100.0))
            .unwrap_or_default(),
        (FieldKind::Number, Some(v)) => v.as_f64().map(display_number).unwrap_or_default(),
        (_, Some(Value::String(s))) => s.clone(),
        (_, Some(v)) => v.to_string(),
    }
}

fn field_view(
    ctx: &RequestContext,
    spec: &FieldSpec,
    state: &FormState,
    document: &Value,
) -> FieldView {
    let current = document.pointer(&spec.pointer());
    let value = state
        .raw
        .get(&spec.path)
        .cloned()
        .unwrap_or_else(|| display_value(spec.kind, current));

    let options = match spec.kind {
        FieldKind::Choice(codes) => codes
            .iter()
            .map(|code| {
                let key = format!("option-{code}");
                SelectOption {
                    value: (*code).to_owned(),
                    label: if ctx.i18n.contains(&key) {
                        ctx.t(&key)
                    } else {
                        (*code).to_owned()
                    },
                    selected: value == *code,
                }
            })
            .collect(),
        FieldKind::Text
        | FieldKind::Integer
        | FieldKind::Number
        | FieldKind::Percent
        | FieldKind::Checkbox
        | FieldKind::JsonList => Vec::new(),
    };

    let mut label = lookup(ctx, "field", &spec.path);
    if spec.kind == FieldKind::Percent {
        label.push_str(" (%)");
    }

    let placeholder = match spec.path.as_str() {
        "company.name" => ctx.t("placeholder-name"),
        "company.address" => ctx.t("placeholder-address"),
        _ => String::new(),
    };

    FieldView {
        name: spec.path.clone(),
        id: spec.id(),
        label,
        input: spec.kind.input(),
        step: if spec.kind == FieldKind::Integer { "1" } else { "any" },
        // re-rendered submissions show what was sent, not the defaults
        checked: if state.raw.is_empty() {
            current.and_then(Value::as_bool).unwrap_or(false)
        } else {
            state.raw.get(&spec.path).is_some_and(|v| is_checked(v))
        },
        required: REQUIRED_FIELDS.contains(&spec.path.as_str()),
        placeholder,
        options,
        error: state.messages.get(&spec.path).cloned(),
        value,
    }
}

/// Sections of the form in display order
#[must_use]
pub fn form_sections(ctx: &RequestContext, state: &FormState) -> Vec<FormSectionView> {
    let document = state.document.clone().unwrap_or_else(defaults_value);
    let specs = field_specs();

    SECTION_ORDER
        .into_iter()
        .filter_map(|key| {
            let mut groups: Vec<(String, FieldGroupView)> = Vec::new();
            for spec in specs.iter().filter(|spec| spec.section() == key) {
                let view = field_view(ctx, spec, state, &document);
                if let Some((_, group)) = groups.iter_mut().find(|(path, _)| *path == spec.group) {
                    group.fields.push(view);
                } else {
                    let title = (!spec.group.is_empty() && spec.group != key)
                        .then(|| lookup(ctx, "group", &spec.group));
                    groups.push((
                        spec.group.clone(),
                        FieldGroupView {
                            title,
                            fields: vec![view],
                        },
                    ));
                }
            }
            if groups.is_empty() {
                return None;
            }

            let description_key = format!("section-{key}-description");
            Some(FormSectionView {
                key,
                title: ctx.t(&format!("section-{key}")),
                description: ctx
                    .i18n
                    .contains(&description_key)
                    .then(|| ctx.t(&description_key)),
                advanced: ADVANCED_SECTIONS.contains(&key),
                groups: groups.into_iter().map(|(_, group)| group).collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blps_i18n::{Catalog, Language};
    use blps_types::{NotificationTime, TariffType};

    fn ctx() -> RequestContext {
        RequestContext {
            locale: Language::English,
            i18n: Catalog::load().unwrap().get(Language::English).unwrap(),
            session: None,
            path: "/evaluation/new".to_owned(),
        }
    }

    fn spec(path: &str) -> FieldSpec {
        field_specs()
            .into_iter()
            .find(|spec| spec.path == path)
            .unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_field_kinds_follow_defaults() {
        assert_eq!(spec("company.name").kind, FieldKind::Text);
        assert_eq!(spec("n_cabinets").kind, FieldKind::Integer);
        assert_eq!(spec("financial.lifetime_years").kind, FieldKind::Integer);
        assert_eq!(spec("battery.unit.power_rating_kw").kind, FieldKind::Number);
        assert_eq!(spec("battery.unit.initial_soc").kind, FieldKind::Percent);
        assert_eq!(spec("financial.esco.spv").kind, FieldKind::Percent);
        assert_eq!(spec("adr.activate_all").kind, FieldKind::Checkbox);
        assert_eq!(
            spec("base_case.tariff_type").kind,
            FieldKind::Choice(&TariffType::CODES)
        );
        assert_eq!(spec("battery.costs.replacements").kind, FieldKind::JsonList);
    }

    #[test]
    fn test_sections_and_groups() {
        assert_eq!(spec("n_cabinets").section(), "cabinets");
        assert_eq!(
            spec("base_case.grid.is_excess_contract_capacity_allowed").group,
            "base_case.grid"
        );
        // lone toggles are listed under their parent program
        assert_eq!(
            spec("adr.demand_bidding.combined_type.is_active").group,
            "adr.demand_bidding"
        );
        assert_eq!(
            spec("adr.real_time_dr.guaranteed_response_type.is_active").group,
            "adr.real_time_dr.guaranteed_response_type"
        );
    }

    #[test]
    fn test_unchecked_checkbox_is_false_and_missing_field_keeps_default() {
        let settings = settings_from_fields(&fields(&[
            ("company.name", " Acme "),
            ("n_cabinets", "8"),
        ]))
        .unwrap();
        assert_eq!(settings.company.name, "Acme");
        assert_eq!(settings.n_cabinets, 8);
        assert_eq!(settings.start_n_cabinets, 1);
        // defaults to true, but the form did not send it
        assert!(!settings.base_case.grid.is_excess_contract_capacity_allowed);
    }

    #[test]
    fn test_percent_and_choice_fields() {
        let settings = settings_from_fields(&fields(&[
            ("battery.unit.initial_soc", "25"),
            ("adr.real_time_dr.guaranteed_response_type.notification_time", "2h"),
            ("adr.schedule_dr.daily_select_time_block.options.2h.is_active", "on"),
        ]))
        .unwrap();
        assert!((settings.battery.unit.initial_soc - 0.25).abs() < 1e-12);
        assert_eq!(
            settings.adr.real_time_dr.guaranteed_response_type.notification_time,
            NotificationTime::TwoHours
        );
        assert!(settings.adr.schedule_dr.daily_select_time_block.options.two_hours.is_active);
    }

    #[test]
    fn test_bad_inputs_are_all_reported() {
        let errors = settings_from_fields(&fields(&[
            ("n_cabinets", "4.5"),
            ("battery.unit.power_rating_kw", "abc"),
            ("base_case.tariff_type", "flat"),
            ("battery.costs.replacements", "{\"year\": 5}"),
        ]))
        .unwrap_err();
        let fields: Vec<_> = errors.iter().filter_map(FormError::field).collect();
        assert_eq!(errors.len(), 4);
        assert!(fields.contains(&"n_cabinets"));
        assert!(fields.contains(&"battery.unit.power_rating_kw"));
        assert!(fields.contains(&"base_case.tariff_type"));
        assert!(fields.contains(&"battery.costs.replacements"));
    }

    #[test]
    fn test_replacements_list() {
        let settings = settings_from_fields(&fields(&[(
            "battery.costs.replacements",
            r#"[{"year": 8, "fraction_of_energy_cost": 0.6}]"#,
        )]))
        .unwrap();
        assert_eq!(settings.battery.costs.replacements.len(), 1);
        assert!((settings.battery.costs.replacements[0].year - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_settings_part_merges_over_defaults() {
        let submission = Submission {
            settings_json: Some(r#"{"company": {"name": "Acme"}, "n_cabinets": 9}"#.to_owned()),
            ..Default::default()
        };
        let settings = submission.settings().unwrap();
        assert_eq!(settings.company.name, "Acme");
        assert_eq!(settings.n_cabinets, 9);
        // no form fields, so checkbox defaults survive
        assert!(settings.base_case.grid.is_excess_contract_capacity_allowed);

        let broken = Submission {
            settings_json: Some("{not json".to_owned()),
            ..Default::default()
        };
        assert!(matches!(
            broken.settings().unwrap_err().as_slice(),
            [FormError::Settings(_)]
        ));
    }

    #[test]
    fn test_form_sections_render_defaults() {
        let sections = form_sections(&ctx(), &FormState::default());
        let keys: Vec<_> = sections.iter().map(|s| s.key).collect();
        assert_eq!(keys, SECTION_ORDER.to_vec());
        assert!(!sections[0].advanced);
        assert!(sections[7].advanced);

        let fields: Vec<&FieldView> = sections
            .iter()
            .flat_map(|s| s.groups.iter())
            .flat_map(|g| g.fields.iter())
            .collect();
        let dispatch = fields
            .iter()
            .find(|f| f.name == "battery.unit.efficiency_dispatch")
            .unwrap();
        assert_eq!(dispatch.value, "95");
        assert!(dispatch.label.ends_with("(%)"));

        let tariff = fields
            .iter()
            .find(|f| f.name == "project_case.tariff_type")
            .unwrap();
        assert_eq!(tariff.input, "select");
        assert!(tariff.options.iter().any(|o| o.value == "batch" && o.selected));

        let name = fields.iter().find(|f| f.name == "company.name").unwrap();
        assert!(name.required);
        assert_eq!(name.id, "company-name");
    }

    #[test]
    fn test_raw_values_and_messages_are_shown_back() {
        let mut state = FormState::default();
        state.raw.insert("n_cabinets".to_owned(), "many".to_owned());
        state
            .messages
            .insert("n_cabinets".to_owned(), "n_cabinets: not a whole number".to_owned());
        let sections = form_sections(&ctx(), &state);
        let field = sections
            .iter()
            .flat_map(|s| s.groups.iter())
            .flat_map(|g| g.fields.iter())
            .find(|f| f.name == "n_cabinets")
            .unwrap();
        assert_eq!(field.value, "many");
        assert!(field.error.is_some());
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("energy_capacity_kwh"), "Energy capacity kwh");
        assert_eq!(humanize(""), "");
    }
}
