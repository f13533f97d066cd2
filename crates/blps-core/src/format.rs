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

//! Number formatting for report figures.
//!
//! Figures are shown the same way in every locale: comma grouping, a dot
//! decimal separator, `NT$` for TWD and `$` for USD.

/// Group the integer digits of `value` and keep at most `max_fraction` digits,
/// dropping trailing zeros
#[must_use]
pub fn number(value: f64, max_fraction: usize) -> String {
    render(value, max_fraction, false)
}

/// Fixed number of fraction digits
#[must_use]
pub fn fixed(value: f64, fraction: usize) -> String {
    render(value, fraction, true)
}

/// Whole New Taiwan dollars, e.g. `NT$1,234,567`
#[must_use]
pub fn currency_twd(value: f64) -> String {
    with_sign(value, 0, "NT$")
}

/// US dollars with cents, e.g. `$400.00`
#[must_use]
pub fn currency_usd(value: f64) -> String {
    with_sign(value, 2, "$")
}

/// Ratio shown as a percentage, e.g. `0.1234` with 2 digits is `12.34%`
#[must_use]
pub fn percent(ratio: f64, fraction: usize) -> String {
    format!("{}%", fixed(ratio * 100.0, fraction))
}

fn with_sign(value: f64, fraction: usize, symbol: &str) -> String {
    let digits = fixed(value.abs(), fraction);
    if value < 0.0 && !is_rendered_zero(&digits) {
        format!("-{symbol}{digits}")
    } else {
        format!("{symbol}{digits}")
    }
}

fn render(value: f64, fraction: usize, keep_zeros: bool) -> String {
    if !value.is_finite() {
        return "-".to_owned();
    }
    let text = format!("{:.*}", fraction, value.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text.as_str(), ""),
    };
    let frac_part = if keep_zeros {
        frac_part
    } else {
        frac_part.trim_end_matches('0')
    };

    let mut out = group_thousands(int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    if value < 0.0 && !is_rendered_zero(&out) {
        out.insert(0, '-');
    }
    out
}

fn is_rendered_zero(digits: &str) -> bool {
    digits.chars().all(|c| matches!(c, '0' | '.' | ','))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len * 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
