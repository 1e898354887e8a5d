//! Growth ratios and their comparison-ready indicators.
//!
//! Computation returns numbers and a `Direction`; mapping a direction to a
//! colour or an icon belongs to the presentation layer.

use serde::{Deserialize, Serialize};

/// Ratios within ±DEAD_BAND are reported as flat.
pub const DEFAULT_DEAD_BAND: f64 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Up => "↑↑",
            Self::Down => "↓↓",
            Self::Flat => "≈",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthIndicator {
    pub ratio: f64,
    pub display: String,
    pub direction: Direction,
}

/// Growth of `current` over `prior`.
///
/// A zero prior is never an error: growth from nothing is 1.0 (100%) when
/// there is something now, otherwise 0.0.
pub fn growth_ratio(current: f64, prior: f64) -> f64 {
    if prior != 0.0 {
        (current - prior) / prior
    } else if current > 0.0 {
        1.0
    } else {
        0.0
    }
}

pub fn direction_of(ratio: f64, dead_band: f64) -> Direction {
    if ratio > dead_band {
        Direction::Up
    } else if ratio < -dead_band {
        Direction::Down
    } else {
        Direction::Flat
    }
}

pub fn format_growth(current: f64, prior: f64) -> GrowthIndicator {
    format_growth_with(current, prior, DEFAULT_DEAD_BAND)
}

pub fn format_growth_with(current: f64, prior: f64, dead_band: f64) -> GrowthIndicator {
    let ratio = growth_ratio(current, prior);
    indicator_for(ratio, dead_band)
}

/// Indicator for an already computed ratio.
pub fn indicator_for(ratio: f64, dead_band: f64) -> GrowthIndicator {
    let direction = direction_of(ratio, dead_band);
    let display = match direction {
        Direction::Flat => format!("0.0% {}", direction.marker()),
        _ => format!("{:.1}% {}", ratio * 100.0, direction.marker()),
    };
    GrowthIndicator {
        ratio,
        display,
        direction,
    }
}

/// Display used when the comparison has no prior season at all.
pub const NOT_AVAILABLE: &str = "N/A";

/// Signed one-decimal percentage, e.g. "+50.0%".
pub fn signed_percent(ratio: f64) -> String {
    format!("{:+.1}%", ratio * 100.0)
}

/// Short label for per-entity tables: "new" from a zero base, "-" when both
/// sides are zero, otherwise the signed percentage.
pub fn growth_label(current: f64, prior: f64) -> String {
    if prior == 0.0 {
        if current > 0.0 {
            "new".to_string()
        } else {
            "-".to_string()
        }
    } else {
        signed_percent(growth_ratio(current, prior))
    }
}

/// Brazilian thousands formatting: 1234567.8 -> "1.234.568" (0 decimals)
/// or "1.234.567,80" (2 decimals).
pub fn format_thousands_br(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{grouped},{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
