use std::fmt;

use serde::{Deserialize, Serialize};

/// Renders a predicted value for display.
pub trait ValueFormatter: fmt::Debug + Send + Sync {
    /// Formats a non-negative amount.
    fn format(&self, value: f64) -> String;
}

/// Currency rendering options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    /// Prefix symbol.
    pub symbol: String,
    /// Thousands separator.
    pub grouping: String,
    /// Fraction digits.
    pub decimals: usize,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            symbol: "$".into(),
            grouping: ",".into(),
            decimals: 0,
        }
    }
}

/// Symbol-prefixed, digit-grouped currency formatter (`$1,234,567`).
#[derive(Debug, Clone, Default)]
pub struct CurrencyFormatter {
    config: CurrencyConfig,
}

impl CurrencyFormatter {
    /// Formatter using the given options.
    #[must_use]
    pub const fn new(config: CurrencyConfig) -> Self {
        Self { config }
    }
}

impl ValueFormatter for CurrencyFormatter {
    fn format(&self, value: f64) -> String {
        let value = if value.is_finite() { value } else { 0.0 };
        let decimals = self.config.decimals.min(12);
        // Half away from zero, unlike `{:.N}` which rounds half to even.
        let scale = 10_f64.powi(i32::try_from(decimals).unwrap_or(12));
        let rounded = (value.abs() * scale).round() / scale;
        let rendered = format!("{rounded:.decimals$}");
        let (whole, fraction) = rendered
            .split_once('.')
            .map_or((rendered.as_str(), None), |(w, f)| (w, Some(f)));

        let mut out = String::with_capacity(rendered.len() + 8);
        if value < 0.0 && rounded > 0.0 {
            out.push('-');
        }
        out.push_str(&self.config.symbol);
        out.push_str(&group_digits(whole, &self.config.grouping));
        if let Some(fraction) = fraction {
            out.push('.');
            out.push_str(fraction);
        }
        out
    }
}

fn group_digits(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3 * separator.len());
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(ch);
    }
    grouped
}
