//! Read-only view of the calculator's form snapshot.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Keys the calculator writes into its snapshot.
pub mod keys {
    pub const PAYMENT_TYPE: &str = "paymentType";
    pub const PAYMENT_AMOUNT: &str = "paymentAmount";
    pub const PAYMENT_FREQUENCY: &str = "paymentFrequency";
    pub const START_DATE: &str = "startDate";
    pub const END_DATE: &str = "endDate";
    pub const ANNUAL_INCREASE: &str = "annualIncrease";
    pub const LUMP_SUMS: &str = "lumpSums";
}

/// Snapshot of the enclosing calculator's form state.
///
/// The calculator owns and mutates the real form; the assistant only ever
/// sees copies of it and never writes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(serde_json::Value);

/// A single lump-sum payment entered in the calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct LumpSum {
    pub amount: Decimal,
    pub date: Option<String>,
}

impl Default for FormData {
    fn default() -> Self {
        Self(serde_json::json!({}))
    }
}

impl From<serde_json::Value> for FormData {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl FormData {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The raw snapshot.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// True when the snapshot holds no fields at all.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// A non-empty string field, with numbers and booleans rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// A monetary field, accepting numbers or strings such as `"$1,250.00"`.
    pub fn amount(&self, key: &str) -> Option<Decimal> {
        parse_amount(self.0.get(key)?)
    }

    /// Lump sums entered for a guaranteed lump-sum stream.
    pub fn lump_sums(&self) -> Vec<LumpSum> {
        let Some(items) = self.0.get(keys::LUMP_SUMS).and_then(|v| v.as_array()) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| {
                let amount = parse_amount(item.get("amount")?)?;
                let date = item
                    .get("date")
                    .and_then(|d| d.as_str())
                    .map(String::from);
                Some(LumpSum { amount, date })
            })
            .collect()
    }

    /// Top-level scalar fields that are not one of the well-known keys, in
    /// key order.
    pub fn extra_fields(&self) -> Vec<(String, String)> {
        let Some(map) = self.0.as_object() else {
            return Vec::new();
        };
        let known = [
            keys::PAYMENT_TYPE,
            keys::PAYMENT_AMOUNT,
            keys::PAYMENT_FREQUENCY,
            keys::START_DATE,
            keys::END_DATE,
            keys::ANNUAL_INCREASE,
            keys::LUMP_SUMS,
        ];
        let mut extras: Vec<(String, String)> = map
            .keys()
            .filter(|k| !known.contains(&k.as_str()))
            .filter_map(|k| self.text(k).map(|v| (k.clone(), v)))
            .collect();
        extras.sort();
        extras
    }
}

fn parse_amount(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain)),
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }
}

/// Render an amount as US currency, e.g. `$12,345.60`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${grouped}.{cents}")
    } else {
        format!("${grouped}.{cents}")
    }
}
