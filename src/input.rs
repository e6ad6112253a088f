//! Parsing of raw form input into amounts and years.
//!
//! Every edit crosses this boundary before it touches a sheet: empty input
//! becomes zero (which the validation scan then flags), anything that is not
//! a finite number is rejected instead of silently coerced.

use crate::error::{BalanceSheetError, Result};
use serde::{Deserialize, Deserializer};

/// Parses an amount, accepting a leading `$` and `,` thousands separators.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let body = body.strip_prefix('$').unwrap_or(body);
    let cleaned: String = body.chars().filter(|c| *c != ',').collect();

    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(BalanceSheetError::InvalidAmount(raw.to_string()));
    }

    let value: f64 = cleaned
        .parse()
        .map_err(|_| BalanceSheetError::InvalidAmount(raw.to_string()))?;

    if !value.is_finite() {
        return Err(BalanceSheetError::InvalidAmount(raw.to_string()));
    }

    Ok(if negative { -value } else { value })
}

/// Parses a year. Empty input yields 0.
pub fn parse_year(raw: &str) -> Result<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    trimmed
        .parse::<i32>()
        .map_err(|_| BalanceSheetError::InvalidYear(raw.to_string()))
}

/// Raw JSON representation of an amount as it may arrive from a form or an
/// analysis payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Amount {
    Number(f64),
    Text(String),
    Flag(bool),
    Missing,
}

impl Amount {
    pub(crate) fn resolve(self) -> Result<f64> {
        match self {
            Amount::Number(value) => Ok(value),
            Amount::Text(text) => parse_amount(&text),
            Amount::Flag(flag) => Ok(if flag { 1.0 } else { 0.0 }),
            Amount::Missing => Ok(0.0),
        }
    }

    fn resolve_year(self) -> Result<i32> {
        match self {
            Amount::Number(value) if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 => {
                Ok(value as i32)
            }
            Amount::Number(value) => Err(BalanceSheetError::InvalidYear(value.to_string())),
            Amount::Text(text) => parse_year(&text),
            Amount::Flag(flag) => Err(BalanceSheetError::InvalidYear(flag.to_string())),
            Amount::Missing => Ok(0),
        }
    }
}

pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Amount::deserialize(deserializer)?
        .resolve()
        .map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_year<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Amount::deserialize(deserializer)?
        .resolve_year()
        .map_err(serde::de::Error::custom)
}
