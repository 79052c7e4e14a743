//! Conversion of raw dashboard fields into typed values.
//!
//! Dashboards report quantities as text with a unit suffix (`"12.4 kWh"`), as bare numeric
//! strings (`"12.4"`) or as JSON numbers, and timestamps in a handful of fixed layouts. All
//! timestamps are read as UTC.

use crate::api::Error;
use crate::model::EpochSeconds;
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

pub const POWER_UNIT: &str = "kW";
pub const ENERGY_UNIT: &str = "kWh";
pub const CAPACITY_UNIT: &str = "kWp";
pub const IRRADIATION_UNIT: &str = "kW/m^2";
pub const TEMPERATURE_UNIT: &str = "C";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2021-06-14T10:20:30.123456Z`
    FractionalZulu,
    /// `2021-06-14T10:20:30Z`
    Zulu,
    /// `2021-06-14 10:20:30`
    Plain,
}

impl TimestampFormat {
    fn pattern(self) -> &'static str {
        match self {
            TimestampFormat::FractionalZulu => "%Y-%m-%dT%H:%M:%S%.fZ",
            TimestampFormat::Zulu => "%Y-%m-%dT%H:%M:%SZ",
            TimestampFormat::Plain => "%Y-%m-%d %H:%M:%S",
        }
    }
}

/// Parse a quantity such as `"12.4 kWh"`. Only tokens equal to `unit` are discarded, the first
/// remaining numeric token is the value. Returns `None` when nothing numeric is left.
pub fn parse_quantity(text: &str, unit: &str) -> Option<f64> {
    text.split_whitespace()
        .filter(|token| *token != unit)
        .filter_map(|token| token.parse::<f64>().ok())
        .find(|value| value.is_finite())
}

/// Like `parse_quantity`, but accepts whatever JSON value the dashboard put in the field.
pub fn quantity(value: &Value, unit: &str) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_quantity(s, unit),
        _ => None,
    }
}

pub fn parse_timestamp(text: &str, format: TimestampFormat) -> Result<EpochSeconds, Error> {
    NaiveDateTime::parse_from_str(text.trim(), format.pattern())
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp())
        .map_err(|_| Error::MalformedTimestamp(text.to_owned()))
}

/// Parse a `...Z` timestamp with or without fractional seconds.
pub fn parse_zulu_timestamp(text: &str) -> Result<EpochSeconds, Error> {
    parse_timestamp(text, TimestampFormat::FractionalZulu)
        .or_else(|_| parse_timestamp(text, TimestampFormat::Zulu))
}
