//! Defaults for nullable source columns so every aggregate field is populated.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

pub fn text(value: Option<String>) -> String {
    value.unwrap_or_default()
}

pub fn int(value: Option<i32>) -> i64 {
    value.map(i64::from).unwrap_or(0)
}

pub fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}

pub fn amount(value: Option<Decimal>) -> Decimal {
    value.unwrap_or(Decimal::ZERO)
}

/// Unset and zero dates (`0000-00-00 00:00:00` decodes to NULL) become the Unix epoch.
pub fn timestamp(value: Option<NaiveDateTime>) -> DateTime<Utc> {
    value.map(|v| v.and_utc()).unwrap_or_default()
}

pub fn date(value: Option<NaiveDate>) -> NaiveDate {
    value.unwrap_or_default()
}

/// Foreign keys use 0 for "none".
pub fn reference(value: Option<i32>) -> i64 {
    value.filter(|v| *v > 0).map(i64::from).unwrap_or(0)
}
