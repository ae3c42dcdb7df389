// SPDX-License-Identifier: GPL-3.0-only
//! Conversions from ad attributes to custom field values, shared by the adapters
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::catalog::models::{is_truthy, TransactionType};
use crate::catalog::Ad;
use crate::store::FieldValue;

static INT_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\D*|\s").expect("valid integer noise pattern"));

/// Whole numbers as integers, so that `250000.0` is stored as `250000`
pub fn number(value: f64) -> FieldValue {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        FieldValue::Integer(value as i64)
    } else {
        FieldValue::Float(value)
    }
}

/// Extra value as stored, `None` for missing and null values
pub fn extra(ad: &Ad, code: &str) -> Option<FieldValue> {
    match ad.extras.value(code)? {
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(FieldValue::Integer)
            .or_else(|| n.as_f64().map(FieldValue::Float)),
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        _ => None,
    }
}

/// Lenient integer reading: `" 1 850 m²"` is 1850, anything unreadable is 0
pub fn lenient_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        Some(Value::String(s)) => {
            let cleaned = INT_NOISE.replace_all(s, "");
            let digits: String = cleaned.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        }
        Some(Value::Bool(true)) => 1,
        _ => 0,
    }
}

pub fn lenient_extra_int(ad: &Ad, code: &str) -> FieldValue {
    FieldValue::Integer(lenient_int(ad.extras.value(code)))
}

/// Bathrooms plus shower rooms
pub fn bathrooms(ad: &Ad) -> FieldValue {
    let total = ad.extras.number("nb_sdb").unwrap_or(0.0) + ad.extras.number("nb_sde").unwrap_or(0.0);
    number(total)
}

pub fn price(ad: &Ad) -> Option<FieldValue> {
    ad.listed_price().map(number)
}

pub fn surface(ad: &Ad) -> Option<FieldValue> {
    ad.surface.map(number)
}

pub fn mandate(ad: &Ad) -> Option<FieldValue> {
    ad.mandate.clone().map(FieldValue::Text)
}

pub fn is_rental(ad: &Ad) -> bool {
    matches!(ad.transaction_type, TransactionType::Rent | TransactionType::SeasonalRent)
}

pub fn is_sold(ad: &Ad) -> bool {
    ad.transaction_type == TransactionType::Sold
}

/// First truthy extra among `codes`
pub fn first_truthy(ad: &Ad, codes: &[&str]) -> Option<FieldValue> {
    codes
        .iter()
        .find(|code| ad.extras.value(code).is_some_and(is_truthy))
        .and_then(|code| extra(ad, code))
}
