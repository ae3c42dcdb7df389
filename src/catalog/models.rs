// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static PHOTO_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)$").expect("valid photo timestamp pattern"));

/// Transaction labels as published by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionType {
    Sale,
    Rent,
    SeasonalRent,
    Sold,
    LifeAnnuity,
    Other(String),
}

impl TransactionType {
    pub fn label(&self) -> &str {
        match self {
            Self::Sale => "Vente",
            Self::Rent => "Location",
            Self::SeasonalRent => "Location de Vacances",
            Self::Sold => "Bien Vendu",
            Self::LifeAnnuity => "Viager",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for TransactionType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Vente" => Self::Sale,
            "Location" => Self::Rent,
            "Location de Vacances" => Self::SeasonalRent,
            "Bien Vendu" => Self::Sold,
            "Viager" => Self::LifeAnnuity,
            _ => Self::Other(label),
        }
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(String::deserialize(deserializer)?.into())
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One listing of the remote catalog, as fetched for a single run
#[derive(Debug, Clone, Deserialize)]
pub struct Ad {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(rename = "ref", default, deserialize_with = "lenient_string")]
    pub reference: String,

    pub transaction_type: TransactionType,

    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub mandate: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,

    /// Zero or missing means "not applicable"
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub surface: Option<f64>,

    pub stats: AdStats,

    #[serde(default, deserialize_with = "null_as_default")]
    pub contact: Contact,

    #[serde(default)]
    pub extras: Extras,

    #[serde(default, deserialize_with = "null_as_default")]
    pub photos: Vec<Photo>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub localization: Localization,

    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub property_type: PropertyType,
}

impl Ad {
    /// Price when it is meaningful (strictly positive)
    pub fn listed_price(&self) -> Option<f64> {
        self.price.filter(|price| *price > 0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdStats {
    #[serde(deserialize_with = "timestamp")]
    pub created: DateTime<Utc>,

    #[serde(deserialize_with = "timestamp")]
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub mail: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Localization {
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,

    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub zip_code: Option<String>,

    #[serde(default)]
    pub address: Option<String>,
}

impl Localization {
    /// "address, zip city", without the address part when it is unknown
    pub fn full_address(&self) -> String {
        let locality = [self.zip_code.as_deref().unwrap_or_default(), self.city.as_str()]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        match self.address.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(street) if !locality.is_empty() => format!("{}, {}", street, locality),
            Some(street) => street.to_string(),
            None => locality,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyType {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Photo {
    pub url: String,

    #[serde(default, alias = "desc")]
    pub description: Option<String>,
}

impl Photo {
    /// Upstream modification time carried as the last path segment of the url,
    /// e.g. `http://photos.example.com/9099042/0/large/1394097932`. Zero when absent.
    pub fn embedded_timestamp(&self) -> i64 {
        PHOTO_TIMESTAMP
            .captures(&self.url)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0)
    }

    /// Full-size variant of the photo
    pub fn source_url(&self) -> String {
        self.url.replace("/large/", "/original/")
    }
}

/// One typed attribute of an ad
#[derive(Debug, Clone, Deserialize)]
pub struct Extra {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    #[serde(default, deserialize_with = "lenient_flag")]
    pub display: bool,

    #[serde(default)]
    pub value: Value,
}

/// Extras keyed by code. The catalog sends them as an object keyed by code;
/// a plain list of extras carrying their own `code` is accepted too.
#[derive(Debug, Clone, Default)]
pub struct Extras(Vec<Extra>);

impl Extras {
    pub fn iter(&self) -> impl Iterator<Item = &Extra> {
        self.0.iter()
    }

    pub fn get(&self, code: &str) -> Option<&Extra> {
        self.0.iter().find(|extra| extra.code == code)
    }

    pub fn value(&self, code: &str) -> Option<&Value> {
        self.get(code).map(|extra| &extra.value)
    }

    /// Value rendered as text; `None` for null, booleans and empty strings
    pub fn text(&self, code: &str) -> Option<String> {
        match self.value(code)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Value read as a number, accepting numeric strings
    pub fn number(&self, code: &str) -> Option<f64> {
        match self.value(code)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }

    pub fn is_truthy(&self, code: &str) -> bool {
        self.value(code).is_some_and(is_truthy)
    }
}

impl From<Vec<Extra>> for Extras {
    fn from(extras: Vec<Extra>) -> Self {
        Self(extras)
    }
}

impl<'de> Deserialize<'de> for Extras {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExtrasVisitor;

        impl<'de> de::Visitor<'de> for ExtrasVisitor {
            type Value = Extras;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map or a list of extras")
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Extras, A::Error> {
                let mut extras = Vec::new();
                while let Some((code, mut extra)) = map.next_entry::<String, Extra>()? {
                    if extra.code.is_empty() {
                        extra.code = code;
                    }
                    extras.push(extra);
                }
                Ok(Extras(extras))
            }

            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Extras, A::Error> {
                let mut extras = Vec::new();
                while let Some(extra) = seq.next_element::<Extra>()? {
                    extras.push(extra);
                }
                Ok(Extras(extras))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Extras, E> {
                Ok(Extras::default())
            }
        }

        deserializer.deserialize_any(ExtrasVisitor)
    }
}

/// Loose truthiness of a catalog value: null, false, 0, "" and "0" are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected a string or a number, got {}", other))),
    }
}

/// Text field that may be sent as a number or as `null` (read as empty)
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected a string, got {}", other))),
    }
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(is_truthy(&Value::deserialize(deserializer)?))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => Ok(s.trim().replace(',', ".").parse().ok()),
        _ => Ok(None),
    }
}

/// Timestamps arrive as RFC 3339 strings (date markers are normalized to
/// that form while decoding), as epoch seconds, or as `{ "epoch": secs }`.
fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    timestamp_from_value(&value)
        .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", value)))
}

fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::Object(map) => map.get("epoch").and_then(timestamp_from_value),
        _ => None,
    }
}
