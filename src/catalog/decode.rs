// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

use crate::catalog::error::CatalogError;
use crate::catalog::models::Ad;
use crate::catalog::traits::{PageResult, RejectedAd};
use crate::config::ApiFormat;

/// Serialized date convention of the catalog: `/Date(<millis>)/`, with the
/// slashes optionally still escaped.
static DATE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\\?/Date\((-?\d+)\)\\?/$").expect("valid date marker pattern")
});

#[derive(Deserialize)]
struct PageEnvelope {
    nb_results: usize,
    total_results: usize,
    #[serde(default)]
    results: Vec<Value>,
}

pub fn parse_date_marker(s: &str) -> Option<DateTime<Utc>> {
    let caps = DATE_MARKER.captures(s)?;
    let millis: i64 = caps[1].parse().ok()?;
    DateTime::from_timestamp_millis(millis)
}

/// Replace every date marker string in `value`, at any depth, by its RFC 3339 form
pub fn convert_date_markers(value: &mut Value) {
    match value {
        Value::String(s) => {
            if let Some(ts) = parse_date_marker(s) {
                *s = ts.to_rfc3339_opts(SecondsFormat::Secs, true);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(convert_date_markers),
        Value::Object(map) => map.values_mut().for_each(convert_date_markers),
        _ => {}
    }
}

/// Strip the `callback(...);` wrapper of a JSONP body
pub fn unwrap_jsonp<'a>(body: &'a str, callback: &str) -> Option<&'a str> {
    body.trim()
        .strip_prefix(callback)?
        .strip_prefix('(')?
        .strip_suffix(';')?
        .strip_suffix(')')
}

fn parse_payload(body: &str, format: ApiFormat, callback: &str) -> Result<Value, CatalogError> {
    let raw = match format {
        ApiFormat::Json => body,
        ApiFormat::Jsonp => unwrap_jsonp(body, callback)
            .ok_or_else(|| CatalogError::Decode("Incorrect Data".to_string()))?,
    };
    Ok(serde_json::from_str(raw)?)
}

/// `{ "error": { "code": .., "message": .. } }` envelope with a failure code (400 and up)
fn embedded_error(value: &Value) -> Option<(u16, String)> {
    let error = value.get("error")?.as_object()?;
    let code = match error.get("code")? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if code < 400 {
        return None;
    }
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    Some((u16::try_from(code).unwrap_or(u16::MAX), message))
}

/// Error message carried by the body of a failed response
pub fn error_message(body: &str, format: ApiFormat, callback: &str) -> Option<String> {
    let value = parse_payload(body, format, callback).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Decode the body of a nominally successful page response
pub fn decode_page(body: &str, format: ApiFormat, callback: &str) -> Result<PageResult, CatalogError> {
    let mut value = parse_payload(body, format, callback)?;

    // JSONP responses are always 200, the status only lives in the envelope.
    if let Some((code, message)) = embedded_error(&value) {
        return Err(CatalogError::Remote { code, message });
    }

    convert_date_markers(&mut value);
    let envelope: PageEnvelope = serde_json::from_value(value)?;

    let mut items = Vec::with_capacity(envelope.results.len());
    let mut rejected = Vec::new();
    for (position, raw) in envelope.results.into_iter().enumerate() {
        let id = match raw.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };
        match serde_json::from_value::<Ad>(raw) {
            Ok(ad) => items.push(ad),
            Err(e) => {
                let hint = id.clone().unwrap_or_else(|| format!("#{}", position));
                warn!(ad = %hint, error = %e, "Skipping undecodable ad");
                rejected.push(RejectedAd {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(PageResult {
        items,
        page_count: envelope.nb_results,
        total_count: envelope.total_results,
        rejected,
    })
}
