// SPDX-License-Identifier: GPL-3.0-only
use regex::Regex;
use std::sync::LazyLock;

const PREFIX: &str = "property_photo";

/// `property_photo_{external id}_{position}`, with the `-N` suffix the store
/// appends to a name that is already taken
static ATTACHMENT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^property_photo_(.+)_(\d+)(?:-\d+)?$").expect("valid attachment name pattern")
});

pub fn attachment_name(external_id: &str, position: usize) -> String {
    format!("{}_{}_{}", PREFIX, external_id, position)
}

/// Position encoded in an attachment name, when the name belongs to `external_id`
pub fn parse_position(name: &str, external_id: &str) -> Option<usize> {
    let caps = ATTACHMENT_NAME.captures(name)?;
    if &caps[1] != external_id {
        return None;
    }
    caps[2].parse().ok()
}
