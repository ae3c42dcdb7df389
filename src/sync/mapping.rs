// SPDX-License-Identifier: GPL-3.0-only
//! Theme independent part of turning an ad into a record: content, base
//! custom fields and taxonomy terms.
use serde_json::Value;

use crate::adapter::ThemeAdapter;
use crate::catalog::Ad;
use crate::store::{FieldValue, LocalStore, Metas, RecordDraft, RecordId, RecordStatus, EXTERNAL_ID_FIELD};

const EXCLUSIVE_FEATURE: &str = "Exclusivité";
const FAVORITE_FEATURE: &str = "Coup de coeur";

/// Record content for `ad`, e.g. "Vente Maison Lyon"
pub fn record_draft(ad: &Ad, record_type: &str) -> RecordDraft {
    let kind = if ad.property_type.name.trim().is_empty() {
        ad.property_type.category.as_str()
    } else {
        ad.property_type.name.as_str()
    };

    let title = [ad.transaction_type.label(), kind, ad.localization.city.as_str()]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    RecordDraft {
        record_type: record_type.to_string(),
        title,
        slug: ad.reference.clone(),
        content: ad.text.clone(),
        status: RecordStatus::Published,
        created_at: ad.stats.created,
        author_id: None,
    }
}

/// Custom fields every theme stores
pub fn base_metas(ad: &Ad) -> Metas {
    let mut metas = Metas::new();
    metas.insert(EXTERNAL_ID_FIELD.to_string(), Some(FieldValue::from(ad.id.as_str())));
    metas
}

/// Write `metas` onto the record. Missing and empty values remove the field.
pub async fn apply_metas(store: &dyn LocalStore, id: RecordId, metas: &Metas) -> anyhow::Result<()> {
    for (key, value) in metas {
        match value {
            Some(value) if !value.is_empty() => store.set_custom_field(id, key, value).await?,
            _ => store.remove_custom_field(id, key).await?,
        }
    }
    Ok(())
}

/// Displayed boolean extras, plus the mandate and favorite markers
pub fn features(ad: &Ad) -> Vec<String> {
    let mut features: Vec<String> = ad
        .extras
        .iter()
        .filter(|extra| extra.display && extra.value == Value::Bool(true))
        .map(|extra| extra.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    if ad
        .extras
        .text("type_mandat")
        .is_some_and(|kind| kind.eq_ignore_ascii_case("exclusif"))
    {
        features.push(EXCLUSIVE_FEATURE.to_string());
    }
    if ad.extras.is_truthy("coup_de_coeur") {
        features.push(FAVORITE_FEATURE.to_string());
    }

    dedup(features)
}

/// Property category then type, without repeating identical labels
pub fn property_types(ad: &Ad) -> Vec<String> {
    dedup(vec![
        ad.property_type.category.trim().to_string(),
        ad.property_type.name.trim().to_string(),
    ])
}

pub fn locations(ad: &Ad) -> Vec<String> {
    dedup(vec![ad.localization.city.trim().to_string()])
}

fn dedup(terms: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        if !term.is_empty() && !unique.contains(&term) {
            unique.push(term);
        }
    }
    unique
}

/// Replace the record's location, type and feature terms
pub async fn assign_taxonomies(
    store: &dyn LocalStore,
    adapter: &dyn ThemeAdapter,
    id: RecordId,
    ad: &Ad,
) -> anyhow::Result<()> {
    store.set_taxonomy_terms(id, "location", &locations(ad)).await?;
    store.set_taxonomy_terms(id, "property-type", &property_types(ad)).await?;
    store
        .set_taxonomy_terms(id, adapter.feature_taxonomy(), &features(ad))
        .await?;
    Ok(())
}
