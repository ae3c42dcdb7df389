// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::Duration;
use tracing::debug;

use crate::adapter::fields;
use crate::adapter::traits::{HostInfo, ThemeAdapter};
use crate::catalog::models::TransactionType;
use crate::catalog::Ad;
use crate::store::{FieldValue, LocalStore, Metas, RecordId};

const PROPERTY_TYPE: &str = "property";
const CATEGORY_TAXONOMY: &str = "category";
const STATUS_FIELD: &str = "nt_status";
const IMAGES_FIELD: &str = "nt_propertyimages";

/// Realto theme properties
pub struct RealtoAdapter;

impl RealtoAdapter {
    pub fn check_compatibility(host: &HostInfo) -> bool {
        host.theme_is(&["realto"])
    }

    fn status(ad: &Ad) -> &'static str {
        if fields::is_rental(ad) {
            "for-rent"
        } else if fields::is_sold(ad) {
            "sold"
        } else {
            "for-sale"
        }
    }

    /// Category the record is filed under for a status; sold properties get none
    fn category(status: &str) -> Option<&'static str> {
        match status {
            "for-rent" => Some("Rent"),
            "for-sale" => Some("Sale"),
            _ => None,
        }
    }
}

#[async_trait]
impl ThemeAdapter for RealtoAdapter {
    fn name(&self) -> &'static str {
        "realto"
    }

    fn indexed_record_types(&self) -> Vec<String> {
        vec![PROPERTY_TYPE.to_string()]
    }

    fn target_record_type(&self, _ad: &Ad) -> Option<String> {
        Some(PROPERTY_TYPE.to_string())
    }

    fn transaction_filter(&self) -> &'static [&'static str] {
        &["O", "R", "L", "S", "H"]
    }

    fn feature_taxonomy(&self) -> &'static str {
        "features"
    }

    fn supports_photo_reformat(&self) -> bool {
        true
    }

    /// Remote and local timestamps are compared as is
    fn timestamp_skew(&self) -> Duration {
        Duration::zero()
    }

    fn map_extra_fields(&self, mut metas: Metas, ad: &Ad, _record_id: RecordId) -> Metas {
        let period = (ad.transaction_type == TransactionType::Rent).then(|| FieldValue::from("month"));
        let living_area = if ad.property_type.category != "Terrain" {
            fields::surface(ad)
        } else {
            None
        };
        let homepage = ad
            .extras
            .is_truthy("coup_de_coeur")
            .then_some(FieldValue::Integer(1));

        let mapped = [
            ("nt_prop_id", fields::mandate(ad)),
            ("nt_listprice", fields::price(ad)),
            ("nt_period", period),
            ("nt_bedrooms", fields::extra(ad, "nb_chambres")),
            ("nt_bathrooms", Some(fields::bathrooms(ad))),
            ("nt_plot_size", Some(fields::lenient_extra_int(ad, "surface_terrain"))),
            ("nt_living_area", living_area),
            ("nt_terrace", Some(fields::lenient_extra_int(ad, "surface_terrasse"))),
            ("nt_parking", fields::extra(ad, "type_parking")),
            ("nt_heating", fields::extra(ad, "chauffage")),
            ("nt_builtin", fields::extra(ad, "annee_construction")),
            ("nt_property_contact_phone", ad.contact.phone.clone().map(FieldValue::Text)),
            ("nt_property_contact_email", ad.contact.mail.clone().map(FieldValue::Text)),
            ("nt_homepage", homepage),
            ("_dpe", fields::first_truthy(ad, &["dpe_conso_en", "dpe_conso_en_lettre"])),
            ("_ges", fields::first_truthy(ad, &["dpe_ges", "dpe_ges_lettre"])),
            (STATUS_FIELD, Some(FieldValue::from(Self::status(ad)))),
            ("nt_gmap", Some(FieldValue::Text(ad.localization.full_address()))),
        ];

        // Fields already mapped upstream win over this theme's
        for (key, value) in mapped {
            metas.entry(key.to_string()).or_insert(value);
        }
        metas
    }

    async fn on_record_saved(
        &self,
        store: &dyn LocalStore,
        record_id: RecordId,
        ad: &Ad,
        metas: &Metas,
    ) -> anyhow::Result<()> {
        let status = match metas.get(STATUS_FIELD) {
            Some(Some(FieldValue::Text(status))) => status.as_str(),
            _ => Self::status(ad),
        };

        if let Some(category) = Self::category(status) {
            store
                .add_taxonomy_terms(record_id, CATEGORY_TAXONOMY, &[category.to_string()])
                .await?;
            debug!(record_id, category, "Filed property under category");
        }
        Ok(())
    }

    async fn on_photo_imported(
        &self,
        store: &dyn LocalStore,
        record_id: RecordId,
        attachment_id: RecordId,
    ) -> anyhow::Result<()> {
        store
            .add_custom_field(record_id, IMAGES_FIELD, &FieldValue::Integer(attachment_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{AdBuilder, MemoryStore};
    use serde_json::json;

    #[test]
    fn test_map_rental_fields() {
        let ad = AdBuilder::new("12")
            .transaction("Location")
            .mandate("L-3")
            .price(1200.0)
            .surface(80.0)
            .contact("0102030405", "agence@example.com")
            .extra("coup_de_coeur", "Coup de coeur", false, json!(1))
            .extra("dpe_conso_en", "DPE", true, json!(0))
            .extra("dpe_conso_en_lettre", "DPE lettre", true, json!("C"))
            .extra("dpe_ges", "GES", true, json!(12))
            .build();

        let metas = RealtoAdapter.map_extra_fields(Metas::new(), &ad, 1);
        assert_eq!(metas["nt_prop_id"], Some(FieldValue::from("L-3")));
        assert_eq!(metas["nt_listprice"], Some(FieldValue::Integer(1200)));
        assert_eq!(metas["nt_period"], Some(FieldValue::from("month")));
        assert_eq!(metas["nt_living_area"], Some(FieldValue::Integer(80)));
        assert_eq!(metas["nt_property_contact_phone"], Some(FieldValue::from("0102030405")));
        assert_eq!(metas["nt_homepage"], Some(FieldValue::Integer(1)));
        assert_eq!(metas["_dpe"], Some(FieldValue::from("C")));
        assert_eq!(metas["_ges"], Some(FieldValue::Integer(12)));
        assert_eq!(metas["nt_status"], Some(FieldValue::from("for-rent")));
    }

    #[test]
    fn test_land_has_no_living_area() {
        let ad = AdBuilder::new("13")
            .category("Terrain", "Terrain constructible")
            .surface(900.0)
            .build();

        let metas = RealtoAdapter.map_extra_fields(Metas::new(), &ad, 1);
        assert_eq!(metas["nt_living_area"], None);
        assert_eq!(metas["nt_period"], None);
        assert_eq!(metas["nt_status"], Some(FieldValue::from("for-sale")));
    }

    #[test]
    fn test_base_fields_are_kept() {
        let ad = AdBuilder::new("14").build();
        let mut base = Metas::new();
        base.insert("_gedeon_id".to_string(), Some(FieldValue::from("14")));

        let metas = RealtoAdapter.map_extra_fields(base, &ad, 1);
        assert_eq!(metas["_gedeon_id"], Some(FieldValue::from("14")));
    }

    #[tokio::test]
    async fn test_hooks_file_category_and_link_photos() {
        let store = MemoryStore::new();
        let id = store.insert_record("property", "15", chrono::Utc::now());
        let ad = AdBuilder::new("15").transaction("Vente").build();
        let metas = RealtoAdapter.map_extra_fields(Metas::new(), &ad, id);

        RealtoAdapter.on_record_saved(&store, id, &ad, &metas).await.unwrap();
        RealtoAdapter.on_record_saved(&store, id, &ad, &metas).await.unwrap();
        assert_eq!(store.terms(id, "category"), vec!["Sale".to_string()]);

        RealtoAdapter.on_photo_imported(&store, id, 101).await.unwrap();
        RealtoAdapter.on_photo_imported(&store, id, 102).await.unwrap();
        assert_eq!(
            store.record(id).unwrap().custom_fields["nt_propertyimages"],
            vec!["101".to_string(), "102".to_string()]
        );
    }

    #[tokio::test]
    async fn test_sold_property_gets_no_category() {
        let store = MemoryStore::new();
        let id = store.insert_record("property", "16", chrono::Utc::now());
        let ad = AdBuilder::new("16").transaction("Bien Vendu").build();
        let metas = RealtoAdapter.map_extra_fields(Metas::new(), &ad, id);

        RealtoAdapter.on_record_saved(&store, id, &ad, &metas).await.unwrap();
        assert!(store.terms(id, "category").is_empty());
    }
}
