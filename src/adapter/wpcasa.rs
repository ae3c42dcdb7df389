// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

use crate::adapter::fields;
use crate::adapter::traits::{HostInfo, ThemeAdapter};
use crate::catalog::Ad;
use crate::store::{FieldValue, Metas, RecordId};

const LISTING_TYPE: &str = "listing";

/// WPCasa (wpSight) listings
pub struct WpCasaAdapter;

impl WpCasaAdapter {
    pub fn check_compatibility(host: &HostInfo) -> bool {
        host.theme_is(&["wpcasa", "wpsight"])
    }
}

#[async_trait]
impl ThemeAdapter for WpCasaAdapter {
    fn name(&self) -> &'static str {
        "wpcasa"
    }

    fn indexed_record_types(&self) -> Vec<String> {
        vec![LISTING_TYPE.to_string()]
    }

    fn target_record_type(&self, _ad: &Ad) -> Option<String> {
        Some(LISTING_TYPE.to_string())
    }

    fn transaction_filter(&self) -> &'static [&'static str] {
        &["O", "R", "L", "S", "H"]
    }

    fn map_extra_fields(&self, mut metas: Metas, ad: &Ad, _record_id: RecordId) -> Metas {
        let status = if fields::is_rental(ad) { "rent" } else { "sale" };

        let mapped = [
            ("_listing_id", fields::mandate(ad)),
            ("_price", fields::price(ad)),
            ("_details_1", fields::extra(ad, "nb_chambres")),
            ("_details_2", Some(fields::bathrooms(ad))),
            ("_details_3", Some(fields::lenient_extra_int(ad, "surface_terrain"))),
            ("_details_4", fields::surface(ad)),
            ("_details_5", Some(fields::lenient_extra_int(ad, "surface_terrasse"))),
            ("_details_6", fields::extra(ad, "type_parking")),
            ("_details_7", fields::extra(ad, "chauffage")),
            ("_details_8", fields::extra(ad, "annee_construction")),
            ("_price_status", Some(FieldValue::from(status))),
            ("_price_sold_rented", Some(FieldValue::Integer(fields::is_sold(ad) as i64))),
            ("_map_address", Some(FieldValue::Text(ad.localization.full_address()))),
        ];
        metas.extend(mapped.into_iter().map(|(key, value)| (key.to_string(), value)));
        metas
    }
}
