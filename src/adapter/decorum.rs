// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

use crate::adapter::fields;
use crate::adapter::traits::{HostInfo, ThemeAdapter};
use crate::catalog::models::TransactionType;
use crate::catalog::Ad;
use crate::store::{FieldValue, Metas, RecordId};

const SALE_TYPE: &str = "sale";
const RENT_TYPE: &str = "rent";

/// Decorum theme: sales and rentals are two distinct record types
pub struct DecorumAdapter;

impl DecorumAdapter {
    pub fn check_compatibility(host: &HostInfo) -> bool {
        host.theme_is(&["decorum"])
    }
}

#[async_trait]
impl ThemeAdapter for DecorumAdapter {
    fn name(&self) -> &'static str {
        "decorum"
    }

    fn indexed_record_types(&self) -> Vec<String> {
        vec![SALE_TYPE.to_string(), RENT_TYPE.to_string()]
    }

    fn target_record_type(&self, ad: &Ad) -> Option<String> {
        match ad.transaction_type {
            TransactionType::Sale => Some(SALE_TYPE.to_string()),
            TransactionType::Rent => Some(RENT_TYPE.to_string()),
            _ => None,
        }
    }

    fn transaction_filter(&self) -> &'static [&'static str] {
        &["R", "S", "O"]
    }

    fn map_extra_fields(&self, mut metas: Metas, ad: &Ad, _record_id: RecordId) -> Metas {
        let mapped = [
            ("property_id", fields::mandate(ad)),
            ("_price", fields::price(ad)),
            ("_beds", fields::extra(ad, "nb_chambres")),
            ("_baths", Some(fields::bathrooms(ad))),
            ("_size", fields::surface(ad)),
            ("_details_2", Some(fields::lenient_extra_int(ad, "surface_terrasse"))),
            ("_details_3", fields::extra(ad, "type_parking")),
            ("_price_sold", Some(FieldValue::Integer(fields::is_sold(ad) as i64))),
            ("_map_address", Some(FieldValue::Text(ad.localization.full_address()))),
        ];
        metas.extend(mapped.into_iter().map(|(key, value)| (key.to_string(), value)));
        metas
    }
}
