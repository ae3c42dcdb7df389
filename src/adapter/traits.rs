// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::Duration;

use crate::catalog::Ad;
use crate::store::{LocalStore, Metas, RecordId};

/// What is known about the hosting site when picking an adapter
#[derive(Debug, Clone, Default)]
pub struct HostInfo {
    pub theme: Option<String>,
}

impl HostInfo {
    pub fn theme_is(&self, names: &[&str]) -> bool {
        self.theme
            .as_deref()
            .map(str::trim)
            .is_some_and(|theme| names.iter().any(|name| theme.eq_ignore_ascii_case(name)))
    }
}

/// One local schema the engine can write into. Adapters only differ in how an
/// ad maps onto records; the reconciliation itself is shared.
#[async_trait]
pub trait ThemeAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Record types indexed at the start of a run
    fn indexed_record_types(&self) -> Vec<String>;

    /// Record type an ad is stored as; `None` when this theme cannot hold it
    fn target_record_type(&self, ad: &Ad) -> Option<String>;

    /// Transaction type codes requested from the catalog
    fn transaction_filter(&self) -> &'static [&'static str];

    /// Added to the ad's modification time before comparing it with the record's
    fn timestamp_skew(&self) -> Duration {
        Duration::hours(2)
    }

    fn feature_taxonomy(&self) -> &'static str {
        "feature"
    }

    fn supports_photo_reformat(&self) -> bool {
        false
    }

    /// Complete the base custom fields with this theme's own
    fn map_extra_fields(&self, base: Metas, ad: &Ad, record_id: RecordId) -> Metas;

    /// Called once the record and its custom fields are written
    async fn on_record_saved(
        &self,
        _store: &dyn LocalStore,
        _record_id: RecordId,
        _ad: &Ad,
        _metas: &Metas,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after a photo was imported as a new attachment
    async fn on_photo_imported(
        &self,
        _store: &dyn LocalStore,
        _record_id: RecordId,
        _attachment_id: RecordId,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}
