// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

use crate::store::models::{
    Attachment, AttachmentDraft, AttachmentUpdate, FieldValue, LocalRecord, RecordDraft, RecordId,
    RecordStatus,
};

#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Records of a type whose status is one of `statuses`, with their custom fields
    async fn find_by_type(
        &self,
        record_type: &str,
        statuses: &[RecordStatus],
    ) -> anyhow::Result<Vec<LocalRecord>>;

    async fn find_attachments(&self, parent: RecordId) -> anyhow::Result<Vec<Attachment>>;

    async fn create(&self, draft: &RecordDraft) -> anyhow::Result<RecordId>;

    async fn update(&self, id: RecordId, draft: &RecordDraft) -> anyhow::Result<()>;

    /// Soft delete
    async fn trash(&self, id: RecordId) -> anyhow::Result<()>;

    /// Replace every value of `key` with `value`
    async fn set_custom_field(&self, id: RecordId, key: &str, value: &FieldValue) -> anyhow::Result<()>;

    /// Append one more value to a multi-valued field
    async fn add_custom_field(&self, id: RecordId, key: &str, value: &FieldValue) -> anyhow::Result<()>;

    async fn remove_custom_field(&self, id: RecordId, key: &str) -> anyhow::Result<()>;

    async fn create_attachment(&self, draft: AttachmentDraft) -> anyhow::Result<RecordId>;

    async fn update_attachment(&self, id: RecordId, update: AttachmentUpdate) -> anyhow::Result<()>;

    async fn delete_attachment(&self, id: RecordId) -> anyhow::Result<()>;

    /// Replace the record's terms in `taxonomy`
    async fn set_taxonomy_terms(&self, id: RecordId, taxonomy: &str, terms: &[String]) -> anyhow::Result<()>;

    /// Add terms to the record's existing ones in `taxonomy`
    async fn add_taxonomy_terms(&self, id: RecordId, taxonomy: &str, terms: &[String]) -> anyhow::Result<()>;

    async fn set_primary_image(&self, id: RecordId, attachment: RecordId) -> anyhow::Result<()>;
}
