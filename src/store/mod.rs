// SPDX-License-Identifier: GPL-3.0-only
pub mod kv;
pub mod models;
pub mod sqlite;
pub mod traits;

pub use models::{
    Attachment, AttachmentDraft, AttachmentUpdate, FieldValue, LocalRecord, Metas, RecordDraft,
    RecordId, RecordStatus, EXTERNAL_ID_FIELD,
};
pub use sqlite::SqliteStore;
pub use traits::LocalStore;
