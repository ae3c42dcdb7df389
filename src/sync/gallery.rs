// SPDX-License-Identifier: GPL-3.0-only
//! Position-aware reconciliation of an ad's photos with the record's attachments.
use anyhow::Context;
use std::collections::BTreeMap;
use tracing::debug;

use crate::adapter::ThemeAdapter;
use crate::catalog::Ad;
use crate::photos::naming::{attachment_name, parse_position};
use crate::photos::reformat::{reformat, sniff_mime};
use crate::photos::{PhotoFetcher, PhotoFormat};
use crate::store::{Attachment, AttachmentDraft, AttachmentUpdate, LocalStore, RecordId};

/// One marker per handled attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoAction {
    /// Kept as is
    Valid,
    /// Content refreshed in place
    Updated,
    /// Imported as a new attachment
    New,
    /// Deleted as stale
    Deleted,
}

impl PhotoAction {
    pub fn marker(&self) -> char {
        match self {
            Self::Valid => 'V',
            Self::Updated => 'U',
            Self::New => 'N',
            Self::Deleted => 'D',
        }
    }
}

#[derive(Debug, Default)]
pub struct GalleryReport {
    pub actions: Vec<PhotoAction>,
}

impl GalleryReport {
    pub fn markers(&self) -> String {
        self.actions.iter().map(PhotoAction::marker).collect()
    }

    pub fn count(&self, action: PhotoAction) -> usize {
        self.actions.iter().filter(|a| **a == action).count()
    }
}

pub struct Gallery<'a> {
    pub store: &'a dyn LocalStore,
    pub fetcher: &'a dyn PhotoFetcher,
    pub adapter: &'a dyn ThemeAdapter,
    /// Re-encoding applied to downloads, if any
    pub format: Option<PhotoFormat>,
}

impl Gallery<'_> {
    /// Bring the attachments of `record_id` in line with `ad.photos`.
    /// Stale attachments are only cleaned up on records that already existed.
    pub async fn reconcile(&self, ad: &Ad, record_id: RecordId, is_new: bool) -> anyhow::Result<GalleryReport> {
        let mut attachments = self.store.find_attachments(record_id).await?;
        attachments.sort_by_key(|attachment| attachment.id);

        let mut current: BTreeMap<usize, Attachment> = BTreeMap::new();
        let mut duplicates = Vec::new();
        for attachment in attachments {
            let Some(position) = parse_position(&attachment.name, &ad.id) else {
                continue;
            };
            if current.contains_key(&position) {
                duplicates.push(attachment);
            } else {
                current.insert(position, attachment);
            }
        }

        let mut report = GalleryReport::default();

        for (position, photo) in ad.photos.iter().enumerate() {
            let existing = current.remove(&position);

            if let Some(attachment) = &existing {
                if attachment.modified_at.timestamp() > photo.embedded_timestamp() {
                    if attachment.position != position as i64 {
                        let update = AttachmentUpdate {
                            position: Some(position as i64),
                            ..Default::default()
                        };
                        self.store.update_attachment(attachment.id, update).await?;
                    }
                    report.actions.push(PhotoAction::Valid);
                    continue;
                }
            }

            let url = photo.source_url();
            let mut content = self
                .fetcher
                .fetch(&url)
                .await
                .with_context(|| format!("Failed to download photo {}", url))?;
            if let Some(format) = self.format {
                content = reformat(content, format)
                    .await
                    .with_context(|| format!("Failed to reformat photo {}", url))?;
            }
            let title = photo
                .description
                .as_deref()
                .map(str::trim)
                .filter(|desc| !desc.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("photo {}", position));

            match existing {
                Some(attachment) => {
                    let update = AttachmentUpdate {
                        title: Some(title),
                        position: Some(position as i64),
                        mime_type: Some(sniff_mime(&content).to_string()),
                        content: Some(content),
                    };
                    self.store.update_attachment(attachment.id, update).await?;
                    report.actions.push(PhotoAction::Updated);
                }
                None => {
                    let draft = AttachmentDraft {
                        parent_id: record_id,
                        name: attachment_name(&ad.id, position),
                        title,
                        position: position as i64,
                        mime_type: sniff_mime(&content).to_string(),
                        content,
                    };
                    let attachment_id = self.store.create_attachment(draft).await?;
                    if position == 0 {
                        self.store.set_primary_image(record_id, attachment_id).await?;
                    }
                    self.adapter
                        .on_photo_imported(self.store, record_id, attachment_id)
                        .await?;
                    report.actions.push(PhotoAction::New);
                }
            }
        }

        if !is_new {
            for attachment in current.into_values().chain(duplicates) {
                debug!(attachment = attachment.id, name = %attachment.name, "Deleting stale photo");
                self.store.delete_attachment(attachment.id).await?;
                report.actions.push(PhotoAction::Deleted);
            }
        }

        Ok(report)
    }
}
