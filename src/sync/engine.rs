// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{Ad, PageQuery};
use crate::photos::PhotoFormat;
use crate::runlog::RunLog;
use crate::store::{LocalRecord, RecordId, RecordStatus};
use crate::sync::context::SyncContext;
use crate::sync::error::SyncError;
use crate::sync::gallery::{Gallery, PhotoAction};
use crate::sync::mapping;
use crate::sync::state::{RunSummary, SyncState};

const PAGE_SORT: &str = "ad_id asc";

/// External id to record, over every indexed record type
type RecordIndex = BTreeMap<String, LocalRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Created,
    Updated,
    Skipped,
    Unsupported,
}

/// Mutable state of the run in progress
struct Run {
    holder: String,
    log: RunLog,
    summary: RunSummary,
}

impl Run {
    fn new() -> Self {
        let log = RunLog::new();
        let summary = RunSummary::new(log.key(), log.started_at());
        Self {
            holder: Uuid::new_v4().to_string(),
            log,
            summary,
        }
    }

    fn key(&self) -> &str {
        &self.summary.run
    }

    fn enter(&mut self, state: SyncState) {
        debug!(run = %self.summary.run, state = ?state, "Sync state");
        self.summary.state = state;
    }

    fn note(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!(run = %self.summary.run, "{}", line);
        self.log.push(line);
    }

    fn fail(&mut self, line: impl Into<String>) {
        let line = line.into();
        warn!(run = %self.summary.run, "{}", line);
        self.log.push(line);
    }

    fn finish(&mut self, state: SyncState) -> RunSummary {
        self.enter(state);
        self.summary.finished_at = Some(Utc::now());
        self.summary.clone()
    }
}

fn stamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Mirrors the remote catalog into the local store, one run at a time
pub struct ReconciliationEngine {
    ctx: SyncContext,
    photo_format: Option<PhotoFormat>,
    skew: Duration,
    last_run: RwLock<Option<RunSummary>>,
}

impl ReconciliationEngine {
    pub fn new(ctx: SyncContext) -> anyhow::Result<Self> {
        let photo_format = if ctx.adapter.supports_photo_reformat() {
            Some(ctx.config.photo_format()?)
        } else {
            None
        };
        let skew = ctx
            .config
            .timestamp_skew_secs
            .map(Duration::seconds)
            .unwrap_or_else(|| ctx.adapter.timestamp_skew());

        Ok(Self {
            ctx,
            photo_format,
            skew,
            last_run: RwLock::new(None),
        })
    }

    pub fn adapter_name(&self) -> &'static str {
        self.ctx.adapter.name()
    }

    /// Whether some run currently holds the sync lock
    pub async fn is_running(&self) -> anyhow::Result<bool> {
        self.ctx.lock.is_held().await
    }

    pub async fn last_run(&self) -> Option<RunSummary> {
        self.last_run.read().await.clone()
    }

    /// Run one full reconciliation.
    ///
    /// Errors are only returned when the run could not start (bad configuration,
    /// lock held elsewhere). A run that fails midway ends in the `Aborted` state
    /// and is reported through the summary.
    pub async fn run_sync(&self) -> Result<RunSummary, SyncError> {
        let mut run = Run::new();
        run.enter(SyncState::Initializing);
        info!(run = %run.key(), adapter = self.adapter_name(), "Starting sync");

        if let Err(e) = self.check_configuration() {
            run.fail(format!("Fatal Error : {}", e));
            return Err(self.abort_before_start(run, e).await);
        }

        match self.ctx.lock.acquire(&run.holder).await {
            Ok(true) => {}
            Ok(false) => {
                info!(run = %run.key(), "Another sync holds the lock, not starting");
                return Err(SyncError::AlreadyRunning);
            }
            Err(e) => {
                let e = SyncError::Store(e);
                run.fail(format!("Fatal Error : {}", e));
                return Err(self.abort_before_start(run, e).await);
            }
        }

        let outcome = self.reconcile(&mut run).await;

        run.enter(SyncState::Finalizing);
        if let Err(e) = &outcome {
            error!(run = %run.key(), error = ?e, "Sync aborted");
            run.fail(format!("Fatal Error : {}", e.report()));
            run.summary.error = Some(e.to_string());
        }
        if let Err(e) = self.ctx.lock.release(&run.holder).await {
            warn!(run = %run.key(), error = %e, "Failed to release sync lock");
        }
        self.persist_log(&run).await;

        let summary = run.finish(if outcome.is_ok() {
            SyncState::Done
        } else {
            SyncState::Aborted
        });
        info!(
            run = %summary.run,
            state = ?summary.state,
            processed = summary.processed,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            trashed = summary.trashed,
            "Sync finished"
        );

        *self.last_run.write().await = Some(summary.clone());
        Ok(summary)
    }

    fn check_configuration(&self) -> Result<(), SyncError> {
        if self.ctx.config.credential().is_none() {
            return Err(SyncError::Configuration("Api Key is empty".to_string()));
        }

        let record_types = self.ctx.adapter.indexed_record_types();
        if record_types.is_empty() || record_types.iter().any(|t| t.trim().is_empty()) {
            return Err(SyncError::Configuration(format!(
                "Could not guess the record type of the {} theme",
                self.adapter_name()
            )));
        }

        Ok(())
    }

    async fn abort_before_start(&self, mut run: Run, err: SyncError) -> SyncError {
        run.summary.error = Some(err.to_string());
        self.persist_log(&run).await;
        let summary = run.finish(SyncState::Aborted);
        *self.last_run.write().await = Some(summary);
        err
    }

    async fn persist_log(&self, run: &Run) {
        if let Err(e) = self.ctx.run_logs.persist(&run.log).await {
            error!(run = %run.key(), error = %e, "Failed to persist run log");
        }
    }

    /// Push back the lock expiry; a run never stops because of this
    async fn refresh_lock(&self, run: &Run) {
        match self.ctx.lock.acquire(&run.holder).await {
            Ok(true) => {}
            Ok(false) => warn!(run = %run.key(), "Sync lock was taken over by another run"),
            Err(e) => warn!(run = %run.key(), error = %e, "Failed to refresh sync lock"),
        }
    }

    async fn reconcile(&self, run: &mut Run) -> Result<(), SyncError> {
        run.enter(SyncState::Indexing);
        let index = self.build_index(run).await?;
        self.refresh_lock(run).await;

        let mut seen = HashSet::new();
        let complete = self.paginate(run, &index, &mut seen).await;

        run.enter(SyncState::Trashing);
        if complete {
            self.trash_unseen(run, &index, &seen).await;
        } else {
            run.fail("Catalog listing incomplete, no property moved to trash");
        }

        Ok(())
    }

    async fn build_index(&self, run: &mut Run) -> Result<RecordIndex, SyncError> {
        let mut index = RecordIndex::new();

        for record_type in self.ctx.adapter.indexed_record_types() {
            let records = self
                .ctx
                .store
                .find_by_type(&record_type, &RecordStatus::ALL)
                .await?;

            for record in records {
                let Some(external_id) = record.external_id().map(str::to_string) else {
                    debug!(record = record.id, "Ignoring record without external id");
                    continue;
                };
                if let Some(shadowed) = index.insert(external_id.clone(), record) {
                    debug!(record = shadowed.id, external_id = %external_id, "Duplicate external id");
                }
            }
        }

        run.note(format!("{} local property(ies) indexed", index.len()));
        Ok(index)
    }

    /// Walk the catalog page by page. Returns false when a page could not be
    /// fetched, in which case the set of seen records is incomplete.
    async fn paginate(&self, run: &mut Run, index: &RecordIndex, seen: &mut HashSet<RecordId>) -> bool {
        let transaction: Vec<String> = self
            .ctx
            .adapter
            .transaction_filter()
            .iter()
            .map(|code| code.to_string())
            .collect();
        let mut offset = 0;

        loop {
            run.enter(SyncState::Paginating { offset });
            let query = PageQuery {
                transaction: transaction.clone(),
                sort: PAGE_SORT.to_string(),
                offset,
                limit: self.ctx.config.page_limit,
            };

            let page = match self.ctx.catalog.fetch_page(&query).await {
                Ok(page) => page,
                Err(e) => {
                    run.fail(format!("Error : {}", e));
                    return false;
                }
            };

            for rejected in &page.rejected {
                run.fail(format!("Error : skipped undecodable ad {}", rejected));
                run.summary.failed += 1;
                // Still listed upstream, so its record must survive the trashing pass
                if let Some(record) = rejected.id.as_ref().and_then(|id| index.get(id)) {
                    seen.insert(record.id);
                }
            }
            if page.is_empty() {
                return true;
            }

            run.enter(SyncState::PerItem);
            for ad in &page.items {
                self.refresh_lock(run).await;
                run.summary.processed += 1;
                run.note(format!(
                    " === [{}/{}] : Ad: {} mandat {} (ref {}) ===",
                    run.summary.processed,
                    page.total_count,
                    ad.id,
                    ad.mandate.as_deref().unwrap_or("-"),
                    ad.reference
                ));

                match self.sync_ad(run, ad, index, seen).await {
                    Ok(ItemOutcome::Created) => run.summary.created += 1,
                    Ok(ItemOutcome::Updated) => run.summary.updated += 1,
                    Ok(ItemOutcome::Skipped) => run.summary.skipped += 1,
                    Ok(ItemOutcome::Unsupported) => run.summary.unsupported += 1,
                    Err(e) => {
                        run.summary.failed += 1;
                        run.fail(format!("Error : {}", e));
                    }
                }
            }

            offset += page.page_count.max(page.items.len() + page.rejected.len());
            if offset >= page.total_count {
                return true;
            }
        }
    }

    async fn sync_ad(
        &self,
        run: &mut Run,
        ad: &Ad,
        index: &RecordIndex,
        seen: &mut HashSet<RecordId>,
    ) -> Result<ItemOutcome, SyncError> {
        let adapter = self.ctx.adapter.as_ref();
        let store = self.ctx.store.as_ref();

        let Some(record_type) = adapter.target_record_type(ad) else {
            run.note(format!("Unsupported transaction type : {}", ad.transaction_type));
            return Ok(ItemOutcome::Unsupported);
        };

        let existing = index.get(&ad.id);
        if let Some(record) = existing {
            seen.insert(record.id);

            let remote = ad.stats.modified + self.skew;
            if record.modified_at >= remote {
                run.note(format!(
                    "Up to date (local {} >= remote {})",
                    stamp(record.modified_at),
                    stamp(remote)
                ));
                return Ok(ItemOutcome::Skipped);
            }
            run.note(format!(
                "Outdated (local {} < remote {})",
                stamp(record.modified_at),
                stamp(remote)
            ));
        }

        let item_error = |e: anyhow::Error| SyncError::item(&ad.id, e);

        let draft = mapping::record_draft(ad, &record_type);
        let record_id = match existing {
            Some(record) => {
                store.update(record.id, &draft).await.map_err(item_error)?;
                record.id
            }
            None => store.create(&draft).await.map_err(item_error)?,
        };

        let metas = adapter.map_extra_fields(mapping::base_metas(ad), ad, record_id);
        mapping::apply_metas(store, record_id, &metas)
            .await
            .map_err(item_error)?;
        adapter
            .on_record_saved(store, record_id, ad, &metas)
            .await
            .map_err(item_error)?;

        let gallery = Gallery {
            store,
            fetcher: self.ctx.photos.as_ref(),
            adapter,
            format: self.photo_format,
        };
        let report = gallery
            .reconcile(ad, record_id, existing.is_none())
            .await
            .map_err(item_error)?;
        debug!(
            external_id = %ad.id,
            kept = report.count(PhotoAction::Valid),
            refreshed = report.count(PhotoAction::Updated),
            imported = report.count(PhotoAction::New),
            deleted = report.count(PhotoAction::Deleted),
            "Photos reconciled"
        );
        run.note(format!("{} photo(s) : {}", ad.photos.len(), report.markers()));

        mapping::assign_taxonomies(store, adapter, record_id, ad)
            .await
            .map_err(item_error)?;

        if existing.is_some() {
            run.note(format!("Updated {} {}", record_type, record_id));
            Ok(ItemOutcome::Updated)
        } else {
            run.note(format!("Created {} {}", record_type, record_id));
            Ok(ItemOutcome::Created)
        }
    }

    async fn trash_unseen(&self, run: &mut Run, index: &RecordIndex, seen: &HashSet<RecordId>) {
        let obsolete: Vec<(&String, &LocalRecord)> = index
            .iter()
            .filter(|(_, record)| !seen.contains(&record.id) && record.status != RecordStatus::Trashed)
            .collect();

        let mut trashed = 0;
        for (external_id, record) in obsolete {
            self.refresh_lock(run).await;
            match self.ctx.store.trash(record.id).await {
                Ok(()) => {
                    trashed += 1;
                    debug!(record = record.id, external_id = %external_id, "Moved record to trash");
                }
                Err(e) => {
                    run.summary.failed += 1;
                    run.fail(format!("Error : could not trash property {}: {:#}", record.id, e));
                }
            }
        }

        run.summary.trashed = trashed;
        if trashed == 0 {
            run.note("No property deleted.");
        } else {
            run.note(format!("Moved {} property(ies) to trash", trashed));
        }
    }
}
