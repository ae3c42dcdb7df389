// SPDX-License-Identifier: GPL-3.0-only
//! In-memory collaborators and builders shared by the unit tests
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::adapter::ThemeAdapter;
use crate::catalog::decode::decode_page;
use crate::catalog::{Ad, CatalogError, PageQuery, PageResult, RemoteCatalog};
use crate::config::ApiFormat;
use crate::config::Config;
use crate::lock::SyncLock;
use crate::photos::PhotoFetcher;
use crate::runlog::{RunLog, RunLogStore};
use crate::store::{
    Attachment, AttachmentDraft, AttachmentUpdate, FieldValue, LocalRecord, LocalStore, RecordDraft,
    RecordId, RecordStatus, EXTERNAL_ID_FIELD,
};
use crate::sync::{ReconciliationEngine, SyncContext};

/// Builds catalog ads through their JSON form, the way the client receives them
pub struct AdBuilder {
    fields: Map<String, Value>,
    extras: Map<String, Value>,
    photos: Vec<Value>,
}

impl AdBuilder {
    /// A house for sale in Lyon, created and last modified a day ago
    pub fn new(id: &str) -> Self {
        let yesterday = (Utc::now() - Duration::days(1)).timestamp();
        let ad = json!({
            "id": id,
            "ref": format!("REF-{}", id),
            "transaction_type": "Vente",
            "text": format!("Description of ad {}", id),
            "stats": { "created": yesterday, "modified": yesterday },
            "localization": { "city": "Lyon" },
            "type": { "name": "Maison", "category": "Maison" },
        });

        let Value::Object(fields) = ad else {
            unreachable!("ad literal is an object")
        };
        Self {
            fields,
            extras: Map::new(),
            photos: Vec::new(),
        }
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn reference(self, reference: &str) -> Self {
        self.set("ref", json!(reference))
    }

    pub fn transaction(self, label: &str) -> Self {
        self.set("transaction_type", json!(label))
    }

    pub fn mandate(self, mandate: &str) -> Self {
        self.set("mandate", json!(mandate))
    }

    pub fn text(self, text: &str) -> Self {
        self.set("text", json!(text))
    }

    pub fn price(self, price: f64) -> Self {
        self.set("price", json!(price))
    }

    pub fn surface(self, surface: f64) -> Self {
        self.set("surface", json!(surface))
    }

    pub fn category(self, category: &str, name: &str) -> Self {
        self.set("type", json!({ "name": name, "category": category }))
    }

    pub fn address(self, street: &str, zip_code: &str, city: &str) -> Self {
        self.set(
            "localization",
            json!({ "address": street, "zip_code": zip_code, "city": city }),
        )
    }

    pub fn contact(self, phone: &str, mail: &str) -> Self {
        self.set("contact", json!({ "phone": phone, "mail": mail }))
    }

    pub fn modified(self, modified: DateTime<Utc>) -> Self {
        let created = self.fields["stats"]["created"].clone();
        self.set(
            "stats",
            json!({ "created": created, "modified": modified.timestamp() }),
        )
    }

    pub fn extra(mut self, code: &str, name: &str, display: bool, value: Value) -> Self {
        self.extras.insert(
            code.to_string(),
            json!({ "name": name, "display": display, "value": value }),
        );
        self
    }

    pub fn photo(mut self, url: &str) -> Self {
        self.photos.push(json!({ "url": url }));
        self
    }

    /// Wire form of the ad, as found in a catalog page
    pub fn json(mut self) -> Value {
        self.fields.insert("extras".to_string(), Value::Object(self.extras));
        self.fields.insert("photos".to_string(), Value::Array(self.photos));
        Value::Object(self.fields)
    }

    pub fn build(self) -> Ad {
        serde_json::from_value(self.json()).expect("valid test ad")
    }
}

#[derive(Default)]
struct MemoryState {
    next_id: RecordId,
    records: BTreeMap<RecordId, LocalRecord>,
    attachments: BTreeMap<RecordId, Attachment>,
    terms: HashMap<(RecordId, String), Vec<String>>,
    primary_images: HashMap<RecordId, RecordId>,
    writes: usize,
}

impl MemoryState {
    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    fn record_mut(&mut self, id: RecordId) -> anyhow::Result<&mut LocalRecord> {
        self.records
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("Record {} does not exist", id))
    }

    fn touch(&mut self, id: RecordId) -> anyhow::Result<()> {
        self.record_mut(id)?.modified_at = Utc::now();
        Ok(())
    }
}

/// `LocalStore` kept in memory, counting every write it receives
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    unreadable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a published record carrying `external_id`; not counted as a write
    pub fn insert_record(&self, record_type: &str, external_id: &str, modified_at: DateTime<Utc>) -> RecordId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id();
        let mut custom_fields = BTreeMap::new();
        custom_fields.insert(EXTERNAL_ID_FIELD.to_string(), vec![external_id.to_string()]);
        state.records.insert(
            id,
            LocalRecord {
                id,
                record_type: record_type.to_string(),
                title: String::new(),
                slug: String::new(),
                content: String::new(),
                status: RecordStatus::Published,
                created_at: modified_at,
                modified_at,
                author_id: None,
                custom_fields,
            },
        );
        id
    }

    pub fn set_status(&self, id: RecordId, status: RecordStatus) {
        let mut state = self.state.lock().unwrap();
        state.records.get_mut(&id).unwrap().status = status;
    }

    pub fn set_field(&self, id: RecordId, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .records
            .get_mut(&id)
            .unwrap()
            .custom_fields
            .insert(key.to_string(), vec![value.to_string()]);
    }

    pub fn insert_attachment(
        &self,
        parent_id: RecordId,
        name: &str,
        position: i64,
        modified_at: DateTime<Utc>,
    ) -> RecordId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id();
        state.attachments.insert(
            id,
            Attachment {
                id,
                parent_id,
                name: name.to_string(),
                title: name.to_string(),
                position,
                mime_type: "image/jpeg".to_string(),
                location: format!("memory://{}", name),
                modified_at,
            },
        );
        id
    }

    pub fn record(&self, id: RecordId) -> Option<LocalRecord> {
        self.state.lock().unwrap().records.get(&id).cloned()
    }

    pub fn find_external(&self, external_id: &str) -> Option<LocalRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .values()
            .find(|record| record.external_id() == Some(external_id))
            .cloned()
    }

    pub fn records_of(&self, record_type: &str) -> Vec<LocalRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .values()
            .filter(|record| record.record_type == record_type)
            .cloned()
            .collect()
    }

    pub fn attachments(&self, parent_id: RecordId) -> Vec<Attachment> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .values()
            .filter(|attachment| attachment.parent_id == parent_id)
            .cloned()
            .collect()
    }

    pub fn terms(&self, id: RecordId, taxonomy: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .terms
            .get(&(id, taxonomy.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn primary_image(&self, id: RecordId) -> Option<RecordId> {
        self.state.lock().unwrap().primary_images.get(&id).copied()
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn reset_writes(&self) {
        self.state.lock().unwrap().writes = 0;
    }

    /// Make record lookups fail while set
    pub fn set_unreadable(&self, unreadable: bool) {
        self.unreadable.store(unreadable, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn find_by_type(&self, record_type: &str, statuses: &[RecordStatus]) -> anyhow::Result<Vec<LocalRecord>> {
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("database is locked")
                .context(format!("Failed to list {} records", record_type)));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .records
            .values()
            .filter(|record| record.record_type == record_type && statuses.contains(&record.status))
            .cloned()
            .collect())
    }

    async fn find_attachments(&self, parent: RecordId) -> anyhow::Result<Vec<Attachment>> {
        Ok(self.attachments(parent))
    }

    async fn create(&self, draft: &RecordDraft) -> anyhow::Result<RecordId> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        let id = state.allocate_id();
        state.records.insert(
            id,
            LocalRecord {
                id,
                record_type: draft.record_type.clone(),
                title: draft.title.clone(),
                slug: draft.slug.clone(),
                content: draft.content.clone(),
                status: draft.status,
                created_at: draft.created_at,
                modified_at: Utc::now(),
                author_id: draft.author_id,
                custom_fields: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: RecordId, draft: &RecordDraft) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        let record = state.record_mut(id)?;
        record.record_type = draft.record_type.clone();
        record.title = draft.title.clone();
        record.slug = draft.slug.clone();
        record.content = draft.content.clone();
        record.status = draft.status;
        record.created_at = draft.created_at;
        record.author_id = draft.author_id.or(record.author_id);
        record.modified_at = Utc::now();
        Ok(())
    }

    async fn trash(&self, id: RecordId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        let record = state.record_mut(id)?;
        record.status = RecordStatus::Trashed;
        record.modified_at = Utc::now();
        Ok(())
    }

    async fn set_custom_field(&self, id: RecordId, key: &str, value: &FieldValue) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state
            .record_mut(id)?
            .custom_fields
            .insert(key.to_string(), vec![value.to_string()]);
        Ok(())
    }

    async fn add_custom_field(&self, id: RecordId, key: &str, value: &FieldValue) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state
            .record_mut(id)?
            .custom_fields
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn remove_custom_field(&self, id: RecordId, key: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state.record_mut(id)?.custom_fields.remove(key);
        Ok(())
    }

    async fn create_attachment(&self, draft: AttachmentDraft) -> anyhow::Result<RecordId> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;

        let mut name = draft.name.clone();
        let mut suffix = 2;
        while state.attachments.values().any(|a| a.name == name) {
            name = format!("{}-{}", draft.name, suffix);
            suffix += 1;
        }

        let id = state.allocate_id();
        state.attachments.insert(
            id,
            Attachment {
                id,
                parent_id: draft.parent_id,
                location: format!("memory://{}", name),
                name,
                title: draft.title,
                position: draft.position,
                mime_type: draft.mime_type,
                modified_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_attachment(&self, id: RecordId, update: AttachmentUpdate) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        let attachment = state
            .attachments
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("Attachment {} does not exist", id))?;
        if let Some(title) = update.title {
            attachment.title = title;
        }
        if let Some(position) = update.position {
            attachment.position = position;
        }
        if let Some(mime_type) = update.mime_type {
            attachment.mime_type = mime_type;
        }
        attachment.modified_at = Utc::now();
        Ok(())
    }

    async fn delete_attachment(&self, id: RecordId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state.attachments.remove(&id);
        state.primary_images.retain(|_, attachment| *attachment != id);
        Ok(())
    }

    async fn set_taxonomy_terms(&self, id: RecordId, taxonomy: &str, terms: &[String]) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state.touch(id)?;
        state.terms.insert((id, taxonomy.to_string()), terms.to_vec());
        Ok(())
    }

    async fn add_taxonomy_terms(&self, id: RecordId, taxonomy: &str, terms: &[String]) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state.touch(id)?;
        let current = state.terms.entry((id, taxonomy.to_string())).or_default();
        for term in terms {
            if !current.contains(term) {
                current.push(term.clone());
            }
        }
        Ok(())
    }

    async fn set_primary_image(&self, id: RecordId, attachment: RecordId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state.primary_images.insert(id, attachment);
        Ok(())
    }
}

/// Serves a fixed list of ads page by page and records every query
#[derive(Default)]
pub struct ScriptedCatalog {
    ads: Mutex<Vec<Ad>>,
    queries: Mutex<Vec<PageQuery>>,
    fail_at: Mutex<Option<usize>>,
    hang: AtomicBool,
    raw_page: Mutex<Option<String>>,
}

impl ScriptedCatalog {
    pub fn set_ads(&self, ads: Vec<Ad>) {
        *self.ads.lock().unwrap() = ads;
    }

    /// Answer the page starting at `offset` with a transport error
    pub fn fail_at_offset(&self, offset: usize) {
        *self.fail_at.lock().unwrap() = Some(offset);
    }

    /// Serve this JSON body, through the real decoder, as the only page
    pub fn set_raw_page(&self, body: String) {
        *self.raw_page.lock().unwrap() = Some(body);
    }

    /// Never answer while set
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn queries(&self) -> Vec<PageQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteCatalog for ScriptedCatalog {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResult, CatalogError> {
        self.queries.lock().unwrap().push(query.clone());
        tokio::task::yield_now().await;

        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if *self.fail_at.lock().unwrap() == Some(query.offset) {
            return Err(CatalogError::Transport("connection reset".to_string()));
        }

        if let Some(body) = self.raw_page.lock().unwrap().as_deref() {
            return match query.offset {
                0 => decode_page(body, ApiFormat::Json, "jsonp"),
                _ => Ok(PageResult::default()),
            };
        }

        let ads = self.ads.lock().unwrap();
        let items: Vec<Ad> = ads.iter().skip(query.offset).take(query.limit).cloned().collect();
        Ok(PageResult {
            page_count: items.len(),
            total_count: ads.len(),
            items,
            rejected: Vec::new(),
        })
    }
}

/// Small but decodable PNG
pub fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 6, image::Rgb([30, 90, 160]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Answers every download with `sample_png`, optionally failing some urls
#[derive(Default)]
pub struct StubPhotoFetcher {
    requests: Mutex<Vec<String>>,
    fail_pattern: Mutex<Option<String>>,
    hang: AtomicBool,
}

impl StubPhotoFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let fetcher = Self::default();
        fetcher.fail_on("");
        fetcher
    }

    /// Fail downloads of urls containing `pattern`
    pub fn fail_on(&self, pattern: &str) {
        *self.fail_pattern.lock().unwrap() = Some(pattern.to_string());
    }

    /// Never finish a download while set
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoFetcher for StubPhotoFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(pattern) = self.fail_pattern.lock().unwrap().as_deref() {
            if url.contains(pattern) {
                anyhow::bail!("HTTP 404 for {}", url);
            }
        }
        Ok(sample_png())
    }
}

/// Run logs kept in memory, newest first
#[derive(Default)]
pub struct MemoryRunLogStore {
    logs: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl RunLogStore for MemoryRunLogStore {
    async fn persist(&self, log: &RunLog) -> anyhow::Result<()> {
        let mut logs = self.logs.lock().unwrap();
        let key = log.key();
        logs.retain(|(existing, _)| *existing != key);
        logs.insert(0, (key, log.lines().to_vec()));
        Ok(())
    }

    async fn history(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.logs.lock().unwrap().iter().map(|(key, _)| key.clone()).collect())
    }

    async fn load(&self, key: &str) -> anyhow::Result<Option<Vec<String>>> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, lines)| lines.clone()))
    }
}

/// Process-local `SyncLock` with the same expiry rules as the SQLite one
pub struct MemoryLock {
    ttl: std::time::Duration,
    owner: Mutex<Option<(String, Instant)>>,
}

impl MemoryLock {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl,
            owner: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SyncLock for MemoryLock {
    async fn acquire(&self, holder: &str) -> anyhow::Result<bool> {
        let mut owner = self.owner.lock().unwrap();
        let now = Instant::now();
        let free = match owner.as_ref() {
            None => true,
            Some((current, expires_at)) => current == holder || *expires_at <= now,
        };
        if free {
            *owner = Some((holder.to_string(), now + self.ttl));
        }
        Ok(free)
    }

    async fn release(&self, holder: &str) -> anyhow::Result<()> {
        let mut owner = self.owner.lock().unwrap();
        let releasable = owner
            .as_ref()
            .is_some_and(|(current, expires_at)| current == holder || *expires_at <= Instant::now());
        if releasable {
            *owner = None;
        }
        Ok(())
    }

    async fn is_held(&self) -> anyhow::Result<bool> {
        Ok(self
            .owner
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|(_, expires_at)| *expires_at > Instant::now()))
    }
}

pub fn create_test_config() -> Config {
    Config {
        api_key: Some("test-key".to_string()),
        log_level: "error".to_string(),
        ..Config::default()
    }
}

/// Every collaborator of a run, in memory
pub struct TestHarness {
    pub config: Config,
    pub catalog: Arc<ScriptedCatalog>,
    pub store: Arc<MemoryStore>,
    pub lock: Arc<MemoryLock>,
    pub run_logs: Arc<MemoryRunLogStore>,
    pub photos: Arc<StubPhotoFetcher>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_lock_ttl(std::time::Duration::from_secs(120))
    }

    pub fn with_lock_ttl(ttl: std::time::Duration) -> Self {
        Self {
            config: create_test_config(),
            catalog: Arc::new(ScriptedCatalog::default()),
            store: Arc::new(MemoryStore::new()),
            lock: Arc::new(MemoryLock::new(ttl)),
            run_logs: Arc::new(MemoryRunLogStore::default()),
            photos: Arc::new(StubPhotoFetcher::new()),
        }
    }

    pub fn context(&self, adapter: Arc<dyn ThemeAdapter>) -> SyncContext {
        SyncContext {
            config: Arc::new(self.config.clone()),
            catalog: self.catalog.clone(),
            store: self.store.clone(),
            lock: self.lock.clone(),
            run_logs: self.run_logs.clone(),
            photos: self.photos.clone(),
            adapter,
        }
    }

    pub fn engine(&self, adapter: Arc<dyn ThemeAdapter>) -> ReconciliationEngine {
        ReconciliationEngine::new(self.context(adapter)).unwrap()
    }
}
