// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;

use crate::adapter::ThemeAdapter;
use crate::catalog::RemoteCatalog;
use crate::config::Config;
use crate::lock::SyncLock;
use crate::photos::PhotoFetcher;
use crate::runlog::RunLogStore;
use crate::store::LocalStore;

/// Collaborators of a sync run, injected so that every one of them can be
/// replaced in tests
#[derive(Clone)]
pub struct SyncContext {
    pub config: Arc<Config>,
    pub catalog: Arc<dyn RemoteCatalog>,
    pub store: Arc<dyn LocalStore>,
    pub lock: Arc<dyn SyncLock>,
    pub run_logs: Arc<dyn RunLogStore>,
    pub photos: Arc<dyn PhotoFetcher>,
    pub adapter: Arc<dyn ThemeAdapter>,
}
