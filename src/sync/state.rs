// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Stage a run is in. A run only moves forward; `Done` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "stage")]
pub enum SyncState {
    Idle,
    Initializing,
    Indexing,
    Paginating { offset: usize },
    PerItem,
    Trashing,
    Finalizing,
    Done,
    Aborted,
}

/// Outcome of one run, as returned to the caller and exposed by the local API
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run log key
    pub run: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: SyncState,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub trashed: usize,
    /// Set when the run was aborted
    pub error: Option<String>,
}

impl RunSummary {
    pub fn new(run: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run,
            started_at,
            finished_at: None,
            state: SyncState::Idle,
            processed: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            unsupported: 0,
            failed: 0,
            trashed: 0,
            error: None,
        }
    }
}
