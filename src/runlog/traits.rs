// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

use crate::runlog::models::RunLog;

#[async_trait]
pub trait RunLogStore: Send + Sync {
    /// Store a finished run's log and index it in the bounded history
    async fn persist(&self, log: &RunLog) -> anyhow::Result<()>;

    /// Keys of the most recent runs, newest first
    async fn history(&self) -> anyhow::Result<Vec<String>>;

    /// Lines of one run; `None` once its retention window has passed
    async fn load(&self, key: &str) -> anyhow::Result<Option<Vec<String>>>;
}
