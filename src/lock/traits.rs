// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

/// Advisory, TTL-bound mutual exclusion between sync runs
#[async_trait]
pub trait SyncLock: Send + Sync {
    /// Take the lock for `holder`, or push back its expiry when `holder` already
    /// owns it. Returns false while another holder's lock is unexpired.
    async fn acquire(&self, holder: &str) -> anyhow::Result<bool>;

    /// Drop the lock if `holder` owns it (or if it has expired)
    async fn release(&self, holder: &str) -> anyhow::Result<()>;

    async fn is_held(&self) -> anyhow::Result<bool>;
}
