// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    /// Download the content behind `url`
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}
