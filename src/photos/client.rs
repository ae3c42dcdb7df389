// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::photos::traits::PhotoFetcher;

pub struct HttpPhotoFetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpPhotoFetcher {
    pub fn new(timeout: Duration, max_retries: u32) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("estate-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_retries: max_retries.max(1),
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Base of the exponential backoff between attempts
    #[cfg(test)]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    async fn fetch_once(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;

        let content = response.bytes().await?;
        if content.is_empty() {
            anyhow::bail!("Empty response body");
        }
        Ok(content.to_vec())
    }
}

#[async_trait]
impl PhotoFetcher for HttpPhotoFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.fetch_once(url).await {
                Ok(content) => {
                    if attempt > 1 {
                        info!(url = %url, attempt, "Photo download succeeded after retry");
                    }
                    debug!(url = %url, bytes = content.len(), "Downloaded photo");
                    return Ok(content);
                }
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "Photo download attempt failed");
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.retry_delay * 2_u32.pow(attempt - 1)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("Photo download failed after {} attempts", self.max_retries)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(max_retries: u32) -> HttpPhotoFetcher {
        HttpPhotoFetcher::new(Duration::from_secs(5), max_retries)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/9099042/0/original/1394097932")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(vec![0xFF, 0xD8, 0xFF, 0xE0])
            .create_async()
            .await;

        let url = format!("{}/9099042/0/original/1394097932", server.url());
        let content = fetcher(3).fetch(&url).await.unwrap();
        assert_eq!(content, vec![0xFF, 0xD8, 0xFF, 0xE0]);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_retries_then_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(3)
            .create_async()
            .await;

        let url = format!("{}/missing", server.url());
        assert!(fetcher(3).fetch(&url).await.is_err());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/empty")
            .with_status(200)
            .create_async()
            .await;

        let url = format!("{}/empty", server.url());
        assert!(fetcher(1).fetch(&url).await.is_err());

        mock.assert_async().await;
    }
}
