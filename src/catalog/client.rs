// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::catalog::decode;
use crate::catalog::error::CatalogError;
use crate::catalog::traits::{PageQuery, PageResult, RemoteCatalog};
use crate::config::{ApiFormat, Config};

/// Client of the listings REST API
#[derive(Debug, Clone)]
pub struct LsiCatalogClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    format: ApiFormat,
    jsonp_callback: String,
}

impl LsiCatalogClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        format: ApiFormat,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("estate-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            format,
            jsonp_callback: String::from("jsonp"),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut client = Self::new(
            config.api_url.clone(),
            config.credential().map(str::to_string),
            config.api_format,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        client.jsonp_callback = config.jsonp_callback.clone();
        Ok(client)
    }

    fn build_url(&self, resource: &str, query: &PageQuery) -> Result<Url, CatalogError> {
        let endpoint = format!("{}/{}", self.base_url.trim_end_matches('/'), resource);

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(ref key) = self.api_key {
            params.push(("key", key.clone()));
        }
        params.push((
            "format",
            match self.format {
                ApiFormat::Json => "json".to_string(),
                ApiFormat::Jsonp => "jsonp".to_string(),
            },
        ));
        if self.format == ApiFormat::Jsonp {
            params.push(("jsonp", self.jsonp_callback.clone()));
        }
        params.extend(query.params());

        Url::parse_with_params(&endpoint, &params)
            .map_err(|e| CatalogError::Transport(format!("Invalid catalog url {}: {}", endpoint, e)))
    }
}

#[async_trait]
impl RemoteCatalog for LsiCatalogClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResult, CatalogError> {
        let url = self.build_url("ads", query)?;
        debug!(offset = query.offset, limit = query.limit, "Fetching catalog page");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            warn!(status = %status, "Catalog request failed");
            return Err(
                match decode::error_message(&body, self.format, &self.jsonp_callback) {
                    Some(message) => CatalogError::Remote {
                        code: status.as_u16(),
                        message,
                    },
                    None => CatalogError::Transport(format!("Error code {}", status.as_u16())),
                },
            );
        }

        let page = decode::decode_page(&body, self.format, &self.jsonp_callback)?;
        debug!(
            returned = page.page_count,
            total = page.total_count,
            "Fetched catalog page"
        );
        Ok(page)
    }
}
