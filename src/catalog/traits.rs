// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::fmt;

use crate::catalog::error::CatalogError;
use crate::catalog::models::Ad;

/// Parameters of one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Transaction type codes, sent comma-joined
    pub transaction: Vec<String>,
    /// Sort order, e.g. "ad_id asc"
    pub sort: String,
    pub offset: usize,
    pub limit: usize,
}

impl PageQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("transaction", self.transaction.join(",")),
            ("sort", self.sort.clone()),
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageResult {
    /// Ads that decoded successfully
    pub items: Vec<Ad>,
    /// Number of results the remote returned for this page
    pub page_count: usize,
    /// Number of results across all pages
    pub total_count: usize,
    /// Results that could not be decoded
    pub rejected: Vec<RejectedAd>,
}

/// A result of the page that did not decode as an ad
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedAd {
    /// External id, when the raw result still carried a readable one
    pub id: Option<String>,
    pub reason: String,
}

impl fmt::Display for RejectedAd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}: {}", id, self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

impl PageResult {
    pub fn is_empty(&self) -> bool {
        self.page_count == 0 && self.items.is_empty()
    }
}

#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Fetch one page of ads. Pagination is driven by the caller.
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResult, CatalogError>;
}
