// SPDX-License-Identifier: GPL-3.0-only
use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("The sync is already running, try again in a moment")]
    AlreadyRunning,

    #[error("No theme adapter is compatible with this site")]
    NoCompatibleAdapter,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Failure confined to a single ad; the run goes on
    #[error("Ad {external_id}: {message}")]
    Item { external_id: String, message: String },

    #[error("Storage error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Message with every underlying cause, and the backtrace when one was captured
    pub fn report(&self) -> String {
        match self {
            Self::Store(err) => format!("Storage error: {:?}", err),
            other => other.to_string(),
        }
    }

    pub fn item(external_id: &str, err: anyhow::Error) -> Self {
        Self::Item {
            external_id: external_id.to_string(),
            message: format!("{:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_report_keeps_causes() {
        let err = SyncError::Store(anyhow::anyhow!("disk full").context("Failed to trash record 4"));

        let report = err.report();
        assert!(report.starts_with("Storage error: Failed to trash record 4"));
        assert!(report.contains("Caused by"));
        assert!(report.contains("disk full"));

        assert_eq!(
            SyncError::Internal("scheduled run panicked".to_string()).report(),
            "Internal error: scheduled run panicked"
        );
    }
}
