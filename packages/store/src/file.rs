//! Bulk read of case records from a JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use corruption_watch_case_models::CaseRecord;

use crate::{CaseStore, StoreError, Subscription};

/// Reads a JSON array of case rows from disk. Rows may use either the
/// camelCase field names or the backend's column names.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this store reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CaseStore for JsonFileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_all(&self) -> Result<Vec<CaseRecord>, StoreError> {
        log::info!("Reading case records from {}", self.path.display());
        let body = tokio::fs::read_to_string(&self.path).await?;
        let cases: Vec<CaseRecord> = serde_json::from_str(&body)?;
        log::info!("Read {} case record(s)", cases.len());
        Ok(cases)
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        Err(StoreError::Subscription {
            reason: format!("{} has no live update channel", self.path.display()),
        })
    }
}
