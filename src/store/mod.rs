/// Share store
///
/// The remote record store holding share links. Two backends:
/// - `rest.rs`: hosted PostgREST table, the production setup
/// - `sqlite.rs`: local SQLite file for offline use and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use crate::state::data::{ShareLink, SignatureSubmission};

pub mod rest;
pub mod sqlite;

pub use rest::RestShareStore;
pub use sqlite::SqliteShareStore;

#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Look up exactly one share by token.
    async fn find_by_token(&self, token: &str) -> Result<Option<ShareLink>, StoreError>;

    /// Bump the view counter and last-viewed timestamp. Advisory only.
    async fn record_view(&self, share: &ShareLink, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Attach the signature and mark the share signed, only if it is still
    /// active. Returns the timestamp the store recorded.
    async fn submit_signature(
        &self,
        id: &str,
        submission: &SignatureSubmission,
    ) -> Result<DateTime<Utc>, StoreError>;
}

/// Build the configured backend.
pub fn open_store(config: &StoreConfig, timeout: Duration) -> Result<Arc<dyn ShareStore>, StoreError> {
    match config.backend {
        StoreBackend::Rest => {
            let store = RestShareStore::new(&config.rest_url, &config.api_key, &config.table, timeout)?;
            Ok(Arc::new(store))
        }
        StoreBackend::Sqlite => {
            let path = match &config.sqlite_path {
                Some(path) => path.clone(),
                None => SqliteShareStore::default_path().ok_or_else(|| {
                    StoreError::NotConfigured("could not determine a data directory".to_string())
                })?,
            };
            Ok(Arc::new(SqliteShareStore::open(&path)?))
        }
    }
}
