//! Per-run collection state shared by the workers of one call number.

use std::sync::Arc;

use daopub_common::{CallNumber, Result};
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, OnceCell};

use crate::metadata::MetadataProvider;

/// A collection being published: its lazily resolved repository id and the
/// lock serializing writes to its finding aid.
#[derive(Debug)]
pub struct Collection {
    call_number: CallNumber,
    repository: OnceCell<String>,
    ead_lock: Mutex<()>,
}

impl Collection {
    pub fn new(call_number: CallNumber) -> Self {
        Self {
            call_number,
            repository: OnceCell::new(),
            ead_lock: Mutex::new(()),
        }
    }

    pub fn call_number(&self) -> &CallNumber {
        &self.call_number
    }

    /// Repository id, fetched on first use and reused for the rest of the run.
    ///
    /// Concurrent callers wait on the same lookup. A failed lookup is not
    /// cached, so a later caller retries it.
    pub async fn repository_id(&self, provider: &dyn MetadataProvider) -> Result<&str> {
        let repo = self
            .repository
            .get_or_try_init(|| async {
                tracing::debug!(collection = %self.call_number, "Resolving repository id");
                provider.repository_id(&self.call_number).await
            })
            .await?;
        Ok(repo.as_str())
    }

    /// Exclusive access to the collection's finding aid.
    pub async fn lock_ead(&self) -> MutexGuard<'_, ()> {
        self.ead_lock.lock().await
    }
}

/// Collections seen during a run, keyed by call number.
#[derive(Debug, Default)]
pub struct CollectionRegistry {
    collections: DashMap<CallNumber, Arc<Collection>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared entry for `call_number`, created on first request.
    pub fn get(&self, call_number: &CallNumber) -> Arc<Collection> {
        self.collections
            .entry(call_number.clone())
            .or_insert_with(|| Arc::new(Collection::new(call_number.clone())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
