//! In-memory metrics store for testing

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use benchtrack_core::{CoreError, PerformanceRecord};

use super::{validate_collection, MetricsStore};
use crate::error::Result;

const ENDPOINT: &str = "memory://";

/// In-memory metrics store (for testing)
///
/// Documents are kept per collection in push order. Failures can be injected
/// per metric name or for the whole store.
#[derive(Clone, Default)]
pub struct MemoryMetricsStore {
    collections: Arc<RwLock<HashMap<String, Vec<Map<String, Value>>>>>,
    failing_metrics: Arc<RwLock<HashSet<String>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every push of `metric` fails with `StoreUnavailable`.
    pub fn fail_metric(&self, metric: impl Into<String>) {
        self.failing_metrics.write().insert(metric.into());
    }

    /// Simulates the backend going away (or coming back).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Documents stored in `collection`, oldest first.
    pub fn documents(&self, collection: &str) -> Vec<Map<String, Value>> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn collection_exists(&self, collection: &str) -> bool {
        self.collections.read().contains_key(collection)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CoreError::unavailable(ENDPOINT, "store is offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetricsStore for MemoryMetricsStore {
    async fn ping(&self) -> Result<()> {
        self.check_online()
    }

    async fn push(&self, collection: &str, record: &PerformanceRecord) -> Result<()> {
        self.check_online()?;
        validate_collection(collection)?;
        if self.failing_metrics.read().contains(record.metric()) {
            return Err(CoreError::unavailable(
                ENDPOINT,
                format!("injected failure for `{}`", record.metric()),
            ));
        }

        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(record.as_document());
        Ok(())
    }
}
