//! Queue inspector: the entry point for every read query.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::{QueueError, QueueResult};
use crate::keys::KeySpace;
use crate::scripts::{ScriptName, ScriptRuntime};
use crate::store::{QueueStore, RedisOptions, RedisStore};

/// Metric names for the engine's partial-failure points.
pub mod names {
    pub const COUNT_FAILURES_TOTAL: &str = "taskboard_queue_count_failures_total";
    pub const HYDRATION_FAILURES_TOTAL: &str = "taskboard_job_hydration_failures_total";
}

/// Inspector configuration.
#[derive(Debug, Clone)]
pub struct InspectorConfig {
    /// Namespace the producing library writes under
    pub namespace: String,
    /// Count hint of the single discovery scan
    pub scan_count: u64,
    /// Stop offset used when a listing gives none
    pub page_size: u64,
    /// Upper bound on the number of ids read per listing
    pub max_page_size: u64,
    /// Job hashes fetched concurrently while hydrating a page
    pub hydrate_concurrency: usize,
    /// Bound on every individual store call
    pub operation_timeout: Duration,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            namespace: crate::keys::DEFAULT_NAMESPACE.to_string(),
            scan_count: 100,
            page_size: 25,
            max_page_size: 500,
            hydrate_concurrency: 16,
            operation_timeout: Duration::from_secs(5),
        }
    }
}

/// Read-only view over the queues of one namespace.
///
/// Cheap to clone; clones share the store connection and script table.
#[derive(Clone)]
pub struct QueueInspector {
    pub(crate) store: Arc<dyn QueueStore>,
    pub(crate) scripts: Arc<ScriptRuntime>,
    pub(crate) keys: KeySpace,
    pub(crate) config: InspectorConfig,
}

impl QueueInspector {
    /// Assemble an inspector over an existing store.
    pub fn new(store: Arc<dyn QueueStore>, scripts: Arc<ScriptRuntime>, config: InspectorConfig) -> Self {
        let keys = KeySpace::new(&config.namespace);
        Self {
            store,
            scripts,
            keys,
            config,
        }
    }

    /// Connect to Redis, load the script bundle and register it with the server.
    ///
    /// Every failure here is fatal for startup.
    pub async fn connect(redis: &RedisOptions, config: InspectorConfig) -> QueueResult<Self> {
        let scripts = Arc::new(ScriptRuntime::load()?);
        let store = RedisStore::connect(redis).await?;
        scripts.preload(&store).await?;

        info!(
            namespace = %config.namespace,
            scripts = ScriptName::ALL.len(),
            "Queue inspector ready"
        );
        Ok(Self::new(Arc::new(store), scripts, config))
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Check the store is reachable.
    pub async fn ping(&self) -> QueueResult<()> {
        self.bounded("ping", self.store.ping()).await
    }

    /// Run one store call under the configured deadline.
    pub(crate) async fn bounded<T, F>(&self, operation: &'static str, call: F) -> QueueResult<T>
    where
        F: Future<Output = QueueResult<T>>,
    {
        let after = self.config.operation_timeout;
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| QueueError::Timeout { operation, after })?
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::memory::MemoryStore;

    pub fn inspector(namespace: &str) -> (QueueInspector, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let scripts = Arc::new(ScriptRuntime::load().unwrap());
        let config = InspectorConfig {
            namespace: namespace.to_string(),
            ..InspectorConfig::default()
        };
        let inspector = QueueInspector::new(store.clone(), scripts, config);
        (inspector, store)
    }
}
