//! Queue discovery.

use std::collections::BTreeSet;

use taskboard_models::QueueName;
use tracing::debug;

use crate::error::QueueResult;
use crate::inspector::QueueInspector;

impl QueueInspector {
    /// Queue names found under the namespace, sorted and deduplicated.
    ///
    /// Discovery is a single bounded scan, so on a keyspace larger than
    /// `scan_count` this is a best-effort first page rather than a full listing.
    pub async fn list_queues(&self) -> QueueResult<Vec<QueueName>> {
        let pattern = self.keys.discovery_pattern();
        let raw_keys = self
            .bounded(
                "discover_queues",
                self.scripts
                    .discover_queues(&*self.store, &pattern, 0, self.config.scan_count),
            )
            .await?;

        let names: BTreeSet<QueueName> = raw_keys
            .iter()
            .filter_map(|key| self.keys.queue_of(key))
            .filter_map(|queue| QueueName::parse(queue).ok())
            .collect();

        debug!(
            pattern = %pattern,
            keys = raw_keys.len(),
            queues = names.len(),
            "Discovered queues"
        );
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::inspector::test_support::inspector;

    #[tokio::test]
    async fn test_list_queues_strips_and_dedups() {
        let (inspector, store) = inspector("ns");
        store.index_add("ns:b:wait", 1.0, "1");
        store.index_add("ns:a:wait", 1.0, "1");
        store.index_add("ns:a:active", 1.0, "2");

        let queues = inspector.list_queues().await.unwrap();
        let names: Vec<_> = queues.iter().map(|q| q.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_list_queues_ignores_other_namespaces() {
        let (inspector, store) = inspector("ns");
        store.index_add("ns:mail:failed", 1.0, "4");
        store.put_hash("ns:mail:4", &[("name", "send")]);
        store.index_add("other:reports:wait", 1.0, "1");

        let queues = inspector.list_queues().await.unwrap();
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0].as_str(), "mail");
    }

    #[tokio::test]
    async fn test_scan_bound_counts_keys_before_matching() {
        let (mut inspector, store) = inspector("ns");
        inspector.config.scan_count = 2;
        store.index_add("aa:x:wait", 1.0, "1");
        store.index_add("ns:a:wait", 1.0, "1");
        store.index_add("ns:b:wait", 1.0, "1");

        let queues = inspector.list_queues().await.unwrap();
        let names: Vec<_> = queues.iter().map(|q| q.as_str()).collect();
        assert_eq!(names, ["a"]);
    }

    #[tokio::test]
    async fn test_list_queues_finds_list_indexes() {
        let (inspector, store) = inspector("ns");
        store.list_push("ns:reports:wait", "1");

        let queues = inspector.list_queues().await.unwrap();
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0].as_str(), "reports");
    }

    #[tokio::test]
    async fn test_list_queues_empty_namespace() {
        let (inspector, _store) = inspector("ns");
        assert!(inspector.list_queues().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_queues_propagates_store_error() {
        let (inspector, store) = inspector("ns");
        store.fail_on("ns:*");

        let err = inspector.list_queues().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }
}
