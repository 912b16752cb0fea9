//! Fleet-wide counts.

use futures_util::future::join_all;
use taskboard_models::OverviewSnapshot;
use tracing::warn;

use crate::error::QueueResult;
use crate::inspector::{names, QueueInspector};

impl QueueInspector {
    /// Counts for every discovered queue.
    ///
    /// Failing to list queues fails the call. A queue whose count fails is
    /// logged and left out, the rest are still returned. Each queue is read
    /// independently, so the snapshot is not consistent across queues.
    pub async fn overview(&self) -> QueueResult<OverviewSnapshot> {
        let queues = self.list_queues().await?;

        let results = join_all(queues.into_iter().map(|queue| async move {
            let counts = self.count_job_states(&queue).await;
            (queue, counts)
        }))
        .await;

        let mut snapshot = OverviewSnapshot::new();
        for (queue, counts) in results {
            match counts {
                Ok(counts) => {
                    snapshot.insert(queue, counts);
                }
                Err(e) => {
                    warn!(queue = %queue, error = %e, "Leaving queue out of overview");
                    metrics::counter!(names::COUNT_FAILURES_TOTAL, "queue" => queue.to_string())
                        .increment(1);
                }
            }
        }
        Ok(snapshot)
    }
}
