//! Per-state job counts.

use taskboard_models::{JobCounts, JobState, QueueName};
use tracing::warn;

use crate::error::QueueResult;
use crate::inspector::QueueInspector;

impl QueueInspector {
    /// Count every canonical state of `queue` in one atomic script execution.
    ///
    /// Counts are matched to states by the names echoed in the reply; a state
    /// the reply does not mention stays at zero.
    pub async fn count_job_states(&self, queue: &QueueName) -> QueueResult<JobCounts> {
        let queue_key = self.keys.queue_key(queue);
        let suffixes = JobState::ALL.map(|state| state.index_suffix());

        let pairs = self
            .bounded(
                "count_states",
                self.scripts.count_states(&*self.store, &queue_key, &suffixes),
            )
            .await?;

        let mut counts = JobCounts::default();
        for (suffix, count) in pairs {
            match JobState::from_index_suffix(&suffix) {
                Some(state) => counts.set(state, count),
                None => warn!(queue = %queue, suffix = %suffix, "Ignoring count for unknown state"),
            }
        }
        Ok(counts)
    }
}
