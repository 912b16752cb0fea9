//! Paged listing of one state index, with optional payload filtering.

use futures_util::{future, stream, StreamExt};
use taskboard_models::{DecodedJobRecord, JobId, JobPage, JobState, QueueName};
use tracing::{debug, warn};

use crate::error::QueueResult;
use crate::inspector::{names, QueueInspector};

/// Which slice of a state index to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobListQuery {
    pub state: JobState,
    /// Zero-based offset, newest job first
    pub start: u64,
    /// Exclusive end offset; `None` and `Some(0)` both mean the default page size.
    /// Pages longer than `max_page_size` are shortened, and the stop actually
    /// used is reported back in [`JobPage::stop`].
    pub stop: Option<u64>,
    /// Keep only jobs whose serialized `data` contains this text
    pub filter: Option<String>,
}

impl JobListQuery {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            start: 0,
            stop: None,
            filter: None,
        }
    }
}

impl QueueInspector {
    /// List one page of jobs in `query.state`, newest first, with the index size.
    ///
    /// The filter applies to the fetched page only, so a page may hold fewer
    /// jobs than requested even when matches exist further down the index.
    /// Ids whose record cannot be read are logged and skipped.
    pub async fn list_jobs(&self, queue: &QueueName, query: &JobListQuery) -> QueueResult<JobPage> {
        let key = self.keys.state_key(queue, query.state);
        let (start, stop) = self.page_bounds(query);

        let range = async {
            if stop <= start {
                return Ok(Vec::new());
            }
            self.bounded(
                "zrevrange",
                self.store
                    .index_range_rev(&key, to_index(start), to_index(stop - 1)),
            )
            .await
        };
        let total = self.bounded("zcard", self.store.index_len(&key));
        let (ids, total) = tokio::try_join!(range, total)?;

        let filter = query.filter.as_deref().filter(|text| !text.is_empty());
        let fetched = ids.len();

        let jobs: Vec<DecodedJobRecord> = stream::iter(ids)
            .map(|raw| async move {
                let result = self.hydrate(queue, &raw).await;
                (raw, result)
            })
            .buffered(self.config.hydrate_concurrency.max(1))
            .filter_map(|(raw, result)| {
                future::ready(match result {
                    Ok(job) => Some(job),
                    Err(e) => {
                        warn!(queue = %queue, state = %query.state, job_id = %raw, error = %e, "Skipping unreadable job");
                        metrics::counter!(
                            names::HYDRATION_FAILURES_TOTAL,
                            "queue" => queue.to_string(),
                            "state" => query.state.as_str()
                        )
                        .increment(1);
                        None
                    }
                })
            })
            .filter(|job| future::ready(filter.map_or(true, |text| data_contains(job, text))))
            .collect()
            .await;

        debug!(
            queue = %queue,
            state = %query.state,
            start,
            stop,
            fetched,
            returned = jobs.len(),
            total,
            "Listed jobs"
        );
        Ok(JobPage {
            jobs,
            total,
            start,
            stop,
        })
    }

    /// Resolve the default stop and clamp the page to `max_page_size`.
    ///
    /// A start past the stop yields an empty range, reported as `stop == start`.
    fn page_bounds(&self, query: &JobListQuery) -> (u64, u64) {
        let stop = match query.stop {
            None | Some(0) => self.config.page_size,
            Some(stop) => stop,
        };
        let stop = stop
            .min(query.start.saturating_add(self.config.max_page_size))
            .max(query.start);
        (query.start, stop)
    }

    async fn hydrate(&self, queue: &QueueName, raw_id: &str) -> QueueResult<DecodedJobRecord> {
        let id = JobId::parse(raw_id)?;
        self.fetch_job(queue, &id).await
    }
}

fn to_index(offset: u64) -> isize {
    isize::try_from(offset).unwrap_or(isize::MAX)
}

fn data_contains(job: &DecodedJobRecord, text: &str) -> bool {
    serde_json::to_string(&job.data)
        .map(|serialized| serialized.contains(text))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;
    use crate::inspector::test_support::inspector;
    use crate::memory::MemoryStore;

    fn queue(name: &str) -> QueueName {
        QueueName::parse(name).unwrap()
    }

    fn put_job(store: &MemoryStore, key: &str, data: &str) {
        store.put_hash(key, &[("name", "job"), ("data", data), ("opts", "{}")]);
    }

    fn ids(page: &JobPage) -> Vec<&str> {
        page.jobs.iter().map(|j| j.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_newest_first() {
        let (inspector, store) = inspector("ns");
        for (score, id) in [(1.0, "1"), (2.0, "2"), (3.0, "3")] {
            store.index_add("ns:q:completed", score, id);
            put_job(&store, &format!("ns:q:{id}"), "{}");
        }

        let page = inspector
            .list_jobs(&queue("q"), &JobListQuery::new(JobState::Completed))
            .await
            .unwrap();
        assert_eq!(ids(&page), ["3", "2", "1"]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_default_stop_matches_explicit_page_size() {
        let (inspector, store) = inspector("ns");
        for i in 1..=30 {
            store.index_add("ns:q:wait", i as f64, &i.to_string());
            put_job(&store, &format!("ns:q:{i}"), "{}");
        }

        let mut query = JobListQuery::new(JobState::Waiting);
        let default_page = inspector.list_jobs(&queue("q"), &query).await.unwrap();

        query.stop = Some(0);
        let zero_page = inspector.list_jobs(&queue("q"), &query).await.unwrap();

        query.stop = Some(25);
        let explicit_page = inspector.list_jobs(&queue("q"), &query).await.unwrap();

        assert_eq!(default_page.jobs.len(), 25);
        assert_eq!(default_page, explicit_page);
        assert_eq!(zero_page, explicit_page);
        assert_eq!(explicit_page.total, 30);
        assert_eq!(explicit_page.jobs[0].id.as_str(), "30");
    }

    #[tokio::test]
    async fn test_offsets_page_through_index() {
        let (inspector, store) = inspector("ns");
        for i in 1..=10 {
            store.index_add("ns:q:failed", i as f64, &i.to_string());
            put_job(&store, &format!("ns:q:{i}"), "{}");
        }

        let query = JobListQuery {
            start: 2,
            stop: Some(5),
            ..JobListQuery::new(JobState::Failed)
        };
        let page = inspector.list_jobs(&queue("q"), &query).await.unwrap();
        assert_eq!(ids(&page), ["8", "7", "6"]);
        assert_eq!(page.total, 10);
    }

    #[tokio::test]
    async fn test_filter_keeps_matches_in_index_order() {
        let (inspector, store) = inspector("ns");
        let jobs = [
            ("1", r#"{"user":"alice"}"#),
            ("2", r#"{"user":"bob"}"#),
            ("3", r#"{"user":"alice"}"#),
        ];
        for (score, (id, data)) in jobs.iter().enumerate() {
            store.index_add("ns:q:failed", score as f64, id);
            put_job(&store, &format!("ns:q:{id}"), data);
        }

        let query = JobListQuery {
            start: 0,
            stop: Some(10),
            filter: Some("alice".to_string()),
            ..JobListQuery::new(JobState::Failed)
        };
        let page = inspector.list_jobs(&queue("q"), &query).await.unwrap();
        assert_eq!(ids(&page), ["3", "1"]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_filter_only_sees_fetched_page() {
        let (inspector, store) = inspector("ns");
        store.index_add("ns:q:failed", 1.0, "1");
        put_job(&store, "ns:q:1", r#"{"user":"alice"}"#);
        store.index_add("ns:q:failed", 2.0, "2");
        put_job(&store, "ns:q:2", r#"{"user":"bob"}"#);

        let query = JobListQuery {
            stop: Some(1),
            filter: Some("alice".to_string()),
            ..JobListQuery::new(JobState::Failed)
        };
        let page = inspector.list_jobs(&queue("q"), &query).await.unwrap();
        assert!(page.jobs.is_empty());
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_unreadable_jobs_are_skipped() {
        let (inspector, store) = inspector("ns");
        store.index_add("ns:q:failed", 1.0, "1");
        put_job(&store, "ns:q:1", "{}");
        store.index_add("ns:q:failed", 2.0, "2");
        put_job(&store, "ns:q:2", "{broken");
        store.index_add("ns:q:failed", 3.0, "3");
        store.index_add("ns:q:failed", 4.0, "custom-id");
        store.index_add("ns:q:failed", 5.0, "5");
        put_job(&store, "ns:q:5", "{}");
        store.fail_on("ns:q:5");

        let query = JobListQuery::new(JobState::Failed);
        let page = inspector.list_jobs(&queue("q"), &query).await.unwrap();
        assert_eq!(ids(&page), ["1"]);
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_page_is_clamped() {
        let (mut inspector, store) = inspector("ns");
        inspector.config.max_page_size = 2;
        for i in 1..=5 {
            store.index_add("ns:q:delayed", i as f64, &i.to_string());
            put_job(&store, &format!("ns:q:{i}"), "{}");
        }

        let query = JobListQuery {
            stop: Some(100),
            ..JobListQuery::new(JobState::Delayed)
        };
        let page = inspector.list_jobs(&queue("q"), &query).await.unwrap();
        assert_eq!(ids(&page), ["5", "4"]);
        assert_eq!((page.start, page.stop), (0, 2));
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_start_past_stop_is_empty() {
        let (inspector, store) = inspector("ns");
        store.index_add("ns:q:active", 1.0, "1");
        put_job(&store, "ns:q:1", "{}");

        let query = JobListQuery {
            start: 30,
            ..JobListQuery::new(JobState::Active)
        };
        let page = inspector.list_jobs(&queue("q"), &query).await.unwrap();
        assert!(page.jobs.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!((page.start, page.stop), (30, 30));
    }

    #[tokio::test]
    async fn test_list_index_reads_from_head() {
        let (inspector, store) = inspector("ns");
        for id in ["1", "2", "3"] {
            store.list_push("ns:q:wait", id);
            put_job(&store, &format!("ns:q:{id}"), "{}");
        }

        let query = JobListQuery {
            stop: Some(2),
            ..JobListQuery::new(JobState::Waiting)
        };
        let page = inspector.list_jobs(&queue("q"), &query).await.unwrap();
        assert_eq!(ids(&page), ["3", "2"]);
        assert_eq!(page.total, 3);

        let counts = inspector.count_job_states(&queue("q")).await.unwrap();
        assert_eq!(counts.waiting, page.total);
    }

    #[tokio::test]
    async fn test_default_stop_is_reported() {
        let (inspector, _store) = inspector("ns");
        let page = inspector
            .list_jobs(&queue("q"), &JobListQuery::new(JobState::Failed))
            .await
            .unwrap();
        assert!(page.jobs.is_empty());
        assert_eq!((page.start, page.stop, page.total), (0, 25, 0));
    }

    #[tokio::test]
    async fn test_index_failure_fails_listing() {
        let (inspector, store) = inspector("ns");
        store.fail_on("ns:q:failed");
        let err = inspector
            .list_jobs(&queue("q"), &JobListQuery::new(JobState::Failed))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }
}
