//! Job record lookup and decoding.

use std::collections::HashMap;

use serde_json::Value;
use taskboard_models::{DecodedJobRecord, JobId, QueueName};
use tracing::debug;

use crate::error::{QueueError, QueueResult};
use crate::inspector::QueueInspector;

/// Field names of the per-job hash written by the producing library.
pub mod fields {
    pub const NAME: &str = "name";
    pub const DATA: &str = "data";
    pub const OPTS: &str = "opts";
    pub const STACKTRACE: &str = "stacktrace";
    pub const RETURN_VALUE: &str = "returnvalue";
    pub const FAILED_REASON: &str = "failedReason";
    pub const TIMESTAMP: &str = "timestamp";
    pub const PROCESSED_ON: &str = "processedOn";
    pub const FINISHED_ON: &str = "finishedOn";
    pub const ATTEMPTS_MADE: &str = "attemptsMade";
    pub const PRIORITY: &str = "priority";
    pub const DELAY: &str = "delay";
}

impl QueueInspector {
    /// Fetch and decode one job.
    ///
    /// The id is validated before the store is touched.
    pub async fn get_job(&self, queue: &QueueName, raw_id: &str) -> QueueResult<DecodedJobRecord> {
        let id = JobId::parse(raw_id)?;
        self.fetch_job(queue, &id).await
    }

    pub(crate) async fn fetch_job(&self, queue: &QueueName, id: &JobId) -> QueueResult<DecodedJobRecord> {
        let key = self.keys.job_key(queue, id);
        let hash = self.bounded("hgetall", self.store.hash_fields(&key)).await?;

        if hash.is_empty() {
            return Err(QueueError::JobNotFound {
                queue: queue.to_string(),
                id: id.to_string(),
            });
        }

        decode_job(queue, id, &hash)
    }
}

/// Turn a raw job hash into a decoded record.
///
/// `data` and `opts` are required JSON. `stacktrace` and `returnvalue` are
/// decoded best-effort and fall back to empty values.
pub fn decode_job(
    queue: &QueueName,
    id: &JobId,
    hash: &HashMap<String, String>,
) -> QueueResult<DecodedJobRecord> {
    let data = required_json(id, hash, fields::DATA)?;
    let opts = required_json(id, hash, fields::OPTS)?;

    let stacktrace = match hash.get(fields::STACKTRACE) {
        Some(raw) => serde_json::from_str::<Vec<String>>(raw).unwrap_or_else(|e| {
            debug!(queue = %queue, job_id = %id, error = %e, "Ignoring undecodable stacktrace");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let returnvalue = hash
        .get(fields::RETURN_VALUE)
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(Value::Null);

    Ok(DecodedJobRecord {
        id: id.clone(),
        queue: queue.clone(),
        name: hash.get(fields::NAME).cloned().unwrap_or_default(),
        data,
        opts,
        stacktrace,
        returnvalue,
        failed_reason: hash
            .get(fields::FAILED_REASON)
            .filter(|reason| !reason.is_empty())
            .cloned(),
        timestamp: optional_int(id, hash, fields::TIMESTAMP)?,
        processed_on: optional_int(id, hash, fields::PROCESSED_ON)?,
        finished_on: optional_int(id, hash, fields::FINISHED_ON)?,
        attempts_made: optional_int(id, hash, fields::ATTEMPTS_MADE)?.unwrap_or(0),
        priority: optional_int(id, hash, fields::PRIORITY)?.unwrap_or(0),
        delay: optional_int(id, hash, fields::DELAY)?.unwrap_or(0),
    })
}

fn required_json(id: &JobId, hash: &HashMap<String, String>, field: &'static str) -> QueueResult<Value> {
    let raw = hash
        .get(field)
        .ok_or_else(|| QueueError::decode(id.as_str(), field, "field is missing"))?;
    serde_json::from_str(raw).map_err(|e| QueueError::decode(id.as_str(), field, e))
}

fn optional_int(
    id: &JobId,
    hash: &HashMap<String, String>,
    field: &'static str,
) -> QueueResult<Option<i64>> {
    match hash.get(field).map(|raw| raw.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| QueueError::decode(id.as_str(), field, e)),
    }
}
