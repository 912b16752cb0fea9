//! Job detail and listing handlers.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use taskboard_models::{DecodedJobRecord, JobState, QueueName};
use taskboard_queue::JobListQuery;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Fetch one job.
pub async fn get_job(
    State(state): State<AppState>,
    Path((queue, id)): Path<(String, String)>,
) -> ApiResult<Json<DecodedJobRecord>> {
    let queue = QueueName::parse(queue)?;
    let job = state.inspector.get_job(&queue, &id).await?;
    Ok(Json(job))
}

/// Query parameters for job listing.
///
/// Offsets arrive as raw text so that empty values (`?stop=`) count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsParams {
    #[serde(default)]
    pub start: Option<String>,
    /// Exclusive end offset
    #[serde(default)]
    pub stop: Option<String>,
    /// Substring matched against the job payload
    #[serde(default)]
    pub filter: Option<String>,
}

impl ListJobsParams {
    fn into_query(self, state: JobState) -> ApiResult<JobListQuery> {
        Ok(JobListQuery {
            start: parse_offset("start", self.start.as_deref())?.unwrap_or(0),
            stop: parse_offset("stop", self.stop.as_deref())?,
            filter: self.filter,
            ..JobListQuery::new(state)
        })
    }
}

fn parse_offset(name: &str, raw: Option<&str>) -> ApiResult<Option<u64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{name} must be a non-negative integer, got {raw:?}"))),
    }
}

#[derive(Serialize)]
pub struct JobListResponse {
    /// Size of the whole state index, not of this page
    pub count: u64,
    /// Offsets actually read, after defaulting and clamping
    pub start: u64,
    pub stop: u64,
    pub results: Vec<DecodedJobRecord>,
}

/// List one page of jobs in a state, newest first.
pub async fn list_jobs(
    State(state): State<AppState>,
    Path((queue, job_state)): Path<(String, String)>,
    params: Result<Query<ListJobsParams>, QueryRejection>,
) -> ApiResult<Json<JobListResponse>> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let queue = QueueName::parse(queue)?;
    let job_state: JobState = job_state.parse()?;

    let query = params.into_query(job_state)?;
    let page = state.inspector.list_jobs(&queue, &query).await?;

    Ok(Json(JobListResponse {
        count: page.total,
        start: page.start,
        stop: page.stop,
        results: page.jobs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start: Option<&str>, stop: Option<&str>) -> ListJobsParams {
        ListJobsParams {
            start: start.map(str::to_string),
            stop: stop.map(str::to_string),
            filter: None,
        }
    }

    #[test]
    fn test_empty_offsets_are_absent() {
        let query = params(Some(""), Some(" ")).into_query(JobState::Failed).unwrap();
        assert_eq!(query.start, 0);
        assert_eq!(query.stop, None);
    }

    #[test]
    fn test_offsets_parse() {
        let query = params(Some("5"), Some("15")).into_query(JobState::Delayed).unwrap();
        assert_eq!(query.start, 5);
        assert_eq!(query.stop, Some(15));
    }

    #[test]
    fn test_bad_offsets_are_rejected() {
        for (start, stop) in [(Some("abc"), None), (None, Some("-1")), (None, Some("1.5"))] {
            let err = params(start, stop).into_query(JobState::Failed).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "{start:?} {stop:?}");
        }
    }
}
