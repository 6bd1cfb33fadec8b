//! Read-side API for UI and chatbot collaborators.
//!
//! Two flavors: cache-backed reads straight off the published CSVs (used
//! where the store may lag the sheet), and live queue-distance queries that
//! combine the persisted roster with door cutoffs parsed fresh per request.

use anyhow::Result;
use tracing::instrument;

use crate::cache::Cache;
use crate::csv;
use crate::db::{self, Pool};
use crate::doors;
use crate::fetch::Fetcher;
use crate::model::{QueueDistances, ScheduleAssignment};
use crate::queue::{self, RangeBounds};

/// A read served from the CSV path. `stale` marks a degraded answer built
/// from an expired cache entry after a failed refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult<T> {
    pub value: T,
    pub stale: bool,
}

/// Today's assignments for one worker, read from the pivoted schedule CSV
/// through the cache. Returns every assignment when `worker_id` is `None`.
#[instrument(skip(cache, fetcher, url))]
pub async fn assignments_from_source(
    cache: &Cache,
    fetcher: &dyn Fetcher,
    url: &str,
    worker_id: Option<&str>,
) -> Result<ReadResult<Vec<ScheduleAssignment>>> {
    let outcome = cache
        .get_or_fetch("schedule", || async {
            Ok(fetcher.fetch_csv(url).await?)
        })
        .await?;

    let despivoted = crate::schedule::despivot(&csv::parse(&outcome.value));
    let value = match worker_id {
        Some(id) => despivoted
            .assignments
            .into_iter()
            .filter(|a| a.worker_id == id)
            .collect(),
        None => despivoted.assignments,
    };
    Ok(ReadResult {
        value,
        stale: outcome.stale,
    })
}

/// Queue distances for one worker: roster position from the store, door
/// cutoffs fetched fresh (never cached; the doors sheet changes minute to
/// minute on call days). `None` when the worker is not in the roster.
#[instrument(skip(pool, fetcher, doors_url, bounds))]
pub async fn worker_queue_distances(
    pool: &Pool,
    fetcher: &dyn Fetcher,
    doors_url: &str,
    bounds: &RangeBounds,
    worker_id: &str,
) -> Result<Option<QueueDistances>> {
    let Some(position) = db::roster_position(pool, worker_id).await? else {
        return Ok(None);
    };
    let raw = fetcher.fetch_csv(doors_url).await?;
    let report = doors::parse_doors(&raw);
    Ok(Some(queue::queue_distances(
        position,
        &report.cutoffs,
        bounds,
    )))
}
