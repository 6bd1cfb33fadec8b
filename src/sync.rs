//! Periodic sync orchestrator.
//!
//! Each cycle fetches, parses, normalizes and persists every source. The
//! sources run concurrently and fail independently: a source's error becomes
//! its own `ok: false` outcome, never a cancelled sibling. Outside the
//! configured working-hours window a cycle is a no-op that still reports a
//! well-formed skipped result.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::csv;
use crate::db::{self, Pool};
use crate::fetch::Fetcher;
use crate::roster;
use crate::schedule;

/// Working-hours window in a fixed timezone. Cycles outside it are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub tz: Tz,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SyncWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let hour = self.tz.from_utc_datetime(&now.naive_utc()).hour();
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// Per-source result of one cycle.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncOutcome {
    pub source: &'static str,
    pub ok: bool,
    /// Rows inserted or updated in the store.
    pub inserted: u64,
    /// Rows rejected during normalization.
    pub rejected: u64,
    /// Rows lost to persistence errors.
    pub errored: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncOutcome {
    fn failed(source: &'static str, message: String) -> Self {
        Self {
            source,
            ok: false,
            inserted: 0,
            rejected: 0,
            errored: 0,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CycleReport {
    pub skipped: bool,
    pub outcomes: Vec<SyncOutcome>,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            outcomes: Vec::new(),
        }
    }
}

/// Run one cycle at the wall-clock time `now`. Split out from [`run_cycle`]
/// so the window policy is testable.
pub async fn run_cycle_at(
    pool: &Pool,
    fetcher: &dyn Fetcher,
    cfg: &Config,
    now: DateTime<Utc>,
) -> anyhow::Result<CycleReport> {
    let window = SyncWindow {
        tz: cfg.timezone()?,
        start_hour: cfg.sync.window_start_hour,
        end_hour: cfg.sync.window_end_hour,
    };
    if !window.contains(now) {
        info!("outside sync window; skipping cycle");
        return Ok(CycleReport::skipped());
    }
    Ok(run_sources(pool, fetcher, cfg).await)
}

pub async fn run_cycle(
    pool: &Pool,
    fetcher: &dyn Fetcher,
    cfg: &Config,
) -> anyhow::Result<CycleReport> {
    run_cycle_at(pool, fetcher, cfg, Utc::now()).await
}

/// Fan out all sources concurrently, window policy already decided.
pub async fn run_sources(pool: &Pool, fetcher: &dyn Fetcher, cfg: &Config) -> CycleReport {
    let (schedule_outcome, roster_outcome) = futures::join!(
        sync_schedule(pool, fetcher, cfg),
        sync_roster(pool, fetcher, cfg),
    );
    CycleReport {
        skipped: false,
        outcomes: vec![schedule_outcome, roster_outcome],
    }
}

/// Schedule source: fetch -> parse -> despivot -> batched upsert.
#[instrument(skip_all)]
pub async fn sync_schedule(pool: &Pool, fetcher: &dyn Fetcher, cfg: &Config) -> SyncOutcome {
    const SOURCE: &str = "schedule";

    let raw = match fetcher.fetch_csv(&cfg.sources.schedule_url).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(?err, "schedule fetch failed");
            return SyncOutcome::failed(SOURCE, err.to_string());
        }
    };

    let parsed = csv::parse(&raw);
    if parsed.rows.is_empty() {
        return SyncOutcome::failed(SOURCE, "empty CSV".into());
    }

    let despivoted = schedule::despivot(&parsed);
    let stats = match db::upsert_assignments(pool, &despivoted.assignments, cfg.sync.batch_size)
        .await
    {
        Ok(stats) => stats,
        Err(err) => {
            warn!(?err, "schedule persistence failed");
            return SyncOutcome::failed(SOURCE, err.to_string());
        }
    };

    info!(
        inserted = stats.affected,
        rejected = despivoted.rejected,
        errored = stats.errored,
        "schedule synced"
    );
    SyncOutcome {
        source: SOURCE,
        ok: true,
        inserted: stats.affected,
        rejected: despivoted.rejected as u64,
        errored: stats.errored,
        message: None,
    }
}

/// Roster source: fetch -> flatten -> replace snapshot.
#[instrument(skip_all)]
pub async fn sync_roster(pool: &Pool, fetcher: &dyn Fetcher, cfg: &Config) -> SyncOutcome {
    const SOURCE: &str = "roster";

    let raw = match fetcher.fetch_csv(&cfg.sources.roster_url).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(?err, "roster fetch failed");
            return SyncOutcome::failed(SOURCE, err.to_string());
        }
    };

    let flattened = match roster::flatten(&csv::parse(&raw)) {
        Ok(flattened) => flattened,
        Err(err) => {
            warn!(?err, "roster normalization failed");
            return SyncOutcome::failed(SOURCE, err.to_string());
        }
    };
    if flattened.entries.is_empty() {
        return SyncOutcome::failed(SOURCE, "no valid census entries".into());
    }

    match db::replace_roster(pool, &flattened.entries).await {
        Ok(inserted) => {
            info!(inserted, skipped = flattened.skipped_cells, "roster synced");
            SyncOutcome {
                source: SOURCE,
                ok: true,
                inserted,
                rejected: flattened.skipped_cells as u64,
                errored: 0,
                message: None,
            }
        }
        Err(err) => {
            warn!(?err, "roster persistence failed");
            SyncOutcome::failed(SOURCE, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_respects_the_configured_timezone() {
        let window = SyncWindow {
            tz: chrono_tz::Europe::Madrid,
            start_hour: 7,
            end_hour: 16,
        };
        // 06:30 UTC in January is 07:30 in Madrid (UTC+1): inside.
        let inside = Utc.with_ymd_and_hms(2025, 1, 15, 6, 30, 0).unwrap();
        assert!(window.contains(inside));
        // 15:30 UTC in January is 16:30 in Madrid: outside.
        let outside = Utc.with_ymd_and_hms(2025, 1, 15, 15, 30, 0).unwrap();
        assert!(!window.contains(outside));
        // Summer: 05:30 UTC is 07:30 in Madrid (UTC+2): inside.
        let summer = Utc.with_ymd_and_hms(2025, 7, 15, 5, 30, 0).unwrap();
        assert!(window.contains(summer));
    }

    #[test]
    fn window_end_hour_is_exclusive() {
        let window = SyncWindow {
            tz: chrono_tz::UTC,
            start_hour: 7,
            end_hour: 16,
        };
        assert!(window.contains(Utc.with_ymd_and_hms(2025, 1, 1, 7, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2025, 1, 1, 16, 0, 0).unwrap()));
    }
}
