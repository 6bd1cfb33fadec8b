//! End-to-end pipeline tests: canned CSV exports through fetch, parse,
//! normalize and persist, then the read-side queries on top of the store.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;

use estiba_sync::cache::Cache;
use estiba_sync::config::{self, App, Config, Roster, Sources};
use estiba_sync::fetch::{FetchError, Fetcher};
use estiba_sync::model::Role;
use estiba_sync::queue::RangeBounds;
use estiba_sync::{db, read, sync};

/// Canned per-URL responses served in order. An exhausted queue answers 404,
/// so a test that forgets to queue a response fails loudly instead of
/// hanging on the network.
#[derive(Default)]
struct StubFetcher {
    responses: Mutex<HashMap<String, VecDeque<Result<String, u16>>>>,
}

impl StubFetcher {
    fn push_ok(&self, url: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(Ok(body.to_string()));
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch_csv(&self, url: &str) -> Result<String, FetchError> {
        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(body)) => Ok(body),
            Some(Err(code)) => Err(FetchError::Status {
                status: StatusCode::from_u16(code).unwrap(),
                attempts: 3,
            }),
            None => Err(FetchError::Status {
                status: StatusCode::NOT_FOUND,
                attempts: 3,
            }),
        }
    }
}

fn test_config() -> Config {
    Config {
        app: App {
            data_dir: ".".into(),
            cache_ttl_seconds: 300,
        },
        sources: Sources {
            schedule_url: "stub://schedule".into(),
            roster_url: "stub://roster".into(),
            doors_url: "stub://doors".into(),
        },
        sync: config::Sync {
            interval_seconds: 180,
            batch_size: 100,
            timezone: "UTC".into(),
            window_start_hour: 7,
            window_end_hour: 16,
        },
        roster: Roster {
            primary_max: 449,
            secondary_min: 450,
            secondary_max: 535,
        },
    }
}

async fn setup_pool() -> db::Pool {
    let pool = db::init_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// Two valid rows (one assignment each) plus one malformed row.
const SCHEDULE_CSV: &str = "\
FC,CSHorario,NomCliAbr,Parte,Buque,T,TC,C1,B,E\n\
3/11/25,08-14,APM,1,ODYSSEUS,221,,,,\n\
3/11/25,20 a 02,MSC,2,MSC SARA,,222,,,\n\
bad,row\n";

/// Census grid text: 1 header line plus 55 body lines of 33 columns, with
/// `cells` as (group, data_row, worker, color) placements.
fn census_csv(cells: &[(usize, usize, &str, &str)]) -> String {
    let width = 33;
    let mut rows = vec![vec![String::new(); width]; 55];
    for &(group, row, worker, color) in cells {
        rows[5 + row][group * 3] = (row + 1).to_string();
        rows[5 + row][group * 3 + 1] = worker.to_string();
        rows[5 + row][group * 3 + 2] = color.to_string();
    }
    let mut lines = vec![vec!["h"; width].join(",")];
    lines.extend(rows.iter().map(|r| r.join(",")));
    lines.join("\n")
}

fn census_three_workers() -> String {
    census_csv(&[
        (0, 0, "221", "2"),
        (0, 1, "222", "4"),
        (0, 2, "333", "0"),
    ])
}

const DOORS_CSV: &str = "\
,,,,,,\n\
,3/11/25,,,,,\n\
,,08-14,2,460,,x\n";

#[tokio::test]
async fn full_cycle_persists_schedule_and_roster() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let stub = StubFetcher::default();
    stub.push_ok(&cfg.sources.schedule_url, SCHEDULE_CSV);
    stub.push_ok(&cfg.sources.roster_url, &census_three_workers());

    let report = sync::run_sources(&pool, &stub, &cfg).await;
    assert!(!report.skipped);
    assert_eq!(report.outcomes.len(), 2);

    let schedule = &report.outcomes[0];
    assert_eq!(schedule.source, "schedule");
    assert!(schedule.ok);
    assert_eq!(schedule.inserted, 2);
    assert_eq!(schedule.rejected, 1);
    assert_eq!(schedule.errored, 0);

    let roster = &report.outcomes[1];
    assert_eq!(roster.source, "roster");
    assert!(roster.ok);
    assert_eq!(roster.inserted, 3);

    let date = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
    let stored = db::assignments_for_date(&pool, "221", date).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, Role::Rigger);
    assert_eq!(stored[0].vessel, "ODYSSEUS");

    assert_eq!(db::assignment_count(&pool).await.unwrap(), 2);
    assert_eq!(db::roster_position(&pool, "333").await.unwrap(), Some(3));
}

#[tokio::test]
async fn repeated_cycles_do_not_grow_the_store() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let stub = StubFetcher::default();
    for _ in 0..2 {
        stub.push_ok(&cfg.sources.schedule_url, SCHEDULE_CSV);
        stub.push_ok(&cfg.sources.roster_url, &census_three_workers());
    }

    sync::run_sources(&pool, &stub, &cfg).await;
    let report = sync::run_sources(&pool, &stub, &cfg).await;
    assert!(report.outcomes.iter().all(|o| o.ok));

    assert_eq!(db::assignment_count(&pool).await.unwrap(), 2);
    assert_eq!(db::roster_len(&pool).await.unwrap(), 3);
}

#[tokio::test]
async fn queue_distances_for_a_synced_worker() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let stub = StubFetcher::default();
    stub.push_ok(&cfg.sources.schedule_url, SCHEDULE_CSV);
    stub.push_ok(&cfg.sources.roster_url, &census_three_workers());
    sync::run_sources(&pool, &stub, &cfg).await;

    // Doors are fetched fresh on every query.
    stub.push_ok(&cfg.sources.doors_url, DOORS_CSV);
    stub.push_ok(&cfg.sources.doors_url, DOORS_CSV);

    let bounds = RangeBounds::default();

    // Worker at position 3, morning cutoff at 2: next call in 1.
    let d = read::worker_queue_distances(&pool, &stub, &cfg.sources.doors_url, &bounds, "333")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(d.working_day, Some(1));
    assert_eq!(d.holiday, None);

    // Position 1 already passed the door: wraps the whole primary range.
    let d = read::worker_queue_distances(&pool, &stub, &cfg.sources.doors_url, &bounds, "221")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(d.working_day, Some(448));

    // Not in the roster at all.
    let missing =
        read::worker_queue_distances(&pool, &stub, &cfg.sources.doors_url, &bounds, "999")
            .await
            .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn cached_read_serves_fresh_hit_without_fetching() {
    let cfg = test_config();
    let stub = StubFetcher::default();
    // One response only; the second read must come from the cache.
    stub.push_ok(&cfg.sources.schedule_url, SCHEDULE_CSV);

    let cache = Cache::new(Duration::from_secs(60));
    let first =
        read::assignments_from_source(&cache, &stub, &cfg.sources.schedule_url, Some("221"))
            .await
            .unwrap();
    assert!(!first.stale);
    assert_eq!(first.value.len(), 1);
    assert_eq!(first.value[0].worker_id, "221");

    let second = read::assignments_from_source(&cache, &stub, &cfg.sources.schedule_url, None)
        .await
        .unwrap();
    assert!(!second.stale);
    assert_eq!(second.value.len(), 2);
}

#[tokio::test]
async fn cached_read_falls_back_to_stale_on_fetch_failure() {
    let cfg = test_config();
    let stub = StubFetcher::default();
    stub.push_ok(&cfg.sources.schedule_url, SCHEDULE_CSV);

    // Zero TTL expires the entry immediately, forcing a refetch that fails.
    let cache = Cache::new(Duration::ZERO);
    let first =
        read::assignments_from_source(&cache, &stub, &cfg.sources.schedule_url, Some("222"))
            .await
            .unwrap();
    assert!(!first.stale);
    assert_eq!(first.value.len(), 1);

    let degraded =
        read::assignments_from_source(&cache, &stub, &cfg.sources.schedule_url, Some("222"))
            .await
            .unwrap();
    assert!(degraded.stale);
    assert_eq!(degraded.value, first.value);
}
