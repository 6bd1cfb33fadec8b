use crate::model::{Origin, Role, RosterEntry, ScheduleAssignment, ShiftCode, StatusColor};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{instrument, warn};

pub type Pool = SqlitePool;

/// Batch size recommended for assignment upserts.
pub const DEFAULT_BATCH_SIZE: usize = 100;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let pool = SqlitePool::connect(database_url).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Counters from a batched upsert run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    /// Rows inserted or updated.
    pub affected: u64,
    /// Rows lost to failed batches.
    pub errored: u64,
}

/// Upsert assignments in batches on the natural key (date, worker, shift).
/// Mutable fields take last-write-wins; a failed batch is counted and does
/// not abort the remaining batches.
#[instrument(skip_all, fields(rows = assignments.len()))]
pub async fn upsert_assignments(
    pool: &Pool,
    assignments: &[ScheduleAssignment],
    batch_size: usize,
) -> Result<UpsertStats> {
    let batch_size = batch_size.max(1);
    let mut stats = UpsertStats::default();

    for batch in assignments.chunks(batch_size) {
        let result: Result<()> = async {
            let mut tx = pool.begin().await?;
            for a in batch {
                sqlx::query(
                    "INSERT INTO assignments (date, worker_id, role, shift, company, vessel, batch_number, origin) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(date, worker_id, shift) DO UPDATE SET \
                       role = excluded.role, \
                       company = excluded.company, \
                       vessel = excluded.vessel, \
                       batch_number = excluded.batch_number, \
                       origin = excluded.origin, \
                       updated_at = CURRENT_TIMESTAMP",
                )
                .bind(a.date)
                .bind(&a.worker_id)
                .bind(a.role.code())
                .bind(a.shift.as_str())
                .bind(&a.company)
                .bind(&a.vessel)
                .bind(&a.batch_number)
                .bind(a.origin.as_str())
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => stats.affected += batch.len() as u64,
            Err(err) => {
                warn!(?err, batch_len = batch.len(), "assignment batch failed");
                stats.errored += batch.len() as u64;
            }
        }
    }

    Ok(stats)
}

/// Manual-entry path: a single assignment recorded by an operator, same
/// conflict key as the import.
#[instrument(skip_all)]
pub async fn insert_manual_assignment(pool: &Pool, assignment: &ScheduleAssignment) -> Result<()> {
    let manual = ScheduleAssignment {
        origin: Origin::Manual,
        ..assignment.clone()
    };
    let stats = upsert_assignments(pool, std::slice::from_ref(&manual), 1).await?;
    if stats.errored > 0 {
        return Err(anyhow!("manual assignment was not persisted"));
    }
    Ok(())
}

/// Replace the whole roster snapshot. Delete and insert run inside one
/// transaction, so readers never observe the empty intermediate state.
#[instrument(skip_all, fields(entries = entries.len()))]
pub async fn replace_roster(pool: &Pool, entries: &[RosterEntry]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM roster").execute(&mut *tx).await?;
    for e in entries {
        sqlx::query("INSERT INTO roster (position, worker_id, color) VALUES (?, ?, ?)")
            .bind(e.position)
            .bind(&e.worker_id)
            .bind(e.color.code())
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(entries.len() as u64)
}

#[instrument(skip_all)]
pub async fn roster_position(pool: &Pool, worker_id: &str) -> Result<Option<i64>> {
    let pos = sqlx::query_scalar::<_, i64>("SELECT position FROM roster WHERE worker_id = ?")
        .bind(worker_id)
        .fetch_optional(pool)
        .await?;
    Ok(pos)
}

pub async fn roster_entry(pool: &Pool, worker_id: &str) -> Result<Option<RosterEntry>> {
    let row = sqlx::query("SELECT position, worker_id, color FROM roster WHERE worker_id = ?")
        .bind(worker_id)
        .fetch_optional(pool)
        .await?;
    row.map(roster_from_row).transpose()
}

pub async fn roster_len(pool: &Pool) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roster")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

#[instrument(skip_all)]
pub async fn assignments_for_date(
    pool: &Pool,
    worker_id: &str,
    date: NaiveDate,
) -> Result<Vec<ScheduleAssignment>> {
    let rows = sqlx::query(
        "SELECT date, worker_id, role, shift, company, vessel, batch_number, origin \
         FROM assignments WHERE worker_id = ? AND date = ? ORDER BY shift",
    )
    .bind(worker_id)
    .bind(date)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(assignment_from_row).collect()
}

#[instrument(skip_all)]
pub async fn assignments_between(
    pool: &Pool,
    worker_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ScheduleAssignment>> {
    let rows = sqlx::query(
        "SELECT date, worker_id, role, shift, company, vessel, batch_number, origin \
         FROM assignments WHERE worker_id = ? AND date >= ? AND date <= ? \
         ORDER BY date, shift",
    )
    .bind(worker_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(assignment_from_row).collect()
}

pub async fn assignment_count(pool: &Pool) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM assignments")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

fn assignment_from_row(row: SqliteRow) -> Result<ScheduleAssignment> {
    let role_code: String = row.get("role");
    let shift_raw: String = row.get("shift");
    let origin_raw: String = row.get("origin");
    Ok(ScheduleAssignment {
        date: row.get("date"),
        worker_id: row.get("worker_id"),
        role: Role::from_code(&role_code)
            .ok_or_else(|| anyhow!("unknown role code in store: {role_code}"))?,
        shift: ShiftCode::from_canonical(&shift_raw)
            .ok_or_else(|| anyhow!("unknown shift code in store: {shift_raw}"))?,
        company: row.get("company"),
        vessel: row.get("vessel"),
        batch_number: row.get("batch_number"),
        origin: Origin::from_str_opt(&origin_raw)
            .ok_or_else(|| anyhow!("unknown origin in store: {origin_raw}"))?,
    })
}

fn roster_from_row(row: SqliteRow) -> Result<RosterEntry> {
    let color_code: i64 = row.get("color");
    Ok(RosterEntry {
        position: row.get("position"),
        worker_id: row.get("worker_id"),
        color: StatusColor::from_code(color_code)
            .ok_or_else(|| anyhow!("unknown color code in store: {color_code}"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn assignment(worker: &str, shift: ShiftCode) -> ScheduleAssignment {
        ScheduleAssignment {
            date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            worker_id: worker.to_string(),
            role: Role::Specialist,
            shift,
            company: "APM".into(),
            vessel: "ODYSSEUS".into(),
            batch_number: "1".into(),
            origin: Origin::Csv,
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_the_natural_key() {
        let pool = setup_pool().await;
        let rows = vec![
            assignment("221", ShiftCode::Morning08_14),
            assignment("221", ShiftCode::Evening20_02),
            assignment("330", ShiftCode::Morning08_14),
        ];

        let first = upsert_assignments(&pool, &rows, 2).await.unwrap();
        assert_eq!(first.affected, 3);
        assert_eq!(assignment_count(&pool).await.unwrap(), 3);

        let second = upsert_assignments(&pool, &rows, 2).await.unwrap();
        assert_eq!(second.errored, 0);
        assert_eq!(assignment_count(&pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn conflicting_fields_take_last_write() {
        let pool = setup_pool().await;
        let mut a = assignment("221", ShiftCode::Morning08_14);
        upsert_assignments(&pool, std::slice::from_ref(&a), 10)
            .await
            .unwrap();

        a.vessel = "MSC SARA".into();
        a.company = "MSC".into();
        upsert_assignments(&pool, std::slice::from_ref(&a), 10)
            .await
            .unwrap();

        let stored = assignments_for_date(&pool, "221", a.date).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].vessel, "MSC SARA");
        assert_eq!(stored[0].company, "MSC");
    }

    #[tokio::test]
    async fn roster_snapshot_is_replaced_wholesale() {
        let pool = setup_pool().await;
        let first = vec![
            RosterEntry {
                position: 1,
                worker_id: "111".into(),
                color: StatusColor::Green,
            },
            RosterEntry {
                position: 2,
                worker_id: "222".into(),
                color: StatusColor::Red,
            },
        ];
        replace_roster(&pool, &first).await.unwrap();
        assert_eq!(roster_position(&pool, "222").await.unwrap(), Some(2));

        let second = vec![RosterEntry {
            position: 1,
            worker_id: "222".into(),
            color: StatusColor::Blue,
        }];
        replace_roster(&pool, &second).await.unwrap();
        assert_eq!(roster_len(&pool).await.unwrap(), 1);
        assert_eq!(roster_position(&pool, "111").await.unwrap(), None);
        assert_eq!(roster_position(&pool, "222").await.unwrap(), Some(1));

        let entry = roster_entry(&pool, "222").await.unwrap().unwrap();
        assert_eq!(entry.color, StatusColor::Blue);
    }

    #[tokio::test]
    async fn date_range_query_is_inclusive_and_ordered() {
        let pool = setup_pool().await;
        let mut rows = Vec::new();
        for (d, shift) in [
            (1, ShiftCode::Morning08_14),
            (2, ShiftCode::Night02_08),
            (3, ShiftCode::Holiday),
        ] {
            let mut a = assignment("042", shift);
            a.date = NaiveDate::from_ymd_opt(2025, 11, d).unwrap();
            rows.push(a);
        }
        upsert_assignments(&pool, &rows, 100).await.unwrap();

        let hits = assignments_between(
            &pool,
            "042",
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 2).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].date, NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
        // Leading-zero worker id round-trips.
        assert_eq!(hits[0].worker_id, "042");
    }

    #[tokio::test]
    async fn manual_entry_carries_its_origin() {
        let pool = setup_pool().await;
        let a = assignment("604", ShiftCode::Afternoon14_20);
        insert_manual_assignment(&pool, &a).await.unwrap();

        let stored = assignments_for_date(&pool, "604", a.date).await.unwrap();
        assert_eq!(stored[0].origin, Origin::Manual);
    }
}
