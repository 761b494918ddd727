use super::model::{milestone_values, milestones_from, table_spec, ListOrder, TableSpec};
use crate::model::{MediaKind, TrackedRecord};
use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/`, ensure the parent
/// directory exists and ask SQLite to create the file. Leaves in-memory URLs
/// untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let query = match query_part {
        Some(q) if q.contains("mode=") => q.to_string(),
        Some(q) => format!("{q}&mode=rwc"),
        None => "mode=rwc".to_string(),
    };
    format!("sqlite://{expanded_path}?{query}")
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Whether a row with this external id exists, compared as text.
///
/// Reads every id of the kind's table and scans them.
#[instrument(skip(pool))]
pub async fn is_tracked(pool: &Pool, external_id: &str, kind: MediaKind) -> sqlx::Result<bool> {
    let spec = table_spec(kind);
    let ids: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT CAST(external_id AS TEXT) FROM {}",
        spec.table
    ))
    .fetch_all(pool)
    .await?;
    Ok(ids.iter().any(|id| id == external_id))
}

fn insert_sql(spec: &TableSpec, on_conflict: &str) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) {}",
        spec.table,
        spec.column_list(),
        on_conflict
    )
}

fn overwrite_clause(spec: &TableSpec) -> String {
    let assignments: Vec<String> = spec.columns[1..]
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();
    format!(
        "ON CONFLICT(external_id) DO UPDATE SET {}, updated_at = CURRENT_TIMESTAMP",
        assignments.join(", ")
    )
}

fn bind_record<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    record: &'q TrackedRecord,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let (first, second) = milestone_values(record);
    query
        .bind(&record.external_id)
        .bind(&record.name)
        .bind(&record.original_name)
        .bind(&record.first_release_date)
        .bind(first)
        .bind(second)
        .bind(&record.poster_url)
        .bind(&record.backdrop_url)
        .bind(record.status)
}

/// Write records, replacing any existing row with the same id and kind.
#[instrument(skip_all, fields(count = records.len()))]
pub async fn upsert(pool: &Pool, records: &[TrackedRecord]) -> sqlx::Result<u64> {
    let mut tx = pool.begin().await?;
    let mut written = 0;
    for record in records {
        let spec = table_spec(record.kind());
        let sql = insert_sql(&spec, &overwrite_clause(&spec));
        written += bind_record(sqlx::query(&sql), record)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;
    debug!(written, "upserted tracked rows");
    Ok(written)
}

/// Insert unless a row with the same id and kind exists. Returns whether it was inserted.
#[instrument(skip_all, fields(external_id = %record.external_id))]
pub async fn insert_if_absent(pool: &Pool, record: &TrackedRecord) -> sqlx::Result<bool> {
    let spec = table_spec(record.kind());
    let sql = insert_sql(&spec, "ON CONFLICT(external_id) DO NOTHING");
    let res = bind_record(sqlx::query(&sql), record).execute(pool).await?;
    Ok(res.rows_affected() == 1)
}

fn row_to_record(kind: MediaKind, row: &SqliteRow) -> sqlx::Result<TrackedRecord> {
    Ok(TrackedRecord {
        external_id: row.try_get(0)?,
        name: row.try_get(1)?,
        original_name: row.try_get(2)?,
        first_release_date: row.try_get(3)?,
        milestones: milestones_from(kind, row.try_get(4)?, row.try_get(5)?),
        poster_url: row.try_get(6)?,
        backdrop_url: row.try_get(7)?,
        status: row.try_get(8)?,
    })
}

#[instrument(skip(pool))]
pub async fn fetch(
    pool: &Pool,
    kind: MediaKind,
    external_id: &str,
) -> sqlx::Result<Option<TrackedRecord>> {
    let spec = table_spec(kind);
    let row = sqlx::query(&format!(
        "SELECT {} FROM {} WHERE external_id = ?",
        spec.column_list(),
        spec.table
    ))
    .bind(external_id)
    .fetch_optional(pool)
    .await?;
    row.map(|r| row_to_record(kind, &r)).transpose()
}

#[instrument(skip(pool))]
pub async fn list(
    pool: &Pool,
    kind: MediaKind,
    order: ListOrder,
) -> sqlx::Result<Vec<TrackedRecord>> {
    let spec = table_spec(kind);
    let rows = sqlx::query(&format!(
        "SELECT {} FROM {} {}",
        spec.column_list(),
        spec.table,
        order.clause(&spec)
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(|r| row_to_record(kind, r)).collect()
}

#[instrument(skip(pool))]
pub async fn remove(pool: &Pool, kind: MediaKind, external_id: &str) -> sqlx::Result<bool> {
    let spec = table_spec(kind);
    let res = sqlx::query(&format!("DELETE FROM {} WHERE external_id = ?", spec.table))
        .bind(external_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}
