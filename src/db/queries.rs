use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

use super::models::{record_date_key, ArchiveRecord, StoredRecord};

/// Check whether a record exists for the (url, resolved date) key.
pub async fn record_exists(
    pool: &SqlitePool,
    url: &str,
    resolved_date: DateTime<Utc>,
) -> Result<bool> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM archive_records WHERE url = ? AND resolved_date = ?")
            .bind(url)
            .bind(record_date_key(resolved_date))
            .fetch_optional(pool)
            .await
            .context("Failed to check record existence")?;

    Ok(row.is_some())
}

/// Insert or replace the record stored under its (url, resolved date) key.
///
/// The conflict clause makes the upsert atomic with respect to the key's
/// uniqueness: two upserts with the same key never produce two rows.
pub async fn upsert_record(pool: &SqlitePool, record: &ArchiveRecord) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO archive_records
            (url, resolved_date, slug, scraped_at, client_context, rendered, raw)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(url, resolved_date) DO UPDATE SET
            slug = excluded.slug,
            scraped_at = excluded.scraped_at,
            client_context = excluded.client_context,
            rendered = excluded.rendered,
            raw = excluded.raw
        ",
    )
    .bind(&record.url)
    .bind(record_date_key(record.resolved_date))
    .bind(&record.slug)
    .bind(record.scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true))
    .bind(serde_json::to_string(&record.client_context).context("Failed to serialize client context")?)
    .bind(serde_json::to_string(&record.rendered).context("Failed to serialize rendered capture")?)
    .bind(serde_json::to_string(&record.raw).context("Failed to serialize raw capture")?)
    .execute(pool)
    .await
    .context("Failed to upsert archive record")?;

    Ok(())
}

/// Fetch a stored record by its (url, resolved date) key.
pub async fn get_record(
    pool: &SqlitePool,
    url: &str,
    resolved_date: DateTime<Utc>,
) -> Result<Option<StoredRecord>> {
    sqlx::query_as("SELECT * FROM archive_records WHERE url = ? AND resolved_date = ?")
        .bind(url)
        .bind(record_date_key(resolved_date))
        .fetch_optional(pool)
        .await
        .context("Failed to fetch archive record")
}

/// Count all stored records.
pub async fn count_records(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM archive_records")
        .fetch_one(pool)
        .await
        .context("Failed to count archive records")?;

    Ok(row.0)
}
