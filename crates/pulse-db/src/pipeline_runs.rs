//! Database operations for `pipeline_runs` and `pipeline_run_sources`.

use chrono::{DateTime, Utc};
use pulse_core::SourceOutcome;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `pipeline_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub articles_new: i32,
    pub articles_duplicate: i32,
    pub articles_updated: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `pipeline_run_sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRunSourceRow {
    pub id: i64,
    pub pipeline_run_id: i64,
    pub source_id: String,
    pub status: String,
    pub fetched: i32,
    pub new_count: i32,
    pub duplicate_count: i32,
    pub updated_count: i32,
    pub dropped_count: i32,
    pub upsert_failed_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
     articles_new, articles_duplicate, articles_updated, error_message, created_at";

// ---------------------------------------------------------------------------
// pipeline_runs operations
// ---------------------------------------------------------------------------

/// Creates a new pipeline run in `queued` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or fetch fails.
pub async fn create_pipeline_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<PipelineRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, PipelineRunRow>(&format!(
        "INSERT INTO pipeline_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_pipeline_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded` or `degraded`, sets `completed_at = NOW()` and
/// the aggregate article counts.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_pipeline_run(
    pool: &PgPool,
    id: i64,
    status: &str,
    articles_new: i32,
    articles_duplicate: i32,
    articles_updated: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = $1, completed_at = NOW(), \
             articles_new = $2, articles_duplicate = $3, articles_updated = $4 \
         WHERE id = $5 AND status = 'running'",
    )
    .bind(status)
    .bind(articles_new)
    .bind(articles_duplicate)
    .bind(articles_updated)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_pipeline_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_pipeline_run(pool: &PgPool, id: i64) -> Result<PipelineRunRow, DbError> {
    let row = sqlx::query_as::<_, PipelineRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM pipeline_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pipeline_runs(pool: &PgPool, limit: i64) -> Result<Vec<PipelineRunRow>, DbError> {
    let rows = sqlx::query_as::<_, PipelineRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM pipeline_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// pipeline_run_sources operations
// ---------------------------------------------------------------------------

/// Inserts or updates the per-source result row for a pipeline run.
///
/// Conflicts on `(pipeline_run_id, source_id)` update the counts, status,
/// and error message in place.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_pipeline_run_source(
    pool: &PgPool,
    run_id: i64,
    outcome: &SourceOutcome,
) -> Result<(), DbError> {
    let status = if outcome.succeeded() { "succeeded" } else { "failed" };

    sqlx::query(
        "INSERT INTO pipeline_run_sources \
             (pipeline_run_id, source_id, status, fetched, new_count, duplicate_count, \
              updated_count, dropped_count, upsert_failed_count, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (pipeline_run_id, source_id) DO UPDATE SET \
             status              = EXCLUDED.status, \
             fetched             = EXCLUDED.fetched, \
             new_count           = EXCLUDED.new_count, \
             duplicate_count     = EXCLUDED.duplicate_count, \
             updated_count       = EXCLUDED.updated_count, \
             dropped_count       = EXCLUDED.dropped_count, \
             upsert_failed_count = EXCLUDED.upsert_failed_count, \
             error_message       = EXCLUDED.error_message",
    )
    .bind(run_id)
    .bind(&outcome.source_id)
    .bind(status)
    .bind(i32::try_from(outcome.fetched).unwrap_or(i32::MAX))
    .bind(i32::try_from(outcome.new).unwrap_or(i32::MAX))
    .bind(i32::try_from(outcome.duplicate).unwrap_or(i32::MAX))
    .bind(i32::try_from(outcome.updated).unwrap_or(i32::MAX))
    .bind(i32::try_from(outcome.dropped).unwrap_or(i32::MAX))
    .bind(i32::try_from(outcome.upsert_failed).unwrap_or(i32::MAX))
    .bind(outcome.error.as_deref())
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns all source-level result rows for a given run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pipeline_run_sources(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<PipelineRunSourceRow>, DbError> {
    let rows = sqlx::query_as::<_, PipelineRunSourceRow>(
        "SELECT id, pipeline_run_id, source_id, status, fetched, new_count, duplicate_count, \
                updated_count, dropped_count, upsert_failed_count, error_message, created_at \
         FROM pipeline_run_sources \
         WHERE pipeline_run_id = $1 \
         ORDER BY id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
