use agencyvault_core::domain::run::{AgentRun, RunId, RunMode, RunStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::{
    encode_optional_timestamp, encode_timestamp, parse_optional_timestamp, parse_timestamp,
    parse_u32, RepositoryError,
};

pub(crate) async fn upsert<'e, E>(executor: E, run: &AgentRun) -> Result<(), RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO agent_runs (
            id,
            mode,
            status,
            batch_size,
            planned,
            considered,
            notes,
            started_at,
            finished_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            planned = excluded.planned,
            considered = excluded.considered,
            notes = excluded.notes,
            finished_at = excluded.finished_at",
    )
    .bind(&run.id.0)
    .bind(run.mode.as_str())
    .bind(run.status.as_str())
    .bind(i64::from(run.batch_size))
    .bind(i64::from(run.planned))
    .bind(i64::from(run.considered))
    .bind(&run.notes)
    .bind(encode_timestamp(run.started_at))
    .bind(encode_optional_timestamp(run.finished_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn find_by_id<'e, E>(
    executor: E,
    id: &RunId,
) -> Result<Option<AgentRun>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, mode, status, batch_size, planned, considered, notes, started_at, finished_at
         FROM agent_runs
         WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(executor)
    .await?;

    row.map(|row| run_from_row(&row)).transpose()
}

pub(crate) async fn latest_for_mode<'e, E>(
    executor: E,
    mode: RunMode,
) -> Result<Option<AgentRun>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, mode, status, batch_size, planned, considered, notes, started_at, finished_at
         FROM agent_runs
         WHERE mode = ?
         ORDER BY started_at DESC, rowid DESC
         LIMIT 1",
    )
    .bind(mode.as_str())
    .fetch_optional(executor)
    .await?;

    row.map(|row| run_from_row(&row)).transpose()
}

pub(crate) async fn recent<'e, E>(executor: E, limit: u32) -> Result<Vec<AgentRun>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, mode, status, batch_size, planned, considered, notes, started_at, finished_at
         FROM agent_runs
         ORDER BY started_at DESC, rowid DESC
         LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(executor)
    .await?;

    rows.iter().map(run_from_row).collect()
}

fn run_from_row(row: &SqliteRow) -> Result<AgentRun, RepositoryError> {
    let mode_raw = row.try_get::<String, _>("mode")?;
    let mode = RunMode::parse(&mode_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown run mode `{mode_raw}`")))?;
    let status_raw = row.try_get::<String, _>("status")?;
    let status = RunStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown run status `{status_raw}`")))?;

    Ok(AgentRun {
        id: RunId(row.try_get("id")?),
        mode,
        status,
        batch_size: parse_u32("batch_size", row.try_get("batch_size")?)?,
        planned: parse_u32("planned", row.try_get("planned")?)?,
        considered: parse_u32("considered", row.try_get("considered")?)?,
        notes: row.try_get("notes")?,
        started_at: parse_timestamp("started_at", row.try_get("started_at")?)?,
        finished_at: parse_optional_timestamp("finished_at", row.try_get("finished_at")?)?,
    })
}
