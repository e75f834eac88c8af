use agencyvault_core::chrono::{DateTime, Utc};
use agencyvault_core::domain::action::{Action, ActionId, ActionKind, ActionPayload, ActionStatus};
use agencyvault_core::domain::lead::LeadId;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::{
    encode_optional_timestamp, encode_timestamp, parse_optional_timestamp, parse_timestamp,
    RepositoryError,
};

const ACTION_COLUMNS: &str = "id, lead_id, kind, status, tool, payload_json, due_at, error,
     created_at, started_at, finished_at";

pub(crate) async fn find_by_id<'e, E>(
    executor: E,
    id: &ActionId,
) -> Result<Option<Action>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("SELECT {ACTION_COLUMNS} FROM actions WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(executor)
        .await?;

    row.map(|row| action_from_row(&row)).transpose()
}

pub(crate) async fn upsert<'e, E>(executor: E, action: &Action) -> Result<(), RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let payload_json = serde_json::to_string(&action.payload)
        .map_err(|error| RepositoryError::Decode(format!("action payload encode: {error}")))?;

    sqlx::query(
        "INSERT INTO actions (
            id,
            lead_id,
            kind,
            status,
            tool,
            payload_json,
            due_at,
            error,
            created_at,
            started_at,
            finished_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            payload_json = excluded.payload_json,
            due_at = excluded.due_at,
            error = excluded.error,
            started_at = excluded.started_at,
            finished_at = excluded.finished_at",
    )
    .bind(&action.id.0)
    .bind(&action.lead_id.0)
    .bind(action.kind.as_str())
    .bind(action.status.as_str())
    .bind(&action.tool)
    .bind(payload_json)
    .bind(encode_timestamp(action.due_at))
    .bind(action.error.as_deref())
    .bind(encode_timestamp(action.created_at))
    .bind(encode_optional_timestamp(action.started_at))
    .bind(encode_optional_timestamp(action.finished_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn pending_outbound<'e, E>(
    executor: E,
    limit: u32,
) -> Result<Vec<Action>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        "SELECT {ACTION_COLUMNS}
         FROM actions
         WHERE status = ? AND kind IN (?, ?)
         ORDER BY created_at ASC, due_at ASC, rowid ASC
         LIMIT ?"
    ))
    .bind(ActionStatus::Pending.as_str())
    .bind(ActionKind::Text.as_str())
    .bind(ActionKind::Call.as_str())
    .bind(i64::from(limit))
    .fetch_all(executor)
    .await?;

    rows.iter().map(action_from_row).collect()
}

pub(crate) async fn for_lead<'e, E>(
    executor: E,
    lead_id: &LeadId,
    status: Option<ActionStatus>,
) -> Result<Vec<Action>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        "SELECT {ACTION_COLUMNS}
         FROM actions
         WHERE lead_id = ? AND (? IS NULL OR status = ?)
         ORDER BY created_at ASC, due_at ASC, rowid ASC"
    ))
    .bind(&lead_id.0)
    .bind(status.map(|status| status.as_str()))
    .bind(status.map(|status| status.as_str()))
    .fetch_all(executor)
    .await?;

    rows.iter().map(action_from_row).collect()
}

/// PENDING -> RUNNING as a compare-and-set on the stored status.
pub(crate) async fn claim<'e, E>(executor: E, action: &Action) -> Result<bool, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE actions SET status = ?, started_at = ? WHERE id = ? AND status = ?",
    )
    .bind(ActionStatus::Running.as_str())
    .bind(encode_optional_timestamp(action.started_at))
    .bind(&action.id.0)
    .bind(ActionStatus::Pending.as_str())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn running_started_before<'e, E>(
    executor: E,
    cutoff: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<Action>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        "SELECT {ACTION_COLUMNS}
         FROM actions
         WHERE status = ? AND started_at IS NOT NULL AND started_at < ?
         ORDER BY started_at ASC, rowid ASC
         LIMIT ?"
    ))
    .bind(ActionStatus::Running.as_str())
    .bind(encode_timestamp(cutoff))
    .bind(i64::from(limit))
    .fetch_all(executor)
    .await?;

    rows.iter().map(action_from_row).collect()
}

/// Pending TEXT/CALL backlog waiting for the executor.
pub(crate) async fn pending_outbound_count<'e, E>(executor: E) -> Result<i64, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT COUNT(*) AS pending FROM actions WHERE status = ? AND kind IN (?, ?)")
        .bind(ActionStatus::Pending.as_str())
        .bind(ActionKind::Text.as_str())
        .bind(ActionKind::Call.as_str())
        .fetch_one(executor)
        .await?;

    Ok(row.try_get("pending")?)
}

fn action_from_row(row: &SqliteRow) -> Result<Action, RepositoryError> {
    let kind_raw = row.try_get::<String, _>("kind")?;
    let kind = ActionKind::parse(&kind_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown action kind `{kind_raw}`")))?;
    let status_raw = row.try_get::<String, _>("status")?;
    let status = ActionStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown action status `{status_raw}`")))?;
    let payload_raw = row.try_get::<String, _>("payload_json")?;
    let payload = serde_json::from_str::<ActionPayload>(&payload_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid action payload: {error}")))?;

    Ok(Action {
        id: ActionId(row.try_get("id")?),
        lead_id: LeadId(row.try_get("lead_id")?),
        kind,
        status,
        tool: row.try_get("tool")?,
        payload,
        due_at: parse_timestamp("due_at", row.try_get("due_at")?)?,
        error: row.try_get("error")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        started_at: parse_optional_timestamp("started_at", row.try_get("started_at")?)?,
        finished_at: parse_optional_timestamp("finished_at", row.try_get("finished_at")?)?,
    })
}
