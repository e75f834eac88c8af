use agencyvault_core::audit::AuditEntry;
use agencyvault_core::domain::lead::LeadId;
use agencyvault_core::domain::run::RunId;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::{encode_timestamp, parse_timestamp, RepositoryError};

/// Audit rows are insert-only; there is no update or delete path.
pub(crate) async fn insert<'e, E>(executor: E, entry: &AuditEntry) -> Result<(), RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO audit_log (id, run_id, lead_id, event, detail, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(entry.run_id.as_ref().map(|id| id.0.as_str()))
    .bind(entry.lead_id.as_ref().map(|id| id.0.as_str()))
    .bind(&entry.event)
    .bind(&entry.detail)
    .bind(encode_timestamp(entry.created_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn for_lead<'e, E>(
    executor: E,
    lead_id: &LeadId,
) -> Result<Vec<AuditEntry>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, run_id, lead_id, event, detail, created_at
         FROM audit_log
         WHERE lead_id = ?
         ORDER BY created_at ASC, rowid ASC",
    )
    .bind(&lead_id.0)
    .fetch_all(executor)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

pub(crate) async fn for_run<'e, E>(
    executor: E,
    run_id: &RunId,
) -> Result<Vec<AuditEntry>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, run_id, lead_id, event, detail, created_at
         FROM audit_log
         WHERE run_id = ?
         ORDER BY created_at ASC, rowid ASC",
    )
    .bind(&run_id.0)
    .fetch_all(executor)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

fn entry_from_row(row: &SqliteRow) -> Result<AuditEntry, RepositoryError> {
    Ok(AuditEntry {
        id: row.try_get("id")?,
        run_id: row.try_get::<Option<String>, _>("run_id")?.map(RunId),
        lead_id: row.try_get::<Option<String>, _>("lead_id")?.map(LeadId),
        event: row.try_get("event")?,
        detail: row.try_get("detail")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
