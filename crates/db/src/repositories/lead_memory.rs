use agencyvault_core::chrono::{DateTime, Utc};
use agencyvault_core::domain::lead::{LeadId, LeadMemoryEntry, LeadMemoryKey};
use sqlx::{Executor, Row, Sqlite};

use super::{encode_timestamp, parse_timestamp, RepositoryError};

pub(crate) async fn get<'e, E>(
    executor: E,
    lead_id: &LeadId,
    key: LeadMemoryKey,
) -> Result<Option<String>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT value FROM lead_memory WHERE lead_id = ? AND key = ?")
        .bind(&lead_id.0)
        .bind(key.as_str())
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|row| row.try_get::<String, _>("value")).transpose()?)
}

pub(crate) async fn set<'e, E>(
    executor: E,
    lead_id: &LeadId,
    key: LeadMemoryKey,
    value: &str,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO lead_memory (lead_id, key, value, updated_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(lead_id, key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at",
    )
    .bind(&lead_id.0)
    .bind(key.as_str())
    .bind(value)
    .bind(encode_timestamp(now))
    .execute(executor)
    .await?;

    Ok(())
}

/// Entries with keys this build does not know are skipped.
pub(crate) async fn for_lead<'e, E>(
    executor: E,
    lead_id: &LeadId,
) -> Result<Vec<LeadMemoryEntry>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT lead_id, key, value, updated_at FROM lead_memory WHERE lead_id = ? ORDER BY key",
    )
    .bind(&lead_id.0)
    .fetch_all(executor)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let key_raw = row.try_get::<String, _>("key")?;
        let Some(key) = LeadMemoryKey::parse(&key_raw) else {
            continue;
        };
        entries.push(LeadMemoryEntry {
            lead_id: LeadId(row.try_get("lead_id")?),
            key,
            value: row.try_get("value")?,
            updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
        });
    }
    Ok(entries)
}
