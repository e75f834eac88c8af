use agencyvault_core::domain::lead::LeadId;
use agencyvault_core::domain::message::{Message, MessageDirection};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::{encode_timestamp, parse_timestamp, RepositoryError};

pub(crate) async fn insert<'e, E>(executor: E, message: &Message) -> Result<(), RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO messages (
            id,
            lead_id,
            direction,
            from_number,
            to_number,
            body,
            provider_id,
            created_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&message.id)
    .bind(&message.lead_id.0)
    .bind(message.direction.as_str())
    .bind(message.from_number.as_deref())
    .bind(message.to_number.as_deref())
    .bind(&message.body)
    .bind(message.provider_id.as_deref())
    .bind(encode_timestamp(message.created_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn for_lead<'e, E>(
    executor: E,
    lead_id: &LeadId,
) -> Result<Vec<Message>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, lead_id, direction, from_number, to_number, body, provider_id, created_at
         FROM messages
         WHERE lead_id = ?
         ORDER BY created_at ASC, rowid ASC",
    )
    .bind(&lead_id.0)
    .fetch_all(executor)
    .await?;

    rows.iter().map(message_from_row).collect()
}

fn message_from_row(row: &SqliteRow) -> Result<Message, RepositoryError> {
    let direction_raw = row.try_get::<String, _>("direction")?;
    let direction = MessageDirection::parse(&direction_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown message direction `{direction_raw}`"))
    })?;

    Ok(Message {
        id: row.try_get("id")?,
        lead_id: LeadId(row.try_get("lead_id")?),
        direction,
        from_number: row.try_get("from_number")?,
        to_number: row.try_get("to_number")?,
        body: row.try_get("body")?,
        provider_id: row.try_get("provider_id")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
