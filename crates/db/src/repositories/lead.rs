use agencyvault_core::chrono::{DateTime, Utc};
use agencyvault_core::domain::lead::{Lead, LeadFlags, LeadId, LeadStatus};
use agencyvault_core::outreach::store::PlanningCandidate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::{
    encode_optional_timestamp, encode_timestamp, parse_optional_timestamp, parse_timestamp,
    parse_u32, RepositoryError,
};

const LEAD_COLUMNS: &str = "id, full_name, phone, email, status, dial_score, dialed_at,
     last_contacted_at, timezone, notes, created_at, updated_at";

pub(crate) async fn find_by_id<'e, E>(
    executor: E,
    id: &LeadId,
) -> Result<Option<Lead>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(executor)
        .await?;

    row.map(|row| lead_from_row(&row)).transpose()
}

pub(crate) async fn find_by_phone<'e, E>(
    executor: E,
    phone: &str,
) -> Result<Option<Lead>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads WHERE phone = ? ORDER BY created_at ASC LIMIT 1"
    ))
    .bind(phone)
    .fetch_optional(executor)
    .await?;

    row.map(|row| lead_from_row(&row)).transpose()
}

pub(crate) async fn find_by_email<'e, E>(
    executor: E,
    email: &str,
) -> Result<Option<Lead>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads WHERE lower(email) = lower(?) ORDER BY created_at ASC LIMIT 1"
    ))
    .bind(email)
    .fetch_optional(executor)
    .await?;

    row.map(|row| lead_from_row(&row)).transpose()
}

pub(crate) async fn upsert<'e, E>(executor: E, lead: &Lead) -> Result<(), RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO leads (
            id,
            full_name,
            phone,
            email,
            status,
            dial_score,
            dialed_at,
            last_contacted_at,
            timezone,
            notes,
            created_at,
            updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            full_name = excluded.full_name,
            phone = excluded.phone,
            email = excluded.email,
            status = excluded.status,
            dial_score = excluded.dial_score,
            dialed_at = excluded.dialed_at,
            last_contacted_at = excluded.last_contacted_at,
            timezone = excluded.timezone,
            notes = excluded.notes,
            updated_at = excluded.updated_at",
    )
    .bind(&lead.id.0)
    .bind(&lead.full_name)
    .bind(lead.phone.as_deref())
    .bind(lead.email.as_deref())
    .bind(lead.status.as_str())
    .bind(lead.dial_score.map(i64::from))
    .bind(encode_optional_timestamp(lead.dialed_at))
    .bind(encode_optional_timestamp(lead.last_contacted_at))
    .bind(lead.timezone.as_deref())
    .bind(&lead.notes)
    .bind(encode_timestamp(lead.created_at))
    .bind(encode_timestamp(lead.updated_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn delete<'e, E>(executor: E, id: &LeadId) -> Result<bool, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM leads WHERE id = ?").bind(&id.0).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}

/// Sets `status` and appends `note` only if the stored status is still `expected`.
/// Returns `false` when the lead is gone or moved on.
pub(crate) async fn transition_status<'e, E>(
    executor: E,
    id: &LeadId,
    expected: LeadStatus,
    next: LeadStatus,
    note: Option<&str>,
    at: DateTime<Utc>,
) -> Result<bool, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    write_status(executor, id, Some(expected), next, note, at).await
}

/// Sets `status` and appends `note` whatever the stored status is.
pub(crate) async fn update_status<'e, E>(
    executor: E,
    id: &LeadId,
    status: LeadStatus,
    note: Option<&str>,
    at: DateTime<Utc>,
) -> Result<bool, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    write_status(executor, id, None, status, note, at).await
}

async fn write_status<'e, E>(
    executor: E,
    id: &LeadId,
    expected: Option<LeadStatus>,
    next: LeadStatus,
    note: Option<&str>,
    at: DateTime<Utc>,
) -> Result<bool, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let note = note.map(str::trim).filter(|note| !note.is_empty());
    let result = sqlx::query(
        "UPDATE leads
            SET updated_at = CASE WHEN status = ? AND ? IS NULL THEN updated_at ELSE ? END,
                notes = CASE
                    WHEN ? IS NULL THEN notes
                    WHEN notes = '' THEN ?
                    ELSE notes || char(10) || ?
                END,
                status = ?
          WHERE id = ?
            AND (? IS NULL OR status = ?)",
    )
    .bind(next.as_str())
    .bind(note)
    .bind(encode_timestamp(at))
    .bind(note)
    .bind(note)
    .bind(note)
    .bind(next.as_str())
    .bind(&id.0)
    .bind(expected.map(|status| status.as_str()))
    .bind(expected.map(|status| status.as_str()))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Touch columns only; mirrors [`Lead::record_touch`].
pub(crate) async fn record_touch<'e, E>(
    executor: E,
    id: &LeadId,
    dialed: bool,
    at: DateTime<Utc>,
) -> Result<(), RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let at = encode_timestamp(at);
    sqlx::query(
        "UPDATE leads
            SET last_contacted_at = ?,
                dial_score = COALESCE(dial_score, 0) + 1,
                dialed_at = CASE WHEN ? THEN ? ELSE dialed_at END,
                updated_at = ?
          WHERE id = ?",
    )
    .bind(&at)
    .bind(dialed)
    .bind(&at)
    .bind(&at)
    .bind(&id.0)
    .execute(executor)
    .await?;

    Ok(())
}

/// NEW/WORKING leads with a phone, oldest first, joined with their quarantine and
/// planned-touch markers.
pub(crate) async fn planning_candidates<'e, E>(
    executor: E,
    limit: u32,
) -> Result<Vec<PlanningCandidate>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let [first, second] = LeadStatus::plannable();
    let rows = sqlx::query(
        "SELECT
            l.id AS id,
            l.full_name AS full_name,
            l.phone AS phone,
            l.email AS email,
            l.status AS status,
            l.dial_score AS dial_score,
            l.dialed_at AS dialed_at,
            l.last_contacted_at AS last_contacted_at,
            l.timezone AS timezone,
            l.notes AS notes,
            l.created_at AS created_at,
            l.updated_at AS updated_at,
            m.value AS quarantined,
            t.value AS last_planned_touch
         FROM leads l
         LEFT JOIN lead_memory m ON m.lead_id = l.id AND m.key = 'quarantined'
         LEFT JOIN lead_memory t ON t.lead_id = l.id AND t.key = 'last_planned_touch'
         WHERE l.phone IS NOT NULL
           AND trim(l.phone) <> ''
           AND l.status IN (?, ?)
         ORDER BY l.created_at ASC, l.rowid ASC
         LIMIT ?",
    )
    .bind(first.as_str())
    .bind(second.as_str())
    .bind(i64::from(limit))
    .fetch_all(executor)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<PlanningCandidate, RepositoryError> {
            let quarantined = row.try_get::<Option<String>, _>("quarantined")?;
            let last_planned_touch = row.try_get::<Option<String>, _>("last_planned_touch")?;
            Ok(PlanningCandidate {
                lead: lead_from_row(&row)?,
                flags: LeadFlags {
                    quarantined: quarantined.as_deref() == Some(LeadFlags::SET),
                    last_planned_touch: last_planned_touch.as_deref().and_then(LeadFlags::parse_touch),
                },
            })
        })
        .collect()
}

pub(crate) async fn list_recent<'e, E>(executor: E, limit: u32) -> Result<Vec<Lead>, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC, rowid DESC LIMIT ?"
    ))
    .bind(i64::from(limit))
    .fetch_all(executor)
    .await?;

    rows.iter().map(lead_from_row).collect()
}

fn lead_from_row(row: &SqliteRow) -> Result<Lead, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = LeadStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown lead status `{status_raw}`")))?;

    Ok(Lead {
        id: LeadId(row.try_get("id")?),
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        status,
        dial_score: row
            .try_get::<Option<i64>, _>("dial_score")?
            .map(|value| parse_u32("dial_score", value))
            .transpose()?,
        dialed_at: parse_optional_timestamp("dialed_at", row.try_get("dialed_at")?)?,
        last_contacted_at: parse_optional_timestamp(
            "last_contacted_at",
            row.try_get("last_contacted_at")?,
        )?,
        timezone: row.try_get("timezone")?,
        notes: row.try_get("notes")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
