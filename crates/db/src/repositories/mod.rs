use agencyvault_core::chrono::{DateTime, SecondsFormat, Utc};
use agencyvault_core::errors::ApplicationError;
use thiserror::Error;

pub mod action;
pub mod agent_run;
pub mod audit;
pub mod lead;
pub mod lead_memory;
pub mod memory;
pub mod message;
pub mod store;

pub use memory::InMemoryOutreachStore;
pub use store::SqlOutreachStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Fixed-width UTC so lexical order in SQLite matches time order.
pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn encode_optional_timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(encode_timestamp)
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

#[cfg(test)]
mod tests {
    use agencyvault_core::chrono::{TimeZone, Utc};
    use agencyvault_core::errors::ApplicationError;

    use super::{encode_timestamp, parse_timestamp, parse_u32, RepositoryError};

    #[test]
    fn timestamps_encode_with_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).single().expect("valid time");

        let encoded = encode_timestamp(whole);

        assert_eq!(encoded, "2026-03-02T18:00:00.000000Z");
        assert_eq!(parse_timestamp("created_at", encoded).expect("parse"), whole);
    }

    #[test]
    fn decode_failures_become_persistence_errors() {
        let error = parse_u32("dial_score", -1).expect_err("negative");

        assert!(matches!(error, RepositoryError::Decode(ref message) if message.contains("dial_score")));
        assert!(matches!(ApplicationError::from(error), ApplicationError::Persistence(_)));
    }
}
