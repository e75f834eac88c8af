use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{AuditEntry, AuditEventKind};
use crate::contact::{clean_text, normalize_email, normalize_phone, safe_full_name};
use crate::domain::lead::{Lead, LeadId};
use crate::errors::{ApplicationError, DomainError};
use crate::outreach::store::OutreachStore;

/// Raw lead fields as they arrive from a form, import, or operator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLead {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Normalizes and stores a new lead in status NEW.
///
/// Rejects a phone that cannot be normalized to E.164 and any lead whose phone or email
/// already belongs to another lead.
pub async fn create_lead<S>(
    store: &S,
    input: NewLead,
    now: DateTime<Utc>,
) -> Result<Lead, ApplicationError>
where
    S: OutreachStore + ?Sized,
{
    let phone = normalize_phone(&input.phone)
        .ok_or_else(|| DomainError::InvalidPhone(input.phone.trim().to_string()))?;
    let email = input.email.as_deref().and_then(normalize_email);

    if store.find_lead_by_phone(&phone).await?.is_some() {
        return Err(DomainError::DuplicateLead { field: "phone" }.into());
    }
    if let Some(email) = &email {
        if store.find_lead_by_email(email).await?.is_some() {
            return Err(DomainError::DuplicateLead { field: "email" }.into());
        }
    }

    let mut lead =
        Lead::new(LeadId::generate(), safe_full_name(&input.full_name), Some(phone), email, now);
    lead.timezone = input.timezone.as_deref().and_then(clean_text);

    store.save_lead(&lead).await?;
    store
        .append_audit(AuditEntry::new(
            None,
            Some(lead.id.clone()),
            AuditEventKind::LeadCreated,
            format!("name={}", lead.full_name),
            now,
        ))
        .await?;

    info!(event_name = "outreach.intake.created", lead_id = %lead.id, "lead created");
    Ok(lead)
}

/// Deletes a lead with its actions, memory and messages. The audit trail keeps a
/// LEAD_DELETED row naming who it was.
pub async fn remove_lead<S>(
    store: &S,
    lead_id: &LeadId,
    now: DateTime<Utc>,
) -> Result<Lead, ApplicationError>
where
    S: OutreachStore + ?Sized,
{
    let lead = store
        .find_lead(lead_id)
        .await?
        .ok_or_else(|| ApplicationError::NotFound { entity: "lead", id: lead_id.to_string() })?;

    if !store.delete_lead(&lead.id).await? {
        return Err(ApplicationError::NotFound { entity: "lead", id: lead_id.to_string() });
    }
    store
        .append_audit(AuditEntry::new(
            None,
            Some(lead.id.clone()),
            AuditEventKind::LeadDeleted,
            format!("name={} phone={}", lead.full_name, lead.phone.as_deref().unwrap_or_default()),
            now,
        ))
        .await?;

    info!(event_name = "outreach.intake.deleted", lead_id = %lead.id, "lead deleted");
    Ok(lead)
}
