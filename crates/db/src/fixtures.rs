use agencyvault_core::chrono::{DateTime, Duration, Utc};
use agencyvault_core::domain::lead::{Lead, LeadId, LeadStatus};

use crate::connection::DbPool;
use crate::repositories::{lead, RepositoryError};

/// Demo leads covering the planner's main branches.
const SEED_LEADS: &[SeedLeadContract] = &[
    SeedLeadContract {
        id: "lead-demo-new",
        full_name: "Maria Gomez",
        phone: Some("+15551234567"),
        email: Some("maria.gomez@example.com"),
        status: LeadStatus::New,
        dial_score: None,
        age_hours: 1,
        contacted_hours_ago: None,
        description: "fresh web lead, gets speed-to-lead text and call",
    },
    SeedLeadContract {
        id: "lead-demo-working",
        full_name: "James Carter",
        phone: Some("+15557654321"),
        email: None,
        status: LeadStatus::Working,
        dial_score: Some(2),
        age_hours: 72,
        contacted_hours_ago: Some(30),
        description: "stale working lead, due for a nudge",
    },
    SeedLeadContract {
        id: "lead-demo-malformed",
        full_name: "Insurance Lead",
        phone: Some("5551234567"),
        email: None,
        status: LeadStatus::New,
        dial_score: None,
        age_hours: 2,
        contacted_hours_ago: None,
        description: "non-E.164 phone, quarantined for review",
    },
    SeedLeadContract {
        id: "lead-demo-dnc",
        full_name: "Pat Reyes",
        phone: Some("+15550001111"),
        email: None,
        status: LeadStatus::Dnc,
        dial_score: None,
        age_hours: 96,
        contacted_hours_ago: None,
        description: "do-not-call, never planned",
    },
];

/// Deterministic demo dataset for local runs and smoke tests.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// Upserts the demo leads. Reloading resets them to their seeded state.
    pub async fn load(pool: &DbPool, now: DateTime<Utc>) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        for seed in SEED_LEADS {
            lead::upsert(&mut *tx, &seed.to_lead(now)).await?;
        }
        tx.commit().await?;

        let leads_seeded = SEED_LEADS
            .iter()
            .map(|seed| LeadSeedInfo { lead_id: seed.id, description: seed.description })
            .collect();
        Ok(SeedResult { leads_seeded })
    }

    /// Checks that every demo lead exists with its seeded phone.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SEED_LEADS.len());
        for seed in SEED_LEADS {
            let stored = lead::find_by_id(pool, &LeadId(seed.id.to_string())).await?;
            let matches = stored.is_some_and(|stored| stored.phone.as_deref() == seed.phone);
            checks.push((seed.id, matches));
        }

        Ok(VerificationResult { all_present: checks.iter().all(|(_, ok)| *ok), checks })
    }

    /// Removes the demo leads; their actions and memory go with them.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for seed in SEED_LEADS {
            lead::delete(&mut *tx, &LeadId(seed.id.to_string())).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedLeadContract {
    id: &'static str,
    full_name: &'static str,
    phone: Option<&'static str>,
    email: Option<&'static str>,
    status: LeadStatus,
    dial_score: Option<u32>,
    age_hours: i64,
    contacted_hours_ago: Option<i64>,
    description: &'static str,
}

impl SeedLeadContract {
    fn to_lead(self, now: DateTime<Utc>) -> Lead {
        let created_at = now - Duration::hours(self.age_hours);
        let mut lead = Lead::new(
            LeadId(self.id.to_string()),
            self.full_name,
            self.phone.map(str::to_string),
            self.email.map(str::to_string),
            created_at,
        );
        lead.status = self.status;
        lead.dial_score = self.dial_score;
        lead.last_contacted_at = self.contacted_hours_ago.map(|hours| now - Duration::hours(hours));
        lead
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub leads_seeded: Vec<LeadSeedInfo>,
}

#[derive(Debug)]
pub struct LeadSeedInfo {
    pub lead_id: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
