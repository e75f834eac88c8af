use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Working,
    Ready,
    Contacted,
    Closed,
    Dnc,
    DoNotContact,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Working => "WORKING",
            Self::Ready => "READY",
            Self::Contacted => "CONTACTED",
            Self::Closed => "CLOSED",
            Self::Dnc => "DNC",
            Self::DoNotContact => "DO_NOT_CONTACT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NEW" => Some(Self::New),
            "WORKING" => Some(Self::Working),
            "READY" => Some(Self::Ready),
            "CONTACTED" => Some(Self::Contacted),
            "CLOSED" => Some(Self::Closed),
            "DNC" => Some(Self::Dnc),
            "DO_NOT_CONTACT" => Some(Self::DoNotContact),
            _ => None,
        }
    }

    /// Compliance hard stops. Leads in these states never receive automated outreach.
    pub fn is_compliance_stop(&self) -> bool {
        matches!(self, Self::Dnc | Self::DoNotContact)
    }

    /// Statuses the planner selects leads from.
    pub fn plannable() -> [Self; 2] {
        [Self::New, Self::Working]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub dial_score: Option<u32>,
    pub dialed_at: Option<DateTime<Utc>>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(
        id: LeadId,
        full_name: impl Into<String>,
        phone: Option<String>,
        email: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            phone,
            email,
            status: LeadStatus::New,
            dial_score: Some(0),
            dialed_at: None,
            last_contacted_at: None,
            timezone: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn append_note(&mut self, note: &str) {
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(note);
    }

    /// Records a completed outbound touch. Every touch counts as an attempt; calls also
    /// start the dial cooldown.
    pub fn record_touch(&mut self, dialed: bool, now: DateTime<Utc>) {
        self.last_contacted_at = Some(now);
        self.dial_score = Some(self.dial_score.unwrap_or(0).saturating_add(1));
        if dialed {
            self.dialed_at = Some(now);
        }
        self.updated_at = now;
    }
}

/// Typed keys for the per-lead memory table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadMemoryKey {
    Quarantined,
    LastInboundIntent,
    LastInboundText,
    LastHumanNote,
    /// When the planner last queued a text or nudge for the lead.
    LastPlannedTouch,
}

impl LeadMemoryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarantined => "quarantined",
            Self::LastInboundIntent => "last_inbound_intent",
            Self::LastInboundText => "last_inbound_text",
            Self::LastHumanNote => "last_human_note",
            Self::LastPlannedTouch => "last_planned_touch",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "quarantined" => Some(Self::Quarantined),
            "last_inbound_intent" => Some(Self::LastInboundIntent),
            "last_inbound_text" => Some(Self::LastInboundText),
            "last_human_note" => Some(Self::LastHumanNote),
            "last_planned_touch" => Some(Self::LastPlannedTouch),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadMemoryEntry {
    pub lead_id: LeadId,
    pub key: LeadMemoryKey,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Flags the planner reads out of lead memory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadFlags {
    pub quarantined: bool,
    pub last_planned_touch: Option<DateTime<Utc>>,
}

impl LeadFlags {
    pub const SET: &'static str = "1";

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LeadMemoryEntry>) -> Self {
        let mut flags = Self::default();
        for entry in entries {
            match entry.key {
                LeadMemoryKey::Quarantined => flags.quarantined = entry.value == Self::SET,
                LeadMemoryKey::LastPlannedTouch => {
                    flags.last_planned_touch = Self::parse_touch(&entry.value);
                }
                _ => {}
            }
        }
        flags
    }

    /// Unparseable values read as "never planned".
    pub fn parse_touch(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value.trim()).ok().map(|touched| touched.with_timezone(&Utc))
    }

    pub fn encode_touch(at: DateTime<Utc>) -> String {
        at.to_rfc3339()
    }
}
