use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Planning,
    Execution,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Execution => "execution",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planning" => Some(Self::Planning),
            "execution" => Some(Self::Execution),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Started,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "STARTED" => Some(Self::Started),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One planning or execution batch. Audit entries written during the batch carry its id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: RunId,
    pub mode: RunMode,
    pub status: RunStatus,
    pub batch_size: u32,
    pub planned: u32,
    pub considered: u32,
    pub notes: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl AgentRun {
    pub fn start(mode: RunMode, batch_size: u32, notes: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: RunId::generate(),
            mode,
            status: RunStatus::Started,
            batch_size,
            planned: 0,
            considered: 0,
            notes: notes.into(),
            started_at: now,
            finished_at: None,
        }
    }

    pub fn succeed(&mut self, planned: u32, considered: u32, now: DateTime<Utc>) {
        self.status = RunStatus::Succeeded;
        self.planned = planned;
        self.considered = considered;
        self.finished_at = Some(now);
    }

    pub fn fail(&mut self, error: &str, now: DateTime<Utc>) {
        self.status = RunStatus::Failed;
        self.notes = format!("{} | failed: {error}", self.notes);
        self.finished_at = Some(now);
    }

    pub fn is_open(&self) -> bool {
        self.status == RunStatus::Started
    }
}
