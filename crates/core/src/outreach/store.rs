use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::domain::action::{Action, ActionId};
use crate::domain::lead::{Lead, LeadFlags, LeadId, LeadMemoryKey, LeadStatus};
use crate::domain::message::Message;
use crate::domain::run::{AgentRun, RunId};
use crate::errors::ApplicationError;

/// A lead selected for planning together with the memory flags the planner consults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningCandidate {
    pub lead: Lead,
    pub flags: LeadFlags,
}

/// Status the planner read for a lead and the status it leaves behind. `expected ==
/// next` is a pure guard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadTransition {
    pub lead_id: LeadId,
    pub expected: LeadStatus,
    pub next: LeadStatus,
    pub note: Option<String>,
}

/// Everything one planning batch wants to write. Stores commit it atomically.
///
/// Every lead the plan writes anything for carries a [`LeadTransition`]. At commit time a
/// lead whose stored status no longer equals `expected` is stale: its transition, actions,
/// memory markers and audit rows are all dropped, and the rest of the batch goes through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachPlan {
    pub run_id: RunId,
    pub planned_at: DateTime<Utc>,
    pub considered: u32,
    pub actions: Vec<Action>,
    pub transitions: Vec<LeadTransition>,
    pub quarantined: Vec<LeadId>,
    /// Leads that got a text queued this batch; stamped with `planned_at`.
    pub touched: Vec<LeadId>,
    pub audit: Vec<AuditEntry>,
}

impl OutreachPlan {
    pub fn empty(run_id: RunId, planned_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            planned_at,
            considered: 0,
            actions: Vec::new(),
            transitions: Vec::new(),
            quarantined: Vec::new(),
            touched: Vec::new(),
            audit: Vec::new(),
        }
    }

    pub fn planned(&self) -> u32 {
        u32::try_from(self.actions.len()).unwrap_or(u32::MAX)
    }

    pub fn actions_for(&self, lead_id: &LeadId) -> Vec<&Action> {
        self.actions.iter().filter(|action| &action.lead_id == lead_id).collect()
    }

    pub fn transition_for(&self, lead_id: &LeadId) -> Option<&LeadTransition> {
        self.transitions.iter().find(|transition| &transition.lead_id == lead_id)
    }

    /// The plan minus everything that belongs to `stale` leads. Run-level audit rows stay.
    pub fn without(&self, stale: &[LeadId]) -> Self {
        let fresh = |lead_id: &LeadId| !stale.contains(lead_id);
        Self {
            run_id: self.run_id.clone(),
            planned_at: self.planned_at,
            considered: self.considered,
            actions: self.actions.iter().filter(|action| fresh(&action.lead_id)).cloned().collect(),
            transitions: self
                .transitions
                .iter()
                .filter(|transition| fresh(&transition.lead_id))
                .cloned()
                .collect(),
            quarantined: self.quarantined.iter().filter(|&id| fresh(id)).cloned().collect(),
            touched: self.touched.iter().filter(|&id| fresh(id)).cloned().collect(),
            audit: self
                .audit
                .iter()
                .filter(|entry| entry.lead_id.as_ref().map_or(true, fresh))
                .cloned()
                .collect(),
        }
    }
}

/// What a store actually wrote for a plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCommit {
    pub actions: u32,
    /// Leads whose status changed between selection and commit.
    pub stale: Vec<LeadId>,
}

/// Data-access context injected into every outreach operation.
#[async_trait]
pub trait OutreachStore: Send + Sync {
    async fn find_lead(&self, id: &LeadId) -> Result<Option<Lead>, ApplicationError>;

    async fn find_lead_by_phone(&self, phone: &str) -> Result<Option<Lead>, ApplicationError>;

    async fn find_lead_by_email(&self, email: &str) -> Result<Option<Lead>, ApplicationError>;

    /// Full-row write. Concurrent workers use the narrower writes below instead.
    async fn save_lead(&self, lead: &Lead) -> Result<(), ApplicationError>;

    /// Sets status (and appends `note`) without touching any other column. Returns `false`
    /// when the lead does not exist.
    async fn update_lead_status(
        &self,
        id: &LeadId,
        status: LeadStatus,
        note: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool, ApplicationError>;

    /// Records a completed outbound touch on the touch columns only, as
    /// [`Lead::record_touch`] does in memory.
    async fn record_touch(
        &self,
        id: &LeadId,
        dialed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), ApplicationError>;

    /// Returns `true` when a lead was removed.
    async fn delete_lead(&self, id: &LeadId) -> Result<bool, ApplicationError>;

    /// Leads with a phone and a plannable status, oldest first, at most `limit`.
    async fn planning_candidates(
        &self,
        limit: u32,
    ) -> Result<Vec<PlanningCandidate>, ApplicationError>;

    async fn memory_get(
        &self,
        lead_id: &LeadId,
        key: LeadMemoryKey,
    ) -> Result<Option<String>, ApplicationError>;

    async fn memory_set(
        &self,
        lead_id: &LeadId,
        key: LeadMemoryKey,
        value: &str,
    ) -> Result<(), ApplicationError>;

    async fn find_action(&self, id: &ActionId) -> Result<Option<Action>, ApplicationError>;

    async fn save_action(&self, action: &Action) -> Result<(), ApplicationError>;

    /// Writes a RUNNING action only if the stored row is still PENDING. Returns `false`
    /// when someone else already moved it.
    async fn claim_action(&self, action: &Action) -> Result<bool, ApplicationError>;

    /// Pending TEXT/CALL actions, oldest created first. REVIEW actions are never returned.
    async fn pending_outbound_actions(&self, limit: u32) -> Result<Vec<Action>, ApplicationError>;

    async fn pending_actions_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<Action>, ApplicationError>;

    /// RUNNING actions started before `cutoff`, oldest first.
    async fn running_actions_started_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Action>, ApplicationError>;

    async fn save_run(&self, run: &AgentRun) -> Result<(), ApplicationError>;

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), ApplicationError>;

    async fn record_message(&self, message: &Message) -> Result<(), ApplicationError>;

    /// Oldest first.
    async fn messages_for_lead(&self, lead_id: &LeadId) -> Result<Vec<Message>, ApplicationError>;

    /// Writes a planning batch all-or-nothing, minus stale leads.
    async fn commit_plan(&self, plan: &OutreachPlan) -> Result<PlanCommit, ApplicationError>;
}
