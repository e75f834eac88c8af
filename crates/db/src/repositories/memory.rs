use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use agencyvault_core::audit::AuditEntry;
use agencyvault_core::chrono::{DateTime, Utc};
use agencyvault_core::contact::normalize_email;
use agencyvault_core::domain::action::{Action, ActionId, ActionKind, ActionStatus};
use agencyvault_core::domain::lead::{
    Lead, LeadFlags, LeadId, LeadMemoryEntry, LeadMemoryKey, LeadStatus,
};
use agencyvault_core::domain::message::Message;
use agencyvault_core::domain::run::{AgentRun, RunId};
use agencyvault_core::errors::ApplicationError;
use agencyvault_core::outreach::store::{
    OutreachPlan, OutreachStore, PlanCommit, PlanningCandidate,
};

#[derive(Default)]
struct State {
    leads: HashMap<String, Lead>,
    /// Insertion order doubles as the rowid tiebreak the SQL store uses.
    actions: Vec<Action>,
    runs: HashMap<String, AgentRun>,
    audit: Vec<AuditEntry>,
    memory: HashMap<(String, LeadMemoryKey), LeadMemoryEntry>,
    messages: Vec<Message>,
    /// `save_action` fails for actions in these statuses.
    rejected_action_saves: Vec<ActionStatus>,
}

impl State {
    fn set_memory(&mut self, lead_id: &LeadId, key: LeadMemoryKey, value: &str, at: DateTime<Utc>) {
        self.memory.insert(
            (lead_id.0.clone(), key),
            LeadMemoryEntry { lead_id: lead_id.clone(), key, value: value.to_string(), updated_at: at },
        );
    }

    fn write_status(
        &mut self,
        id: &LeadId,
        expected: Option<LeadStatus>,
        next: LeadStatus,
        note: Option<&str>,
        at: DateTime<Utc>,
    ) -> bool {
        let Some(lead) = self.leads.get_mut(&id.0) else {
            return false;
        };
        if expected.is_some_and(|expected| lead.status != expected) {
            return false;
        }
        let note = note.map(str::trim).filter(|note| !note.is_empty());
        if lead.status != next || note.is_some() {
            lead.updated_at = at;
        }
        lead.status = next;
        if let Some(note) = note {
            lead.append_note(note);
        }
        true
    }

    fn upsert_action(&mut self, action: &Action) {
        match self.actions.iter_mut().find(|existing| existing.id == action.id) {
            Some(existing) => *existing = action.clone(),
            None => self.actions.push(action.clone()),
        }
    }
}

/// Process-local [`OutreachStore`] for tests and dry runs.
///
/// A single lock covers every table, so [`OutreachStore::commit_plan`] is atomic.
#[derive(Default)]
pub struct InMemoryOutreachStore {
    state: RwLock<State>,
    fail_commits: AtomicBool,
}

impl InMemoryOutreachStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `commit_plan` fail without writing anything.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Makes `save_action` fail for actions in any of `statuses`. An empty slice clears it.
    pub async fn reject_action_saves(&self, statuses: &[ActionStatus]) {
        self.state.write().await.rejected_action_saves = statuses.to_vec();
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.clone()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.read().await.audit.clone()
    }

    pub async fn actions(&self) -> Vec<Action> {
        self.state.read().await.actions.clone()
    }

    pub async fn runs(&self) -> Vec<AgentRun> {
        let state = self.state.read().await;
        let mut runs: Vec<AgentRun> = state.runs.values().cloned().collect();
        runs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.0.cmp(&b.id.0)));
        runs
    }

    pub async fn find_run(&self, run_id: &RunId) -> Option<AgentRun> {
        self.state.read().await.runs.get(&run_id.0).cloned()
    }
}

#[async_trait::async_trait]
impl OutreachStore for InMemoryOutreachStore {
    async fn find_lead(&self, id: &LeadId) -> Result<Option<Lead>, ApplicationError> {
        Ok(self.state.read().await.leads.get(&id.0).cloned())
    }

    async fn find_lead_by_phone(&self, phone: &str) -> Result<Option<Lead>, ApplicationError> {
        let state = self.state.read().await;
        Ok(state.leads.values().find(|lead| lead.phone.as_deref() == Some(phone)).cloned())
    }

    async fn find_lead_by_email(&self, email: &str) -> Result<Option<Lead>, ApplicationError> {
        let Some(wanted) = normalize_email(email) else {
            return Ok(None);
        };
        let state = self.state.read().await;
        Ok(state
            .leads
            .values()
            .find(|lead| lead.email.as_deref().and_then(normalize_email).as_deref() == Some(&wanted))
            .cloned())
    }

    async fn save_lead(&self, lead: &Lead) -> Result<(), ApplicationError> {
        self.state.write().await.leads.insert(lead.id.0.clone(), lead.clone());
        Ok(())
    }

    async fn delete_lead(&self, id: &LeadId) -> Result<bool, ApplicationError> {
        let mut state = self.state.write().await;
        if state.leads.remove(&id.0).is_none() {
            return Ok(false);
        }
        state.actions.retain(|action| &action.lead_id != id);
        state.memory.retain(|(lead_id, _), _| lead_id != &id.0);
        state.messages.retain(|message| &message.lead_id != id);
        Ok(true)
    }

    async fn update_lead_status(
        &self,
        id: &LeadId,
        status: LeadStatus,
        note: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool, ApplicationError> {
        Ok(self.state.write().await.write_status(id, None, status, note, at))
    }

    async fn record_touch(
        &self,
        id: &LeadId,
        dialed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        if let Some(lead) = self.state.write().await.leads.get_mut(&id.0) {
            lead.record_touch(dialed, at);
        }
        Ok(())
    }

    async fn planning_candidates(
        &self,
        limit: u32,
    ) -> Result<Vec<PlanningCandidate>, ApplicationError> {
        let state = self.state.read().await;
        let plannable = LeadStatus::plannable();
        let mut leads: Vec<&Lead> = state
            .leads
            .values()
            .filter(|lead| plannable.contains(&lead.status))
            .filter(|lead| lead.phone.as_deref().is_some_and(|phone| !phone.trim().is_empty()))
            .collect();
        leads.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));

        Ok(leads
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|lead| {
                let flags = LeadFlags::from_entries(
                    [LeadMemoryKey::Quarantined, LeadMemoryKey::LastPlannedTouch]
                        .into_iter()
                        .filter_map(|key| state.memory.get(&(lead.id.0.clone(), key))),
                );
                PlanningCandidate { lead: lead.clone(), flags }
            })
            .collect())
    }

    async fn memory_get(
        &self,
        lead_id: &LeadId,
        key: LeadMemoryKey,
    ) -> Result<Option<String>, ApplicationError> {
        let state = self.state.read().await;
        Ok(state.memory.get(&(lead_id.0.clone(), key)).map(|entry| entry.value.clone()))
    }

    async fn memory_set(
        &self,
        lead_id: &LeadId,
        key: LeadMemoryKey,
        value: &str,
    ) -> Result<(), ApplicationError> {
        self.state.write().await.set_memory(lead_id, key, value, Utc::now());
        Ok(())
    }

    async fn find_action(&self, id: &ActionId) -> Result<Option<Action>, ApplicationError> {
        let state = self.state.read().await;
        Ok(state.actions.iter().find(|action| &action.id == id).cloned())
    }

    async fn save_action(&self, action: &Action) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        if state.rejected_action_saves.contains(&action.status) {
            return Err(ApplicationError::Persistence(format!(
                "save rejected for {} action {}",
                action.status.as_str(),
                action.id
            )));
        }
        state.upsert_action(action);
        Ok(())
    }

    async fn claim_action(&self, action: &Action) -> Result<bool, ApplicationError> {
        let mut state = self.state.write().await;
        let Some(stored) = state.actions.iter_mut().find(|existing| existing.id == action.id) else {
            return Ok(false);
        };
        if stored.status != ActionStatus::Pending {
            return Ok(false);
        }
        stored.status = ActionStatus::Running;
        stored.started_at = action.started_at;
        Ok(true)
    }

    async fn pending_outbound_actions(&self, limit: u32) -> Result<Vec<Action>, ApplicationError> {
        let state = self.state.read().await;
        let mut pending: Vec<&Action> = state
            .actions
            .iter()
            .filter(|action| action.status == ActionStatus::Pending)
            .filter(|action| matches!(action.kind, ActionKind::Text | ActionKind::Call))
            .collect();
        // Stable sort keeps insertion order among equal keys.
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.due_at.cmp(&b.due_at)));

        Ok(pending
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn pending_actions_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<Action>, ApplicationError> {
        let state = self.state.read().await;
        Ok(state
            .actions
            .iter()
            .filter(|action| &action.lead_id == lead_id && action.status == ActionStatus::Pending)
            .cloned()
            .collect())
    }

    async fn running_actions_started_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Action>, ApplicationError> {
        let state = self.state.read().await;
        let mut running: Vec<&Action> = state
            .actions
            .iter()
            .filter(|action| action.status == ActionStatus::Running)
            .filter(|action| action.started_at.is_some_and(|started| started < cutoff))
            .collect();
        running.sort_by_key(|action| action.started_at);

        Ok(running
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn save_run(&self, run: &AgentRun) -> Result<(), ApplicationError> {
        self.state.write().await.runs.insert(run.id.0.clone(), run.clone());
        Ok(())
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), ApplicationError> {
        self.state.write().await.audit.push(entry);
        Ok(())
    }

    async fn record_message(&self, message: &Message) -> Result<(), ApplicationError> {
        let mut state = self.state.write().await;
        if !state.leads.contains_key(&message.lead_id.0) {
            return Err(ApplicationError::Persistence(format!(
                "message {} references unknown lead {}",
                message.id, message.lead_id
            )));
        }
        state.messages.push(message.clone());
        Ok(())
    }

    async fn messages_for_lead(&self, lead_id: &LeadId) -> Result<Vec<Message>, ApplicationError> {
        let state = self.state.read().await;
        let mut messages: Vec<Message> =
            state.messages.iter().filter(|message| &message.lead_id == lead_id).cloned().collect();
        messages.sort_by_key(|message| message.created_at);
        Ok(messages)
    }

    async fn commit_plan(&self, plan: &OutreachPlan) -> Result<PlanCommit, ApplicationError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(ApplicationError::Persistence(format!(
                "commit rejected for run {}",
                plan.run_id
            )));
        }

        let mut state = self.state.write().await;
        for action in &plan.actions {
            if !state.leads.contains_key(&action.lead_id.0) {
                return Err(ApplicationError::Persistence(format!(
                    "action {} references unknown lead {}",
                    action.id.0, action.lead_id.0
                )));
            }
        }

        let stale: Vec<LeadId> = plan
            .transitions
            .iter()
            .filter(|transition| {
                state.leads.get(&transition.lead_id.0).map(|lead| lead.status)
                    != Some(transition.expected)
            })
            .map(|transition| transition.lead_id.clone())
            .collect();
        let fresh = plan.without(&stale);

        for transition in &fresh.transitions {
            state.write_status(
                &transition.lead_id,
                Some(transition.expected),
                transition.next,
                transition.note.as_deref(),
                plan.planned_at,
            );
        }
        for lead_id in &fresh.quarantined {
            state.set_memory(lead_id, LeadMemoryKey::Quarantined, LeadFlags::SET, plan.planned_at);
        }
        let touched_at = LeadFlags::encode_touch(plan.planned_at);
        for lead_id in &fresh.touched {
            state.set_memory(lead_id, LeadMemoryKey::LastPlannedTouch, &touched_at, plan.planned_at);
        }
        for action in &fresh.actions {
            state.upsert_action(action);
        }
        state.audit.extend(fresh.audit.iter().cloned());
        Ok(PlanCommit { actions: fresh.planned(), stale })
    }
}
