use agencyvault_core::audit::AuditEntry;
use agencyvault_core::chrono::{DateTime, Utc};
use agencyvault_core::domain::action::{Action, ActionId, ActionStatus};
use agencyvault_core::domain::lead::{
    Lead, LeadFlags, LeadId, LeadMemoryEntry, LeadMemoryKey, LeadStatus,
};
use agencyvault_core::domain::message::Message;
use agencyvault_core::domain::run::{AgentRun, RunId, RunMode};
use agencyvault_core::errors::ApplicationError;
use agencyvault_core::outreach::store::{
    OutreachPlan, OutreachStore, PlanCommit, PlanningCandidate,
};

use super::{action, agent_run, audit, lead, lead_memory, message, RepositoryError};
use crate::DbPool;

/// SQLite-backed [`OutreachStore`]. Planning batches commit inside one transaction.
#[derive(Clone)]
pub struct SqlOutreachStore {
    pool: DbPool,
}

impl SqlOutreachStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn actions_for_lead(&self, lead_id: &LeadId) -> Result<Vec<Action>, RepositoryError> {
        action::for_lead(&self.pool, lead_id, None).await
    }

    pub async fn audit_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        audit::for_lead(&self.pool, lead_id).await
    }

    pub async fn audit_for_run(&self, run_id: &RunId) -> Result<Vec<AuditEntry>, RepositoryError> {
        audit::for_run(&self.pool, run_id).await
    }

    pub async fn memory_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<LeadMemoryEntry>, RepositoryError> {
        lead_memory::for_lead(&self.pool, lead_id).await
    }

    pub async fn find_run(&self, run_id: &RunId) -> Result<Option<AgentRun>, RepositoryError> {
        agent_run::find_by_id(&self.pool, run_id).await
    }

    pub async fn latest_run(&self, mode: RunMode) -> Result<Option<AgentRun>, RepositoryError> {
        agent_run::latest_for_mode(&self.pool, mode).await
    }

    pub async fn recent_runs(&self, limit: u32) -> Result<Vec<AgentRun>, RepositoryError> {
        agent_run::recent(&self.pool, limit).await
    }

    pub async fn pending_outbound_count(&self) -> Result<i64, RepositoryError> {
        action::pending_outbound_count(&self.pool).await
    }

    pub async fn recent_leads(&self, limit: u32) -> Result<Vec<Lead>, RepositoryError> {
        lead::list_recent(&self.pool, limit).await
    }
}

#[async_trait::async_trait]
impl OutreachStore for SqlOutreachStore {
    async fn find_lead(&self, id: &LeadId) -> Result<Option<Lead>, ApplicationError> {
        Ok(lead::find_by_id(&self.pool, id).await?)
    }

    async fn find_lead_by_phone(&self, phone: &str) -> Result<Option<Lead>, ApplicationError> {
        Ok(lead::find_by_phone(&self.pool, phone).await?)
    }

    async fn find_lead_by_email(&self, email: &str) -> Result<Option<Lead>, ApplicationError> {
        Ok(lead::find_by_email(&self.pool, email).await?)
    }

    async fn save_lead(&self, lead: &Lead) -> Result<(), ApplicationError> {
        Ok(lead::upsert(&self.pool, lead).await?)
    }

    async fn update_lead_status(
        &self,
        id: &LeadId,
        status: LeadStatus,
        note: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool, ApplicationError> {
        Ok(lead::update_status(&self.pool, id, status, note, at).await?)
    }

    async fn record_touch(
        &self,
        id: &LeadId,
        dialed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        Ok(lead::record_touch(&self.pool, id, dialed, at).await?)
    }

    async fn delete_lead(&self, id: &LeadId) -> Result<bool, ApplicationError> {
        Ok(lead::delete(&self.pool, id).await?)
    }

    async fn planning_candidates(
        &self,
        limit: u32,
    ) -> Result<Vec<PlanningCandidate>, ApplicationError> {
        Ok(lead::planning_candidates(&self.pool, limit).await?)
    }

    async fn memory_get(
        &self,
        lead_id: &LeadId,
        key: LeadMemoryKey,
    ) -> Result<Option<String>, ApplicationError> {
        Ok(lead_memory::get(&self.pool, lead_id, key).await?)
    }

    async fn memory_set(
        &self,
        lead_id: &LeadId,
        key: LeadMemoryKey,
        value: &str,
    ) -> Result<(), ApplicationError> {
        Ok(lead_memory::set(&self.pool, lead_id, key, value, Utc::now()).await?)
    }

    async fn find_action(&self, id: &ActionId) -> Result<Option<Action>, ApplicationError> {
        Ok(action::find_by_id(&self.pool, id).await?)
    }

    async fn save_action(&self, action: &Action) -> Result<(), ApplicationError> {
        Ok(action::upsert(&self.pool, action).await?)
    }

    async fn claim_action(&self, action: &Action) -> Result<bool, ApplicationError> {
        Ok(action::claim(&self.pool, action).await?)
    }

    async fn pending_outbound_actions(&self, limit: u32) -> Result<Vec<Action>, ApplicationError> {
        Ok(action::pending_outbound(&self.pool, limit).await?)
    }

    async fn pending_actions_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<Action>, ApplicationError> {
        Ok(action::for_lead(&self.pool, lead_id, Some(ActionStatus::Pending)).await?)
    }

    async fn running_actions_started_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Action>, ApplicationError> {
        Ok(action::running_started_before(&self.pool, cutoff, limit).await?)
    }

    async fn save_run(&self, run: &AgentRun) -> Result<(), ApplicationError> {
        Ok(agent_run::upsert(&self.pool, run).await?)
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), ApplicationError> {
        Ok(audit::insert(&self.pool, &entry).await?)
    }

    async fn record_message(&self, message: &Message) -> Result<(), ApplicationError> {
        Ok(message::insert(&self.pool, message).await?)
    }

    async fn messages_for_lead(&self, lead_id: &LeadId) -> Result<Vec<Message>, ApplicationError> {
        Ok(message::for_lead(&self.pool, lead_id).await?)
    }

    async fn commit_plan(&self, plan: &OutreachPlan) -> Result<PlanCommit, ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let mut stale = Vec::new();
        for transition in &plan.transitions {
            let applied = lead::transition_status(
                &mut *tx,
                &transition.lead_id,
                transition.expected,
                transition.next,
                transition.note.as_deref(),
                plan.planned_at,
            )
            .await?;
            if !applied {
                stale.push(transition.lead_id.clone());
            }
        }
        let fresh = plan.without(&stale);

        for lead_id in &fresh.quarantined {
            lead_memory::set(
                &mut *tx,
                lead_id,
                LeadMemoryKey::Quarantined,
                LeadFlags::SET,
                plan.planned_at,
            )
            .await?;
        }
        let touched_at = LeadFlags::encode_touch(plan.planned_at);
        for lead_id in &fresh.touched {
            lead_memory::set(
                &mut *tx,
                lead_id,
                LeadMemoryKey::LastPlannedTouch,
                &touched_at,
                plan.planned_at,
            )
            .await?;
        }
        for planned in &fresh.actions {
            action::upsert(&mut *tx, planned).await?;
        }
        for entry in &fresh.audit {
            audit::insert(&mut *tx, entry).await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(PlanCommit { actions: fresh.planned(), stale })
    }
}

#[cfg(test)]
mod tests {
    use agencyvault_core::chrono::{DateTime, Duration, TimeZone, Utc};
    use agencyvault_core::domain::action::{Action, ActionKind, ActionPayload, ActionStatus};
    use agencyvault_core::domain::lead::{Lead, LeadId, LeadMemoryKey, LeadStatus};
    use agencyvault_core::domain::run::RunId;
    use agencyvault_core::domain::message::Message;
    use agencyvault_core::outreach::store::{LeadTransition, OutreachPlan, OutreachStore};

    use super::SqlOutreachStore;
    use crate::{connect_with_settings, migrations};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).single().expect("valid time")
    }

    async fn store() -> SqlOutreachStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlOutreachStore::new(pool)
    }

    fn lead(id: &str, phone: &str, created_at: DateTime<Utc>) -> Lead {
        Lead::new(LeadId(id.to_string()), "Maria Gomez", Some(phone.to_string()), None, created_at)
    }

    #[tokio::test]
    async fn lead_and_action_round_trip() {
        let store = store().await;
        let mut saved = lead("L-1", "+15551234567", now());
        saved.email = Some("maria@example.com".to_string());
        saved.timezone = Some("America/Chicago".to_string());
        saved.dialed_at = Some(now() - Duration::hours(3));
        store.save_lead(&saved).await.expect("save lead");

        let action = Action::pending(
            saved.id.clone(),
            ActionKind::Call,
            ActionPayload { to: Some("+15551234567".to_string()), ..ActionPayload::default() },
            now() + Duration::minutes(2),
            now(),
        );
        store.save_action(&action).await.expect("save action");

        assert_eq!(store.find_lead(&saved.id).await.expect("find"), Some(saved.clone()));
        assert_eq!(
            store.find_lead_by_email("MARIA@example.com").await.expect("by email"),
            Some(saved.clone())
        );
        assert_eq!(store.find_action(&action.id).await.expect("find action"), Some(action.clone()));
        assert_eq!(
            store.pending_actions_for_lead(&saved.id).await.expect("pending"),
            vec![action]
        );
    }

    #[tokio::test]
    async fn planning_candidates_are_oldest_first_and_carry_quarantine_flag() {
        let store = store().await;
        let older = lead("L-OLD", "5551234567", now() - Duration::days(2));
        let newer = lead("L-NEW", "+15550000001", now() - Duration::days(1));
        let mut closed = lead("L-CLOSED", "+15550000002", now() - Duration::days(3));
        closed.status = LeadStatus::Closed;
        let mut phoneless = lead("L-NOPHONE", "", now() - Duration::days(4));
        phoneless.phone = None;

        for lead in [&newer, &older, &closed, &phoneless] {
            store.save_lead(lead).await.expect("save lead");
        }
        store.memory_set(&older.id, LeadMemoryKey::Quarantined, "1").await.expect("flag");

        let candidates = store.planning_candidates(10).await.expect("candidates");

        let ids: Vec<&str> = candidates.iter().map(|c| c.lead.id.0.as_str()).collect();
        assert_eq!(ids, vec!["L-OLD", "L-NEW"]);
        assert!(candidates[0].flags.quarantined);
        assert!(!candidates[1].flags.quarantined);
        assert_eq!(store.planning_candidates(1).await.expect("limited").len(), 1);
    }

    #[tokio::test]
    async fn review_actions_are_never_pending_outbound() {
        let store = store().await;
        let saved = lead("L-1", "+15551234567", now());
        store.save_lead(&saved).await.expect("save lead");

        let review =
            Action::pending(saved.id.clone(), ActionKind::Review, ActionPayload::default(), now(), now());
        let text = Action::pending(
            saved.id.clone(),
            ActionKind::Text,
            ActionPayload::default(),
            now(),
            now() + Duration::seconds(1),
        );
        let mut done = Action::pending(saved.id.clone(), ActionKind::Call, ActionPayload::default(), now(), now());
        done.start(now()).expect("start");
        done.complete(now()).expect("complete");
        for action in [&review, &text, &done] {
            store.save_action(action).await.expect("save action");
        }

        let pending = store.pending_outbound_actions(10).await.expect("pending");

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, text.id);
        assert_eq!(pending[0].status, ActionStatus::Pending);
    }

    #[tokio::test]
    async fn failed_commit_writes_nothing() {
        let store = store().await;
        let saved = lead("L-1", "+15551234567", now());
        store.save_lead(&saved).await.expect("save lead");

        let mut plan = OutreachPlan::empty(RunId("run-1".to_string()), now());
        plan.transitions.push(LeadTransition {
            lead_id: saved.id.clone(),
            expected: LeadStatus::New,
            next: LeadStatus::Working,
            note: None,
        });
        plan.actions.push(Action::pending(
            saved.id.clone(),
            ActionKind::Text,
            ActionPayload::default(),
            now(),
            now(),
        ));
        // Foreign key violation on the second action aborts the whole batch.
        plan.actions.push(Action::pending(
            LeadId("L-MISSING".to_string()),
            ActionKind::Text,
            ActionPayload::default(),
            now(),
            now(),
        ));

        store.commit_plan(&plan).await.expect_err("commit should fail");

        let reloaded = store.find_lead(&saved.id).await.expect("find").expect("lead exists");
        assert_eq!(reloaded.status, LeadStatus::New);
        assert!(store.actions_for_lead(&saved.id).await.expect("actions").is_empty());
    }

    #[tokio::test]
    async fn deleting_a_lead_removes_actions_and_memory_but_keeps_audit() {
        let store = store().await;
        let saved = lead("L-1", "+15551234567", now());
        store.save_lead(&saved).await.expect("save lead");
        store
            .save_action(&Action::pending(
                saved.id.clone(),
                ActionKind::Text,
                ActionPayload::default(),
                now(),
                now(),
            ))
            .await
            .expect("save action");
        store.memory_set(&saved.id, LeadMemoryKey::LastHumanNote, "call back").await.expect("memo");
        store
            .append_audit(agencyvault_core::audit::AuditEntry::new(
                None,
                Some(saved.id.clone()),
                agencyvault_core::audit::AuditEventKind::LeadCreated,
                "name=Maria Gomez",
                now(),
            ))
            .await
            .expect("audit");

        assert!(store.delete_lead(&saved.id).await.expect("delete"));
        assert!(!store.delete_lead(&saved.id).await.expect("second delete"));

        assert!(store.actions_for_lead(&saved.id).await.expect("actions").is_empty());
        assert!(store.memory_for_lead(&saved.id).await.expect("memory").is_empty());
        assert_eq!(store.audit_for_lead(&saved.id).await.expect("audit").len(), 1);
    }

    #[tokio::test]
    async fn stale_leads_are_dropped_from_a_commit_without_failing_it() {
        let store = store().await;
        let kept = lead("L-KEEP", "+15551234567", now());
        let opted_out = lead("L-STOP", "+15557654321", now());
        for lead in [&kept, &opted_out] {
            store.save_lead(lead).await.expect("save lead");
        }

        let mut plan = OutreachPlan::empty(RunId("run-1".to_string()), now());
        for lead in [&kept, &opted_out] {
            plan.transitions.push(LeadTransition {
                lead_id: lead.id.clone(),
                expected: LeadStatus::New,
                next: LeadStatus::Working,
                note: None,
            });
            plan.actions.push(Action::pending(
                lead.id.clone(),
                ActionKind::Text,
                ActionPayload::default(),
                now(),
                now(),
            ));
            plan.touched.push(lead.id.clone());
        }
        // Opt-out lands between selection and commit.
        store
            .update_lead_status(&opted_out.id, LeadStatus::DoNotContact, Some("Opted out."), now())
            .await
            .expect("opt out");

        let commit = store.commit_plan(&plan).await.expect("commit");

        assert_eq!(commit.actions, 1);
        assert_eq!(commit.stale, vec![opted_out.id.clone()]);
        let reloaded = store.find_lead(&opted_out.id).await.expect("find").expect("lead");
        assert_eq!(reloaded.status, LeadStatus::DoNotContact);
        assert_eq!(reloaded.notes, "Opted out.");
        assert!(store.actions_for_lead(&opted_out.id).await.expect("actions").is_empty());
        assert!(store.memory_for_lead(&opted_out.id).await.expect("memory").is_empty());

        let candidates = store.planning_candidates(10).await.expect("candidates");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].lead.status, LeadStatus::Working);
        assert_eq!(candidates[0].flags.last_planned_touch, Some(now()));
    }

    #[tokio::test]
    async fn narrow_writes_leave_other_columns_alone() {
        let store = store().await;
        let mut saved = lead("L-1", "+15551234567", now() - Duration::days(1));
        saved.notes = "Imported.".to_string();
        store.save_lead(&saved).await.expect("save lead");

        store.record_touch(&saved.id, false, now()).await.expect("text touch");
        store.record_touch(&saved.id, true, now() + Duration::minutes(5)).await.expect("call touch");
        assert!(store
            .update_lead_status(&saved.id, LeadStatus::Contacted, None, now())
            .await
            .expect("status"));
        assert!(!store
            .update_lead_status(&LeadId("L-GONE".to_string()), LeadStatus::Closed, None, now())
            .await
            .expect("missing lead"));

        let reloaded = store.find_lead(&saved.id).await.expect("find").expect("lead");
        assert_eq!(reloaded.status, LeadStatus::Contacted);
        assert_eq!(reloaded.dial_score, Some(2));
        assert_eq!(reloaded.dialed_at, Some(now() + Duration::minutes(5)));
        assert_eq!(reloaded.last_contacted_at, Some(now() + Duration::minutes(5)));
        assert_eq!(reloaded.notes, "Imported.");
        assert_eq!(reloaded.full_name, saved.full_name);
    }

    #[tokio::test]
    async fn claim_only_moves_pending_actions() {
        let store = store().await;
        let saved = lead("L-1", "+15551234567", now());
        store.save_lead(&saved).await.expect("save lead");
        let mut action =
            Action::pending(saved.id.clone(), ActionKind::Text, ActionPayload::default(), now(), now());
        store.save_action(&action).await.expect("save action");

        action.start(now()).expect("start");
        assert!(store.claim_action(&action).await.expect("first claim"));
        assert!(!store.claim_action(&action).await.expect("second claim"));

        let stuck = store
            .running_actions_started_before(now() + Duration::minutes(20), 10)
            .await
            .expect("running");
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].status, ActionStatus::Running);
        assert!(store
            .running_actions_started_before(now(), 10)
            .await
            .expect("not yet stuck")
            .is_empty());
        assert_eq!(store.pending_outbound_count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn messages_are_listed_oldest_first_and_go_with_the_lead() {
        let store = store().await;
        let saved = lead("L-1", "+15551234567", now());
        store.save_lead(&saved).await.expect("save lead");
        let reply = Message::inbound(saved.id.clone(), "+15551234567", "yes", now() + Duration::minutes(1));
        let sent = Message::outbound(saved.id.clone(), "+15551234567", "Hi Maria", "SM1", now());
        store.record_message(&reply).await.expect("reply");
        store.record_message(&sent).await.expect("sent");

        assert_eq!(store.messages_for_lead(&saved.id).await.expect("messages"), vec![sent, reply]);

        store.delete_lead(&saved.id).await.expect("delete");
        assert!(store.messages_for_lead(&saved.id).await.expect("messages").is_empty());
    }
}
