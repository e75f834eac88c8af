//! Outreach planner
//!
//! Turns a batch of eligible leads into concrete PENDING actions. Planning is split in
//! two: [`OutreachPlanner::plan_batch`] is pure and produces an [`OutreachPlan`], and
//! [`OutreachPlanner::plan_actions`] wraps it in an [`AgentRun`] and commits the plan
//! through the injected store in one transaction.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::audit::{AuditEntry, AuditEventKind};
use crate::contact::{is_e164, safe_first_name};
use crate::decision::{decide_next_action, Decision};
use crate::domain::action::{Action, ActionKind, ActionPayload};
use crate::domain::lead::{Lead, LeadStatus};
use crate::domain::run::{AgentRun, RunId, RunMode};
use crate::errors::ApplicationError;
use crate::outreach::store::{
    LeadTransition, OutreachPlan, OutreachStore, PlanCommit, PlanningCandidate,
};

/// Timing and copy knobs for a planning batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannerSettings {
    pub batch_size: u32,
    /// Delay between the speed-to-lead text and the first call.
    pub call_delay: Duration,
    /// Delay before a follow-up nudge text goes out.
    pub nudge_delay: Duration,
    /// Anti-spam guard: no nudge while the last sent or planned touch is more recent
    /// than this.
    pub nudge_quiet_period: Duration,
    pub office_name: String,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            batch_size: 25,
            call_delay: Duration::minutes(2),
            nudge_delay: Duration::minutes(5),
            nudge_quiet_period: Duration::hours(20),
            office_name: "AgencyVault".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReport {
    pub run_id: RunId,
    pub planned_actions: u32,
    pub considered: u32,
    pub quarantined: u32,
    /// Leads dropped because their status changed before the commit.
    pub stale: u32,
}

#[derive(Clone, Debug, Default)]
pub struct OutreachPlanner {
    settings: PlannerSettings,
}

impl OutreachPlanner {
    pub fn new(settings: PlannerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// Runs one planning cycle against `store`.
    ///
    /// The run row is written as STARTED before any lead is read. If loading or
    /// committing the batch fails, the run is closed as FAILED and the error returned;
    /// nothing from the batch is persisted. Leads whose status changed while the batch
    /// was being planned are dropped from the commit and audited as PLAN_STALE.
    pub async fn plan_actions<S>(
        &self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<PlanReport, ApplicationError>
    where
        S: OutreachStore + ?Sized,
    {
        let mut run = AgentRun::start(RunMode::Planning, self.settings.batch_size, "Planner run", now);
        store.save_run(&run).await?;

        let outcome: Result<(OutreachPlan, PlanCommit), ApplicationError> = async {
            let candidates = store.planning_candidates(self.settings.batch_size).await?;
            let plan = self.plan_batch(&run.id, candidates, now);
            let commit = store.commit_plan(&plan).await?;
            Ok((plan, commit))
        }
        .await;

        let (plan, commit) = match outcome {
            Ok(committed) => committed,
            Err(planning_error) => {
                run.fail(&planning_error.to_string(), now);
                error!(
                    event_name = "outreach.planner.failed",
                    run_id = %run.id,
                    error = %planning_error,
                    "planning batch rolled back"
                );
                if let Err(close_error) = store.save_run(&run).await {
                    warn!(
                        event_name = "outreach.planner.close_failed",
                        run_id = %run.id,
                        error = %close_error,
                        "could not mark planner run as failed"
                    );
                }
                let _ = store
                    .append_audit(AuditEntry::new(
                        Some(run.id.clone()),
                        None,
                        AuditEventKind::PlannerFailed,
                        planning_error.to_string(),
                        now,
                    ))
                    .await;
                return Err(planning_error);
            }
        };

        for lead_id in &commit.stale {
            warn!(
                event_name = "outreach.planner.stale_lead",
                run_id = %run.id,
                lead_id = %lead_id,
                "lead changed during planning; its entries were dropped"
            );
            let expected = plan
                .transition_for(lead_id)
                .map(|transition| transition.expected.as_str())
                .unwrap_or("unknown");
            store
                .append_audit(AuditEntry::new(
                    Some(run.id.clone()),
                    Some(lead_id.clone()),
                    AuditEventKind::PlanStale,
                    format!("Lead is no longer {expected}; planned entries dropped"),
                    now,
                ))
                .await?;
        }

        run.succeed(commit.actions, plan.considered, now);
        store.save_run(&run).await?;
        store
            .append_audit(AuditEntry::new(
                Some(run.id.clone()),
                None,
                AuditEventKind::AiPlanned,
                format!(
                    "planned={} considered={} stale={}",
                    commit.actions,
                    plan.considered,
                    commit.stale.len()
                ),
                now,
            ))
            .await?;

        let fresh = plan.without(&commit.stale);
        let report = PlanReport {
            run_id: run.id,
            planned_actions: commit.actions,
            considered: plan.considered,
            quarantined: u32::try_from(fresh.quarantined.len()).unwrap_or(u32::MAX),
            stale: u32::try_from(commit.stale.len()).unwrap_or(u32::MAX),
        };
        info!(
            event_name = "outreach.planner.completed",
            run_id = %report.run_id,
            planned = report.planned_actions,
            considered = report.considered,
            quarantined = report.quarantined,
            stale = report.stale,
            "planning batch committed"
        );
        Ok(report)
    }

    /// Plans a batch without touching storage.
    pub fn plan_batch(
        &self,
        run_id: &RunId,
        candidates: Vec<PlanningCandidate>,
        now: DateTime<Utc>,
    ) -> OutreachPlan {
        let mut plan = OutreachPlan::empty(run_id.clone(), now);

        for candidate in candidates {
            plan.considered += 1;
            self.plan_lead(candidate, now, &mut plan);
        }

        plan
    }

    fn plan_lead(&self, candidate: PlanningCandidate, now: DateTime<Utc>, plan: &mut OutreachPlan) {
        let PlanningCandidate { lead, flags } = candidate;
        let run_id = Some(plan.run_id.clone());
        let audit = |event: AuditEventKind, lead: &Lead, detail: String| {
            AuditEntry::new(run_id.clone(), Some(lead.id.clone()), event, detail, now)
        };
        let guard = |next: LeadStatus, note: Option<String>| LeadTransition {
            lead_id: lead.id.clone(),
            expected: lead.status,
            next,
            note,
        };

        if lead.status.is_compliance_stop() {
            return;
        }

        if flags.quarantined {
            plan.audit.push(audit(
                AuditEventKind::SkipQuarantined,
                &lead,
                "Lead is quarantined pending human review".to_string(),
            ));
            return;
        }

        let Some(phone) = lead.phone.clone().filter(|phone| is_e164(phone)) else {
            let raw = lead.phone.clone().unwrap_or_default();
            let reason = format!("Malformed phone `{raw}`; fix the number before outreach");
            plan.audit.push(audit(AuditEventKind::Quarantined, &lead, reason.clone()));
            plan.audit.push(audit(
                AuditEventKind::ReviewPlanned,
                &lead,
                "Human review queued for malformed phone".to_string(),
            ));
            plan.actions.push(Action::pending(
                lead.id.clone(),
                ActionKind::Review,
                ActionPayload { reason: Some(reason), ..ActionPayload::default() },
                now,
                now,
            ));
            plan.transitions.push(guard(lead.status, None));
            plan.quarantined.push(lead.id.clone());
            return;
        };

        let first_name = safe_first_name(&lead.full_name);

        if lead.status == LeadStatus::New {
            let call_due = now + self.settings.call_delay;
            plan.actions.push(Action::pending(
                lead.id.clone(),
                ActionKind::Text,
                ActionPayload {
                    to: Some(phone.clone()),
                    message: Some(self.speed_to_lead_message(&first_name)),
                    ..ActionPayload::default()
                },
                now,
                now,
            ));
            plan.audit.push(audit(
                AuditEventKind::TextPlanned,
                &lead,
                "Speed-to-lead text due now".to_string(),
            ));
            plan.actions.push(Action::pending(
                lead.id.clone(),
                ActionKind::Call,
                ActionPayload {
                    to: Some(phone),
                    reason: Some("First call after speed-to-lead text".to_string()),
                    ..ActionPayload::default()
                },
                call_due,
                now,
            ));
            plan.audit.push(audit(
                AuditEventKind::CallPlanned,
                &lead,
                format!("Call due {}", call_due.to_rfc3339()),
            ));
            // Just queued a text, so the nudge guard is closed for this lead this cycle.
            plan.transitions.push(guard(LeadStatus::Working, None));
            plan.touched.push(lead.id.clone());
            return;
        }

        if lead.status != LeadStatus::Working {
            return;
        }

        let next = decide_next_action(&lead, now);
        match next.decision {
            Decision::DoNotCall => return,
            Decision::CloseOut => {
                plan.audit.push(audit(
                    AuditEventKind::DecisionApplied,
                    &lead,
                    format!("decision={} reason={}", next.decision.as_str(), next.reason),
                ));
                plan.transitions
                    .push(guard(next.new_status.unwrap_or(LeadStatus::Closed), next.append_note));
                return;
            }
            Decision::Wait => {
                let detail = match next.cooldown_until {
                    Some(until) => format!("Cooldown window active until {}", until.to_rfc3339()),
                    None => next.reason,
                };
                plan.audit.push(audit(AuditEventKind::NudgeSuppressed, &lead, detail));
                return;
            }
            Decision::Ready => {}
        }

        let last_touch = [lead.last_contacted_at, flags.last_planned_touch].into_iter().flatten().max();
        let guard_open =
            last_touch.map_or(true, |touched| now - touched > self.settings.nudge_quiet_period);

        if !guard_open {
            let detail = match last_touch {
                Some(touched) => format!("Last touched {}", touched.to_rfc3339()),
                None => "Recently contacted".to_string(),
            };
            plan.audit.push(audit(AuditEventKind::NudgeSuppressed, &lead, detail));
            return;
        }

        let nudge_due = now + self.settings.nudge_delay;
        plan.actions.push(Action::pending(
            lead.id.clone(),
            ActionKind::Text,
            ActionPayload {
                to: Some(phone),
                message: Some(self.nudge_message(&first_name)),
                ..ActionPayload::default()
            },
            nudge_due,
            now,
        ));
        plan.audit.push(audit(
            AuditEventKind::NudgePlanned,
            &lead,
            format!("Follow-up nudge due {}", nudge_due.to_rfc3339()),
        ));
        plan.transitions.push(guard(LeadStatus::Working, None));
        plan.touched.push(lead.id.clone());
    }

    fn speed_to_lead_message(&self, first_name: &str) -> String {
        format!(
            "Hi{}, this is {}. You requested life insurance information. \
             Would you like a quick quote today? We can also give you a call in a few minutes.",
            greeting_suffix(first_name),
            self.settings.office_name
        )
    }

    fn nudge_message(&self, first_name: &str) -> String {
        format!(
            "Hi{}, just following up on your life insurance request with {}. \
             Reply here or let us know a good time to call.",
            greeting_suffix(first_name),
            self.settings.office_name
        )
    }
}

pub(crate) fn greeting_suffix(first_name: &str) -> String {
    if first_name.is_empty() {
        String::new()
    } else {
        format!(" {first_name}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{OutreachPlanner, PlannerSettings};
    use crate::audit::AuditEventKind;
    use crate::domain::action::{ActionKind, ActionStatus};
    use crate::domain::lead::{Lead, LeadFlags, LeadId, LeadStatus};
    use crate::domain::run::RunId;
    use crate::outreach::store::PlanningCandidate;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).single().expect("valid time")
    }

    fn candidate(id: &str, name: &str, phone: &str, status: LeadStatus) -> PlanningCandidate {
        let mut lead = Lead::new(
            LeadId(id.to_string()),
            name,
            Some(phone.to_string()),
            None,
            now() - Duration::days(1),
        );
        lead.status = status;
        PlanningCandidate { lead, flags: LeadFlags::default() }
    }

    fn run_id() -> RunId {
        RunId("run-test".to_string())
    }

    #[test]
    fn mixed_batch_plans_text_and_call_for_new_lead_only() {
        let dnc = candidate("L-DNC", "Dana Smith", "+15550000001", LeadStatus::Dnc);
        let fresh = candidate("L-NEW", "Maria Gomez", "+15551234567", LeadStatus::New);
        let mut working = candidate("L-WRK", "Sam Lee", "+15550000003", LeadStatus::Working);
        working.lead.last_contacted_at = Some(now() - Duration::hours(1));

        let plan = OutreachPlanner::default().plan_batch(&run_id(), vec![dnc, fresh, working], now());

        assert_eq!(plan.considered, 3);
        assert_eq!(plan.planned(), 2);

        let fresh_actions = plan.actions_for(&LeadId("L-NEW".to_string()));
        let kinds: Vec<ActionKind> = fresh_actions.iter().map(|action| action.kind).collect();
        assert_eq!(kinds, vec![ActionKind::Text, ActionKind::Call]);
        assert!(fresh_actions.iter().all(|action| action.status == ActionStatus::Pending));
        assert_eq!(fresh_actions[0].due_at, now());
        assert_eq!(fresh_actions[1].due_at, now() + Duration::minutes(2));

        assert!(plan.actions_for(&LeadId("L-DNC".to_string())).is_empty());
        assert!(plan.actions_for(&LeadId("L-WRK".to_string())).is_empty());

        let fresh_id = LeadId("L-NEW".to_string());
        let moved = plan.transition_for(&fresh_id).expect("status move for the new lead");
        assert_eq!((moved.expected, moved.next), (LeadStatus::New, LeadStatus::Working));
        assert_eq!(plan.touched, vec![fresh_id]);
        assert!(plan.transition_for(&LeadId("L-WRK".to_string())).is_none());
        assert!(plan.audit.iter().all(|entry| entry.run_id == Some(run_id())));
        assert!(!plan.audit.iter().any(|entry| entry.lead_id == Some(LeadId("L-DNC".to_string()))));
    }

    #[test]
    fn greeting_is_personalized_with_safe_first_name() {
        let plan = OutreachPlanner::default().plan_batch(
            &run_id(),
            vec![
                candidate("L-1", "Maria Gomez", "+15551234567", LeadStatus::New),
                candidate("L-2", "Insurance Lead", "+15551234568", LeadStatus::New),
            ],
            now(),
        );

        let greeting = |id: &str| {
            plan.actions_for(&LeadId(id.to_string()))[0].payload.message.clone().unwrap_or_default()
        };
        assert!(greeting("L-1").starts_with("Hi Maria, this is AgencyVault."));
        assert!(greeting("L-2").starts_with("Hi, this is AgencyVault."));
    }

    #[test]
    fn malformed_phone_is_quarantined_with_review_action() {
        let plan = OutreachPlanner::default().plan_batch(
            &run_id(),
            vec![candidate("L-BAD", "Maria Gomez", "5551234567", LeadStatus::New)],
            now(),
        );

        assert_eq!(plan.quarantined, vec![LeadId("L-BAD".to_string())]);
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].kind, ActionKind::Review);
        assert_eq!(plan.actions[0].tool, "human");
        let held = plan.transition_for(&LeadId("L-BAD".to_string())).expect("status guard");
        assert_eq!(held.next, LeadStatus::New, "quarantined leads keep their status");
        assert_eq!(
            plan.audit.iter().filter(|entry| entry.is(AuditEventKind::Quarantined)).count(),
            1
        );
    }

    #[test]
    fn quarantined_lead_is_skipped_with_audit_only() {
        let mut flagged = candidate("L-BAD", "Maria Gomez", "5551234567", LeadStatus::New);
        flagged.flags.quarantined = true;

        let plan = OutreachPlanner::default().plan_batch(&run_id(), vec![flagged], now());

        assert!(plan.actions.is_empty());
        assert!(plan.quarantined.is_empty());
        assert_eq!(plan.audit.len(), 1);
        assert!(plan.audit[0].is(AuditEventKind::SkipQuarantined));
    }

    #[test]
    fn do_not_contact_is_skipped_silently() {
        let plan = OutreachPlanner::default().plan_batch(
            &run_id(),
            vec![candidate("L-X", "Maria Gomez", "+15551234567", LeadStatus::DoNotContact)],
            now(),
        );

        assert_eq!(plan.considered, 1);
        assert!(plan.actions.is_empty());
        assert!(plan.audit.is_empty());
    }

    #[test]
    fn stale_working_lead_gets_one_nudge() {
        let mut stale = candidate("L-OLD", "Sam Lee", "+15550000003", LeadStatus::Working);
        stale.lead.last_contacted_at = Some(now() - Duration::hours(21));
        let mut never = candidate("L-NEVER", "Ana Ruiz", "+15550000004", LeadStatus::Working);
        never.lead.last_contacted_at = None;

        let plan = OutreachPlanner::default().plan_batch(&run_id(), vec![stale, never], now());

        for id in ["L-OLD", "L-NEVER"] {
            let actions = plan.actions_for(&LeadId(id.to_string()));
            assert_eq!(actions.len(), 1, "{id} should get exactly one nudge");
            assert_eq!(actions[0].kind, ActionKind::Text);
            assert_eq!(actions[0].due_at, now() + Duration::minutes(5));
        }
        assert_eq!(plan.touched.len(), 2);
        assert!(plan.transitions.iter().all(|transition| transition.next == LeadStatus::Working));
    }

    #[test]
    fn recent_working_lead_records_suppressed_nudge() {
        let mut recent = candidate("L-WRK", "Sam Lee", "+15550000003", LeadStatus::Working);
        recent.lead.last_contacted_at = Some(now() - Duration::hours(19));

        let plan = OutreachPlanner::default().plan_batch(&run_id(), vec![recent], now());

        assert!(plan.actions.is_empty());
        assert_eq!(plan.audit.len(), 1);
        assert!(plan.audit[0].is(AuditEventKind::NudgeSuppressed));
    }

    #[test]
    fn settings_control_delays_and_office_name() {
        let planner = OutreachPlanner::new(PlannerSettings {
            call_delay: Duration::minutes(10),
            office_name: "Nick's office".to_string(),
            ..PlannerSettings::default()
        });

        let plan = planner.plan_batch(
            &run_id(),
            vec![candidate("L-1", "Maria Gomez", "+15551234567", LeadStatus::New)],
            now(),
        );

        assert_eq!(plan.actions[1].due_at, now() + Duration::minutes(10));
        assert!(plan.actions[0]
            .payload
            .message
            .as_deref()
            .is_some_and(|message| message.contains("Nick's office")));
    }
    #[test]
    fn planning_never_marks_a_lead_as_contacted() {
        let plan = OutreachPlanner::default().plan_batch(
            &run_id(),
            vec![candidate("L-NEW", "Maria Gomez", "+15551234567", LeadStatus::New)],
            now(),
        );

        let moved = plan.transition_for(&LeadId("L-NEW".to_string())).expect("status move");
        assert_eq!(moved.note, None);
        assert_eq!(plan.touched, vec![LeadId("L-NEW".to_string())]);
    }

    #[test]
    fn recently_planned_touch_suppresses_nudge_even_without_contact() {
        let mut queued = candidate("L-WRK", "Sam Lee", "+15550000003", LeadStatus::Working);
        queued.lead.last_contacted_at = None;
        queued.flags.last_planned_touch = Some(now() - Duration::minutes(1));

        let plan = OutreachPlanner::default().plan_batch(&run_id(), vec![queued], now());

        assert!(plan.actions.is_empty());
        assert!(plan.audit[0].is(AuditEventKind::NudgeSuppressed));
    }

    #[test]
    fn exhausted_working_lead_is_closed_instead_of_nudged() {
        let mut exhausted = candidate("L-MAX", "Sam Lee", "+15550000003", LeadStatus::Working);
        exhausted.lead.dial_score = Some(5);
        exhausted.lead.last_contacted_at = Some(now() - Duration::days(3));

        let plan = OutreachPlanner::default().plan_batch(&run_id(), vec![exhausted], now());

        assert!(plan.actions.is_empty());
        let closing = plan.transition_for(&LeadId("L-MAX".to_string())).expect("close out");
        assert_eq!((closing.expected, closing.next), (LeadStatus::Working, LeadStatus::Closed));
        assert_eq!(closing.note.as_deref(), Some("Closed by AI: max attempts reached."));
        assert!(plan.audit[0].is(AuditEventKind::DecisionApplied));
    }

    #[test]
    fn cooldown_after_a_call_suppresses_nudge() {
        let mut dialed = candidate("L-DIAL", "Sam Lee", "+15550000003", LeadStatus::Working);
        dialed.lead.dial_score = Some(2);
        dialed.lead.dialed_at = Some(now() - Duration::hours(21));
        dialed.lead.last_contacted_at = Some(now() - Duration::hours(21));

        let plan = OutreachPlanner::default().plan_batch(&run_id(), vec![dialed], now());

        assert!(plan.actions.is_empty());
        assert!(plan.transitions.is_empty());
        assert!(plan.audit[0].is(AuditEventKind::NudgeSuppressed));
        assert!(plan.audit[0].detail.starts_with("Cooldown window active until"));
    }
}
