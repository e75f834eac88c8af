use std::sync::Arc;

use agencyvault_core::chrono::{DateTime, Duration, TimeZone, Utc};
use agencyvault_core::domain::lead::LeadMemoryKey;
use agencyvault_core::outreach::channel::{ChannelError, Dispatch, DryRunChannel, OutboundChannel};
use agencyvault_core::outreach::inbound::STOP_CANCEL_REASON;
use agencyvault_core::domain::run::RunId;
use agencyvault_core::{
    call_now, create_lead, handle_inbound_text, remove_lead, report_outcome, review_lead,
    text_now, ActionKind, ActionStatus, ApplicationError, AuditEventKind, Decision, DomainError,
    ExecutorSettings, HumanOutcome, InboundIntent, Lead, LeadId, LeadStatus, MessageDirection,
    NewLead, OutreachExecutor, OutreachPlanner, OutreachStore, OwnerNotifier, RunStatus,
};
use agencyvault_db::{connect_with_settings, migrations, SqlOutreachStore};

/// 11:00 in America/Denver, inside the default contact window.
fn business_hours() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).single().expect("valid time")
}

async fn store() -> SqlOutreachStore {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    SqlOutreachStore::new(pool)
}

async fn seed_lead(
    store: &SqlOutreachStore,
    id: &str,
    phone: &str,
    status: LeadStatus,
    age: Duration,
) -> Lead {
    let mut lead = Lead::new(
        LeadId(id.to_string()),
        "Maria Gomez",
        Some(phone.to_string()),
        None,
        business_hours() - age,
    );
    lead.status = status;
    store.save_lead(&lead).await.expect("save lead");
    lead
}

struct OfflineChannel;

#[async_trait::async_trait]
impl OutboundChannel for OfflineChannel {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn send_text(&self, _to: &str, _body: &str) -> Result<String, ChannelError> {
        Err(ChannelError::Unavailable("carrier timeout".to_string()))
    }

    async fn place_call(&self, _to: &str, _lead_id: &LeadId) -> Result<String, ChannelError> {
        Err(ChannelError::Unavailable("carrier timeout".to_string()))
    }
}

#[tokio::test]
async fn stored_batch_plans_only_for_the_new_lead() {
    let store = store().await;
    seed_lead(&store, "L-DNC", "+15550000001", LeadStatus::Dnc, Duration::days(3)).await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::days(2)).await;
    let mut working =
        seed_lead(&store, "L-WRK", "+15550000003", LeadStatus::Working, Duration::days(1)).await;
    working.last_contacted_at = Some(business_hours() - Duration::hours(1));
    store.save_lead(&working).await.expect("touch working lead");

    let report =
        OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");

    // DNC leads are never selected, so only two leads reach the planner.
    assert_eq!(report.considered, 2);
    assert_eq!(report.planned_actions, 2);

    let actions = store.actions_for_lead(&fresh.id).await.expect("actions");
    let kinds: Vec<ActionKind> = actions.iter().map(|action| action.kind).collect();
    assert_eq!(kinds, vec![ActionKind::Text, ActionKind::Call]);
    assert!(store.actions_for_lead(&LeadId("L-WRK".to_string())).await.expect("wrk").is_empty());
    assert!(store.actions_for_lead(&LeadId("L-DNC".to_string())).await.expect("dnc").is_empty());

    let dnc = store.find_lead(&LeadId("L-DNC".to_string())).await.expect("find").expect("dnc");
    assert_eq!(dnc.status, LeadStatus::Dnc);
    let promoted = store.find_lead(&fresh.id).await.expect("find").expect("fresh");
    assert_eq!(promoted.status, LeadStatus::Working);

    let run = store.find_run(&report.run_id).await.expect("run").expect("run row");
    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.planned, 2);
    let run_audit = store.audit_for_run(&report.run_id).await.expect("audit");
    assert!(run_audit.iter().any(|entry| entry.is(AuditEventKind::AiPlanned)));
}

#[tokio::test]
async fn malformed_phone_is_quarantined_exactly_once_across_runs() {
    let store = store().await;
    let bad = seed_lead(&store, "L-BAD", "5551234567", LeadStatus::New, Duration::days(1)).await;
    let planner = OutreachPlanner::default();

    for minutes in [0, 10, 20] {
        planner
            .plan_actions(&store, business_hours() + Duration::minutes(minutes))
            .await
            .expect("plan");
    }

    let audit = store.audit_for_lead(&bad.id).await.expect("audit");
    let count = |kind: AuditEventKind| audit.iter().filter(|entry| entry.is(kind)).count();
    assert_eq!(count(AuditEventKind::Quarantined), 1);
    assert_eq!(count(AuditEventKind::SkipQuarantined), 2);

    let actions = store.actions_for_lead(&bad.id).await.expect("actions");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Review);
    assert_eq!(
        store.memory_get(&bad.id, LeadMemoryKey::Quarantined).await.expect("memory"),
        Some("1".to_string())
    );
}

#[tokio::test]
async fn repeated_planning_does_not_double_nudge_a_fresh_lead() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    let planner = OutreachPlanner::default();

    planner.plan_actions(&store, business_hours()).await.expect("first plan");
    let second = planner
        .plan_actions(&store, business_hours() + Duration::minutes(5))
        .await
        .expect("second plan");

    assert_eq!(second.planned_actions, 0);
    assert_eq!(store.actions_for_lead(&fresh.id).await.expect("actions").len(), 2);
}

#[tokio::test]
async fn failed_commit_rolls_back_the_batch_and_fails_the_run() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::days(1)).await;
    sqlx::query(
        "CREATE TRIGGER reject_call_audit BEFORE INSERT ON audit_log
         WHEN NEW.event = 'CALL_PLANNED'
         BEGIN SELECT RAISE(ABORT, 'audit offline'); END",
    )
    .execute(store.pool())
    .await
    .expect("install trigger");

    let error = OutreachPlanner::default()
        .plan_actions(&store, business_hours())
        .await
        .expect_err("commit should fail");

    assert!(matches!(error, ApplicationError::Persistence(_)));
    assert!(store.actions_for_lead(&fresh.id).await.expect("actions").is_empty());
    let reloaded = store.find_lead(&fresh.id).await.expect("find").expect("lead");
    assert_eq!(reloaded.status, LeadStatus::New);

    let runs = store.recent_runs(5).await.expect("runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    let run_audit = store.audit_for_run(&runs[0].id).await.expect("audit");
    assert_eq!(run_audit.len(), 1);
    assert!(run_audit[0].is(AuditEventKind::PlannerFailed));
}

#[tokio::test]
async fn executor_sends_due_text_and_defers_the_call() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");

    let channel = Arc::new(DryRunChannel::default());
    let executor = OutreachExecutor::new(channel.clone(), ExecutorSettings::default());
    let report = executor.execute_due(&store, business_hours()).await.expect("execute");

    assert_eq!(report.considered, 2);
    assert_eq!(report.executed, 1);
    assert_eq!(report.deferred, 1);
    let dispatched = channel.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert!(matches!(&dispatched[0], Dispatch::Text { to, .. } if to == "+15551234567"));

    let later = executor
        .execute_due(&store, business_hours() + Duration::minutes(3))
        .await
        .expect("execute later");
    assert_eq!(later.executed, 1);
    assert!(matches!(channel.dispatched().last(), Some(Dispatch::Call { lead_id, .. }) if lead_id == &fresh.id));

    let actions = store.actions_for_lead(&fresh.id).await.expect("actions");
    assert!(actions.iter().all(|action| action.status == ActionStatus::Done));
    let touched = store.find_lead(&fresh.id).await.expect("find").expect("lead");
    assert_eq!(touched.dialed_at, Some(business_hours() + Duration::minutes(3)));
}

#[tokio::test]
async fn executor_leaves_actions_pending_outside_the_contact_window() {
    let store = store().await;
    seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    // 01:00 in Denver.
    let night = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).single().expect("valid time");
    OutreachPlanner::default().plan_actions(&store, night).await.expect("plan");

    let channel = Arc::new(DryRunChannel::default());
    let report = OutreachExecutor::new(channel.clone(), ExecutorSettings::default())
        .execute_due(&store, night + Duration::minutes(10))
        .await
        .expect("execute");

    assert_eq!(report.executed, 0);
    assert_eq!(report.deferred, 2);
    assert!(channel.dispatched().is_empty());
    assert_eq!(store.pending_outbound_actions(10).await.expect("pending").len(), 2);
}

#[tokio::test]
async fn dispatch_failures_mark_actions_failed_without_aborting_the_tick() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");

    let report = OutreachExecutor::new(Arc::new(OfflineChannel), ExecutorSettings::default())
        .execute_due(&store, business_hours() + Duration::minutes(3))
        .await
        .expect("execute");

    assert_eq!(report.failed, 2);
    let run = store.find_run(&report.run_id).await.expect("run").expect("run row");
    assert_eq!(run.status, RunStatus::Succeeded);
    let actions = store.actions_for_lead(&fresh.id).await.expect("actions");
    assert!(actions.iter().all(|action| action.status == ActionStatus::Failed));
    assert!(actions
        .iter()
        .all(|action| action.error.as_deref().is_some_and(|error| error.contains("carrier timeout"))));
    let audit = store.audit_for_lead(&fresh.id).await.expect("audit");
    assert_eq!(audit.iter().filter(|entry| entry.is(AuditEventKind::ActionError)).count(), 2);
}

#[tokio::test]
async fn inbound_stop_opts_the_lead_out_and_cancels_pending_work() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");

    let report = handle_inbound_text(&store, &OwnerNotifier::disabled(), "(555) 123-4567", "STOP", business_hours())
        .await
        .expect("inbound");

    assert_eq!(report.intent, InboundIntent::Stop);
    assert_eq!(report.canceled_actions, 2);
    let lead = store.find_lead(&fresh.id).await.expect("find").expect("lead");
    assert_eq!(lead.status, LeadStatus::DoNotContact);
    let actions = store.actions_for_lead(&fresh.id).await.expect("actions");
    assert!(actions.iter().all(|action| action.status == ActionStatus::Skipped
        && action.error.as_deref() == Some(STOP_CANCEL_REASON)));
    let audit = store.audit_for_lead(&fresh.id).await.expect("audit");
    assert!(audit.iter().any(|entry| entry.is(AuditEventKind::ComplianceDnc)));

    let replan = OutreachPlanner::default()
        .plan_actions(&store, business_hours() + Duration::days(2))
        .await
        .expect("replan");
    assert_eq!(replan.considered, 0);
}

#[tokio::test]
async fn inbound_interest_marks_the_lead_contacted_and_remembers_the_reply() {
    let store = store().await;
    let lead = seed_lead(&store, "L-1", "+15551234567", LeadStatus::Working, Duration::days(1)).await;

    let report = handle_inbound_text(&store, &OwnerNotifier::disabled(), "+15551234567", "Yes, call me tomorrow", business_hours())
        .await
        .expect("inbound");

    assert_eq!(report.new_status, Some(LeadStatus::Contacted));
    assert_eq!(
        store.memory_get(&lead.id, LeadMemoryKey::LastInboundText).await.expect("memory"),
        Some("Yes, call me tomorrow".to_string())
    );

    let unknown = handle_inbound_text(&store, &OwnerNotifier::disabled(), "+15559990000", "hello", business_hours())
        .await
        .expect("unknown sender");
    assert_eq!(unknown.lead_id, None);
}

#[tokio::test]
async fn not_interested_outcome_closes_the_lead() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");
    let call = store
        .actions_for_lead(&fresh.id)
        .await
        .expect("actions")
        .into_iter()
        .find(|action| action.kind == ActionKind::Call)
        .expect("call planned");

    let done = report_outcome(
        &store,
        &call.id,
        HumanOutcome::NotInterested,
        Some("  already covered through work "),
        business_hours(),
    )
    .await
    .expect("report");

    assert_eq!(done.status, ActionStatus::Done);
    let lead = store.find_lead(&fresh.id).await.expect("find").expect("lead");
    assert_eq!(lead.status, LeadStatus::Closed);
    assert_eq!(
        store.memory_get(&fresh.id, LeadMemoryKey::LastHumanNote).await.expect("memory"),
        Some("already covered through work".to_string())
    );

    let again = report_outcome(&store, &call.id, HumanOutcome::Talked, None, business_hours()).await;
    assert!(matches!(again, Err(ApplicationError::Domain(DomainError::InvalidActionTransition { .. }))));
}

#[tokio::test]
async fn intake_normalizes_and_rejects_duplicates() {
    let store = store().await;
    let input = NewLead {
        full_name: "  maria   gomez ".to_string(),
        phone: "555-123-4567".to_string(),
        email: Some("Maria@Example.com".to_string()),
        timezone: None,
    };

    let created = create_lead(&store, input.clone(), business_hours()).await.expect("create");
    assert_eq!(created.phone.as_deref(), Some("+15551234567"));
    assert_eq!(created.status, LeadStatus::New);
    assert_eq!(store.find_lead(&created.id).await.expect("find"), Some(created.clone()));

    let same_phone = create_lead(&store, input.clone(), business_hours()).await;
    assert!(matches!(
        same_phone,
        Err(ApplicationError::Domain(DomainError::DuplicateLead { field: "phone" }))
    ));

    let same_email = create_lead(
        &store,
        NewLead { phone: "+15550001111".to_string(), ..input.clone() },
        business_hours(),
    )
    .await;
    assert!(matches!(
        same_email,
        Err(ApplicationError::Domain(DomainError::DuplicateLead { field: "email" }))
    ));

    let bad_phone =
        create_lead(&store, NewLead { phone: "12345".to_string(), email: None, ..input }, business_hours())
            .await;
    assert!(matches!(bad_phone, Err(ApplicationError::Domain(DomainError::InvalidPhone(_)))));
}

#[tokio::test]
async fn applied_decision_is_persisted_and_audited() {
    let store = store().await;
    let mut lead =
        seed_lead(&store, "L-1", "+15551234567", LeadStatus::Working, Duration::days(3)).await;
    lead.dial_score = Some(5);
    store.save_lead(&lead).await.expect("save");

    let preview = review_lead(&store, &lead.id, false, business_hours()).await.expect("preview");
    assert_eq!(preview.next.decision, Decision::CloseOut);
    assert!(!preview.applied);
    let unchanged = store.find_lead(&lead.id).await.expect("find").expect("lead");
    assert_eq!(unchanged.status, LeadStatus::Working);

    let applied = review_lead(&store, &lead.id, true, business_hours()).await.expect("apply");
    assert!(applied.applied);
    let closed = store.find_lead(&lead.id).await.expect("find").expect("lead");
    assert_eq!(closed.status, LeadStatus::Closed);
    assert!(store
        .audit_for_lead(&lead.id)
        .await
        .expect("audit")
        .iter()
        .any(|entry| entry.is(AuditEventKind::DecisionApplied)));

    let missing = review_lead(&store, &LeadId("L-NONE".to_string()), false, business_hours()).await;
    assert!(matches!(missing, Err(ApplicationError::NotFound { entity: "lead", .. })));
}

#[tokio::test]
async fn opt_out_between_selection_and_commit_is_not_overwritten() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    let planner = OutreachPlanner::default();

    let candidates = store.planning_candidates(25).await.expect("candidates");
    handle_inbound_text(&store, &OwnerNotifier::disabled(), "+15551234567", "STOP", business_hours())
        .await
        .expect("inbound");
    let plan = planner.plan_batch(&RunId("run-late".to_string()), candidates, business_hours());
    assert_eq!(plan.actions_for(&fresh.id).len(), 2);

    let commit = store.commit_plan(&plan).await.expect("commit");

    assert_eq!(commit.actions, 0);
    assert_eq!(commit.stale, vec![fresh.id.clone()]);
    let lead = store.find_lead(&fresh.id).await.expect("find").expect("lead");
    assert_eq!(lead.status, LeadStatus::DoNotContact);
    assert!(lead.notes.contains("Opted out by inbound STOP."));
    assert!(store.pending_actions_for_lead(&fresh.id).await.expect("pending").is_empty());
    assert_eq!(store.pending_outbound_actions(10).await.expect("pending").len(), 0);
}

#[tokio::test]
async fn stale_leads_are_audited_on_the_planner_run() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    // Status flips under the planner between candidate selection and commit.
    sqlx::query(
        "CREATE TRIGGER opt_out_mid_plan BEFORE UPDATE OF status ON leads
         WHEN OLD.status = 'NEW'
         BEGIN UPDATE leads SET status = 'DO_NOT_CONTACT' WHERE id = OLD.id; SELECT RAISE(IGNORE); END",
    )
    .execute(store.pool())
    .await
    .expect("install trigger");

    let report = OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");

    assert_eq!(report.planned_actions, 0);
    assert_eq!(report.stale, 1);
    assert!(store.actions_for_lead(&fresh.id).await.expect("actions").is_empty());
    let lead = store.find_lead(&fresh.id).await.expect("find").expect("lead");
    assert_eq!(lead.status, LeadStatus::DoNotContact);
    let audit = store.audit_for_lead(&fresh.id).await.expect("audit");
    assert_eq!(audit.len(), 1);
    assert!(audit[0].is(AuditEventKind::PlanStale));
}

#[tokio::test]
async fn failed_sends_never_mark_the_lead_contacted() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    let planner = OutreachPlanner::default();
    planner.plan_actions(&store, business_hours()).await.expect("plan");

    OutreachExecutor::new(Arc::new(OfflineChannel), ExecutorSettings::default())
        .execute_due(&store, business_hours() + Duration::minutes(3))
        .await
        .expect("execute");

    let lead = store.find_lead(&fresh.id).await.expect("find").expect("lead");
    assert_eq!(lead.status, LeadStatus::Working);
    assert_eq!(lead.last_contacted_at, None);
    assert_eq!(lead.dial_score, None);

    // The planned touch still holds the nudge back until the quiet period has passed.
    let soon = planner
        .plan_actions(&store, business_hours() + Duration::minutes(10))
        .await
        .expect("replan soon");
    assert_eq!(soon.planned_actions, 0);
    let next_day = planner
        .plan_actions(&store, business_hours() + Duration::hours(21))
        .await
        .expect("replan next day");
    assert_eq!(next_day.planned_actions, 1);
}

#[tokio::test]
async fn nudges_stop_once_the_attempt_budget_is_spent() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    let planner = OutreachPlanner::default();
    let channel = Arc::new(DryRunChannel::default());
    let executor = OutreachExecutor::new(channel.clone(), ExecutorSettings::default());

    // One planning and one execution cycle a day; Denver stays inside the window.
    let mut closed_on = None;
    for day in 0..10 {
        let at = business_hours() + Duration::days(day);
        planner.plan_actions(&store, at).await.expect("plan");
        executor.execute_due(&store, at + Duration::minutes(10)).await.expect("execute");
        let lead = store.find_lead(&fresh.id).await.expect("find").expect("lead");
        if lead.status == LeadStatus::Closed {
            closed_on = Some(day);
            break;
        }
    }

    assert!(closed_on.is_some(), "lead should be closed out after five attempts");
    let lead = store.find_lead(&fresh.id).await.expect("find").expect("lead");
    assert!(lead.dial_score.unwrap_or(0) >= 5);
    assert!(lead.notes.contains("Closed by AI: max attempts reached."));
    let sent_before = channel.dispatched().len();

    planner
        .plan_actions(&store, business_hours() + Duration::days(12))
        .await
        .expect("plan after close");
    executor
        .execute_due(&store, business_hours() + Duration::days(12) + Duration::minutes(10))
        .await
        .expect("execute after close");
    assert_eq!(channel.dispatched().len(), sent_before);
}

#[tokio::test]
async fn executor_skips_an_action_claimed_by_another_worker() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");
    let mut text = store
        .pending_actions_for_lead(&fresh.id)
        .await
        .expect("pending")
        .into_iter()
        .find(|action| action.kind == ActionKind::Text)
        .expect("text planned");
    text.start(business_hours()).expect("start");
    assert!(store.claim_action(&text).await.expect("claim"));

    let channel = Arc::new(DryRunChannel::default());
    let report = OutreachExecutor::new(channel.clone(), ExecutorSettings::default())
        .execute_due(&store, business_hours() + Duration::minutes(1))
        .await
        .expect("execute");

    // The claimed text is no longer PENDING; only the (not yet due) call is considered.
    assert_eq!(report.considered, 1);
    assert_eq!(report.deferred, 1);
    assert!(channel.dispatched().is_empty());
}

#[tokio::test]
async fn actions_stuck_running_are_failed_by_a_later_tick() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");
    let mut text = store
        .pending_actions_for_lead(&fresh.id)
        .await
        .expect("pending")
        .into_iter()
        .find(|action| action.kind == ActionKind::Text)
        .expect("text planned");
    text.start(business_hours()).expect("start");
    store.claim_action(&text).await.expect("claim");

    let channel = Arc::new(DryRunChannel::default());
    let executor = OutreachExecutor::new(channel.clone(), ExecutorSettings::default());
    let early = executor
        .execute_due(&store, business_hours() + Duration::minutes(5))
        .await
        .expect("early tick");
    assert_eq!(early.interrupted, 0);

    let late = executor
        .execute_due(&store, business_hours() + Duration::minutes(16))
        .await
        .expect("late tick");
    assert_eq!(late.interrupted, 1);

    let stuck = store.find_action(&text.id).await.expect("find").expect("action");
    assert_eq!(stuck.status, ActionStatus::Failed);
    assert!(stuck.error.as_deref().is_some_and(|error| error.contains("Interrupted")));
    assert!(!channel
        .dispatched()
        .iter()
        .any(|dispatch| matches!(dispatch, Dispatch::Text { .. })));
}

#[tokio::test]
async fn conversation_log_keeps_both_directions() {
    let store = store().await;
    let fresh = seed_lead(&store, "L-NEW", "+15551234567", LeadStatus::New, Duration::hours(1)).await;
    OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");
    OutreachExecutor::new(Arc::new(DryRunChannel::default()), ExecutorSettings::default())
        .execute_due(&store, business_hours())
        .await
        .expect("execute");
    handle_inbound_text(
        &store,
        &OwnerNotifier::disabled(),
        "+15551234567",
        "how much for term?",
        business_hours() + Duration::minutes(1),
    )
    .await
    .expect("inbound");

    let messages = store.messages_for_lead(&fresh.id).await.expect("messages");

    let directions: Vec<MessageDirection> = messages.iter().map(|message| message.direction).collect();
    assert_eq!(directions, vec![MessageDirection::Outbound, MessageDirection::Inbound]);
    assert!(messages[0].body.starts_with("Hi Maria, this is AgencyVault."));
    assert_eq!(messages[0].to_number.as_deref(), Some("+15551234567"));
    assert_eq!(messages[1].body, "how much for term?");
}

#[tokio::test]
async fn owner_is_alerted_through_the_channel_on_replies() {
    let store = store().await;
    let lead = seed_lead(&store, "L-1", "+15551234567", LeadStatus::Working, Duration::days(1)).await;
    let channel = Arc::new(DryRunChannel::default());
    let notifier = OwnerNotifier::new(channel.clone(), Some("+15550009999".to_string()));

    handle_inbound_text(&store, &notifier, "+15551234567", "ready now, call me", business_hours())
        .await
        .expect("inbound");

    let alerts: Vec<String> = channel
        .dispatched()
        .into_iter()
        .filter_map(|dispatch| match dispatch {
            Dispatch::Text { to, body } if to == "+15550009999" => Some(body),
            _ => None,
        })
        .collect();
    assert_eq!(alerts.len(), 2);
    assert!(alerts[0].starts_with("LEAD_REPLIED\n#L-1 Maria Gomez +15551234567"));
    assert!(alerts[1].starts_with("WAKE_FOR_MONEY"));
    let audit = store.audit_for_lead(&lead.id).await.expect("audit");
    assert_eq!(audit.iter().filter(|entry| entry.is(AuditEventKind::OwnerNotified)).count(), 2);
}

#[tokio::test]
async fn operator_text_and_call_now_dispatch_immediately() {
    let store = store().await;
    let lead = seed_lead(&store, "L-1", "+15551234567", LeadStatus::Working, Duration::days(1)).await;
    let channel = DryRunChannel::default();

    let text = text_now(&store, &channel, &lead.id, "Gomez Agency", business_hours())
        .await
        .expect("text now");
    let call = call_now(&store, &channel, &lead.id, business_hours()).await.expect("call now");

    assert_eq!(text.status, ActionStatus::Done);
    assert_eq!(call.status, ActionStatus::Done);
    assert!(matches!(
        &channel.dispatched()[0],
        Dispatch::Text { body, .. }
            if body == "Hi Maria, this is Gomez Agency. You requested life insurance information. \
                        Do you want a quick quote now?"
    ));
    let touched = store.find_lead(&lead.id).await.expect("find").expect("lead");
    assert_eq!(touched.dial_score, Some(2));
    assert_eq!(touched.dialed_at, Some(business_hours()));
    let audit = store.audit_for_lead(&lead.id).await.expect("audit");
    assert!(audit.iter().any(|entry| entry.is(AuditEventKind::TextNowSent)));
    assert!(audit.iter().any(|entry| entry.is(AuditEventKind::CallNowStarted)));

    let offline = call_now(&store, &OfflineChannel, &lead.id, business_hours()).await.expect("call");
    assert_eq!(offline.status, ActionStatus::Failed);

    store
        .update_lead_status(&lead.id, LeadStatus::DoNotContact, None, business_hours())
        .await
        .expect("opt out");
    let blocked = text_now(&store, &channel, &lead.id, "Gomez Agency", business_hours()).await;
    assert!(matches!(blocked, Err(ApplicationError::Domain(DomainError::ContactBlocked { .. }))));
}

#[tokio::test]
async fn removed_lead_leaves_only_its_audit_trail() {
    let store = store().await;
    let lead = seed_lead(&store, "L-1", "+15551234567", LeadStatus::New, Duration::days(1)).await;
    OutreachPlanner::default().plan_actions(&store, business_hours()).await.expect("plan");

    let removed = remove_lead(&store, &lead.id, business_hours()).await.expect("remove");

    assert_eq!(removed.id, lead.id);
    assert_eq!(store.find_lead(&lead.id).await.expect("find"), None);
    assert!(store.actions_for_lead(&lead.id).await.expect("actions").is_empty());
    let audit = store.audit_for_lead(&lead.id).await.expect("audit");
    assert!(audit.iter().any(|entry| entry.is(AuditEventKind::LeadDeleted)
        && entry.detail == "name=Maria Gomez phone=+15551234567"));

    let again = remove_lead(&store, &lead.id, business_hours()).await;
    assert!(matches!(again, Err(ApplicationError::NotFound { entity: "lead", .. })));
}

#[tokio::test]
async fn opted_out_lead_keeps_its_status_through_review_and_outcomes() {
    let store = store().await;
    let mut lead =
        seed_lead(&store, "L-1", "+15551234567", LeadStatus::DoNotContact, Duration::days(3)).await;
    lead.dial_score = Some(1);
    store.save_lead(&lead).await.expect("save");

    let review = review_lead(&store, &lead.id, true, business_hours()).await.expect("review");
    assert!(!review.applied);

    let action = agencyvault_core::Action::pending(
        lead.id.clone(),
        ActionKind::Review,
        agencyvault_core::ActionPayload::default(),
        business_hours(),
        business_hours(),
    );
    store.save_action(&action).await.expect("save action");
    report_outcome(&store, &action.id, HumanOutcome::NotInterested, None, business_hours())
        .await
        .expect("outcome");

    let reloaded = store.find_lead(&lead.id).await.expect("find").expect("lead");
    assert_eq!(reloaded.status, LeadStatus::DoNotContact);
}
