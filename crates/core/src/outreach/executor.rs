//! Outreach executor
//!
//! Walks PENDING TEXT/CALL actions and performs the ones that are due, inside the
//! lead's local contact window, through an [`OutboundChannel`]. REVIEW actions are
//! left for a human and never picked up here.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::audit::{AuditEntry, AuditEventKind};
use crate::compliance::ContactWindow;
use crate::domain::action::{Action, ActionKind};
use crate::domain::lead::Lead;
use crate::domain::message::Message;
use crate::domain::run::{AgentRun, RunId, RunMode};
use crate::errors::ApplicationError;
use crate::outreach::channel::{ChannelError, OutboundChannel};
use crate::outreach::store::OutreachStore;

pub const INTERRUPTED_REASON: &str = "Interrupted while running; delivery unknown";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub batch_limit: u32,
    pub window: ContactWindow,
    /// Body used when a TEXT action was queued without a message.
    pub fallback_text: String,
    /// RUNNING actions started longer ago than this are failed as interrupted.
    pub running_timeout: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            batch_limit: 20,
            window: ContactWindow::default(),
            fallback_text: "Hi, just checking in on your life insurance request. \
                            Reply here with any questions."
                .to_string(),
            running_timeout: Duration::minutes(15),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub run_id: RunId,
    pub considered: u32,
    pub executed: u32,
    pub failed: u32,
    pub skipped: u32,
    /// Not yet due, or outside the lead's contact window. Still PENDING.
    pub deferred: u32,
    /// RUNNING actions from an earlier tick that never finished.
    pub interrupted: u32,
}

impl ExecutionReport {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            considered: 0,
            executed: 0,
            failed: 0,
            skipped: 0,
            deferred: 0,
            interrupted: 0,
        }
    }
}

enum Outcome {
    Executed,
    Failed,
    Skipped,
    Deferred,
}

/// What actually went out for an action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Dispatched {
    pub to: String,
    pub body: Option<String>,
    pub provider_id: String,
}

pub struct OutreachExecutor {
    channel: Arc<dyn OutboundChannel>,
    settings: ExecutorSettings,
}

impl OutreachExecutor {
    pub fn new(channel: Arc<dyn OutboundChannel>, settings: ExecutorSettings) -> Self {
        Self { channel, settings }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Runs one executor tick. Dispatch failures are recorded on the action and do not
    /// stop the tick; store failures close the run as FAILED and are returned.
    pub async fn execute_due<S>(
        &self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<ExecutionReport, ApplicationError>
    where
        S: OutreachStore + ?Sized,
    {
        let mut run =
            AgentRun::start(RunMode::Execution, self.settings.batch_limit, "Executor tick", now);
        store.save_run(&run).await?;
        store
            .append_audit(AuditEntry::new(
                Some(run.id.clone()),
                None,
                AuditEventKind::ExecutorTick,
                format!("limit={} channel={}", self.settings.batch_limit, self.channel.name()),
                now,
            ))
            .await?;

        let mut report = ExecutionReport::new(run.id.clone());
        let outcome = self.execute_batch(store, &run.id, now, &mut report).await;

        if let Err(tick_error) = outcome {
            run.fail(&tick_error.to_string(), now);
            error!(
                event_name = "outreach.executor.failed",
                run_id = %run.id,
                error = %tick_error,
                "executor tick aborted"
            );
            if let Err(close_error) = store.save_run(&run).await {
                warn!(
                    event_name = "outreach.executor.close_failed",
                    run_id = %run.id,
                    error = %close_error,
                    "could not mark executor run as failed"
                );
            }
            let _ = store
                .append_audit(AuditEntry::new(
                    Some(run.id.clone()),
                    None,
                    AuditEventKind::ExecutorFailed,
                    tick_error.to_string(),
                    now,
                ))
                .await;
            return Err(tick_error);
        }

        run.succeed(report.executed, report.considered, now);
        store.save_run(&run).await?;
        store
            .append_audit(AuditEntry::new(
                Some(run.id.clone()),
                None,
                AuditEventKind::ExecutorDone,
                format!(
                    "executed={} failed={} skipped={} deferred={} interrupted={}",
                    report.executed,
                    report.failed,
                    report.skipped,
                    report.deferred,
                    report.interrupted
                ),
                now,
            ))
            .await?;

        info!(
            event_name = "outreach.executor.completed",
            run_id = %report.run_id,
            executed = report.executed,
            failed = report.failed,
            skipped = report.skipped,
            deferred = report.deferred,
            interrupted = report.interrupted,
            "executor tick finished"
        );
        Ok(report)
    }

    async fn execute_batch<S>(
        &self,
        store: &S,
        run_id: &RunId,
        now: DateTime<Utc>,
        report: &mut ExecutionReport,
    ) -> Result<(), ApplicationError>
    where
        S: OutreachStore + ?Sized,
    {
        report.interrupted = self.fail_interrupted(store, run_id, now).await?;

        let actions = store.pending_outbound_actions(self.settings.batch_limit).await?;

        for action in actions {
            report.considered += 1;
            match self.execute_one(store, run_id, action, now).await? {
                Outcome::Executed => report.executed += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Deferred => report.deferred += 1,
            }
        }
        Ok(())
    }

    /// Fails actions left RUNNING by a crashed or aborted tick. They are never retried:
    /// the provider may already have delivered them.
    async fn fail_interrupted<S>(
        &self,
        store: &S,
        run_id: &RunId,
        now: DateTime<Utc>,
    ) -> Result<u32, ApplicationError>
    where
        S: OutreachStore + ?Sized,
    {
        let cutoff = now - self.settings.running_timeout;
        let stuck = store.running_actions_started_before(cutoff, self.settings.batch_limit).await?;

        let mut interrupted = 0_u32;
        for mut action in stuck {
            action.fail(INTERRUPTED_REASON, now)?;
            store.save_action(&action).await?;
            store
                .append_audit(AuditEntry::new(
                    Some(run_id.clone()),
                    Some(action.lead_id.clone()),
                    AuditEventKind::ActionInterrupted,
                    format!(
                        "action_id={} started_at={}",
                        action.id,
                        action.started_at.map(|at| at.to_rfc3339()).unwrap_or_default()
                    ),
                    now,
                ))
                .await?;
            warn!(
                event_name = "outreach.executor.interrupted",
                run_id = %run_id,
                action_id = %action.id,
                "failed an action stuck in RUNNING"
            );
            interrupted += 1;
        }
        Ok(interrupted)
    }

    async fn execute_one<S>(
        &self,
        store: &S,
        run_id: &RunId,
        mut action: Action,
        now: DateTime<Utc>,
    ) -> Result<Outcome, ApplicationError>
    where
        S: OutreachStore + ?Sized,
    {
        if action.kind == ActionKind::Review || !action.is_due(now) {
            return Ok(Outcome::Deferred);
        }

        let audit = |event: AuditEventKind, action: &Action, detail: String| {
            AuditEntry::new(
                Some(run_id.clone()),
                Some(action.lead_id.clone()),
                event,
                detail,
                now,
            )
        };

        let Some(lead) = store.find_lead(&action.lead_id).await? else {
            action.fail("missing lead", now)?;
            store.save_action(&action).await?;
            store
                .append_audit(audit(AuditEventKind::ActionFailed, &action, "missing lead".to_string()))
                .await?;
            return Ok(Outcome::Failed);
        };

        if lead.status.is_compliance_stop() {
            let reason = format!("Lead is {}", lead.status.as_str());
            action.skip(reason.clone(), now)?;
            store.save_action(&action).await?;
            store.append_audit(audit(AuditEventKind::ActionSkippedDnc, &action, reason)).await?;
            return Ok(Outcome::Skipped);
        }

        if !self.settings.window.allows(lead.timezone.as_deref(), now) {
            return Ok(Outcome::Deferred);
        }

        action.start(now)?;
        if !store.claim_action(&action).await? {
            info!(
                event_name = "outreach.executor.claim_lost",
                run_id = %run_id,
                action_id = %action.id,
                "action left PENDING before it could be claimed"
            );
            return Ok(Outcome::Skipped);
        }

        // An opt-out that landed after the first read but before the claim.
        let lead = match store.find_lead(&action.lead_id).await? {
            Some(current) if current.status.is_compliance_stop() => {
                let reason = format!("Lead is {}", current.status.as_str());
                action.skip(reason.clone(), now)?;
                store.save_action(&action).await?;
                store.append_audit(audit(AuditEventKind::ActionSkippedDnc, &action, reason)).await?;
                return Ok(Outcome::Skipped);
            }
            Some(current) => current,
            None => lead,
        };

        match self.dispatch(&action, &lead).await {
            Ok(dispatched) => {
                let mut done = action.clone();
                done.complete(now)?;
                if let Err(store_error) = store.save_action(&done).await {
                    self.release_unrecorded(store, run_id, action, &store_error, now).await;
                    return Err(store_error);
                }
                store.record_touch(&lead.id, done.kind == ActionKind::Call, now).await?;
                if let (ActionKind::Text, Some(body)) = (done.kind, dispatched.body.as_deref()) {
                    store
                        .record_message(&Message::outbound(
                            lead.id.clone(),
                            dispatched.to.clone(),
                            body,
                            dispatched.provider_id.clone(),
                            now,
                        ))
                        .await?;
                }
                let event = match done.kind {
                    ActionKind::Call => AuditEventKind::CallStarted,
                    _ => AuditEventKind::TextSent,
                };
                store
                    .append_audit(audit(
                        event,
                        &done,
                        format!("provider_id={}", dispatched.provider_id),
                    ))
                    .await?;
                Ok(Outcome::Executed)
            }
            Err(dispatch_error) => {
                warn!(
                    event_name = "outreach.executor.dispatch_failed",
                    run_id = %run_id,
                    lead_id = %lead.id,
                    action_id = %action.id,
                    error = %dispatch_error,
                    "outbound dispatch failed"
                );
                action.fail(dispatch_error.to_string(), now)?;
                store.save_action(&action).await?;
                store
                    .append_audit(audit(AuditEventKind::ActionError, &action, dispatch_error.to_string()))
                    .await?;
                Ok(Outcome::Failed)
            }
        }
    }

    /// Best effort after a send whose DONE row could not be written: fail the action so
    /// it is neither retried nor left RUNNING. If this write fails too, the next tick's
    /// interrupted sweep picks it up.
    async fn release_unrecorded<S>(
        &self,
        store: &S,
        run_id: &RunId,
        mut action: Action,
        store_error: &ApplicationError,
        now: DateTime<Utc>,
    ) where
        S: OutreachStore + ?Sized,
    {
        error!(
            event_name = "outreach.executor.unrecorded_send",
            run_id = %run_id,
            action_id = %action.id,
            error = %store_error,
            "dispatch succeeded but its result could not be stored"
        );
        let reason = format!("Sent, but the result could not be recorded: {store_error}");
        if action.fail(reason, now).is_err() {
            return;
        }
        if let Err(release_error) = store.save_action(&action).await {
            warn!(
                event_name = "outreach.executor.release_failed",
                run_id = %run_id,
                action_id = %action.id,
                error = %release_error,
                "could not fail the unrecorded action; leaving it for the interrupted sweep"
            );
        }
    }

    async fn dispatch(&self, action: &Action, lead: &Lead) -> Result<Dispatched, ChannelError> {
        let to = dispatch_target(action, lead)
            .ok_or_else(|| ChannelError::Rejected("no destination phone".to_string()))?
            .to_string();

        match action.kind {
            ActionKind::Call => {
                let provider_id = self.channel.place_call(&to, &lead.id).await?;
                Ok(Dispatched { to, body: None, provider_id })
            }
            _ => {
                let body = action
                    .payload
                    .message
                    .clone()
                    .unwrap_or_else(|| self.settings.fallback_text.clone());
                let provider_id = self.channel.send_text(&to, &body).await?;
                Ok(Dispatched { to, body: Some(body), provider_id })
            }
        }
    }
}

/// The payload's `to` wins; the lead's current phone is the fallback.
fn dispatch_target<'a>(action: &'a Action, lead: &'a Lead) -> Option<&'a str> {
    action
        .payload
        .to
        .as_deref()
        .or(lead.phone.as_deref())
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
}
