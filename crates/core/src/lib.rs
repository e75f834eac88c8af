pub use chrono;

pub mod audit;
pub mod compliance;
pub mod config;
pub mod contact;
pub mod decision;
pub mod domain;
pub mod errors;
pub mod outreach;

pub use audit::{AuditEntry, AuditEventKind};
pub use compliance::{classify_inbound_text, ContactWindow, InboundIntent};
pub use decision::{apply_decision, decide_next_action, Decision, NextAction};
pub use domain::action::{Action, ActionId, ActionKind, ActionPayload, ActionStatus};
pub use domain::lead::{Lead, LeadFlags, LeadId, LeadMemoryEntry, LeadMemoryKey, LeadStatus};
pub use domain::message::{Message, MessageDirection};
pub use domain::run::{AgentRun, RunId, RunMode, RunStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use outreach::{
    call_now, create_lead, handle_inbound_text, remove_lead, report_outcome, review_lead,
    text_now, DecisionReport, DryRunChannel, ExecutionReport, ExecutorSettings, HumanOutcome,
    LeadTransition, NewLead, OutboundChannel, OutreachExecutor, OutreachPlan, OutreachPlanner,
    OutreachStore, OwnerNotifier, PlanCommit, PlanReport, PlannerSettings, PlanningCandidate,
};
