pub mod channel;
pub mod executor;
pub mod inbound;
pub mod intake;
pub mod manual;
pub mod notify;
pub mod outcome;
pub mod planner;
pub mod review;
pub mod store;

pub use channel::{ChannelError, Dispatch, DryRunChannel, OutboundChannel};
pub use executor::{ExecutionReport, ExecutorSettings, OutreachExecutor};
pub use inbound::{handle_inbound_text, InboundReport};
pub use intake::{create_lead, remove_lead, NewLead};
pub use manual::{call_now, text_now};
pub use notify::{AlertOutcome, AlertSubject, AlertTag, OwnerNotifier};
pub use outcome::{report_outcome, HumanOutcome};
pub use planner::{OutreachPlanner, PlanReport, PlannerSettings};
pub use review::{review_lead, DecisionReport};
pub use store::{LeadTransition, OutreachPlan, OutreachStore, PlanCommit, PlanningCandidate};
