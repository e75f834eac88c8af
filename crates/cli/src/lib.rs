pub mod commands;

use std::process::ExitCode;

use agencyvault_core::config::ConfigOverrides;
use agencyvault_core::outreach::NewLead;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "agencyvault",
    about = "AgencyVault operator CLI",
    long_about = "Plan and execute lead follow-up, inspect configuration, and manage the outreach database.",
    after_help = "Examples:\n  agencyvault doctor --json\n  agencyvault plan --batch-size 10\n  agencyvault decide lead-123 --apply\n  agencyvault text-now lead-123"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Override the configured database URL")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Validate config, contact window, and database readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Load the deterministic demo lead dataset")]
    Seed,
    #[command(about = "Run one planning batch over eligible leads")]
    Plan {
        #[arg(long, help = "Maximum number of leads to consider")]
        batch_size: Option<u32>,
    },
    #[command(about = "Execute due actions through the dry-run channel")]
    Execute {
        #[arg(long, help = "Maximum number of pending actions to consider")]
        limit: Option<u32>,
    },
    #[command(about = "Show the next-action decision for a lead")]
    Decide {
        lead_id: String,
        #[arg(long, help = "Persist the decision's status change and note")]
        apply: bool,
    },
    #[command(about = "Create a lead from operator input")]
    AddLead {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, help = "IANA timezone, e.g. America/Chicago")]
        timezone: Option<String>,
    },
    #[command(about = "Delete a lead with its actions, memory and messages")]
    DeleteLead { lead_id: String },
    #[command(about = "Send the speed-to-lead text to a lead immediately")]
    TextNow { lead_id: String },
    #[command(about = "Place a call to a lead immediately")]
    CallNow { lead_id: String },
}

pub fn run() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let overrides =
        ConfigOverrides { database_url: cli.database_url, ..ConfigOverrides::default() };

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(overrides),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(overrides, json) }
        }
        Command::Config => commands::config::run(),
        Command::Seed => commands::seed::run(overrides),
        Command::Plan { batch_size } => commands::plan::run(overrides, batch_size),
        Command::Execute { limit } => commands::execute::run(overrides, limit),
        Command::Decide { lead_id, apply } => commands::decide::run(overrides, lead_id, apply),
        Command::AddLead { name, phone, email, timezone } => commands::add_lead::run(
            overrides,
            NewLead { full_name: name, phone, email, timezone },
        ),
        Command::DeleteLead { lead_id } => commands::delete_lead::run(overrides, lead_id),
        Command::TextNow { lead_id } => commands::contact_now::text(overrides, lead_id),
        Command::CallNow { lead_id } => commands::contact_now::call(overrides, lead_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Diagnostics go to stderr so stdout stays a single JSON document.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
