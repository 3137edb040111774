//! # portal - agency client-portal workflow CLI
//!
//! A file-backed workflow engine for an SEO agency's client portal. Work for each client
//! moves through fixed phases (onboarding, foundation, execution, AI optimisation,
//! reporting, monitoring). Every task follows one review cycle:
//!
//! ```text
//! pending -> in-progress -> completed -> submitted -> approved
//!                 ^                          |
//!                 +-------- resubmit <-------+
//! ```
//!
//! Only the US strategy team approves. Approved work can be handed to the client, which
//! restarts the task under the client's ownership. A client moves to its next phase once
//! every task of the current phase is approved, and that phase's tasks are created from
//! templates matching the client's subscription tier.
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a database with the demo agency
//! portal init --demo
//!
//! # Finish the task the demo assigned to a junior
//! portal --as india-junior-1 list --client acme-plumbing-co
//! portal --as india-junior-1 complete ST-FND-001 --client acme-plumbing-co
//! portal --as india-junior-1 submit ST-FND-001 --client acme-plumbing-co --note "Baseline saved"
//!
//! # Review submitted work as the US strategy team and check the phase gate
//! portal --as us-1 approve ST-FND-002 --client acme-plumbing-co
//! portal --as us-1 phases acme-plumbing-co
//!
//! # Kanban board
//! portal --as us-1 board --client acme-plumbing-co
//! ```
//!
//! Data is stored in `~/.portal/portal.json` unless `--db` or `PORTAL_DB` says otherwise.
//! Logs go to stderr; set `PORTAL_LOG` (or `RUST_LOG`) to adjust the level and
//! `PORTAL_LOG_JSON=1` for JSON lines.

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod client;
pub mod cmd;
pub mod db;
pub mod error;
pub mod fields;
pub mod notify;
pub mod permissions;
pub mod phase;
pub mod portal;
pub mod repo;
pub mod seed;
pub mod task;
pub mod templates;
pub mod workflow;
pub mod tui {
    pub mod board;
    pub mod board_run;
    pub mod colors;
}

use cli::Cli;
use cmd::*;
use db::Database;
use workflow::Transition;

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PORTAL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    if env_bool("PORTAL_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let db_path = cli.db_path();
    let user = cli.user.as_deref();

    // Commands that don't read an existing database.
    match &cli.command {
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return;
        }
        Commands::Init { demo, force } => {
            cmd_init(&db_path, *demo, *force);
            return;
        }
        _ => {}
    }

    let mut db = match Database::load(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error: cannot load {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!("handled above"),

        Commands::Users => cmd_users(&db),

        Commands::Clients => cmd_clients(&db),

        Commands::Provision { company, contact, email, tier, status, trial_end } =>
            cmd_provision(&mut db, &db_path, user, company, contact, email, tier, status, trial_end),

        Commands::List { client, phase, status, owner, sort, limit, json } =>
            cmd_list(&mut db, user, client, phase, status, owner, sort, limit, json),

        Commands::View { id, client, json } => cmd_view(&db, user, id, client, json),

        Commands::Start { id, client, if_version } =>
            cmd_transition(&mut db, &db_path, user, id, client, Transition::Start, None, if_version),

        Commands::Complete { id, client, if_version } =>
            cmd_transition(&mut db, &db_path, user, id, client, Transition::Complete, None, if_version),

        Commands::Submit { id, client, note, if_version } =>
            cmd_transition(&mut db, &db_path, user, id, client, Transition::Submit, note, if_version),

        Commands::Approve { id, client, if_version } =>
            cmd_transition(&mut db, &db_path, user, id, client, Transition::Approve, None, if_version),

        Commands::Revise { id, client, reason, if_version } =>
            cmd_transition(&mut db, &db_path, user, id, client, Transition::RequestRevision, reason, if_version),

        Commands::Handoff { id, client, if_version } =>
            cmd_transition(&mut db, &db_path, user, id, client, Transition::HandoffToClient, None, if_version),

        Commands::Comment { id, text, client, attachments } =>
            cmd_comment(&mut db, &db_path, user, id, text, client, attachments),

        Commands::Attach { id, name, url, client } => cmd_attach(&mut db, &db_path, user, id, name, url, client),

        Commands::Assign { id, user: assignee, client } =>
            cmd_assign(&mut db, &db_path, user, id, assignee, client),

        Commands::Add { title, client, phase, owner, desc, cadence, due } =>
            cmd_add(&mut db, &db_path, user, title, client, phase, owner, desc, cadence, due),

        Commands::Phases { client, json } => cmd_phases(&mut db, client, json),

        Commands::Advance { client } => cmd_advance(&mut db, &db_path, user, client),

        Commands::Templates { action } => cmd_templates(&mut db, &db_path, user, action),

        Commands::Settings { allow_empty_phases, disable, enable } =>
            cmd_settings(&mut db, &db_path, user, allow_empty_phases, disable, enable),

        Commands::Board { client } => cmd_board(&db, &db_path, user, client),
    }
}
