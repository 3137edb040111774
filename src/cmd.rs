//! Command implementations for the CLI interface.
//!
//! Every handler loads what it needs from the database, runs the matching `Portal`
//! operation as the `--as` user, saves on success and prints the outcome. Failures print
//! `Error: <message>` to stderr and exit with status 1.

use std::fmt::Display;
use std::path::Path;

use chrono::NaiveDate;
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::client::Actor;
use crate::db::*;
use crate::error::{Action, WorkflowError};
use crate::fields::*;
use crate::notify::TracingNotifier;
use crate::permissions;
use crate::portal::{resolve_actor, NewClient, NewTask, Portal, TaskFilter};
use crate::repo::{ClientRepository, TemplateRepository, UserRepository};
use crate::seed;
use crate::task::{Attachment, Task, TaskTemplate};
use crate::tui::board_run::run_board;
use crate::workflow::Transition;

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty database, optionally filled with demo data.
    Init {
        /// Seed the demo agency, clients and templates.
        #[arg(long)]
        demo: bool,
        /// Overwrite an existing database file.
        #[arg(long)]
        force: bool,
    },

    /// List portal users.
    Users,

    /// List clients with their tier and current phase.
    Clients,

    /// Onboard a new client (admin).
    Provision {
        /// Company name. The client id is derived from it.
        company: String,
        /// Primary contact's name.
        #[arg(long)]
        contact: String,
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value_t = Tier::Starter)]
        tier: Tier,
        #[arg(long, value_enum, default_value_t = SubscriptionStatus::Active)]
        status: SubscriptionStatus,
        /// Last day of the trial: YYYY-MM-DD.
        #[arg(long)]
        trial_end: Option<NaiveDate>,
    },

    /// List the tasks you can see.
    List {
        #[arg(long)]
        client: Option<String>,
        #[arg(long, value_enum)]
        phase: Option<Phase>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long, value_enum)]
        owner: Option<Owner>,
        #[arg(long, value_enum, default_value_t = SortKey::Phase)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// View a single task by ID or code.
    View {
        /// Task ID or code (e.g. ST-FND-002).
        id: String,
        /// Client id, to disambiguate task codes.
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Start work on a pending task, or resume one sent back for revision.
    Start {
        id: String,
        #[arg(long)]
        client: Option<String>,
        /// Refuse unless the task is still at this version.
        #[arg(long)]
        if_version: Option<u64>,
    },

    /// Mark a task in progress as done.
    Complete {
        id: String,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        if_version: Option<u64>,
    },

    /// Submit completed work for review.
    Submit {
        id: String,
        #[arg(long)]
        client: Option<String>,
        /// Note for the reviewer.
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        if_version: Option<u64>,
    },

    /// Approve submitted work (US strategy team).
    Approve {
        id: String,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        if_version: Option<u64>,
    },

    /// Send submitted work back for revision (US strategy team).
    Revise {
        id: String,
        #[arg(long)]
        client: Option<String>,
        /// What needs to change.
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        if_version: Option<u64>,
    },

    /// Hand an approved task to the client for their own review cycle.
    Handoff {
        id: String,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        if_version: Option<u64>,
    },

    /// Comment on a task.
    Comment {
        id: String,
        /// Comment text. May be empty when attaching files.
        #[arg(default_value = "")]
        text: String,
        #[arg(long)]
        client: Option<String>,
        /// File URL to attach. May be repeated.
        #[arg(long = "attach")]
        attachments: Vec<String>,
    },

    /// Attach a deliverable document to a task.
    Attach {
        id: String,
        name: String,
        url: String,
        #[arg(long)]
        client: Option<String>,
    },

    /// Assign a team task to a team member.
    Assign {
        id: String,
        /// User id of the assignee.
        user: String,
        #[arg(long)]
        client: Option<String>,
    },

    /// Add a one-off task to a client.
    Add {
        title: String,
        #[arg(long)]
        client: String,
        #[arg(long, value_enum)]
        phase: Option<Phase>,
        #[arg(long, value_enum, default_value_t = Owner::Lead)]
        owner: Owner,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum)]
        cadence: Option<Cadence>,
        /// Due date: YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// Show a client's progress through every phase.
    Phases {
        client: String,
        #[arg(long)]
        json: bool,
    },

    /// Move a client to its next phase once the current one is fully approved.
    Advance { client: String },

    /// Manage task templates.
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Show or change workflow settings (admin).
    Settings {
        /// Let phases without tasks be advanced past.
        #[arg(long)]
        allow_empty_phases: Option<bool>,
        /// Skip a phase when advancing. May be repeated.
        #[arg(long = "disable-phase", value_enum)]
        disable: Vec<Phase>,
        /// Stop skipping a phase. May be repeated.
        #[arg(long = "enable-phase", value_enum)]
        enable: Vec<Phase>,
    },

    /// Open the Kanban board for a client.
    Board {
        #[arg(long)]
        client: String,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// List templates, optionally only those applying to a tier.
    List {
        #[arg(long, value_enum)]
        tier: Option<Tier>,
        #[arg(long)]
        json: bool,
    },
    /// Add a template (admin).
    Add {
        /// Template code, e.g. TPL-EXE-004.
        code: String,
        title: String,
        #[arg(long, value_enum)]
        phase: Phase,
        #[arg(long, value_enum, default_value_t = Owner::Lead)]
        owner: Owner,
        /// Tier the template applies to. May be repeated.
        #[arg(long = "tier", value_enum)]
        tiers: Vec<Tier>,
        #[arg(long, value_enum)]
        cadence: Option<Cadence>,
        #[arg(long)]
        desc: Option<String>,
        /// Position within the phase.
        #[arg(long, default_value_t = 0)]
        order: u32,
    },
    /// Activate or deactivate a template (admin).
    Toggle { code: String },
    /// Delete a template (admin).
    Delete { code: String },
}

fn fail(msg: impl Display) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

fn check<T>(result: Result<T, WorkflowError>) -> T {
    result.unwrap_or_else(|e| fail(e))
}

fn save(db: &mut Database, db_path: &Path) {
    if let Err(e) = db.save(db_path) {
        fail(format!("failed to save database: {}", e));
    }
}

fn acting(db: &Database, user: Option<&str>) -> Actor {
    let Some(id) = user else {
        fail("no acting user; pass --as <user-id> or set PORTAL_USER");
    };
    check(resolve_actor(db, id))
}

fn task_ref(db: &Database, identifier: &str, client: Option<&str>) -> u64 {
    resolve_task_identifier(identifier, client, db).unwrap_or_else(|e| fail(e))
}

/// Create a fresh database file.
pub fn cmd_init(db_path: &Path, demo: bool, force: bool) {
    if db_path.exists() {
        if !force {
            fail(format!("database already exists at {} (use --force to overwrite)", db_path.display()));
        }
        if let Err(e) = std::fs::remove_file(db_path) {
            fail(format!("cannot remove {}: {}", db_path.display(), e));
        }
    }
    let mut db = Database::default();
    if demo {
        check(seed::demo(&mut db, &TracingNotifier, now_ms()));
    }
    save(&mut db, db_path);
    println!(
        "Initialised {} ({} users, {} clients, {} templates, {} tasks)",
        db_path.display(),
        db.users.len(),
        db.clients.len(),
        db.templates.len(),
        db.tasks.len()
    );
}

pub fn cmd_users(db: &Database) {
    println!("{:<28} {:<18} {:<18} {:<22} {}", "ID", "Name", "Role", "Client", "Active");
    for u in db.users() {
        println!(
            "{:<28} {:<18} {:<18} {:<22} {}",
            u.id,
            truncate(&u.name, 18),
            format_role(u.role),
            u.client_id.as_deref().unwrap_or("-"),
            if u.is_active { "yes" } else { "no" }
        );
    }
}

pub fn cmd_clients(db: &Database) {
    println!(
        "{:<24} {:<26} {:<11} {:<10} {:<22} {}",
        "ID", "Company", "Tier", "Plan", "Phase", "Active"
    );
    for c in db.clients() {
        println!(
            "{:<24} {:<26} {:<11} {:<10} {:<22} {}",
            c.id,
            truncate(&c.company, 26),
            format_tier(c.subscription.tier),
            format_subscription_status(c.subscription.status),
            format_phase(c.current_phase),
            if c.is_active { "yes" } else { "no" }
        );
    }
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_provision(
    db: &mut Database,
    db_path: &Path,
    user: Option<&str>,
    company: String,
    contact: String,
    email: String,
    tier: Tier,
    status: SubscriptionStatus,
    trial_end: Option<NaiveDate>,
) {
    let actor = acting(db, user);
    let notifier = TracingNotifier;
    let input = NewClient {
        company,
        contact_name: contact,
        email,
        tier,
        status,
        trial_end_date: trial_end,
    };
    let (client, created) = check(Portal::new(db, &notifier).provision_client(&actor, input));
    save(db, db_path);
    println!(
        "Provisioned {} ({}) on {} with {} onboarding task(s); contact login: {}-contact",
        client.company,
        client.id,
        format_tier(client.subscription.tier),
        created.len(),
        client.id
    );
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_list(
    db: &mut Database,
    user: Option<&str>,
    client: Option<String>,
    phase: Option<Phase>,
    status: Option<Status>,
    owner: Option<Owner>,
    sort: SortKey,
    limit: Option<usize>,
    json: bool,
) {
    let actor = acting(db, user);
    let notifier = TracingNotifier;
    let portal = Portal::new(db, &notifier);
    let filter = TaskFilter { client, phase, status, owner };
    let mut tasks = portal.visible_tasks(&actor, &filter);

    let status_rank = |s: Status| Status::ALL.iter().position(|&x| x == s).unwrap_or(0);
    match sort {
        SortKey::Phase => tasks.sort_by(|a, b| {
            (&a.client_id, a.phase, &a.task_id).cmp(&(&b.client_id, b.phase, &b.task_id))
        }),
        SortKey::Status => tasks.sort_by_key(|t| (status_rank(t.status), t.id)),
        SortKey::Updated => tasks.sort_by_key(|t| std::cmp::Reverse(t.updated_at_utc)),
        SortKey::Id => tasks.sort_by_key(|t| t.id),
    }
    if let Some(n) = limit {
        tasks.truncate(n);
    }

    if json {
        match serde_json::to_string_pretty(&tasks) {
            Ok(s) => println!("{}", s),
            Err(e) => fail(e),
        }
    } else {
        print_table(&tasks);
    }
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, user: Option<&str>, id: String, client: Option<String>, json: bool) {
    let actor = acting(db, user);
    let task_id = task_ref(db, &id, client.as_deref());
    let Some(task) = db.get(task_id) else {
        fail(format!("task {} not found", task_id));
    };
    if !permissions::can_view(&actor, task) {
        fail(WorkflowError::Forbidden { action: Action::View, role: actor.role });
    }

    if json {
        match serde_json::to_string_pretty(task) {
            Ok(s) => println!("{}", s),
            Err(e) => fail(e),
        }
        return;
    }
    print_task(task);
}

fn print_task(task: &Task) {
    println!("ID:           {}", task.id);
    println!("Code:         {}", task.task_id);
    println!("Title:        {}", task.title);
    println!("Client:       {}", task.client_id);
    println!("Phase:        {}", format_phase(task.phase));
    println!("Status:       {}", format_status(task.status));
    println!("Owner:        {}", format_owner(task.owner));
    println!("Approver:     {}", task.approver.map(format_role).unwrap_or("-"));
    println!("Assigned to:  {}", task.assigned_to.as_deref().unwrap_or("-"));
    println!("Cadence:      {}", format_cadence(task.cadence));
    println!("Due:          {}", task.due.map(|d| d.to_string()).unwrap_or_else(|| "-".into()));
    println!("Template:     {}", task.template_id.as_deref().unwrap_or("-"));
    println!("Version:      {}", task.version);
    println!("Created UTC:  {}", format_timestamp(task.created_at_utc));
    println!("Updated UTC:  {}", format_timestamp(task.updated_at_utc));
    println!("Description:\n{}\n", task.description.as_deref().unwrap_or("-"));

    if !task.documents.is_empty() {
        println!("Documents:");
        for d in &task.documents {
            println!("  - {} <{}> by {} at {}", d.name, d.url, d.uploaded_by, format_timestamp(d.uploaded_at_utc));
        }
    }
    if !task.comments.is_empty() {
        println!("Comments:");
        for c in &task.comments {
            println!("  [{}] {} ({}):", format_timestamp(c.created_at_utc), c.user_name, format_role(c.user_role));
            if !c.content.is_empty() {
                println!("    {}", c.content);
            }
            for a in &c.attachments {
                println!("    + {} <{}>", a.name, a.url);
            }
        }
    }
}

/// Run one status transition on a task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_transition(
    db: &mut Database,
    db_path: &Path,
    user: Option<&str>,
    id: String,
    client: Option<String>,
    transition: Transition,
    note: Option<String>,
    if_version: Option<u64>,
) {
    let actor = acting(db, user);
    let task_id = task_ref(db, &id, client.as_deref());
    let notifier = TracingNotifier;
    let mut portal = Portal::new(db, &notifier);
    let note = note.as_deref();
    let result = match (transition, if_version) {
        (t, Some(v)) => portal.transition_checked(task_id, &actor, t, note, v),
        (Transition::Start, None) => portal.start_task(task_id, &actor),
        (Transition::Complete, None) => portal.complete_task(task_id, &actor),
        (Transition::Submit, None) => portal.submit_task(task_id, &actor, note),
        (Transition::Approve, None) => portal.approve_task(task_id, &actor),
        (Transition::RequestRevision, None) => portal.request_revision(task_id, &actor, note),
        (Transition::HandoffToClient, None) => portal.handoff_to_client(task_id, &actor),
    };
    let task = check(result);
    save(db, db_path);
    println!(
        "{} {}: {} (owner: {}, version {})",
        task.task_id,
        task.title,
        format_status(task.status),
        format_owner(task.owner),
        task.version
    );
}

fn attachment_from_url(index: usize, url: &str) -> Attachment {
    let name = url.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(url).to_string();
    let content_type = match name.rsplit('.').next().map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("csv") => "text/csv",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    };
    Attachment {
        id: format!("a-{}", index + 1),
        name,
        size: 0,
        content_type: content_type.to_string(),
        url: url.to_string(),
    }
}

pub fn cmd_comment(
    db: &mut Database,
    db_path: &Path,
    user: Option<&str>,
    id: String,
    text: String,
    client: Option<String>,
    attachments: Vec<String>,
) {
    let actor = acting(db, user);
    let task_id = task_ref(db, &id, client.as_deref());
    let files = attachments.iter().enumerate().map(|(i, u)| attachment_from_url(i, u)).collect();
    let notifier = TracingNotifier;
    let task = check(Portal::new(db, &notifier).add_comment(task_id, &actor, &text, files));
    save(db, db_path);
    println!("Commented on {} ({} comment(s))", task.task_id, task.comments.len());
}

pub fn cmd_attach(
    db: &mut Database,
    db_path: &Path,
    user: Option<&str>,
    id: String,
    name: String,
    url: String,
    client: Option<String>,
) {
    let actor = acting(db, user);
    let task_id = task_ref(db, &id, client.as_deref());
    let notifier = TracingNotifier;
    let task = check(Portal::new(db, &notifier).add_document(task_id, &actor, &name, &url));
    save(db, db_path);
    println!("Attached {} to {}", name, task.task_id);
}

pub fn cmd_assign(
    db: &mut Database,
    db_path: &Path,
    user: Option<&str>,
    id: String,
    assignee: String,
    client: Option<String>,
) {
    let actor = acting(db, user);
    let task_id = task_ref(db, &id, client.as_deref());
    let notifier = TracingNotifier;
    let task = check(Portal::new(db, &notifier).assign_task(task_id, &actor, &assignee));
    save(db, db_path);
    println!("Assigned {} to {} ({})", task.task_id, assignee, format_owner(task.owner));
}

/// Add a one-off task. Without `--phase` it lands in the client's current phase.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    user: Option<&str>,
    title: String,
    client: String,
    phase: Option<Phase>,
    owner: Owner,
    desc: Option<String>,
    cadence: Option<Cadence>,
    due: Option<NaiveDate>,
) {
    let actor = acting(db, user);
    let Some(phase) = phase.or_else(|| db.client(&client).map(|c| c.current_phase)) else {
        fail(WorkflowError::NotFound(format!("client {}", client)));
    };
    let input = NewTask {
        client_id: client,
        title,
        description: desc.filter(|d| !d.trim().is_empty()),
        phase,
        owner,
        cadence,
        due,
    };
    let notifier = TracingNotifier;
    let task = check(Portal::new(db, &notifier).create_task(&actor, input));
    save(db, db_path);
    println!("Added task {} ({}) for {}", task.task_id, task.id, task.client_id);
}

pub fn cmd_phases(db: &mut Database, client_id: String, json: bool) {
    let notifier = TracingNotifier;
    let portal = Portal::new(db, &notifier);
    let overview = check(portal.phase_overview(&client_id));
    if json {
        match serde_json::to_string_pretty(&overview) {
            Ok(s) => println!("{}", s),
            Err(e) => fail(e),
        }
        return;
    }

    let Some(client) = portal.store().client(&client_id) else {
        fail(WorkflowError::NotFound(format!("client {}", client_id)));
    };
    let disabled = &portal.store().settings.disabled_phases;
    println!(
        "{} ({})  Tier: {}  Current: {}",
        client.company,
        client.id,
        format_tier(client.subscription.tier),
        format_phase(client.current_phase)
    );
    for p in &overview {
        let marker = if p.phase == client.current_phase {
            ">"
        } else if disabled.contains(&p.phase) || !client.subscription.tier.unlocks(p.phase) {
            "-"
        } else {
            " "
        };
        println!(
            "{} {:<24} {:>3}/{:<3} approved  {:>3}%  ({} pending, {} in progress)",
            marker,
            format_phase(p.phase),
            p.approved,
            p.total,
            p.percent(),
            p.pending,
            p.in_progress
        );
    }
}

pub fn cmd_advance(db: &mut Database, db_path: &Path, user: Option<&str>, client_id: String) {
    let actor = acting(db, user);
    let notifier = TracingNotifier;
    let (client, created) = check(Portal::new(db, &notifier).advance_phase(&client_id, &actor));
    save(db, db_path);
    println!("{} is now in {}", client.company, format_phase(client.current_phase));
    for t in &created {
        println!("  + {} {}", t.task_id, t.title);
    }
}

/// Handle template management commands.
pub fn cmd_templates(db: &mut Database, db_path: &Path, user: Option<&str>, action: TemplateAction) {
    let notifier = TracingNotifier;
    match action {
        TemplateAction::List { tier, json } => {
            let portal = Portal::new(db, &notifier);
            let list: Vec<TaskTemplate> = match tier {
                Some(t) => portal.resolve_templates_for_tier(t),
                None => {
                    let mut all: Vec<TaskTemplate> = portal.store().templates().into_iter().cloned().collect();
                    all.sort_by_key(|t| (t.phase, t.order));
                    all
                }
            };
            if json {
                match serde_json::to_string_pretty(&list) {
                    Ok(s) => println!("{}", s),
                    Err(e) => fail(e),
                }
                return;
            }
            println!("{:<13} {:<5} {:<17} {:<11} {:<26} {:<7} {}", "Code", "Phase", "Owner", "Cadence", "Tiers", "Active", "Title");
            for t in &list {
                let tiers: Vec<&str> = t.tiers.iter().map(|&x| format_tier(x)).collect();
                println!(
                    "{:<13} {:<5} {:<17} {:<11} {:<26} {:<7} {}",
                    t.task_id,
                    t.phase.code(),
                    format_owner(t.owner),
                    format_cadence(t.cadence),
                    tiers.join(","),
                    if t.is_active { "yes" } else { "no" },
                    t.title
                );
            }
        }
        TemplateAction::Add { code, title, phase, owner, tiers, cadence, desc, order } => {
            let actor = acting(db, user);
            let template = TaskTemplate {
                task_id: code.trim().to_ascii_uppercase(),
                title,
                description: desc,
                phase,
                owner,
                approver: Some(Role::Gatekeeper),
                cadence,
                tiers,
                is_active: true,
                order,
            };
            let added = check(Portal::new(db, &notifier).add_template(&actor, template));
            save(db, db_path);
            println!("Added template {}", added.task_id);
        }
        TemplateAction::Toggle { code } => {
            let actor = acting(db, user);
            let Some(current) = db.template(&code).map(|t| t.is_active) else {
                fail(WorkflowError::NotFound(format!("template {}", code)));
            };
            let t = check(Portal::new(db, &notifier).set_template_active(&actor, &code, !current));
            save(db, db_path);
            println!("Template {} is now {}", t.task_id, if t.is_active { "active" } else { "inactive" });
        }
        TemplateAction::Delete { code } => {
            let actor = acting(db, user);
            let t = check(Portal::new(db, &notifier).delete_template(&actor, &code));
            save(db, db_path);
            println!("Deleted template {}", t.task_id);
        }
    }
}

pub fn cmd_settings(
    db: &mut Database,
    db_path: &Path,
    user: Option<&str>,
    allow_empty_phases: Option<bool>,
    disable: Vec<Phase>,
    enable: Vec<Phase>,
) {
    if allow_empty_phases.is_some() || !disable.is_empty() || !enable.is_empty() {
        let actor = acting(db, user);
        let mut next = db.settings.clone();
        if let Some(v) = allow_empty_phases {
            next.allow_empty_phases = v;
        }
        for p in disable {
            if !next.disabled_phases.contains(&p) {
                next.disabled_phases.push(p);
            }
        }
        next.disabled_phases.retain(|p| !enable.contains(p));
        next.disabled_phases.sort();
        let notifier = TracingNotifier;
        check(Portal::new(db, &notifier).update_settings(&actor, next));
        save(db, db_path);
    }

    let s = &db.settings;
    println!("allow_empty_phases: {}", s.allow_empty_phases);
    let disabled: Vec<&str> = s.disabled_phases.iter().map(|&p| format_phase(p)).collect();
    println!("disabled_phases:    {}", if disabled.is_empty() { "-".to_string() } else { disabled.join(", ") });
}

/// Launch the Kanban board for one client.
pub fn cmd_board(db: &Database, db_path: &Path, user: Option<&str>, client: String) {
    let actor = acting(db, user);
    if db.client(&client).is_none() {
        fail(WorkflowError::NotFound(format!("client {}", client)));
    }
    if let Err(e) = run_board(db_path, actor, client) {
        fail(format!("board error: {}", e));
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_names_and_types_from_url() {
        let a = attachment_from_url(0, "https://files.test/reports/june.PDF");
        assert_eq!(a.name, "june.PDF");
        assert_eq!(a.content_type, "application/pdf");
        assert_eq!(a.id, "a-1");

        let b = attachment_from_url(2, "https://files.test/raw");
        assert_eq!(b.content_type, "application/octet-stream");
        assert_eq!(b.id, "a-3");
    }
}
