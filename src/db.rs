//! Database operations and utility functions for the portal.
//!
//! This module provides the `Database` struct that stores users, clients, tasks and
//! templates in a single JSON file and implements the repository traits over it, along
//! with display formatting, identifier resolution and table printing helpers.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{Client, User};
use crate::error::StoreError;
use crate::fields::*;
use crate::repo::*;
use crate::task::{Task, TaskTemplate};

/// Workflow policy persisted alongside the data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Let a phase with no tasks count as complete for advancement.
    #[serde(default)]
    pub allow_empty_phases: bool,
    /// Phases skipped when a client advances.
    #[serde(default)]
    pub disabled_phases: Vec<Phase>,
}

/// In-memory database for the whole portal.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub templates: Vec<TaskTemplate>,
    /// Per-(client, phase) task code counters, keyed `client/PHASE`.
    #[serde(default)]
    pub sequences: BTreeMap<String, u32>,
    #[serde(default)]
    pub settings: Settings,
    /// Bumped on every save. A save is refused unless the file still holds the revision
    /// this copy was loaded at.
    #[serde(default)]
    pub revision: u64,
}

/// Only the revision is needed to check a file for concurrent writes.
#[derive(Deserialize)]
struct RevisionHeader {
    #[serde(default)]
    revision: u64,
}

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Exclusive lease on a database file, released on drop.
struct FileLease {
    path: PathBuf,
}

impl FileLease {
    fn acquire(db_path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        let path = db_path.with_extension("json.lock");
        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(FileLease { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if started.elapsed() >= timeout {
                        return Err(StoreError::Locked(path.display().to_string()));
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for FileLease {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn revision_on_disk(path: &Path) -> Result<u64, StoreError> {
    if !path.exists() {
        return Ok(0);
    }
    let mut buf = String::new();
    File::open(path)?.read_to_string(&mut buf)?;
    let header: RevisionHeader = serde_json::from_str(&buf)?;
    Ok(header.revision)
}

impl Database {
    /// Load database from a JSON file. A missing file yields an empty database.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    ///
    /// The write happens under a lock file and only if nobody else saved since this copy
    /// was loaded; otherwise `StoreError::Stale` and the file is left untouched.
    pub fn save(&mut self, path: &Path) -> Result<(), StoreError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let _lease = FileLease::acquire(path, LOCK_TIMEOUT)?;
        let found = revision_on_disk(path)?;
        if found != self.revision {
            return Err(StoreError::Stale { loaded: self.revision, found });
        }

        self.revision = found + 1;
        let written = self.write_atomic(path);
        if written.is_err() {
            self.revision = found;
        }
        written
    }

    fn write_atomic(&self, path: &Path) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

fn sequence_key(client_id: &str, phase: Phase) -> String {
    format!("{}/{}", client_id, phase.code())
}

impl TaskRepository for Database {
    fn task(&self, id: u64) -> Option<&Task> {
        self.get(id)
    }

    fn tasks(&self) -> Vec<&Task> {
        self.tasks.iter().collect()
    }

    fn next_task_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    fn next_sequence(&mut self, client_id: &str, phase: Phase) -> u32 {
        let existing = self
            .tasks
            .iter()
            .filter(|t| t.client_id == client_id && t.phase == phase)
            .count() as u32;
        let counter = self.sequences.entry(sequence_key(client_id, phase)).or_insert(0);
        *counter = (*counter).max(existing) + 1;
        *counter
    }

    fn insert_task(&mut self, task: Task) -> Result<(), StoreError> {
        if self.get(task.id).is_some() {
            return Err(StoreError::Duplicate(format!("task id {}", task.id)));
        }
        if self
            .tasks
            .iter()
            .any(|t| t.client_id == task.client_id && t.task_id == task.task_id)
        {
            return Err(StoreError::Duplicate(format!("{}/{}", task.client_id, task.task_id)));
        }
        self.tasks.push(task);
        Ok(())
    }

    fn update_task(&mut self, task: Task) -> Result<(), StoreError> {
        let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) else {
            return Err(StoreError::Missing(format!("task {}", task.id)));
        };
        if slot.version + 1 != task.version {
            return Err(StoreError::VersionConflict {
                id: task.id,
                expected: slot.version + 1,
                found: task.version,
            });
        }
        *slot = task;
        Ok(())
    }
}

impl ClientRepository for Database {
    fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    fn clients(&self) -> Vec<&Client> {
        self.clients.iter().collect()
    }

    fn insert_client(&mut self, client: Client) -> Result<(), StoreError> {
        if self.client(&client.id).is_some() {
            return Err(StoreError::Duplicate(format!("client {}", client.id)));
        }
        self.clients.push(client);
        Ok(())
    }

    fn update_client(&mut self, client: Client) -> Result<(), StoreError> {
        let Some(slot) = self.clients.iter_mut().find(|c| c.id == client.id) else {
            return Err(StoreError::Missing(format!("client {}", client.id)));
        };
        *slot = client;
        Ok(())
    }
}

impl TemplateRepository for Database {
    fn templates(&self) -> Vec<&TaskTemplate> {
        self.templates.iter().collect()
    }

    fn insert_template(&mut self, template: TaskTemplate) -> Result<(), StoreError> {
        if self.templates.iter().any(|t| t.task_id == template.task_id) {
            return Err(StoreError::Duplicate(format!("template {}", template.task_id)));
        }
        self.templates.push(template);
        Ok(())
    }

    fn update_template(&mut self, template: TaskTemplate) -> Result<(), StoreError> {
        let Some(slot) = self.templates.iter_mut().find(|t| t.task_id == template.task_id) else {
            return Err(StoreError::Missing(format!("template {}", template.task_id)));
        };
        *slot = template;
        Ok(())
    }

    fn remove_template(&mut self, code: &str) -> Result<TaskTemplate, StoreError> {
        let Some(idx) = self.templates.iter().position(|t| t.task_id == code) else {
            return Err(StoreError::Missing(format!("template {}", code)));
        };
        Ok(self.templates.remove(idx))
    }
}

impl UserRepository for Database {
    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn users(&self) -> Vec<&User> {
        self.users.iter().collect()
    }

    fn insert_user(&mut self, user: User) -> Result<(), StoreError> {
        if self.user(&user.id).is_some() {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        self.users.push(user);
        Ok(())
    }
}

impl SettingsRepository for Database {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }
}

/// Current time as Unix epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format an epoch-millisecond timestamp as RFC 3339.
pub fn format_timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".into())
}

/// Format a role for display.
pub fn format_role(r: Role) -> &'static str {
    match r {
        Role::Admin => "Portal Admin",
        Role::Gatekeeper => "US Strategy Team",
        Role::Lead => "India SEO Head",
        Role::Junior => "India SEO Junior",
        Role::Client => "Client",
    }
}

/// Format a task owner for display.
pub fn format_owner(o: Owner) -> &'static str {
    match o.role() {
        Some(r) => format_role(r),
        None => "System",
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Pending => "Pending",
        Status::InProgress => "In Progress",
        Status::Completed => "Completed",
        Status::Submitted => "Submitted for Review",
        Status::Approved => "Approved",
        Status::Resubmit => "Needs Revision",
    }
}

/// Format a phase for display.
pub fn format_phase(p: Phase) -> &'static str {
    match p {
        Phase::Onboarding => "Onboarding & Intake",
        Phase::Foundation => "Foundation Setup",
        Phase::Execution => "Monthly Execution",
        Phase::Ai => "AI / AEO Optimization",
        Phase::Reporting => "Reporting & Strategy",
        Phase::Monitoring => "Failure Monitoring",
    }
}

/// Format a subscription tier for display.
pub fn format_tier(t: Tier) -> &'static str {
    match t {
        Tier::Starter => "Starter",
        Tier::Growth => "Growth",
        Tier::Enterprise => "Enterprise",
    }
}

/// Format a cadence for display.
pub fn format_cadence(c: Option<Cadence>) -> &'static str {
    match c {
        Some(Cadence::Once) => "Once",
        Some(Cadence::Daily) => "Daily",
        Some(Cadence::Weekly) => "Weekly",
        Some(Cadence::BiWeekly) => "Bi-weekly",
        Some(Cadence::Monthly) => "Monthly",
        Some(Cadence::BiMonthly) => "Bi-monthly",
        Some(Cadence::Quarterly) => "Quarterly",
        Some(Cadence::Ongoing) => "Ongoing",
        None => "-",
    }
}

/// Format a subscription status for display.
pub fn format_subscription_status(s: SubscriptionStatus) -> &'static str {
    match s {
        SubscriptionStatus::Active => "Active",
        SubscriptionStatus::Trial => "Trial",
        SubscriptionStatus::Paused => "Paused",
        SubscriptionStatus::Cancelled => "Cancelled",
        SubscriptionStatus::Expired => "Expired",
        SubscriptionStatus::Pending => "Pending",
    }
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task]) {
    println!(
        "{:<5} {:<11} {:<16} {:<11} {:<20} {:<16} {}",
        "ID", "Code", "Client", "Phase", "Status", "Owner", "Title"
    );
    for t in tasks {
        let assignee = t
            .assigned_to
            .as_ref()
            .map(|a| format!(" (@{})", a))
            .unwrap_or_default();
        println!(
            "{:<5} {:<11} {:<16} {:<11} {:<20} {:<16} {}{}",
            t.id,
            t.task_id,
            truncate(&t.client_id, 16),
            t.phase.code(),
            format_status(t.status),
            truncate(format_owner(t.owner), 16),
            t.title,
            assignee
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Resolve a task identifier (numeric ID or task code) to a task ID.
///
/// Codes are only unique per client, so an ambiguous code must be narrowed with `client`
/// or replaced by the numeric ID.
pub fn resolve_task_identifier(identifier: &str, client: Option<&str>, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        return match db.get(id) {
            Some(_) => Ok(id),
            None => Err(format!("Task with ID {} not found", id)),
        };
    }

    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| t.task_id.eq_ignore_ascii_case(identifier))
        .filter(|t| client.map_or(true, |c| t.client_id == c))
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with code '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple tasks found with code '{}':\n", identifier);
            for task in matches {
                error_msg.push_str(&format!("  ID {}: {} [client: {}]\n", task.id, task.title, task.client_id));
            }
            error_msg.push_str("Please use the specific ID or pass --client.");
            Err(error_msg)
        }
    }
}
