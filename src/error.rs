//! Error types for workflow operations and the backing store.

use std::fmt;

use thiserror::Error;

use crate::db::{format_phase, format_role, format_status};
use crate::fields::{Phase, Role, Status};

/// A capability an operation requires. Named in `Forbidden` and `InvalidState` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Start,
    Complete,
    Submit,
    Approve,
    RequestRevision,
    Handoff,
    Comment,
    Assign,
    CreateTask,
    AdvancePhase,
    Administer,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::View => "view this task",
            Action::Start => "start work on this task",
            Action::Complete => "mark this task done",
            Action::Submit => "submit this task for review",
            Action::Approve => "approve this task",
            Action::RequestRevision => "request a revision",
            Action::Handoff => "hand this task off to the client",
            Action::Comment => "comment on this task",
            Action::Assign => "assign this task",
            Action::CreateTask => "create this task",
            Action::AdvancePhase => "advance client phases",
            Action::Administer => "change portal configuration",
        };
        f.write_str(s)
    }
}

/// Failures of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("task {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict { id: u64, expected: u64, found: u64 },
    #[error("no such record: {0}")]
    Missing(String),
    #[error("database was changed by another writer since it was read (revision {loaded}, now {found}); reload and retry")]
    Stale { loaded: u64, found: u64 },
    #[error("timed out waiting for lock {0}; remove it if no other portal process is running")]
    Locked(String),
}

/// Failures of workflow operations. Every variant is recoverable at the caller.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{} may not {action}", format_role(*.role))]
    Forbidden { action: Action, role: Role },
    #[error("cannot {action} while it is {}", format_status(*.status))]
    InvalidState { action: Action, status: Status },
    #[error("{} has {pending} task(s) pending approval", format_phase(*.phase))]
    PhaseIncomplete { phase: Phase, pending: usize },
    #[error("{} has no tasks yet", format_phase(*.phase))]
    PhaseNotStarted { phase: Phase },
    #[error("{} is the last phase", format_phase(*.phase))]
    NoNextPhase { phase: Phase },
    #[error("{0} not found")]
    NotFound(String),
    #[error("task {code} already exists for client {client}")]
    DuplicateInstantiation { client: String, code: String },
    #[error("task {task} changed since it was read (expected version {expected}, now {found})")]
    Conflict { task: u64, expected: u64, found: u64 },
    #[error("subscription for client {client} is not current")]
    SubscriptionLapsed { client: String },
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict { id, expected, found } => {
                WorkflowError::Conflict { task: id, expected, found }
            }
            StoreError::Missing(what) => WorkflowError::NotFound(what),
            other => WorkflowError::Store(other),
        }
    }
}
