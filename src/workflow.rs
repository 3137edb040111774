//! Task status state machine.
//!
//! Tasks move `pending → in-progress → completed → submitted → approved`, with the
//! reviewer able to send submitted work back (`resubmit`), which re-enters the cycle at
//! `in-progress`. An approved task may also be handed off to the client, which restarts it
//! at `pending` under the client's ownership. That edge is a side channel, not a forward
//! state. Permission checks are not made here; see `permissions.rs`.

use crate::error::{Action, WorkflowError};
use crate::fields::{Owner, Role, Status};
use crate::task::Task;

/// A user-triggered move between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Start work, or resume after a revision request.
    Start,
    Complete,
    Submit,
    Approve,
    RequestRevision,
    /// Re-route an approved task to the client for their own cycle.
    HandoffToClient,
}

impl Transition {
    pub fn action(self) -> Action {
        match self {
            Transition::Start => Action::Start,
            Transition::Complete => Action::Complete,
            Transition::Submit => Action::Submit,
            Transition::Approve => Action::Approve,
            Transition::RequestRevision => Action::RequestRevision,
            Transition::HandoffToClient => Action::Handoff,
        }
    }

    pub fn target(self) -> Status {
        match self {
            Transition::Start => Status::InProgress,
            Transition::Complete => Status::Completed,
            Transition::Submit => Status::Submitted,
            Transition::Approve => Status::Approved,
            Transition::RequestRevision => Status::Resubmit,
            Transition::HandoffToClient => Status::Pending,
        }
    }
}

/// Every legal edge. Nothing else ever changes a task's status.
pub const EDGES: [(Status, Transition); 7] = [
    (Status::Pending, Transition::Start),
    (Status::Resubmit, Transition::Start),
    (Status::InProgress, Transition::Complete),
    (Status::Completed, Transition::Submit),
    (Status::Submitted, Transition::Approve),
    (Status::Submitted, Transition::RequestRevision),
    (Status::Approved, Transition::HandoffToClient),
];

/// Whether `transition` may fire from `from`.
pub fn allows(from: Status, transition: Transition) -> bool {
    EDGES.iter().any(|&(s, t)| s == from && t == transition)
}

/// Whether a direct status change `from → to` is one of the enumerated edges.
pub fn is_legal(from: Status, to: Status) -> bool {
    EDGES.iter().any(|&(s, t)| s == from && t.target() == to)
}

/// Apply `transition` to a copy of `task`, stamping it at `now_ms`.
///
/// The input is left untouched; the caller writes the returned task back.
pub fn apply(task: &Task, transition: Transition, now_ms: i64) -> Result<Task, WorkflowError> {
    if !allows(task.status, transition) {
        return Err(WorkflowError::InvalidState {
            action: transition.action(),
            status: task.status,
        });
    }

    let mut next = task.clone();
    next.status = transition.target();
    match transition {
        Transition::Submit => {
            next.returned_owner = Some(task.owner);
            next.owner = Owner::Gatekeeper;
            next.approver = Some(Role::Gatekeeper);
        }
        Transition::RequestRevision => {
            // Records written before `returned_owner` existed go back to the lead.
            next.owner = task.returned_owner.unwrap_or(Owner::Lead);
        }
        Transition::HandoffToClient => {
            next.owner = Owner::Client;
            next.approver = Some(Role::Client);
            next.returned_owner = None;
        }
        Transition::Start | Transition::Complete | Transition::Approve => {}
    }
    next.touch(now_ms);
    Ok(next)
}
