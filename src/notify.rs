//! Notification dispatch.
//!
//! Operations emit an `Event` after their write succeeds. Delivery is fire-and-forget:
//! a notifier never fails the operation that triggered it.

use std::cell::RefCell;

use serde::Serialize;
use tracing::info;

use crate::fields::{Phase, Role, Tier};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    TaskAssigned { client: String, task: String, assignee: String },
    TaskCreated { client: String, task: String, actor: String },
    TaskSubmitted { client: String, task: String, actor: String },
    TaskApproved { client: String, task: String, actor: String },
    RevisionRequested { client: String, task: String, actor: String, reason: Option<String> },
    HandedOffToClient { client: String, task: String, actor: String },
    CommentAdded { client: String, task: String, actor: String, role: Role },
    DocumentAdded { client: String, task: String, actor: String, name: String },
    ClientProvisioned { client: String, tier: Tier, new_tasks: usize },
    PhaseAdvanced { client: String, from: Phase, to: Phase, new_tasks: usize },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TaskAssigned { .. } => "task_assigned",
            Event::TaskCreated { .. } => "task_created",
            Event::TaskSubmitted { .. } => "task_submitted",
            Event::TaskApproved { .. } => "task_approved",
            Event::RevisionRequested { .. } => "revision_requested",
            Event::HandedOffToClient { .. } => "handed_off_to_client",
            Event::CommentAdded { .. } => "comment_added",
            Event::DocumentAdded { .. } => "document_added",
            Event::ClientProvisioned { .. } => "client_provisioned",
            Event::PhaseAdvanced { .. } => "phase_advanced",
        }
    }
}

pub trait Notifier {
    fn dispatch(&self, event: &Event);
}

/// Logs each event and accepts it.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn dispatch(&self, event: &Event) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        info!(event = event.name(), %payload, "notification dispatched");
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: RefCell<Vec<Event>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(Event::name).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn dispatch(&self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}
