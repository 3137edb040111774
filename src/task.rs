//! Task data structures.
//!
//! This module defines the `Task` record that moves through the review workflow, the
//! comments, attachments and documents hung off it, and the `TaskTemplate` definitions
//! that tasks are materialised from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A unit of client work moving through the review workflow.
///
/// A task always belongs to exactly one client and one phase. `version` and
/// `updated_at_utc` advance on every successful mutation; timestamps are Unix epoch
/// milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,
    /// Human-readable code, unique per client (e.g. `ST-ONB-001`).
    pub task_id: String,
    pub client_id: String,
    /// Code of the template this task was materialised from.
    #[serde(default)]
    pub template_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub phase: Phase,
    pub cadence: Option<Cadence>,
    pub owner: Owner,
    pub approver: Option<Role>,
    /// Owner at the time of submission; a revision request hands the task back here.
    #[serde(default)]
    pub returned_owner: Option<Owner>,
    pub status: Status,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub version: u64,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// Record a mutation: bump the version and move `updated_at_utc` strictly forward.
    pub fn touch(&mut self, now_ms: i64) {
        self.version += 1;
        self.updated_at_utc = now_ms.max(self.updated_at_utc + 1);
    }
}

/// A file reference attached to a task or a comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub url: String,
}

/// An append-only remark on a task, carrying the author's identity at the time of writing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_role: Role,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at_utc: i64,
}

/// A deliverable uploaded against a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub url: String,
    pub uploaded_by: String,
    pub uploaded_at_utc: i64,
}

/// A reusable task definition tagged with the tiers it applies to.
///
/// Tier sets are explicit: a template listed for `starter` only is not implied for
/// `growth`. Seed data lists lower tiers' templates under the higher tiers too.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskTemplate {
    pub task_id: String,
    pub title: String,
    pub description: Option<String>,
    pub phase: Phase,
    pub owner: Owner,
    #[serde(default)]
    pub approver: Option<Role>,
    pub cadence: Option<Cadence>,
    pub tiers: Vec<Tier>,
    pub is_active: bool,
    #[serde(default)]
    pub order: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_is_strictly_monotonic() {
        let mut task = Task {
            id: 1,
            task_id: "ST-ONB-001".into(),
            client_id: "acme".into(),
            template_id: None,
            title: "Provide GBP access".into(),
            description: None,
            phase: Phase::Onboarding,
            cadence: None,
            owner: Owner::Client,
            approver: None,
            returned_owner: None,
            status: Status::Pending,
            assigned_to: None,
            comments: vec![],
            documents: vec![],
            attachments: vec![],
            due: None,
            version: 0,
            created_at_utc: 1_000,
            updated_at_utc: 1_000,
        };
        task.touch(500);
        assert_eq!(task.updated_at_utc, 1_001);
        assert_eq!(task.version, 1);
        task.touch(5_000);
        assert_eq!(task.updated_at_utc, 5_000);
        assert_eq!(task.version, 2);
    }
}
