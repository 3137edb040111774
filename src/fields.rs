//! Enumerations and field types for the agency workflow.
//!
//! This module defines the closed sets the workflow is built on: roles and task owners,
//! task statuses, the ordered client phases, subscription tiers and statuses, and cadences.
//! Display labels live in `db.rs`, so these types carry no UI text.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The role an acting user holds.
///
/// `Gatekeeper` is the strategy reviewer who alone may approve submitted work. `Lead` and
/// `Junior` are the two tiers of the execution team.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    #[serde(alias = "us-strategy")]
    #[value(alias = "us-strategy")]
    Gatekeeper,
    #[serde(alias = "india-head")]
    #[value(alias = "india-head")]
    Lead,
    #[serde(alias = "india-junior")]
    #[value(alias = "india-junior")]
    Junior,
    Client,
}

impl Role {
    /// Lead and Junior form the execution team.
    pub fn is_team(self) -> bool {
        matches!(self, Role::Lead | Role::Junior)
    }
}

/// The party currently responsible for acting on a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Owner {
    Admin,
    #[serde(alias = "us-strategy")]
    #[value(alias = "us-strategy")]
    Gatekeeper,
    #[serde(alias = "india-head")]
    #[value(alias = "india-head")]
    Lead,
    #[serde(alias = "india-junior")]
    #[value(alias = "india-junior")]
    Junior,
    Client,
    System,
}

impl Owner {
    /// The role behind this owner, `None` for system-owned tasks.
    pub fn role(self) -> Option<Role> {
        match self {
            Owner::Admin => Some(Role::Admin),
            Owner::Gatekeeper => Some(Role::Gatekeeper),
            Owner::Lead => Some(Role::Lead),
            Owner::Junior => Some(Role::Junior),
            Owner::Client => Some(Role::Client),
            Owner::System => None,
        }
    }

    pub fn is_team(self) -> bool {
        matches!(self, Owner::Lead | Owner::Junior)
    }
}

impl From<Role> for Owner {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => Owner::Admin,
            Role::Gatekeeper => Owner::Gatekeeper,
            Role::Lead => Owner::Lead,
            Role::Junior => Owner::Junior,
            Role::Client => Owner::Client,
        }
    }
}

/// Task workflow status. Legal moves between these are defined in `workflow.rs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    Submitted,
    Approved,
    Resubmit,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Pending,
        Status::InProgress,
        Status::Completed,
        Status::Submitted,
        Status::Approved,
        Status::Resubmit,
    ];

    /// Statuses in which the executing party still holds the task.
    pub fn is_pre_review(self) -> bool {
        matches!(self, Status::Pending | Status::InProgress | Status::Completed | Status::Resubmit)
    }
}

/// Ordered stages of a client's engagement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Onboarding,
    Foundation,
    Execution,
    Ai,
    Reporting,
    Monitoring,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Onboarding,
        Phase::Foundation,
        Phase::Execution,
        Phase::Ai,
        Phase::Reporting,
        Phase::Monitoring,
    ];

    /// Three-letter code used in task and template identifiers.
    pub fn code(self) -> &'static str {
        match self {
            Phase::Onboarding => "ONB",
            Phase::Foundation => "FND",
            Phase::Execution => "EXE",
            Phase::Ai => "AIO",
            Phase::Reporting => "RPT",
            Phase::Monitoring => "MON",
        }
    }

    pub fn index(self) -> usize {
        Phase::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    /// The phase immediately after this one, ignoring phase configuration.
    pub fn next(self) -> Option<Phase> {
        Phase::ALL.get(self.index() + 1).copied()
    }
}

/// How often a templated task recurs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Cadence {
    Once,
    Daily,
    Weekly,
    BiWeekly,
    Monthly,
    BiMonthly,
    Quarterly,
    Ongoing,
}

/// Subscription level; decides which templates apply to a client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Starter,
    Growth,
    Enterprise,
}

impl Tier {
    /// Monthly list price in whole dollars.
    pub fn monthly_price(self) -> u32 {
        match self {
            Tier::Starter => 299,
            Tier::Growth => 599,
            Tier::Enterprise => 999,
        }
    }

    /// Starter plans have no AI optimisation or monitoring work; those phases are skipped.
    pub fn unlocks(self, phase: Phase) -> bool {
        !(self == Tier::Starter && matches!(phase, Phase::Ai | Phase::Monitoring))
    }
}

/// Billing state of a client's subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    Paused,
    Cancelled,
    Expired,
    Pending,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Phase,
    Status,
    Updated,
    Id,
}
