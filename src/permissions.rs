//! Role/permission predicates.
//!
//! Every mutation in `portal.rs` is guarded by one of these pure functions of the acting
//! user and the task. Approval has exactly one gate: only `Role::Gatekeeper` moves a task
//! out of `Submitted`, whatever other roles the caller holds.

use crate::client::Actor;
use crate::fields::{Owner, Role, Status};
use crate::task::Task;

/// Client users only ever see and touch their own client's tasks.
fn same_client(actor: &Actor, task: &Task) -> bool {
    actor.client_id.as_deref() == Some(task.client_id.as_str())
}

fn is_assignee(actor: &Actor, task: &Task) -> bool {
    task.assigned_to.as_deref() == Some(actor.id.as_str())
}

/// Juniors work their own assignments, or junior work nobody has been given yet.
fn junior_holds(actor: &Actor, task: &Task) -> bool {
    is_assignee(actor, task) || (task.owner == Owner::Junior && task.assigned_to.is_none())
}

/// Whether the actor holds the task for execution, ignoring status.
fn holds_for_execution(actor: &Actor, task: &Task) -> bool {
    match actor.role {
        Role::Admin => true,
        // The lead may work any task in the team's stream.
        Role::Lead => matches!(task.owner, Owner::Lead | Owner::Junior | Owner::System),
        Role::Junior => junior_holds(actor, task),
        Role::Client => task.owner == Owner::Client && same_client(actor, task),
        Role::Gatekeeper => task.owner == Owner::Gatekeeper,
    }
}

pub fn can_view(actor: &Actor, task: &Task) -> bool {
    match actor.role {
        Role::Admin | Role::Gatekeeper => true,
        Role::Lead => task.owner.is_team() || task.status == Status::Approved,
        Role::Junior => task.owner.is_team() || is_assignee(actor, task),
        Role::Client => same_client(actor, task),
    }
}

/// May progress the pre-review lifecycle (start, resume, complete).
pub fn can_edit(actor: &Actor, task: &Task) -> bool {
    task.status.is_pre_review() && holds_for_execution(actor, task)
}

pub fn can_submit(actor: &Actor, task: &Task) -> bool {
    task.status == Status::Completed && holds_for_execution(actor, task)
}

/// Approve or send back. Gatekeeper only.
pub fn can_approve(actor: &Actor, task: &Task) -> bool {
    actor.role == Role::Gatekeeper && task.status == Status::Submitted
}

pub fn can_handoff_to_client(actor: &Actor, task: &Task) -> bool {
    actor.role == Role::Gatekeeper && task.status == Status::Approved && task.owner != Owner::Client
}

/// Also governs document uploads. Broader than `can_edit`: it does not depend on status.
pub fn can_comment(actor: &Actor, task: &Task) -> bool {
    match actor.role {
        Role::Admin | Role::Gatekeeper => true,
        Role::Lead => matches!(
            task.owner,
            Owner::Lead | Owner::Junior | Owner::Gatekeeper | Owner::System
        ),
        Role::Junior => junior_holds(actor, task),
        Role::Client => task.owner == Owner::Client && same_client(actor, task),
    }
}

/// Reassign a team task to a specific team member.
pub fn can_assign(actor: &Actor, task: &Task) -> bool {
    matches!(actor.role, Role::Lead | Role::Admin) && task.owner.is_team() && task.status.is_pre_review()
}

pub fn can_create_task(actor: &Actor, owner: Owner) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Gatekeeper => owner != Owner::System && owner != Owner::Admin,
        Role::Lead => owner.is_team(),
        Role::Junior | Role::Client => false,
    }
}

pub fn can_advance_phase(actor: &Actor) -> bool {
    matches!(actor.role, Role::Gatekeeper | Role::Admin)
}

/// Templates, client provisioning and settings.
pub fn can_administer(actor: &Actor) -> bool {
    actor.role == Role::Admin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Phase;

    fn task(owner: Owner, status: Status) -> Task {
        Task {
            id: 1,
            task_id: "ST-FND-001".into(),
            client_id: "acme".into(),
            template_id: None,
            title: "GBP audit".into(),
            description: None,
            phase: Phase::Foundation,
            cadence: None,
            owner,
            approver: None,
            returned_owner: None,
            status,
            assigned_to: None,
            comments: vec![],
            documents: vec![],
            attachments: vec![],
            due: None,
            version: 0,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn all_actors() -> Vec<Actor> {
        vec![
            Actor::new("admin-1", "Alex", Role::Admin),
            Actor::new("us-1", "Sarah", Role::Gatekeeper),
            Actor::new("head-1", "Robert", Role::Lead),
            Actor::new("junior-1", "Jennifer", Role::Junior),
            Actor::for_client("client-1", "John", "acme"),
        ]
    }

    #[test]
    fn test_only_gatekeeper_can_approve_submitted_work() {
        for owner in [Owner::Gatekeeper, Owner::Lead, Owner::Junior, Owner::Client, Owner::System] {
            let t = task(owner, Status::Submitted);
            for actor in all_actors() {
                assert_eq!(can_approve(&actor, &t), actor.role == Role::Gatekeeper);
                // Nothing else opens a path out of Submitted either.
                assert!(!can_edit(&actor, &t));
                assert!(!can_submit(&actor, &t));
            }
        }
    }

    #[test]
    fn test_approve_requires_submitted() {
        let gk = Actor::new("us-1", "Sarah", Role::Gatekeeper);
        for status in Status::ALL {
            let t = task(Owner::Gatekeeper, status);
            assert_eq!(can_approve(&gk, &t), status == Status::Submitted);
        }
    }

    #[test]
    fn test_junior_edits_only_assigned_work() {
        let junior = Actor::new("junior-1", "Jennifer", Role::Junior);
        let mut t = task(Owner::Lead, Status::Pending);
        assert!(!can_edit(&junior, &t));
        t.assigned_to = Some("junior-1".into());
        assert!(can_edit(&junior, &t));
        t.assigned_to = Some("junior-2".into());
        assert!(!can_edit(&junior, &t));
        assert!(can_edit(&junior, &task(Owner::Junior, Status::InProgress)));
    }

    #[test]
    fn test_assignment_excludes_other_juniors() {
        let first = Actor::new("junior-1", "Jennifer", Role::Junior);
        let second = Actor::new("junior-2", "Arjun", Role::Junior);
        let mut t = task(Owner::Junior, Status::Pending);
        assert!(can_edit(&first, &t) && can_edit(&second, &t));

        t.assigned_to = Some("junior-1".into());
        assert!(can_edit(&first, &t));
        assert!(!can_edit(&second, &t));
        assert!(!can_comment(&second, &t));

        t.status = Status::Completed;
        assert!(can_submit(&first, &t));
        assert!(!can_submit(&second, &t));
    }

    #[test]
    fn test_lead_edits_any_team_task() {
        let lead = Actor::new("head-1", "Robert", Role::Lead);
        let mut t = task(Owner::Junior, Status::Pending);
        t.assigned_to = Some("junior-2".into());
        assert!(can_edit(&lead, &t));
        assert!(can_edit(&lead, &task(Owner::System, Status::Resubmit)));
        assert!(!can_edit(&lead, &task(Owner::Client, Status::Pending)));
        assert!(!can_edit(&lead, &task(Owner::Lead, Status::Approved)));
    }

    #[test]
    fn test_submit_requires_completed() {
        let lead = Actor::new("head-1", "Robert", Role::Lead);
        assert!(can_submit(&lead, &task(Owner::Lead, Status::Completed)));
        assert!(!can_submit(&lead, &task(Owner::Lead, Status::InProgress)));
        let client = Actor::for_client("client-1", "John", "acme");
        assert!(!can_submit(&client, &task(Owner::Lead, Status::Completed)));
    }

    #[test]
    fn test_client_is_scoped_to_own_account() {
        let own = Actor::for_client("client-1", "John", "acme");
        let other = Actor::for_client("client-2", "Emily", "globex");
        let t = task(Owner::Client, Status::Pending);
        assert!(can_edit(&own, &t));
        assert!(can_comment(&own, &t));
        assert!(can_view(&own, &t));
        assert!(!can_edit(&other, &t));
        assert!(!can_comment(&other, &t));
        assert!(!can_view(&other, &t));
    }

    #[test]
    fn test_handoff_rules() {
        let gk = Actor::new("us-1", "Sarah", Role::Gatekeeper);
        assert!(can_handoff_to_client(&gk, &task(Owner::Gatekeeper, Status::Approved)));
        assert!(!can_handoff_to_client(&gk, &task(Owner::Client, Status::Approved)));
        assert!(!can_handoff_to_client(&gk, &task(Owner::Gatekeeper, Status::Submitted)));
        let admin = Actor::new("admin-1", "Alex", Role::Admin);
        assert!(!can_handoff_to_client(&admin, &task(Owner::Gatekeeper, Status::Approved)));
    }

    #[test]
    fn test_comment_is_broader_than_edit() {
        let lead = Actor::new("head-1", "Robert", Role::Lead);
        let t = task(Owner::Gatekeeper, Status::Submitted);
        assert!(!can_edit(&lead, &t));
        assert!(can_comment(&lead, &t));

        let junior = Actor::new("junior-1", "Jennifer", Role::Junior);
        assert!(!can_comment(&junior, &task(Owner::Lead, Status::Pending)));
    }

    #[test]
    fn test_create_task_owner_limits() {
        let lead = Actor::new("head-1", "Robert", Role::Lead);
        assert!(can_create_task(&lead, Owner::Junior));
        assert!(!can_create_task(&lead, Owner::Client));
        let gk = Actor::new("us-1", "Sarah", Role::Gatekeeper);
        assert!(can_create_task(&gk, Owner::Client));
        assert!(!can_create_task(&gk, Owner::System));
        let junior = Actor::new("junior-1", "Jennifer", Role::Junior);
        assert!(!can_create_task(&junior, Owner::Junior));
    }
}
