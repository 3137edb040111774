//! Task-template/tier resolution and task materialisation.
//!
//! A client's subscription tier selects the active templates tagged with that tier. When a
//! client is provisioned or enters a new phase, every applicable template for that phase
//! becomes a concrete task, at most once per `(client, template)`.

use tracing::{debug, info};

use crate::client::Client;
use crate::error::{StoreError, WorkflowError};
use crate::fields::{Phase, Status, Tier};
use crate::repo::{TaskRepository, TemplateRepository};
use crate::task::{Task, TaskTemplate};

/// Templates that apply to `tier`, ordered by phase then template order.
pub fn resolve_for_tier<'a>(templates: &[&'a TaskTemplate], tier: Tier) -> Vec<&'a TaskTemplate> {
    let mut out: Vec<&TaskTemplate> = templates
        .iter()
        .copied()
        .filter(|t| t.is_active && t.tiers.contains(&tier))
        .collect();
    out.sort_by_key(|t| (t.phase, t.order, t.task_id.clone()));
    out
}

/// Task code for the `seq`-th task of `phase`, e.g. `ST-FND-004`.
pub fn task_code(phase: Phase, seq: u32) -> String {
    format!("ST-{}-{:03}", phase.code(), seq)
}

/// Build a fresh pending task from a template.
pub fn instantiate(template: &TaskTemplate, client_id: &str, id: u64, code: String, now_ms: i64) -> Task {
    Task {
        id,
        task_id: code,
        client_id: client_id.to_string(),
        template_id: Some(template.task_id.clone()),
        title: template.title.clone(),
        description: template.description.clone(),
        phase: template.phase,
        cadence: template.cadence,
        owner: template.owner,
        approver: template.approver,
        returned_owner: None,
        status: Status::Pending,
        assigned_to: None,
        comments: Vec::new(),
        documents: Vec::new(),
        attachments: Vec::new(),
        due: None,
        version: 0,
        created_at_utc: now_ms,
        updated_at_utc: now_ms,
    }
}

/// Insert a new task, reporting uniqueness violations as `DuplicateInstantiation`.
pub fn insert_instance<S>(store: &mut S, task: Task) -> Result<(), WorkflowError>
where
    S: TaskRepository + ?Sized,
{
    let (client, code) = (task.client_id.clone(), task.task_id.clone());
    match store.insert_task(task) {
        Ok(()) => Ok(()),
        Err(StoreError::Duplicate(_)) => Err(WorkflowError::DuplicateInstantiation { client, code }),
        Err(e) => Err(e.into()),
    }
}

/// Materialise the tasks of `phase` for `client`. Safe to call repeatedly: templates that
/// already produced a task for this client are skipped. Returns only the new tasks.
pub fn materialize<S>(store: &mut S, client: &Client, phase: Phase, now_ms: i64) -> Result<Vec<Task>, WorkflowError>
where
    S: TaskRepository + TemplateRepository + ?Sized,
{
    let applicable: Vec<TaskTemplate> = resolve_for_tier(&store.templates(), client.subscription.tier)
        .into_iter()
        .filter(|t| t.phase == phase)
        .cloned()
        .collect();

    let mut created = Vec::new();
    for template in &applicable {
        let exists = store
            .tasks_for_client(&client.id)
            .iter()
            .any(|t| t.template_id.as_deref() == Some(template.task_id.as_str()));
        if exists {
            debug!(client = %client.id, template = %template.task_id, "template already materialised");
            continue;
        }

        let seq = store.next_sequence(&client.id, phase);
        let task = instantiate(template, &client.id, store.next_task_id(), task_code(phase, seq), now_ms);
        match insert_instance(store, task.clone()) {
            Ok(()) => {
                info!(client = %client.id, task = %task.task_id, template = %template.task_id, "task materialised");
                created.push(task);
            }
            Err(WorkflowError::DuplicateInstantiation { client, code }) => {
                debug!(%client, %code, "duplicate instantiation suppressed");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(created)
}
