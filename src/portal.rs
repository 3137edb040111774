//! Permission-gated operations over a `Store`.
//!
//! `Portal` is the only path that mutates task status or a client's phase. Each operation
//! resolves its inputs, checks state and permission, and only then writes. A rejected
//! operation leaves the store exactly as it was.

use chrono::{NaiveDate, TimeZone, Utc};
use tracing::{info, warn};

use crate::client::{client_slug, Actor, Client, Subscription, User};
use crate::db::{now_ms, Settings};
use crate::error::{Action, StoreError, WorkflowError};
use crate::fields::{Cadence, Owner, Phase, Role, Status, SubscriptionStatus, Tier};
use crate::notify::{Event, Notifier};
use crate::permissions;
use crate::phase::{self, PhaseProgress};
use crate::repo::{Store, UserRepository};
use crate::task::{Attachment, Comment, Document, Task, TaskTemplate};
use crate::templates;
use crate::workflow::{self, Transition};

/// Input for a manually created task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub client_id: String,
    pub title: String,
    pub description: Option<String>,
    pub phase: Phase,
    pub owner: Owner,
    pub cadence: Option<Cadence>,
    pub due: Option<NaiveDate>,
}

/// Input for onboarding a new client.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub company: String,
    pub contact_name: String,
    pub email: String,
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub trial_end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub client: Option<String>,
    pub phase: Option<Phase>,
    pub status: Option<Status>,
    pub owner: Option<Owner>,
}

impl TaskFilter {
    pub fn matches(&self, t: &Task) -> bool {
        self.client.as_deref().map_or(true, |c| t.client_id == c)
            && self.phase.map_or(true, |p| t.phase == p)
            && self.status.map_or(true, |s| t.status == s)
            && self.owner.map_or(true, |o| t.owner == o)
    }
}

/// Resolve a user id to an acting identity. Deactivated users cannot act.
pub fn resolve_actor<U: UserRepository + ?Sized>(users: &U, user_id: &str) -> Result<Actor, WorkflowError> {
    match users.user(user_id) {
        Some(u) if u.is_active => Ok(Actor::from(u)),
        Some(_) => Err(WorkflowError::Invalid(format!("user {} is deactivated", user_id))),
        None => Err(WorkflowError::NotFound(format!("user {}", user_id))),
    }
}

pub struct Portal<'a, S: Store> {
    store: &'a mut S,
    notifier: &'a dyn Notifier,
    now: i64,
}

impl<'a, S: Store> Portal<'a, S> {
    pub fn new(store: &'a mut S, notifier: &'a dyn Notifier) -> Self {
        Portal { store, notifier, now: now_ms() }
    }

    /// Pin the clock used to stamp writes and judge subscriptions.
    pub fn at(mut self, now_ms: i64) -> Self {
        self.now = now_ms;
        self
    }

    pub fn store(&self) -> &S {
        &*self.store
    }

    fn today(&self) -> NaiveDate {
        Utc.timestamp_millis_opt(self.now)
            .single()
            .map(|t| t.date_naive())
            .unwrap_or(NaiveDate::MIN)
    }

    fn reject(&self, actor: &Actor, action: Action, err: WorkflowError) -> WorkflowError {
        warn!(actor = %actor.id, %action, reason = %err, "operation rejected");
        err
    }

    fn forbid(&self, actor: &Actor, action: Action) -> WorkflowError {
        self.reject(actor, action, WorkflowError::Forbidden { action, role: actor.role })
    }

    fn load_task(&self, id: u64) -> Result<Task, WorkflowError> {
        self.store
            .task(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("task {}", id)))
    }

    fn load_client(&self, id: &str) -> Result<Client, WorkflowError> {
        self.store
            .client(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("client {}", id)))
    }

    fn comment(&self, task: &Task, actor: &Actor, content: &str, attachments: Vec<Attachment>) -> Comment {
        Comment {
            id: format!("c-{}-{}", task.id, task.comments.len() + 1),
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
            user_role: actor.role,
            content: content.trim().to_string(),
            attachments,
            created_at_utc: self.now,
        }
    }

    pub fn actor(&self, user_id: &str) -> Result<Actor, WorkflowError> {
        resolve_actor(&*self.store, user_id)
    }

    // ---- task lifecycle ----

    pub fn start_task(&mut self, id: u64, actor: &Actor) -> Result<Task, WorkflowError> {
        self.transition(id, actor, Transition::Start, None, None)
    }

    pub fn complete_task(&mut self, id: u64, actor: &Actor) -> Result<Task, WorkflowError> {
        self.transition(id, actor, Transition::Complete, None, None)
    }

    /// Hand completed work to the reviewer, optionally with a note for them.
    pub fn submit_task(&mut self, id: u64, actor: &Actor, note: Option<&str>) -> Result<Task, WorkflowError> {
        self.transition(id, actor, Transition::Submit, note, None)
    }

    pub fn approve_task(&mut self, id: u64, actor: &Actor) -> Result<Task, WorkflowError> {
        self.transition(id, actor, Transition::Approve, None, None)
    }

    pub fn request_revision(&mut self, id: u64, actor: &Actor, reason: Option<&str>) -> Result<Task, WorkflowError> {
        self.transition(id, actor, Transition::RequestRevision, reason, None)
    }

    pub fn handoff_to_client(&mut self, id: u64, actor: &Actor) -> Result<Task, WorkflowError> {
        self.transition(id, actor, Transition::HandoffToClient, None, None)
    }

    /// Like the named operations, but refuses with `Conflict` unless the task is still
    /// at `expected_version`.
    pub fn transition_checked(
        &mut self,
        id: u64,
        actor: &Actor,
        transition: Transition,
        note: Option<&str>,
        expected_version: u64,
    ) -> Result<Task, WorkflowError> {
        self.transition(id, actor, transition, note, Some(expected_version))
    }

    fn transition(
        &mut self,
        id: u64,
        actor: &Actor,
        transition: Transition,
        note: Option<&str>,
        expected_version: Option<u64>,
    ) -> Result<Task, WorkflowError> {
        let action = transition.action();
        let task = self.load_task(id)?;

        if let Some(expected) = expected_version {
            if task.version != expected {
                let err = WorkflowError::Conflict { task: id, expected, found: task.version };
                return Err(self.reject(actor, action, err));
            }
        }
        if !workflow::allows(task.status, transition) {
            let err = WorkflowError::InvalidState { action, status: task.status };
            return Err(self.reject(actor, action, err));
        }
        let permitted = match transition {
            Transition::Start | Transition::Complete => permissions::can_edit(actor, &task),
            Transition::Submit => permissions::can_submit(actor, &task),
            Transition::Approve | Transition::RequestRevision => permissions::can_approve(actor, &task),
            Transition::HandoffToClient => permissions::can_handoff_to_client(actor, &task),
        };
        if !permitted {
            return Err(self.forbid(actor, action));
        }

        let mut next = workflow::apply(&task, transition, self.now)?;
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        if let Some(n) = note {
            let c = self.comment(&task, actor, n, Vec::new());
            next.comments.push(c);
        }
        self.store.update_task(next.clone())?;
        info!(
            task = %next.task_id,
            client = %next.client_id,
            from = ?task.status,
            to = ?next.status,
            actor = %actor.id,
            "task transitioned"
        );

        let (client, code, by) = (next.client_id.clone(), next.task_id.clone(), actor.id.clone());
        let event = match transition {
            Transition::Start | Transition::Complete => None,
            Transition::Submit => Some(Event::TaskSubmitted { client, task: code, actor: by }),
            Transition::Approve => Some(Event::TaskApproved { client, task: code, actor: by }),
            Transition::RequestRevision => Some(Event::RevisionRequested {
                client,
                task: code,
                actor: by,
                reason: note.map(str::to_string),
            }),
            Transition::HandoffToClient => Some(Event::HandedOffToClient { client, task: code, actor: by }),
        };
        if let Some(e) = event {
            self.notifier.dispatch(&e);
        }
        Ok(next)
    }

    // ---- task content ----

    pub fn add_comment(
        &mut self,
        id: u64,
        actor: &Actor,
        content: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Task, WorkflowError> {
        let task = self.load_task(id)?;
        if !permissions::can_comment(actor, &task) {
            return Err(self.forbid(actor, Action::Comment));
        }
        if content.trim().is_empty() && attachments.is_empty() {
            let err = WorkflowError::Invalid("comment needs text or an attachment".into());
            return Err(self.reject(actor, Action::Comment, err));
        }

        let mut next = task.clone();
        let c = self.comment(&task, actor, content, attachments);
        next.comments.push(c);
        next.touch(self.now);
        self.store.update_task(next.clone())?;
        info!(task = %next.task_id, client = %next.client_id, actor = %actor.id, "comment added");
        self.notifier.dispatch(&Event::CommentAdded {
            client: next.client_id.clone(),
            task: next.task_id.clone(),
            actor: actor.id.clone(),
            role: actor.role,
        });
        Ok(next)
    }

    pub fn add_document(&mut self, id: u64, actor: &Actor, name: &str, url: &str) -> Result<Task, WorkflowError> {
        let task = self.load_task(id)?;
        if !permissions::can_comment(actor, &task) {
            return Err(self.forbid(actor, Action::Comment));
        }
        if name.trim().is_empty() || url.trim().is_empty() {
            let err = WorkflowError::Invalid("a document needs a name and a url".into());
            return Err(self.reject(actor, Action::Comment, err));
        }

        let mut next = task.clone();
        next.documents.push(Document {
            id: format!("d-{}-{}", task.id, task.documents.len() + 1),
            name: name.trim().to_string(),
            url: url.trim().to_string(),
            uploaded_by: actor.id.clone(),
            uploaded_at_utc: self.now,
        });
        next.touch(self.now);
        self.store.update_task(next.clone())?;
        info!(task = %next.task_id, client = %next.client_id, actor = %actor.id, document = %name, "document added");
        self.notifier.dispatch(&Event::DocumentAdded {
            client: next.client_id.clone(),
            task: next.task_id.clone(),
            actor: actor.id.clone(),
            name: name.trim().to_string(),
        });
        Ok(next)
    }

    /// Give a team task to a specific team member. The task's owner follows the assignee's
    /// role so the assignee can work it.
    pub fn assign_task(&mut self, id: u64, actor: &Actor, user_id: &str) -> Result<Task, WorkflowError> {
        let task = self.load_task(id)?;
        if !permissions::can_assign(actor, &task) {
            return Err(self.forbid(actor, Action::Assign));
        }
        let assignee = match self.store.user(user_id) {
            Some(u) if u.is_active && matches!(u.role, Role::Lead | Role::Junior) => u.clone(),
            Some(u) => {
                let err = WorkflowError::Invalid(format!("{} cannot take team tasks", u.name));
                return Err(self.reject(actor, Action::Assign, err));
            }
            None => return Err(WorkflowError::NotFound(format!("user {}", user_id))),
        };

        let mut next = task;
        next.assigned_to = Some(assignee.id.clone());
        next.owner = Owner::from(assignee.role);
        next.touch(self.now);
        self.store.update_task(next.clone())?;
        info!(task = %next.task_id, client = %next.client_id, actor = %actor.id, assignee = %assignee.id, "task assigned");
        self.notifier.dispatch(&Event::TaskAssigned {
            client: next.client_id.clone(),
            task: next.task_id.clone(),
            assignee: assignee.id,
        });
        Ok(next)
    }

    pub fn create_task(&mut self, actor: &Actor, input: NewTask) -> Result<Task, WorkflowError> {
        if !permissions::can_create_task(actor, input.owner) {
            return Err(self.forbid(actor, Action::CreateTask));
        }
        let client = self.load_client(&input.client_id)?;
        if input.title.trim().is_empty() {
            let err = WorkflowError::Invalid("task title is empty".into());
            return Err(self.reject(actor, Action::CreateTask, err));
        }

        let seq = self.store.next_sequence(&client.id, input.phase);
        let task = Task {
            id: self.store.next_task_id(),
            task_id: templates::task_code(input.phase, seq),
            client_id: client.id.clone(),
            template_id: None,
            title: input.title.trim().to_string(),
            description: input.description,
            phase: input.phase,
            cadence: input.cadence,
            owner: input.owner,
            approver: Some(Role::Gatekeeper),
            returned_owner: None,
            status: Status::Pending,
            assigned_to: None,
            comments: Vec::new(),
            documents: Vec::new(),
            attachments: Vec::new(),
            due: input.due,
            version: 0,
            created_at_utc: self.now,
            updated_at_utc: self.now,
        };
        templates::insert_instance(&mut *self.store, task.clone())?;
        info!(task = %task.task_id, client = %task.client_id, actor = %actor.id, "task created");
        self.notifier.dispatch(&Event::TaskCreated {
            client: task.client_id.clone(),
            task: task.task_id.clone(),
            actor: actor.id.clone(),
        });
        Ok(task)
    }

    // ---- clients and phases ----

    /// Move a client to its next phase and materialise that phase's tasks.
    pub fn advance_phase(&mut self, client_id: &str, actor: &Actor) -> Result<(Client, Vec<Task>), WorkflowError> {
        let action = Action::AdvancePhase;
        if !permissions::can_advance_phase(actor) {
            return Err(self.forbid(actor, action));
        }
        let client = self.load_client(client_id)?;
        if !client.is_active {
            let err = WorkflowError::Invalid(format!("client {} is inactive", client.id));
            return Err(self.reject(actor, action, err));
        }
        if !client.subscription.is_current(self.today()) {
            let err = WorkflowError::SubscriptionLapsed { client: client.id.clone() };
            return Err(self.reject(actor, action, err));
        }

        let settings = self.store.settings().clone();
        let from = client.current_phase;
        let Some(to) = phase::next_phase(from, client.subscription.tier, &settings) else {
            return Err(self.reject(actor, action, WorkflowError::NoNextPhase { phase: from }));
        };
        let progress = phase::phase_progress(self.store.tasks(), &client.id, from);
        if let Err(err) = phase::check_gate(&progress, &settings) {
            return Err(self.reject(actor, action, err));
        }

        let mut updated = client;
        updated.current_phase = to;
        self.store.update_client(updated.clone())?;
        let created = templates::materialize(&mut *self.store, &updated, to, self.now)?;
        info!(client = %updated.id, ?from, ?to, actor = %actor.id, new_tasks = created.len(), "phase advanced");
        self.notifier.dispatch(&Event::PhaseAdvanced {
            client: updated.id.clone(),
            from,
            to,
            new_tasks: created.len(),
        });
        Ok((updated, created))
    }

    /// Progress of every phase for a client, in phase order.
    pub fn phase_overview(&self, client_id: &str) -> Result<Vec<PhaseProgress>, WorkflowError> {
        let client = self.load_client(client_id)?;
        let tasks = self.store.tasks_for_client(&client.id);
        Ok(Phase::ALL
            .iter()
            .map(|&p| phase::phase_progress(tasks.iter().copied(), &client.id, p))
            .collect())
    }

    pub fn resolve_templates_for_tier(&self, tier: Tier) -> Vec<TaskTemplate> {
        templates::resolve_for_tier(&self.store.templates(), tier)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Create a client at onboarding with a contact login, and materialise its
    /// onboarding tasks.
    pub fn provision_client(&mut self, actor: &Actor, input: NewClient) -> Result<(Client, Vec<Task>), WorkflowError> {
        let action = Action::Administer;
        if !permissions::can_administer(actor) {
            return Err(self.forbid(actor, action));
        }
        let id = client_slug(&input.company);
        if id.is_empty() || input.email.trim().is_empty() {
            let err = WorkflowError::Invalid("a client needs a company name and an email".into());
            return Err(self.reject(actor, action, err));
        }
        if self.store.client(&id).is_some() {
            let err = WorkflowError::Invalid(format!("client {} already exists", id));
            return Err(self.reject(actor, action, err));
        }

        let mut subscription = Subscription::new(input.tier, input.status);
        subscription.trial_end_date = input.trial_end_date;
        let client = Client {
            id: id.clone(),
            name: input.contact_name.clone(),
            company: input.company.trim().to_string(),
            email: input.email.trim().to_string(),
            current_phase: Phase::Onboarding,
            is_active: true,
            subscription,
            created_at_utc: self.now,
        };
        self.store.insert_client(client.clone())?;

        let contact = format!("{}-contact", id);
        if self.store.user(&contact).is_none() {
            self.store.insert_user(User {
                id: contact,
                name: input.contact_name,
                email: client.email.clone(),
                role: Role::Client,
                client_id: Some(id.clone()),
                is_active: true,
            })?;
        }

        let created = templates::materialize(&mut *self.store, &client, Phase::Onboarding, self.now)?;
        info!(client = %id, tier = ?client.subscription.tier, actor = %actor.id, new_tasks = created.len(), "client provisioned");
        self.notifier.dispatch(&Event::ClientProvisioned {
            client: id,
            tier: client.subscription.tier,
            new_tasks: created.len(),
        });
        Ok((client, created))
    }

    /// Tasks the actor may see, narrowed by `filter`.
    pub fn visible_tasks(&self, actor: &Actor, filter: &TaskFilter) -> Vec<&Task> {
        self.store
            .tasks()
            .into_iter()
            .filter(|t| filter.matches(t) && permissions::can_view(actor, t))
            .collect()
    }

    // ---- administration ----

    pub fn add_template(&mut self, actor: &Actor, template: TaskTemplate) -> Result<TaskTemplate, WorkflowError> {
        let action = Action::Administer;
        if !permissions::can_administer(actor) {
            return Err(self.forbid(actor, action));
        }
        if template.task_id.trim().is_empty() || template.title.trim().is_empty() {
            let err = WorkflowError::Invalid("a template needs a code and a title".into());
            return Err(self.reject(actor, action, err));
        }
        if template.tiers.is_empty() {
            let err = WorkflowError::Invalid(format!("template {} has no tiers", template.task_id));
            return Err(self.reject(actor, action, err));
        }
        match self.store.insert_template(template.clone()) {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                let err = WorkflowError::Invalid(format!("template {} already exists", template.task_id));
                return Err(self.reject(actor, action, err));
            }
            Err(e) => return Err(e.into()),
        }
        info!(template = %template.task_id, actor = %actor.id, "template added");
        Ok(template)
    }

    /// Activate or deactivate a template. Existing tasks are unaffected.
    pub fn set_template_active(&mut self, actor: &Actor, code: &str, active: bool) -> Result<TaskTemplate, WorkflowError> {
        if !permissions::can_administer(actor) {
            return Err(self.forbid(actor, Action::Administer));
        }
        let mut template = self
            .store
            .template(code)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("template {}", code)))?;
        template.is_active = active;
        self.store.update_template(template.clone())?;
        info!(template = %code, active, actor = %actor.id, "template toggled");
        Ok(template)
    }

    pub fn delete_template(&mut self, actor: &Actor, code: &str) -> Result<TaskTemplate, WorkflowError> {
        if !permissions::can_administer(actor) {
            return Err(self.forbid(actor, Action::Administer));
        }
        let removed = self.store.remove_template(code)?;
        info!(template = %code, actor = %actor.id, "template deleted");
        Ok(removed)
    }

    pub fn update_settings(&mut self, actor: &Actor, settings: Settings) -> Result<Settings, WorkflowError> {
        if !permissions::can_administer(actor) {
            return Err(self.forbid(actor, Action::Administer));
        }
        self.store.set_settings(settings.clone());
        info!(actor = %actor.id, allow_empty_phases = settings.allow_empty_phases, "settings updated");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::notify::RecordingNotifier;
    use crate::repo::{ClientRepository, TaskRepository};

    const NOW: i64 = 1_750_000_000_000;

    fn user(id: &str, role: Role, client: Option<&str>) -> User {
        User {
            id: id.into(),
            name: id.into(),
            email: format!("{}@portal.test", id),
            role,
            client_id: client.map(str::to_string),
            is_active: true,
        }
    }

    fn template(code: &str, phase: Phase, tiers: &[Tier], owner: Owner) -> TaskTemplate {
        TaskTemplate {
            task_id: code.into(),
            title: format!("Template {}", code),
            description: None,
            phase,
            owner,
            approver: Some(Role::Gatekeeper),
            cadence: Some(Cadence::Monthly),
            tiers: tiers.to_vec(),
            is_active: true,
            order: 0,
        }
    }

    fn task(id: u64, phase: Phase, owner: Owner, status: Status) -> Task {
        Task {
            id,
            task_id: templates::task_code(phase, id as u32),
            client_id: "acme".into(),
            template_id: None,
            title: format!("Task {}", id),
            description: None,
            phase,
            cadence: None,
            owner,
            approver: Some(Role::Gatekeeper),
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

    /// Growth client in foundation: two approved tasks and one in progress.
    fn fixture() -> Database {
        let mut db = Database::default();
        db.users = vec![
            user("admin-1", Role::Admin, None),
            user("us-1", Role::Gatekeeper, None),
            user("head-1", Role::Lead, None),
            user("junior-1", Role::Junior, None),
            user("junior-2", Role::Junior, None),
            user("acme-contact", Role::Client, Some("acme")),
        ];
        db.clients = vec![Client {
            id: "acme".into(),
            name: "John Martinez".into(),
            company: "Acme Plumbing".into(),
            email: "john@acme.test".into(),
            current_phase: Phase::Foundation,
            is_active: true,
            subscription: Subscription::new(Tier::Growth, SubscriptionStatus::Active),
            created_at_utc: 0,
        }];
        db.templates = vec![
            template("TPL-ONB-001", Phase::Onboarding, &[Tier::Starter, Tier::Growth, Tier::Enterprise], Owner::Client),
            template("TPL-EXE-001", Phase::Execution, &[Tier::Starter, Tier::Growth, Tier::Enterprise], Owner::Lead),
            template("TPL-EXE-002", Phase::Execution, &[Tier::Growth, Tier::Enterprise], Owner::Junior),
            template("TPL-EXE-003", Phase::Execution, &[Tier::Enterprise], Owner::Lead),
        ];
        db.tasks = vec![
            task(1, Phase::Foundation, Owner::Lead, Status::Approved),
            task(2, Phase::Foundation, Owner::Lead, Status::Approved),
            task(3, Phase::Foundation, Owner::Junior, Status::InProgress),
        ];
        db
    }

    fn actor(db: &Database, id: &str) -> Actor {
        Actor::from(db.users.iter().find(|u| u.id == id).unwrap())
    }

    #[test]
    fn test_assigned_junior_starts_pending_task() {
        let mut db = fixture();
        let mut t = task(4, Phase::Foundation, Owner::Lead, Status::Pending);
        t.assigned_to = Some("junior-1".into());
        db.tasks.push(t);
        let junior = actor(&db, "junior-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);

        let started = portal.start_task(4, &junior).unwrap();
        assert_eq!(started.status, Status::InProgress);
        assert_eq!(db.get(4).unwrap().status, Status::InProgress);
    }

    #[test]
    fn test_non_gatekeeper_cannot_approve() {
        let mut db = fixture();
        db.tasks.push(task(4, Phase::Foundation, Owner::Gatekeeper, Status::Submitted));
        let n = RecordingNotifier::default();
        for id in ["admin-1", "head-1", "junior-1", "acme-contact"] {
            let a = actor(&db, id);
            let mut portal = Portal::new(&mut db, &n).at(NOW);
            let err = portal.approve_task(4, &a).unwrap_err();
            assert!(matches!(err, WorkflowError::Forbidden { action: Action::Approve, .. }), "{}", id);
        }
        assert_eq!(db.get(4).unwrap().status, Status::Submitted);
        assert!(n.events().is_empty());
    }

    #[test]
    fn test_advance_blocked_by_unapproved_task() {
        let mut db = fixture();
        let gk = actor(&db, "us-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);
        let err = portal.advance_phase("acme", &gk).unwrap_err();
        assert!(matches!(err, WorkflowError::PhaseIncomplete { phase: Phase::Foundation, pending: 1 }));
        assert_eq!(db.client("acme").unwrap().current_phase, Phase::Foundation);
        assert_eq!(db.tasks.len(), 3);
    }

    #[test]
    fn test_advance_materialises_tier_templates() {
        let mut db = fixture();
        db.tasks[2].status = Status::Approved;
        let gk = actor(&db, "us-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);

        let (client, created) = portal.advance_phase("acme", &gk).unwrap();
        assert_eq!(client.current_phase, Phase::Execution);
        let from_templates: Vec<_> = created.iter().filter_map(|t| t.template_id.as_deref()).collect();
        assert_eq!(from_templates, vec!["TPL-EXE-001", "TPL-EXE-002"]);
        assert_eq!(created[0].task_id, "ST-EXE-001");
        assert!(created.iter().all(|t| t.phase == Phase::Execution && t.status == Status::Pending));
        assert_eq!(db.client("acme").unwrap().current_phase, Phase::Execution);
        assert_eq!(n.names(), vec!["phase_advanced"]);
    }

    #[test]
    fn test_advance_requires_gatekeeper_or_admin() {
        let mut db = fixture();
        db.tasks[2].status = Status::Approved;
        let lead = actor(&db, "head-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);
        assert!(matches!(
            portal.advance_phase("acme", &lead),
            Err(WorkflowError::Forbidden { action: Action::AdvancePhase, .. })
        ));
    }

    #[test]
    fn test_starter_client_walks_past_locked_phases() {
        let mut db = Database::default();
        crate::seed::demo(&mut db, &RecordingNotifier::default(), NOW).unwrap();
        let gatekeeper = actor(&db, "us-1");
        let id = "greenscape-landscaping";
        let n = RecordingNotifier::default();

        let mut reached = Vec::new();
        loop {
            for t in db.tasks.iter_mut().filter(|t| t.client_id == id) {
                t.status = Status::Approved;
            }
            let mut portal = Portal::new(&mut db, &n).at(NOW);
            match portal.advance_phase(id, &gatekeeper) {
                Ok((client, created)) => {
                    assert!(!created.is_empty(), "{:?} has no starter work", client.current_phase);
                    reached.push(client.current_phase);
                }
                Err(err) => {
                    assert!(matches!(err, WorkflowError::NoNextPhase { phase: Phase::Reporting }), "{}", err);
                    break;
                }
            }
        }
        assert_eq!(reached, vec![Phase::Foundation, Phase::Execution, Phase::Reporting]);
        assert!(db.tasks_for_client(id).iter().all(|t| t.phase != Phase::Ai && t.phase != Phase::Monitoring));
    }

    #[test]
    fn test_advance_refused_for_lapsed_subscription_and_last_phase() {
        let mut db = fixture();
        db.tasks[2].status = Status::Approved;
        db.clients[0].subscription.status = SubscriptionStatus::Paused;
        let admin = actor(&db, "admin-1");
        let n = RecordingNotifier::default();
        {
            let mut portal = Portal::new(&mut db, &n).at(NOW);
            assert!(matches!(
                portal.advance_phase("acme", &admin),
                Err(WorkflowError::SubscriptionLapsed { .. })
            ));
        }
        db.clients[0].subscription.status = SubscriptionStatus::Active;
        db.clients[0].current_phase = Phase::Monitoring;
        let mut portal = Portal::new(&mut db, &n).at(NOW);
        assert!(matches!(
            portal.advance_phase("acme", &admin),
            Err(WorkflowError::NoNextPhase { phase: Phase::Monitoring })
        ));
    }

    #[test]
    fn test_gatekeeper_hands_approved_task_to_client() {
        let mut db = fixture();
        let gk = actor(&db, "us-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);
        let t = portal.handoff_to_client(1, &gk).unwrap();
        assert_eq!(t.owner, Owner::Client);
        assert_eq!(t.status, Status::Pending);

        // The client can now work it.
        let client = actor(&db, "acme-contact");
        let mut portal = Portal::new(&mut db, &n).at(NOW);
        assert_eq!(portal.start_task(1, &client).unwrap().status, Status::InProgress);
        assert_eq!(n.names(), vec!["handed_off_to_client"]);
    }

    #[test]
    fn test_growth_tier_resolution() {
        let mut db = fixture();
        let n = RecordingNotifier::default();
        let portal = Portal::new(&mut db, &n).at(NOW);
        let codes: Vec<String> = portal
            .resolve_templates_for_tier(Tier::Growth)
            .into_iter()
            .map(|t| t.task_id)
            .collect();
        assert_eq!(codes, vec!["TPL-ONB-001", "TPL-EXE-001", "TPL-EXE-002"]);
    }

    #[test]
    fn test_review_cycle_with_notes_and_revision() {
        let mut db = fixture();
        let junior = actor(&db, "junior-1");
        let gk = actor(&db, "us-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);

        portal.complete_task(3, &junior).unwrap();
        let submitted = portal.submit_task(3, &junior, Some("  ready for review ")).unwrap();
        assert_eq!(submitted.owner, Owner::Gatekeeper);
        assert_eq!(submitted.comments.len(), 1);
        assert_eq!(submitted.comments[0].content, "ready for review");

        let back = portal.request_revision(3, &gk, Some("fix the NAP data")).unwrap();
        assert_eq!(back.status, Status::Resubmit);
        assert_eq!(back.owner, Owner::Junior);
        assert_eq!(portal.start_task(3, &junior).unwrap().status, Status::InProgress);
        assert_eq!(n.names(), vec!["task_submitted", "revision_requested"]);
    }

    #[test]
    fn test_rejections_leave_task_untouched() {
        let mut db = fixture();
        let before = db.get(3).cloned().unwrap();
        let lead = actor(&db, "head-1");
        let client = actor(&db, "acme-contact");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);

        assert!(matches!(portal.submit_task(3, &lead, None), Err(WorkflowError::InvalidState { .. })));
        assert!(matches!(portal.approve_task(3, &lead), Err(WorkflowError::InvalidState { .. })));
        assert!(matches!(portal.complete_task(3, &client), Err(WorkflowError::Forbidden { .. })));
        assert!(matches!(portal.start_task(99, &lead), Err(WorkflowError::NotFound(_))));

        assert_eq!(db.get(3).cloned().unwrap(), before);
        assert!(n.events().is_empty());
    }

    #[test]
    fn test_updated_at_strictly_increases() {
        let mut db = fixture();
        let lead = actor(&db, "head-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);
        let a = portal.complete_task(3, &lead).unwrap();
        let b = portal.submit_task(3, &lead, None).unwrap();
        let c = portal.add_comment(3, &lead, "looks fine", vec![]).unwrap();
        assert!(a.updated_at_utc < b.updated_at_utc && b.updated_at_utc < c.updated_at_utc);
        assert_eq!(c.version, 3);
    }

    #[test]
    fn test_racing_reviewers_cannot_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.json");
        let mut db = fixture();
        db.tasks.push(task(4, Phase::Foundation, Owner::Lead, Status::Submitted));
        db.save(&path).unwrap();
        let gk = actor(&db, "us-1");
        let n = RecordingNotifier::default();

        let mut approving = Database::load(&path).unwrap();
        let mut revising = Database::load(&path).unwrap();
        Portal::new(&mut approving, &n).at(NOW).approve_task(4, &gk).unwrap();
        Portal::new(&mut revising, &n).at(NOW).request_revision(4, &gk, Some("redo")).unwrap();

        approving.save(&path).unwrap();
        assert!(matches!(revising.save(&path), Err(StoreError::Stale { .. })));
        assert_eq!(Database::load(&path).unwrap().get(4).unwrap().status, Status::Approved);
    }

    #[test]
    fn test_checked_transition_detects_stale_version() {
        let mut db = fixture();
        let lead = actor(&db, "head-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);
        portal.complete_task(3, &lead).unwrap();

        let err = portal
            .transition_checked(3, &lead, Transition::Submit, None, 0)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { task: 3, expected: 0, found: 1 }));
        let ok = portal.transition_checked(3, &lead, Transition::Submit, None, 1).unwrap();
        assert_eq!(ok.status, Status::Submitted);
    }

    #[test]
    fn test_comment_rules() {
        let mut db = fixture();
        let junior = actor(&db, "junior-1");
        let lead = actor(&db, "head-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);

        assert!(matches!(portal.add_comment(3, &lead, "   ", vec![]), Err(WorkflowError::Invalid(_))));
        let with_file = Attachment {
            id: "a-1".into(),
            name: "audit.pdf".into(),
            size: 2048,
            content_type: "application/pdf".into(),
            url: "https://files.test/audit.pdf".into(),
        };
        let t = portal.add_comment(3, &junior, "", vec![with_file]).unwrap();
        assert_eq!(t.comments[0].user_role, Role::Junior);
        // Lead-owned work is outside a junior's chain.
        assert!(matches!(
            portal.add_comment(1, &junior, "hi", vec![]),
            Err(WorkflowError::Forbidden { action: Action::Comment, .. })
        ));
        assert_eq!(n.names(), vec!["comment_added"]);
    }

    #[test]
    fn test_add_document_records_uploader() {
        let mut db = fixture();
        let junior = actor(&db, "junior-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);

        assert!(matches!(portal.add_document(3, &junior, "", "https://files.test/x.pdf"), Err(WorkflowError::Invalid(_))));
        let t = portal.add_document(3, &junior, "Citation report", "https://files.test/citations.pdf").unwrap();
        assert_eq!(t.documents.len(), 1);
        assert_eq!(t.documents[0].uploaded_by, "junior-1");
        assert_eq!(t.documents[0].id, "d-3-1");
        assert_eq!(t.version, 1);
        assert!(matches!(
            portal.add_document(1, &junior, "x", "https://files.test/x"),
            Err(WorkflowError::Forbidden { .. })
        ));
        assert_eq!(n.names(), vec!["document_added"]);
    }

    #[test]
    fn test_assign_moves_ownership_to_assignee() {
        let mut db = fixture();
        db.tasks.push(task(4, Phase::Foundation, Owner::Lead, Status::Pending));
        let lead = actor(&db, "head-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);

        let t = portal.assign_task(4, &lead, "junior-2").unwrap();
        assert_eq!(t.owner, Owner::Junior);
        assert_eq!(t.assigned_to.as_deref(), Some("junior-2"));
        assert!(matches!(portal.assign_task(4, &lead, "acme-contact"), Err(WorkflowError::Invalid(_))));
        assert!(matches!(portal.assign_task(4, &lead, "nobody"), Err(WorkflowError::NotFound(_))));
        assert_eq!(n.names(), vec!["task_assigned"]);
    }

    #[test]
    fn test_create_task_uses_phase_sequence() {
        let mut db = fixture();
        let gk = actor(&db, "us-1");
        let junior = actor(&db, "junior-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);
        let input = NewTask {
            client_id: "acme".into(),
            title: "Fix duplicate listings".into(),
            description: None,
            phase: Phase::Foundation,
            owner: Owner::Lead,
            cadence: Some(Cadence::Once),
            due: None,
        };

        assert!(matches!(
            portal.create_task(&junior, input.clone()),
            Err(WorkflowError::Forbidden { action: Action::CreateTask, .. })
        ));
        let t = portal.create_task(&gk, input).unwrap();
        assert_eq!(t.task_id, "ST-FND-004");
        assert_eq!(t.id, 4);
        assert_eq!(n.names(), vec!["task_created"]);
    }

    #[test]
    fn test_provision_is_admin_only_and_materialises_onboarding() {
        let mut db = fixture();
        let admin = actor(&db, "admin-1");
        let gk = actor(&db, "us-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);
        let input = NewClient {
            company: "GreenScape Landscaping".into(),
            contact_name: "Emily Chen".into(),
            email: "emily@greenscape.test".into(),
            tier: Tier::Starter,
            status: SubscriptionStatus::Trial,
            trial_end_date: None,
        };

        assert!(matches!(portal.provision_client(&gk, input.clone()), Err(WorkflowError::Forbidden { .. })));
        let (client, created) = portal.provision_client(&admin, input.clone()).unwrap();
        assert_eq!(client.id, "greenscape-landscaping");
        assert_eq!(client.current_phase, Phase::Onboarding);
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].task_id, "ST-ONB-001");
        assert!(portal.actor("greenscape-landscaping-contact").is_ok());
        assert!(matches!(portal.provision_client(&admin, input), Err(WorkflowError::Invalid(_))));
        assert_eq!(n.names(), vec!["client_provisioned"]);
    }

    #[test]
    fn test_visible_tasks_respects_role() {
        let mut db = fixture();
        let mut other = task(9, Phase::Foundation, Owner::Client, Status::Pending);
        other.client_id = "globex".into();
        db.tasks.push(other);
        db.tasks.push(task(10, Phase::Foundation, Owner::Client, Status::Pending));
        let client = actor(&db, "acme-contact");
        let n = RecordingNotifier::default();
        let portal = Portal::new(&mut db, &n).at(NOW);

        let seen: Vec<u64> = portal.visible_tasks(&client, &TaskFilter::default()).iter().map(|t| t.id).collect();
        assert_eq!(seen, vec![1, 2, 3, 10]);
        let filter = TaskFilter { status: Some(Status::Approved), ..TaskFilter::default() };
        assert_eq!(portal.visible_tasks(&client, &filter).len(), 2);
    }

    #[test]
    fn test_template_admin() {
        let mut db = fixture();
        let admin = actor(&db, "admin-1");
        let lead = actor(&db, "head-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);

        let t = template("TPL-AIO-001", Phase::Ai, &[Tier::Growth], Owner::Lead);
        assert!(matches!(portal.add_template(&lead, t.clone()), Err(WorkflowError::Forbidden { .. })));
        portal.add_template(&admin, t.clone()).unwrap();
        assert!(matches!(portal.add_template(&admin, t), Err(WorkflowError::Invalid(_))));

        let off = portal.set_template_active(&admin, "TPL-AIO-001", false).unwrap();
        assert!(!off.is_active);
        assert!(portal.resolve_templates_for_tier(Tier::Growth).iter().all(|t| t.task_id != "TPL-AIO-001"));
        portal.delete_template(&admin, "TPL-AIO-001").unwrap();
        assert!(matches!(portal.delete_template(&admin, "TPL-AIO-001"), Err(WorkflowError::NotFound(_))));
    }

    #[test]
    fn test_empty_phase_setting_and_disabled_phases() {
        let mut db = fixture();
        db.clients[0].current_phase = Phase::Execution;
        let admin = actor(&db, "admin-1");
        let n = RecordingNotifier::default();
        let mut portal = Portal::new(&mut db, &n).at(NOW);

        assert!(matches!(
            portal.advance_phase("acme", &admin),
            Err(WorkflowError::PhaseNotStarted { phase: Phase::Execution })
        ));
        portal
            .update_settings(&admin, Settings { allow_empty_phases: true, disabled_phases: vec![Phase::Ai] })
            .unwrap();
        let (client, _) = portal.advance_phase("acme", &admin).unwrap();
        assert_eq!(client.current_phase, Phase::Reporting);
        assert_eq!(db.tasks.len(), 3);
    }
}
