//! Repository contracts the workflow operates through.
//!
//! Each entity gets its own narrow trait so operations only see what they touch. `Store`
//! bundles them for `Portal`. `Database` in `db.rs` implements all of them over a JSON
//! file; tests use the same type in memory.

use crate::client::{Client, User};
use crate::db::Settings;
use crate::error::StoreError;
use crate::fields::Phase;
use crate::task::{Task, TaskTemplate};

pub trait TaskRepository {
    fn task(&self, id: u64) -> Option<&Task>;

    fn tasks(&self) -> Vec<&Task>;

    fn tasks_for_client(&self, client_id: &str) -> Vec<&Task> {
        self.tasks().into_iter().filter(|t| t.client_id == client_id).collect()
    }

    /// Next free opaque task id.
    fn next_task_id(&self) -> u64;

    /// Reserve the next sequence number for `(client_id, phase)`.
    ///
    /// The number is never below the count of existing tasks in that phase plus one, and
    /// never handed out twice.
    fn next_sequence(&mut self, client_id: &str, phase: Phase) -> u32;

    /// Insert a new task. Fails with `Duplicate` if the id or the `(client_id, task_id)`
    /// pair is already taken.
    fn insert_task(&mut self, task: Task) -> Result<(), StoreError>;

    /// Replace a stored task. `task.version` must be exactly one past the stored version,
    /// otherwise `VersionConflict`.
    fn update_task(&mut self, task: Task) -> Result<(), StoreError>;
}

pub trait ClientRepository {
    fn client(&self, id: &str) -> Option<&Client>;

    fn clients(&self) -> Vec<&Client>;

    fn insert_client(&mut self, client: Client) -> Result<(), StoreError>;

    fn update_client(&mut self, client: Client) -> Result<(), StoreError>;
}

pub trait TemplateRepository {
    fn templates(&self) -> Vec<&TaskTemplate>;

    fn template(&self, code: &str) -> Option<&TaskTemplate> {
        self.templates().into_iter().find(|t| t.task_id == code)
    }

    fn insert_template(&mut self, template: TaskTemplate) -> Result<(), StoreError>;

    fn update_template(&mut self, template: TaskTemplate) -> Result<(), StoreError>;

    fn remove_template(&mut self, code: &str) -> Result<TaskTemplate, StoreError>;
}

pub trait UserRepository {
    fn user(&self, id: &str) -> Option<&User>;

    fn users(&self) -> Vec<&User>;

    fn insert_user(&mut self, user: User) -> Result<(), StoreError>;
}

pub trait SettingsRepository {
    fn settings(&self) -> &Settings;

    fn set_settings(&mut self, settings: Settings);
}

/// Everything `Portal` needs from storage.
pub trait Store:
    TaskRepository + ClientRepository + TemplateRepository + UserRepository + SettingsRepository
{
}

impl<T> Store for T where
    T: TaskRepository + ClientRepository + TemplateRepository + UserRepository + SettingsRepository
{
}
