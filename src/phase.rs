//! Phase progression gate.
//!
//! A client leaves a phase only when every one of its tasks in that phase is approved.

use serde::Serialize;

use crate::db::Settings;
use crate::error::WorkflowError;
use crate::fields::{Phase, Status, Tier};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseState {
    NotStarted,
    InProgress,
    Complete,
}

/// Task counts for one client in one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseProgress {
    pub phase: Phase,
    pub total: usize,
    /// Tasks not yet approved, whatever their status.
    pub pending: usize,
    pub in_progress: usize,
    pub approved: usize,
    pub state: PhaseState,
}

impl PhaseProgress {
    /// Approved share in whole percent.
    pub fn percent(&self) -> u16 {
        if self.total == 0 {
            0
        } else {
            (self.approved * 100 / self.total) as u16
        }
    }
}

pub fn phase_progress<'a, I>(tasks: I, client_id: &str, phase: Phase) -> PhaseProgress
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut total = 0;
    let mut in_progress = 0;
    let mut approved = 0;
    for t in tasks.into_iter().filter(|t| t.client_id == client_id && t.phase == phase) {
        total += 1;
        match t.status {
            Status::Approved => approved += 1,
            Status::InProgress => in_progress += 1,
            _ => {}
        }
    }
    let state = if total == 0 {
        PhaseState::NotStarted
    } else if approved == total {
        PhaseState::Complete
    } else {
        PhaseState::InProgress
    };
    PhaseProgress {
        phase,
        total,
        pending: total - approved,
        in_progress,
        approved,
        state,
    }
}

/// Refuse advancement out of a phase that is not finished.
pub fn check_gate(progress: &PhaseProgress, settings: &Settings) -> Result<(), WorkflowError> {
    if progress.total == 0 && !settings.allow_empty_phases {
        return Err(WorkflowError::PhaseNotStarted { phase: progress.phase });
    }
    if progress.pending > 0 {
        return Err(WorkflowError::PhaseIncomplete {
            phase: progress.phase,
            pending: progress.pending,
        });
    }
    Ok(())
}

/// The phase after `current`, skipping phases disabled in `settings` or locked for `tier`.
pub fn next_phase(current: Phase, tier: Tier, settings: &Settings) -> Option<Phase> {
    let mut p = current.next()?;
    while settings.disabled_phases.contains(&p) || !tier.unlocks(p) {
        p = p.next()?;
    }
    Some(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Owner;

    fn task(id: u64, client: &str, phase: Phase, status: Status) -> Task {
        Task {
            id,
            task_id: format!("ST-{}-{:03}", phase.code(), id),
            client_id: client.into(),
            template_id: None,
            title: "Citation cleanup".into(),
            description: None,
            phase,
            cadence: None,
            owner: Owner::Lead,
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

    #[test]
    fn test_one_unapproved_task_blocks_the_gate() {
        let tasks = vec![
            task(1, "acme", Phase::Foundation, Status::Approved),
            task(2, "acme", Phase::Foundation, Status::Approved),
            task(3, "acme", Phase::Foundation, Status::InProgress),
            task(4, "globex", Phase::Foundation, Status::Pending),
        ];
        let p = phase_progress(&tasks, "acme", Phase::Foundation);
        assert_eq!((p.total, p.pending, p.in_progress, p.approved), (3, 1, 1, 2));
        assert_eq!(p.state, PhaseState::InProgress);
        assert_eq!(p.percent(), 66);
        assert!(matches!(
            check_gate(&p, &Settings::default()),
            Err(WorkflowError::PhaseIncomplete { pending: 1, .. })
        ));
    }

    #[test]
    fn test_all_approved_passes() {
        let tasks = vec![
            task(1, "acme", Phase::Foundation, Status::Approved),
            task(2, "acme", Phase::Foundation, Status::Approved),
        ];
        let p = phase_progress(&tasks, "acme", Phase::Foundation);
        assert_eq!(p.state, PhaseState::Complete);
        assert!(check_gate(&p, &Settings::default()).is_ok());
    }

    #[test]
    fn test_empty_phase_policy() {
        let p = phase_progress(&Vec::<Task>::new(), "acme", Phase::Ai);
        assert_eq!(p.state, PhaseState::NotStarted);
        assert!(matches!(
            check_gate(&p, &Settings::default()),
            Err(WorkflowError::PhaseNotStarted { phase: Phase::Ai })
        ));
        let lenient = Settings { allow_empty_phases: true, ..Settings::default() };
        assert!(check_gate(&p, &lenient).is_ok());
    }

    #[test]
    fn test_next_phase_skips_disabled() {
        let mut s = Settings::default();
        assert_eq!(next_phase(Phase::Foundation, Tier::Growth, &s), Some(Phase::Execution));
        assert_eq!(next_phase(Phase::Monitoring, Tier::Growth, &s), None);
        s.disabled_phases = vec![Phase::Ai];
        assert_eq!(next_phase(Phase::Execution, Tier::Growth, &s), Some(Phase::Reporting));
        s.disabled_phases = vec![Phase::Monitoring];
        assert_eq!(next_phase(Phase::Reporting, Tier::Growth, &s), None);
    }

    #[test]
    fn test_starter_skips_locked_phases() {
        let s = Settings::default();
        assert_eq!(next_phase(Phase::Execution, Tier::Starter, &s), Some(Phase::Reporting));
        assert_eq!(next_phase(Phase::Reporting, Tier::Starter, &s), None);
        assert_eq!(next_phase(Phase::Execution, Tier::Enterprise, &s), Some(Phase::Ai));
    }
}
