//! Demo data for `portal init --demo`.
//!
//! The agency team and the template catalogue are inserted directly. Clients are then
//! onboarded through `Portal` like any other, and the first one is walked through its
//! onboarding review so the board has work in several columns.

use crate::client::{Actor, User};
use crate::db::Database;
use crate::error::WorkflowError;
use crate::fields::{Cadence, Owner, Phase, Role, SubscriptionStatus, Tier};
use crate::notify::Notifier;
use crate::portal::{NewClient, Portal};
use crate::repo::{TaskRepository, TemplateRepository, UserRepository};
use crate::task::TaskTemplate;

const ALL: &[Tier] = &[Tier::Starter, Tier::Growth, Tier::Enterprise];
const GROWTH_UP: &[Tier] = &[Tier::Growth, Tier::Enterprise];
const ENTERPRISE: &[Tier] = &[Tier::Enterprise];

fn team() -> Vec<User> {
    let member = |id: &str, name: &str, role: Role| User {
        id: id.into(),
        name: name.into(),
        email: format!("{}@agency.test", id),
        role,
        client_id: None,
        is_active: true,
    };
    vec![
        member("admin-1", "Alex Rivera", Role::Admin),
        member("us-1", "Sarah Johnson", Role::Gatekeeper),
        member("india-head-1", "Rajesh Kumar", Role::Lead),
        member("india-junior-1", "Priya Sharma", Role::Junior),
        member("india-junior-2", "Arjun Patel", Role::Junior),
    ]
}

#[allow(clippy::type_complexity)]
fn catalogue() -> Vec<TaskTemplate> {
    let rows: &[(&str, &str, &str, Phase, Owner, Cadence, &[Tier])] = &[
        ("TPL-ONB-001", "Provide GBP access", "Share Google Business Profile access with the team.", Phase::Onboarding, Owner::Client, Cadence::Once, ALL),
        ("TPL-ONB-002", "Upload 20+ photos", "Photos of the business, team and services.", Phase::Onboarding, Owner::Client, Cadence::Once, ALL),
        ("TPL-ONB-003", "Submit service descriptions", "Describe every service offered.", Phase::Onboarding, Owner::Client, Cadence::Once, ALL),
        ("TPL-ONB-004", "Conduct onboarding call", "Initial strategy call with the client.", Phase::Onboarding, Owner::Gatekeeper, Cadence::Once, ALL),
        ("TPL-ONB-005", "Verify access & completeness", "Confirm client access and materials are complete.", Phase::Onboarding, Owner::Lead, Cadence::Once, ALL),
        ("TPL-FND-001", "GBP audit & baseline snapshot", "Audit the current profile and record a baseline.", Phase::Foundation, Owner::Lead, Cadence::Once, ALL),
        ("TPL-FND-002", "Initial GBP optimization", "Baseline optimization of the profile.", Phase::Foundation, Owner::Lead, Cadence::Once, ALL),
        ("TPL-FND-003", "Location page audit", "Audit location pages for local SEO.", Phase::Foundation, Owner::Lead, Cadence::Once, GROWTH_UP),
        ("TPL-FND-004", "Citation cleanup", "Fix inconsistent NAP citations across directories.", Phase::Foundation, Owner::Junior, Cadence::Once, ENTERPRISE),
        ("TPL-EXE-001", "Publish 2 Google Posts", "Create and publish monthly posts.", Phase::Execution, Owner::Lead, Cadence::Monthly, ALL),
        ("TPL-EXE-002", "Seed 3 GBP Q&As", "Add relevant Q&A content.", Phase::Execution, Owner::Junior, Cadence::Monthly, GROWTH_UP),
        ("TPL-EXE-003", "Review response drafting", "Draft replies to new reviews.", Phase::Execution, Owner::Junior, Cadence::Weekly, ENTERPRISE),
        ("TPL-AIO-001", "FAQ schema markup", "Structured FAQ content for answer engines.", Phase::Ai, Owner::Lead, Cadence::Quarterly, GROWTH_UP),
        ("TPL-AIO-002", "AI answer visibility check", "Check brand presence in AI answers.", Phase::Ai, Owner::Junior, Cadence::Monthly, GROWTH_UP),
        ("TPL-AIO-003", "Entity consistency audit", "Align entity data across knowledge sources.", Phase::Ai, Owner::Lead, Cadence::Quarterly, ENTERPRISE),
        ("TPL-RPT-001", "Update dashboard", "Refresh the KPI dashboard.", Phase::Reporting, Owner::Lead, Cadence::Monthly, ALL),
        ("TPL-RPT-002", "Monthly email summary", "Send the monthly progress report.", Phase::Reporting, Owner::Gatekeeper, Cadence::Monthly, ALL),
        ("TPL-MON-001", "Ranking drop watch", "Investigate sudden ranking losses.", Phase::Monitoring, Owner::Lead, Cadence::Ongoing, GROWTH_UP),
        ("TPL-MON-002", "Profile suspension watch", "Respond to profile suspensions and edits.", Phase::Monitoring, Owner::Lead, Cadence::Ongoing, ENTERPRISE),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, &(code, title, desc, phase, owner, cadence, tiers))| TaskTemplate {
            task_id: code.into(),
            title: title.into(),
            description: Some(desc.into()),
            phase,
            owner,
            approver: Some(Role::Gatekeeper),
            cadence: Some(cadence),
            tiers: tiers.to_vec(),
            is_active: true,
            order: i as u32 + 1,
        })
        .collect()
}

fn clients() -> Vec<NewClient> {
    let client = |company: &str, contact: &str, email: &str, tier: Tier, status: SubscriptionStatus| NewClient {
        company: company.into(),
        contact_name: contact.into(),
        email: email.into(),
        tier,
        status,
        trial_end_date: None,
    };
    vec![
        client("Acme Plumbing Co.", "John Martinez", "john@acmeplumbing.test", Tier::Growth, SubscriptionStatus::Active),
        client("GreenScape Landscaping", "Emily Chen", "emily@greenscape.test", Tier::Starter, SubscriptionStatus::Active),
        client("Elite Auto Repair", "Michael Brown", "michael@eliteauto.test", Tier::Enterprise, SubscriptionStatus::Trial),
    ]
}

/// Fill `db` with the demo agency. Expects an empty database.
pub fn demo(db: &mut Database, notifier: &dyn Notifier, now_ms: i64) -> Result<(), WorkflowError> {
    for user in team() {
        db.insert_user(user)?;
    }
    for template in catalogue() {
        db.insert_template(template)?;
    }

    let admin = Actor::new("admin-1", "Alex Rivera", Role::Admin);
    let gatekeeper = Actor::new("us-1", "Sarah Johnson", Role::Gatekeeper);
    let lead = Actor::new("india-head-1", "Rajesh Kumar", Role::Lead);

    let mut portal = Portal::new(db, notifier).at(now_ms);
    let mut first = None;
    for input in clients() {
        let (client, _) = portal.provision_client(&admin, input)?;
        first.get_or_insert(client.id);
    }
    let Some(acme) = first else {
        return Ok(());
    };

    // Take the first client through onboarding review and into foundation.
    let contact = portal.actor(&format!("{}-contact", acme))?;
    let onboarding: Vec<(u64, Owner)> = portal
        .store()
        .tasks_for_client(&acme)
        .iter()
        .filter(|t| t.phase == Phase::Onboarding)
        .map(|t| (t.id, t.owner))
        .collect();
    for (id, owner) in onboarding {
        let worker = match owner {
            Owner::Client => &contact,
            Owner::Gatekeeper => &gatekeeper,
            _ => &lead,
        };
        portal.start_task(id, worker)?;
        portal.complete_task(id, worker)?;
        portal.submit_task(id, worker, None)?;
        portal.approve_task(id, &gatekeeper)?;
    }
    let (_, foundation) = portal.advance_phase(&acme, &gatekeeper)?;

    // Leave foundation work spread across the board.
    if let Some(t) = foundation.first() {
        portal.assign_task(t.id, &lead, "india-junior-1")?;
        let junior = portal.actor("india-junior-1")?;
        portal.start_task(t.id, &junior)?;
    }
    if let Some(t) = foundation.get(1) {
        portal.start_task(t.id, &lead)?;
        portal.complete_task(t.id, &lead)?;
        portal.submit_task(t.id, &lead, Some("Baseline optimisation done, screenshots attached."))?;
    }
    Ok(())
}
