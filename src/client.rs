//! Clients, subscriptions and portal users.
//!
//! Clients are keyed by a slug derived from their company name. Each client carries one
//! subscription whose tier selects the task templates that apply to it, and the phase it
//! is currently working through. Users resolve to an `Actor` for permission checks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A customer account of the agency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub company: String,
    pub email: String,
    pub current_phase: Phase,
    pub is_active: bool,
    pub subscription: Subscription,
    pub created_at_utc: i64,
}

/// A client's plan. `trial_end_date` only matters while `status` is `Trial`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub tier: Tier,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub trial_end_date: Option<NaiveDate>,
    pub monthly_price: u32,
}

impl Subscription {
    pub fn new(tier: Tier, status: SubscriptionStatus) -> Self {
        Subscription {
            tier,
            status,
            trial_end_date: None,
            monthly_price: tier.monthly_price(),
        }
    }

    /// Whether work may continue under this subscription on `today`.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        match self.status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Trial => self.trial_end_date.map_or(true, |end| today <= end),
            SubscriptionStatus::Paused
            | SubscriptionStatus::Cancelled
            | SubscriptionStatus::Expired
            | SubscriptionStatus::Pending => false,
        }
    }
}

/// A portal login. Client users carry the id of the client they belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub client_id: Option<String>,
    pub is_active: bool,
}

/// The identity an operation is performed as.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub client_id: Option<String>,
}

impl Actor {
    pub fn new(id: &str, name: &str, role: Role) -> Self {
        Actor {
            id: id.to_string(),
            name: name.to_string(),
            role,
            client_id: None,
        }
    }

    /// A client-side actor bound to `client_id`.
    pub fn for_client(id: &str, name: &str, client_id: &str) -> Self {
        Actor {
            client_id: Some(client_id.to_string()),
            ..Actor::new(id, name, Role::Client)
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            client_id: user.client_id.clone(),
        }
    }
}

/// Convert a company name to a client id.
/// Lowercases and collapses every run of non-alphanumerics into a single hyphen.
pub fn client_slug(company: &str) -> String {
    company
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_slug() {
        assert_eq!(client_slug("Acme Plumbing Co."), "acme-plumbing-co");
        assert_eq!(client_slug("GreenScape_Landscaping"), "greenscape-landscaping");
        assert_eq!(client_slug("  Elite   Auto!!Repair "), "elite-auto-repair");
        assert_eq!(client_slug(""), "");
    }

    #[test]
    fn test_subscription_is_current() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(Subscription::new(Tier::Growth, SubscriptionStatus::Active).is_current(today));
        assert!(!Subscription::new(Tier::Growth, SubscriptionStatus::Cancelled).is_current(today));

        let mut trial = Subscription::new(Tier::Starter, SubscriptionStatus::Trial);
        assert!(trial.is_current(today));
        trial.trial_end_date = NaiveDate::from_ymd_opt(2025, 3, 9);
        assert!(!trial.is_current(today));
        trial.trial_end_date = NaiveDate::from_ymd_opt(2025, 3, 10);
        assert!(trial.is_current(today));
    }
}
