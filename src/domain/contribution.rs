use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One guest's payment attestation toward a gift. Immutable once recorded:
/// no update or delete exists anywhere in the crate for contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Uuid,
    pub wedding_id: Uuid,
    pub gift_id: Uuid,
    /// Major currency units (SEK); always positive.
    pub amount: f64,
    pub rail: ContributionRail,
    pub donor_name: Option<String>,
    pub message: Option<String>,
    pub donor_contact: Option<String>,
    /// Stripe checkout session that confirmed this contribution, card rail
    /// only. Used to de-duplicate webhook redeliveries.
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ContributionRail {
    Card,
    Swish,
}

impl ContributionRail {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionRail::Card => "card",
            ContributionRail::Swish => "swish",
        }
    }
}

/// Input to the donation recorder. `id` and `created_at` are assigned at
/// recording time when the caller leaves them unset.
#[derive(Debug, Clone)]
pub struct NewContribution {
    pub id: Option<Uuid>,
    pub wedding_id: Uuid,
    pub gift_id: Uuid,
    pub amount: f64,
    pub rail: ContributionRail,
    pub donor_name: Option<String>,
    pub message: Option<String>,
    pub donor_contact: Option<String>,
    pub checkout_session_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewContribution {
    pub fn new(wedding_id: Uuid, gift_id: Uuid, amount: f64, rail: ContributionRail) -> Self {
        Self {
            id: None,
            wedding_id,
            gift_id,
            amount,
            rail,
            donor_name: None,
            message: None,
            donor_contact: None,
            checkout_session_id: None,
            created_at: None,
        }
    }
}
