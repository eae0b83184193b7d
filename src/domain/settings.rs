use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a wedding's funds settle, one variant per rail. Builders receive
/// exactly the shape they need instead of probing optional nested fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "rail", rename_all = "kebab-case")]
pub enum PayoutRail {
    /// Connected Stripe account for destination charges.
    Card { account_id: String },
    /// Swish handle (phone number) the guest pays directly.
    Swish { handle: String },
}

/// Per-wedding payment settings. Owned by the settings collaborator; this
/// core only reads them (the seeder and tests write them).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    pub wedding_id: Uuid,
    pub rails: Vec<PayoutRail>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentSettings {
    pub fn card_account(&self) -> Option<&str> {
        self.rails.iter().find_map(|rail| match rail {
            PayoutRail::Card { account_id } => Some(account_id.as_str()),
            _ => None,
        })
    }

    pub fn swish_handle(&self) -> Option<&str> {
        self.rails.iter().find_map(|rail| match rail {
            PayoutRail::Swish { handle } => Some(handle.as_str()),
            _ => None,
        })
    }
}
