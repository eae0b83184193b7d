pub mod fake;
pub mod stripe_client;
pub mod swish;

pub use fake::FakePaymentGateway;
pub use stripe_client::StripeGateway;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    config::FeePolicy,
    domain::Gift,
    error::{AppError, Result},
};

/// Abstraction over the payment processor so the card-session flow can be
/// exercised in tests without network access. Mirrors the three processor
/// calls the flow makes, in the order it makes them.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_product(
        &self,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String>;

    async fn create_price(
        &self,
        product_id: &str,
        unit_amount_minor: i64,
        currency: &str,
    ) -> Result<String>;

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest<'_>,
    ) -> Result<CardSession>;
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest<'a> {
    pub price_id: &'a str,
    /// The couple's connected payout account; the platform must never be
    /// the final holder of the funds.
    pub destination_account: &'a str,
    pub application_fee_minor: i64,
    pub return_url: &'a str,
    /// Carried on the session so the confirmation webhook can reconstruct
    /// the contribution.
    pub metadata: HashMap<String, String>,
}

/// A created checkout session. Ephemeral: only a request to pay, its
/// existence does not imply a contribution exists.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CardSession {
    pub session_id: String,
    pub client_secret: String,
}

/// Converts a major-unit amount to minor units (öre). `f64::round` rounds
/// half away from zero, matching the source system's rounding for positive
/// amounts.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Platform fee in minor units: `round((amount * percent + fixed) * 100)`.
pub fn application_fee_minor(amount: f64, policy: &FeePolicy) -> i64 {
    ((amount * policy.percent + policy.fixed) * 100.0).round() as i64
}

/// Prices and constructs a card checkout session: product, then price, then
/// an embedded-mode session with the platform fee and the couple's payout
/// account as transfer destination. Session creation creates billable
/// objects on the processor side, so nothing here retries automatically;
/// the caller must issue a fresh request after a failure.
pub struct CardSessionBuilder {
    gateway: Arc<dyn PaymentGateway>,
    fee_policy: FeePolicy,
    currency: String,
}

impl CardSessionBuilder {
    pub fn new(gateway: Arc<dyn PaymentGateway>, fee_policy: FeePolicy, currency: String) -> Self {
        Self {
            gateway,
            fee_policy,
            currency,
        }
    }

    pub async fn build(
        &self,
        gift: &Gift,
        amount: f64,
        destination_account: &str,
        return_url: &str,
        metadata: HashMap<String, String>,
    ) -> Result<CardSession> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::Validation(
                "Amount must be a positive number".to_string(),
            ));
        }

        let fee_minor = application_fee_minor(amount, &self.fee_policy);
        let unit_amount_minor = to_minor_units(amount);

        tracing::info!(
            gift_id = %gift.id,
            amount,
            fee_minor,
            fee_version = self.fee_policy.version,
            "Creating card checkout session"
        );

        let product_metadata = product_metadata(gift.id);
        let product_id = self
            .gateway
            .create_product(&gift.name, product_metadata)
            .await?;

        let price_id = self
            .gateway
            .create_price(&product_id, unit_amount_minor, &self.currency)
            .await?;

        self.gateway
            .create_checkout_session(CheckoutSessionRequest {
                price_id: &price_id,
                destination_account,
                application_fee_minor: fee_minor,
                return_url,
                metadata,
            })
            .await
    }
}

/// Products are tagged with the gift they fund, for traceability in the
/// processor's dashboard.
fn product_metadata(gift_id: Uuid) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("gift_id".to_string(), gift_id.to_string());
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FeePolicy {
        FeePolicy {
            version: 1,
            percent: 0.10,
            fixed: 5.0,
        }
    }

    #[test]
    fn fee_for_one_krona() {
        // (1 * 0.10 + 5) * 100 = 510
        assert_eq!(application_fee_minor(1.0, &policy()), 510);
    }

    #[test]
    fn fee_for_fifty() {
        assert_eq!(application_fee_minor(50.0, &policy()), 1000);
    }

    #[test]
    fn fee_rounds_half_away_from_zero() {
        // (99.99 * 0.10 + 5) * 100 = 1499.9 -> 1500
        assert_eq!(application_fee_minor(99.99, &policy()), 1500);
    }

    #[test]
    fn fee_for_one_thousand() {
        assert_eq!(application_fee_minor(1000.0, &policy()), 10500);
    }

    #[test]
    fn line_item_prices_in_minor_units() {
        assert_eq!(to_minor_units(600.0), 60000);
        assert_eq!(to_minor_units(99.99), 9999);
    }
}
