use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    domain::{Contribution, ContributionRail, FundingProgress, Gift, NewContribution},
    error::{AppError, Result},
    payments::{stripe_client::CardConfirmation, swish, CardSession, CardSessionBuilder},
    repository::{ContributionRepository, GiftRepository, PaymentSettingsRepository},
};

/// Orchestrates a contribution attempt across both rails. Recording always
/// precedes aggregation: a gift total is never incremented for a
/// contribution that was not durably written first.
pub struct ContributionService {
    gift_repo: Arc<dyn GiftRepository>,
    contribution_repo: Arc<dyn ContributionRepository>,
    settings_repo: Arc<dyn PaymentSettingsRepository>,
    card_builder: Option<CardSessionBuilder>,
}

#[derive(Debug, Clone)]
pub struct CardSessionRequest {
    pub amount: f64,
    pub return_url: String,
    pub donor_name: Option<String>,
    pub message: Option<String>,
    pub donor_contact: Option<String>,
}

/// Result of the Recorded -> Aggregated sequence. `gift_updated == false`
/// means the contribution is durable but the gift's running total is stale
/// until reconciled; the guest must still be shown success.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContributionOutcome {
    pub contribution: Contribution,
    pub gift_updated: bool,
    pub progress: Option<FundingProgress>,
}

impl ContributionService {
    pub fn new(
        gift_repo: Arc<dyn GiftRepository>,
        contribution_repo: Arc<dyn ContributionRepository>,
        settings_repo: Arc<dyn PaymentSettingsRepository>,
        card_builder: Option<CardSessionBuilder>,
    ) -> Self {
        Self {
            gift_repo,
            contribution_repo,
            settings_repo,
            card_builder,
        }
    }

    /// Card rail, step one: price the contribution and create a checkout
    /// session. No contribution exists yet; recording happens only when the
    /// processor confirms the payment via webhook.
    pub async fn create_card_session(
        &self,
        wedding_id: Uuid,
        gift_id: Uuid,
        request: CardSessionRequest,
    ) -> Result<CardSession> {
        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(AppError::Validation(
                "Amount must be a positive number".to_string(),
            ));
        }

        let builder = self.card_builder.as_ref().ok_or_else(|| {
            AppError::PaymentProvider("Card payments are not enabled on this server".to_string())
        })?;

        let gift = self.require_gift(wedding_id, gift_id).await?;

        // Without a connected payout account the platform would end up
        // holding the funds, so the session must not be created.
        let settings = self.settings_repo.find(wedding_id).await?;
        let account_id = settings
            .as_ref()
            .and_then(|s| s.card_account())
            .ok_or_else(|| {
                AppError::PayoutNotConfigured(
                    "The couple has not connected a payout account".to_string(),
                )
            })?
            .to_string();

        let metadata = session_metadata(wedding_id, gift_id, &request);

        builder
            .build(
                &gift,
                request.amount,
                &account_id,
                &request.return_url,
                metadata,
            )
            .await
    }

    /// Card rail, step two: the processor's `checkout.session.completed`
    /// webhook confirms payment, and only then is the contribution
    /// recorded and aggregated. Webhook redeliveries are idempotent.
    pub async fn confirm_card_payment(
        &self,
        confirmation: CardConfirmation,
    ) -> Result<ContributionOutcome> {
        if let Some(existing) = self
            .contribution_repo
            .find_by_session(&confirmation.session_id)
            .await?
        {
            tracing::info!(
                session_id = %confirmation.session_id,
                contribution_id = %existing.id,
                "Duplicate webhook delivery, contribution already recorded"
            );
            let progress = self
                .gift_repo
                .find(existing.wedding_id, existing.gift_id)
                .await?
                .map(|g| g.progress());
            return Ok(ContributionOutcome {
                contribution: existing,
                gift_updated: true,
                progress,
            });
        }

        let mut new = NewContribution::new(
            confirmation.wedding_id,
            confirmation.gift_id,
            confirmation.amount,
            ContributionRail::Card,
        );
        new.donor_name = confirmation.donor_name;
        new.message = confirmation.message;
        new.donor_contact = confirmation.donor_contact;
        new.checkout_session_id = Some(confirmation.session_id);

        self.record_contribution(new).await
    }

    /// Swish rail: build the deterministic payment-request code the guest's
    /// banking app scans. Pure apart from the gift and settings lookups.
    pub async fn build_swish_code(
        &self,
        wedding_id: Uuid,
        gift_id: Uuid,
        amount: f64,
        donor_name: Option<&str>,
        message: Option<&str>,
    ) -> Result<String> {
        let gift = self.require_gift(wedding_id, gift_id).await?;

        let settings = self.settings_repo.find(wedding_id).await?;
        let handle = settings
            .as_ref()
            .and_then(|s| s.swish_handle())
            .ok_or_else(|| {
                AppError::PayoutNotConfigured(
                    "The couple has not configured a Swish handle".to_string(),
                )
            })?
            .to_string();

        swish::build_payment_code(&swish::SwishRequest {
            handle: &handle,
            amount,
            gift_name: &gift.name,
            donor_name,
            message,
        })
    }

    /// Both rails converge here: record the contribution, then apply it to
    /// the gift's running total. An aggregation failure is returned as a
    /// partial success so the guest is never told a saved payment was lost;
    /// the gift's funding bar stays stale until reconciled.
    pub async fn record_contribution(&self, new: NewContribution) -> Result<ContributionOutcome> {
        if !new.amount.is_finite() || new.amount <= 0.0 {
            return Err(AppError::Validation(
                "Amount must be a positive number".to_string(),
            ));
        }

        // Reject before any side effect.
        self.require_gift(new.wedding_id, new.gift_id).await?;

        let wedding_id = new.wedding_id;
        let gift_id = new.gift_id;
        let amount = new.amount;

        let contribution = self.contribution_repo.record(new).await?;

        match self
            .gift_repo
            .apply_contribution(wedding_id, gift_id, amount)
            .await
        {
            Ok(gift) => Ok(ContributionOutcome {
                contribution,
                gift_updated: true,
                progress: Some(gift.progress()),
            }),
            Err(e) => {
                tracing::warn!(
                    contribution_id = %contribution.id,
                    %gift_id,
                    error = %e,
                    "Contribution recorded but gift total not updated; \
                     run reconciliation to repair"
                );
                Ok(ContributionOutcome {
                    contribution,
                    gift_updated: false,
                    progress: None,
                })
            }
        }
    }

    /// Idempotent repair: recompute the gift's total from its recorded
    /// contributions.
    pub async fn reconcile_gift(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<Gift> {
        self.gift_repo.recompute_totals(wedding_id, gift_id).await
    }

    async fn require_gift(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<Gift> {
        self.gift_repo
            .find(wedding_id, gift_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Gift not found: {}", gift_id)))
    }
}

fn session_metadata(
    wedding_id: Uuid,
    gift_id: Uuid,
    request: &CardSessionRequest,
) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("wedding_id".to_string(), wedding_id.to_string());
    metadata.insert("gift_id".to_string(), gift_id.to_string());
    metadata.insert("amount".to_string(), request.amount.to_string());
    if let Some(donor) = &request.donor_name {
        metadata.insert("donor_name".to_string(), donor.clone());
    }
    if let Some(message) = &request.message {
        metadata.insert("message".to_string(), message.clone());
    }
    if let Some(contact) = &request.donor_contact {
        metadata.insert("donor_contact".to_string(), contact.clone());
    }
    metadata
}
