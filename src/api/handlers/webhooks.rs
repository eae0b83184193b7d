use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::{
    api::state::AppState,
    error::{AppError, Result},
    payments::stripe_client,
};

/// Confirmation signal for the card rail. A contribution is recorded only
/// when the processor reports `checkout.session.completed`; session
/// creation alone never records anything.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode> {
    let webhook_secret = state
        .settings
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or_else(|| {
            AppError::PaymentProvider("Stripe webhook secret is not configured".to_string())
        })?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    let Some(confirmation) = stripe_client::parse_confirmation(&body, signature, webhook_secret)?
    else {
        return Ok(StatusCode::OK);
    };

    let outcome = state
        .service_context
        .contribution_service
        .confirm_card_payment(confirmation)
        .await?;

    if !outcome.gift_updated {
        // The contribution is durable, so we still acknowledge the event;
        // retrying the webhook would not repair the gift total, the
        // reconcile endpoint does.
        tracing::warn!(
            contribution_id = %outcome.contribution.id,
            "Card contribution recorded but gift total is stale"
        );
    }

    Ok(StatusCode::OK)
}
