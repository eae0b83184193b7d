use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CheckoutSessionUiMode, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionPaymentIntentData,
    CreateCheckoutSessionPaymentIntentDataTransferData, CreatePrice, CreateProduct, Currency,
    EventObject, EventType, IdOrCreate, Price, Product, Webhook, WebhookError,
};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    payments::{CardSession, CheckoutSessionRequest, PaymentGateway},
};

/// Stripe-backed gateway. Every call runs under a bounded timeout and fails
/// closed: a timed-out session creation is never retried here because the
/// first attempt may still have created billable objects; we log it for
/// manual reconciliation and the caller issues a fresh request.
pub struct StripeGateway {
    client: Client,
    timeout: Duration,
}

impl StripeGateway {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(api_key),
            timeout,
        }
    }

    async fn bounded<T, F>(&self, what: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, stripe::StripeError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::PaymentProvider(format!("{} failed: {}", what, e))),
            Err(_) => {
                tracing::error!(
                    call = what,
                    timeout_secs = self.timeout.as_secs(),
                    "Stripe call timed out; fate of the request is unknown, \
                     flagging for manual reconciliation"
                );
                Err(AppError::PaymentProvider(format!("{} timed out", what)))
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_product(
        &self,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        let mut params = CreateProduct::new(name);
        params.metadata = Some(metadata);

        let product = self
            .bounded("product creation", Product::create(&self.client, params))
            .await?;

        Ok(product.id.to_string())
    }

    async fn create_price(
        &self,
        product_id: &str,
        unit_amount_minor: i64,
        currency: &str,
    ) -> Result<String> {
        let mut params = CreatePrice::new(parse_currency(currency)?);
        params.product = Some(IdOrCreate::Id(product_id));
        params.unit_amount = Some(unit_amount_minor);

        let price = self
            .bounded("price creation", Price::create(&self.client, params))
            .await?;

        Ok(price.id.to_string())
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest<'_>,
    ) -> Result<CardSession> {
        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.ui_mode = Some(CheckoutSessionUiMode::Embedded);
        params.return_url = Some(request.return_url);

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(request.price_id.to_string()),
            quantity: Some(1),
            ..Default::default()
        }]);

        // Destination charge: funds settle on the couple's connected
        // account, minus the platform fee.
        params.payment_intent_data = Some(CreateCheckoutSessionPaymentIntentData {
            application_fee_amount: Some(request.application_fee_minor),
            transfer_data: Some(CreateCheckoutSessionPaymentIntentDataTransferData {
                amount: None,
                destination: request.destination_account.to_string(),
            }),
            ..Default::default()
        });

        params.metadata = Some(request.metadata);

        let session = self
            .bounded(
                "checkout session creation",
                CheckoutSession::create(&self.client, params),
            )
            .await?;

        let client_secret = session.client_secret.ok_or_else(|| {
            AppError::PaymentProvider("Checkout session has no client secret".to_string())
        })?;

        Ok(CardSession {
            session_id: session.id.to_string(),
            client_secret,
        })
    }
}

fn parse_currency(code: &str) -> Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.to_lowercase()))
        .map_err(|_| AppError::Internal(format!("Unsupported currency: {}", code)))
}

/// A confirmed card payment, reconstructed from the checkout session the
/// processor reports as completed.
#[derive(Debug, Clone)]
pub struct CardConfirmation {
    pub session_id: String,
    pub wedding_id: Uuid,
    pub gift_id: Uuid,
    pub amount: f64,
    pub donor_name: Option<String>,
    pub message: Option<String>,
    pub donor_contact: Option<String>,
}

/// Verifies a webhook payload and extracts the confirmation, if any. Only
/// `checkout.session.completed` drives the recording of a contribution;
/// session creation alone never does.
pub fn parse_confirmation(
    payload: &str,
    signature: &str,
    webhook_secret: &str,
) -> Result<Option<CardConfirmation>> {
    let event =
        Webhook::construct_event(payload, signature, webhook_secret).map_err(|e| match e {
            WebhookError::BadSignature => AppError::BadRequest("Invalid signature".to_string()),
            _ => AppError::PaymentProvider(format!("Webhook error: {}", e)),
        })?;

    match event.type_ {
        EventType::CheckoutSessionCompleted => {
            if let EventObject::CheckoutSession(session) = event.data.object {
                return confirmation_from_session(session);
            }
            Ok(None)
        }
        other => {
            tracing::debug!("Unhandled webhook event type: {:?}", other);
            Ok(None)
        }
    }
}

fn confirmation_from_session(session: CheckoutSession) -> Result<Option<CardConfirmation>> {
    let session_id = session.id.to_string();
    let metadata = session.metadata.unwrap_or_default();

    let (Some(wedding_id), Some(gift_id), Some(amount)) = (
        metadata.get("wedding_id"),
        metadata.get("gift_id"),
        metadata.get("amount"),
    ) else {
        // A session created outside the contribution flow; nothing to do.
        tracing::warn!(%session_id, "Completed session without contribution metadata");
        return Ok(None);
    };

    let wedding_id = Uuid::parse_str(wedding_id)
        .map_err(|_| AppError::BadRequest("Malformed wedding_id in session metadata".to_string()))?;
    let gift_id = Uuid::parse_str(gift_id)
        .map_err(|_| AppError::BadRequest("Malformed gift_id in session metadata".to_string()))?;
    let amount: f64 = amount
        .parse()
        .map_err(|_| AppError::BadRequest("Malformed amount in session metadata".to_string()))?;

    Ok(Some(CardConfirmation {
        session_id,
        wedding_id,
        gift_id,
        amount,
        donor_name: metadata.get("donor_name").cloned(),
        message: metadata.get("message").cloned(),
        donor_contact: metadata.get("donor_contact").cloned(),
    }))
}
