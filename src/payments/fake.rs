//! In-memory payment gateway for tests. Records every call so tests can
//! assert on ordering and arguments, and can be told to fail a given call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    error::{AppError, Result},
    payments::{CardSession, CheckoutSessionRequest, PaymentGateway},
};

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Product {
        name: String,
        metadata: HashMap<String, String>,
    },
    Price {
        product_id: String,
        unit_amount_minor: i64,
        currency: String,
    },
    Session {
        price_id: String,
        destination_account: String,
        application_fee_minor: i64,
        return_url: String,
        metadata: HashMap<String, String>,
    },
}

#[derive(Default)]
pub struct FakePaymentGateway {
    calls: Mutex<Vec<GatewayCall>>,
    counter: AtomicU64,
    fail_next: Mutex<Option<String>>,
}

impl FakePaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next gateway call fail with the given provider message.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn check_failure(&self) -> Result<()> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(AppError::PaymentProvider(message));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}_test_{}", prefix, n)
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn create_product(
        &self,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        self.check_failure()?;
        self.calls.lock().unwrap().push(GatewayCall::Product {
            name: name.to_string(),
            metadata,
        });
        Ok(self.next_id("prod"))
    }

    async fn create_price(
        &self,
        product_id: &str,
        unit_amount_minor: i64,
        currency: &str,
    ) -> Result<String> {
        self.check_failure()?;
        self.calls.lock().unwrap().push(GatewayCall::Price {
            product_id: product_id.to_string(),
            unit_amount_minor,
            currency: currency.to_string(),
        });
        Ok(self.next_id("price"))
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest<'_>,
    ) -> Result<CardSession> {
        self.check_failure()?;
        self.calls.lock().unwrap().push(GatewayCall::Session {
            price_id: request.price_id.to_string(),
            destination_account: request.destination_account.to_string(),
            application_fee_minor: request.application_fee_minor,
            return_url: request.return_url.to_string(),
            metadata: request.metadata,
        });
        let session_id = self.next_id("cs");
        let client_secret = format!("{}_secret", session_id);
        Ok(CardSession {
            session_id,
            client_secret,
        })
    }
}
