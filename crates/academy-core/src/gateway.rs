//! # Payment Gateway Trait
//!
//! Boundary to the external payment processor. Card tokenization, intents
//! and capture all live on the processor side; this crate only describes the
//! calls the backend makes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentGateway (trait)                     │
//! │  ├── create_customer()         ├── create_payment_intent()  │
//! │  ├── create_ephemeral_key()    ├── retrieve_payment_intent()│
//! │  ├── create_setup_intent()     ├── capture_payment_intent() │
//! │  └── list_cards()              └── cancel_payment_intent()  │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │ StripeGateway │
//!                    └───────────────┘
//! ```

use crate::error::AcademyResult;
use crate::model::{CardSummary, PaymentStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Short-lived credential handed to a client app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralKey {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Intent used by a client app to save a card for later charges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    pub client_secret: String,
}

/// Processor-side authorization that can later be captured or cancelled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Parameters for a manually confirmed, manually captured payment intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentParams {
    pub amount: i64,
    pub currency: String,
    pub customer_id: Option<String>,
    pub payment_method_id: String,
    pub description: Option<String>,
    /// Platform fee in minor units, forwarded only with a destination
    pub application_fee_amount: Option<i64>,
    /// Connected account receiving the transfer
    pub transfer_destination: Option<String>,
    pub idempotency_key: String,
}

/// Calls the backend makes against the payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a processor customer for a newly registered user.
    /// Returns the customer id.
    async fn create_customer(&self, email: &str) -> AcademyResult<String>;

    /// Issue an ephemeral key scoped to a customer.
    async fn create_ephemeral_key(
        &self,
        customer_id: &str,
        user_id: i64,
    ) -> AcademyResult<EphemeralKey>;

    /// Start a setup intent so the client can attach a card.
    async fn create_setup_intent(&self, customer_id: &str) -> AcademyResult<SetupIntent>;

    /// List card payment methods saved for a customer.
    async fn list_cards(&self, customer_id: &str) -> AcademyResult<Vec<CardSummary>>;

    /// Create (and confirm) a manual-capture payment intent.
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> AcademyResult<PaymentIntent>;

    /// Fetch the current state of a payment intent.
    async fn retrieve_payment_intent(&self, intent_id: &str) -> AcademyResult<PaymentIntent>;

    /// Capture `amount` (minor units) of an authorized intent.
    async fn capture_payment_intent(
        &self,
        intent_id: &str,
        amount: i64,
    ) -> AcademyResult<PaymentIntent>;

    /// Release an uncaptured authorization.
    async fn cancel_payment_intent(&self, intent_id: &str) -> AcademyResult<PaymentIntent>;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
