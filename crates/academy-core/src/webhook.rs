//! # Webhook Events
//!
//! Provider-neutral form of the asynchronous notifications the payment
//! processor delivers about payment intents.

use crate::gateway::PaymentIntent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Webhook event types the backend reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Intent succeeded (funds captured)
    PaymentSucceeded,
    /// Intent captured
    PaymentCaptured,
    /// Charge attempt failed
    PaymentFailed,
    /// Anything else (acknowledged, not acted on)
    Unknown(String),
}

/// A parsed webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from provider
    pub event_id: String,

    pub event_type: WebhookEventType,

    /// Intent carried in the event payload, when the event is about one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<PaymentIntent>,

    pub created: DateTime<Utc>,
}

impl WebhookEvent {
    /// True for events that update a local payment
    pub fn is_payment_event(&self) -> bool {
        !matches!(self.event_type, WebhookEventType::Unknown(_))
    }
}
