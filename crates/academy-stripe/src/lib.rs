//! # academy-stripe
//!
//! Stripe implementation of the academy payment gateway.
//!
//! This crate provides:
//!
//! 1. **StripeGateway** - [`academy_core::PaymentGateway`] over the REST API
//!    - customers and ephemeral keys for the mobile card flow
//!    - setup intents and card listing
//!    - manual-capture payment intents with an optional platform fee
//!
//! 2. **WebhookVerifier** - `Stripe-Signature` checking and event parsing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use academy_stripe::{StripeConfig, StripeGateway};
//! use academy_core::PaymentGateway;
//!
//! let gateway = StripeGateway::new(StripeConfig::from_env()?)?;
//! let customer_id = gateway.create_customer("ada@example.com").await?;
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use academy_stripe::WebhookVerifier;
//!
//! let verifier = WebhookVerifier::new(config.webhook_secret.clone());
//! let event = verifier.verify_and_parse(&body, signature_header)?;
//! payments.apply_event(&event).await?;
//! ```

pub mod config;
pub mod gateway;
pub mod webhook;

// Re-exports
pub use config::StripeConfig;
pub use gateway::StripeGateway;
pub use webhook::{
    parse_event, signature_header, verify_signature, WebhookVerifier, DEFAULT_TOLERANCE_SECS,
    SIGNATURE_HEADER,
};
