//! # academy-core
//!
//! Domain types, collaborator traits and the payment workflow of the
//! academy backend.
//!
//! This crate provides:
//! - `User`, `Course`, `Training`, `Card` and `Payment` records
//! - `Store` trait for persistence
//! - `PaymentGateway` trait for the payment processor
//! - `Notifier` trait for transactional email
//! - `PaymentService` for authorize / capture / webhook / reconcile
//! - `AcademyError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use academy_core::{AuthorizeCommand, PaymentService, PlatformFee};
//!
//! let payments = PaymentService::new(store, gateway, PlatformFee::default());
//!
//! let auth = payments
//!     .authorize(AuthorizeCommand {
//!         user_id: 1,
//!         payment_method_id: "pm_card_visa".into(),
//!         amount: 5000,
//!         currency: "usd".into(),
//!         description: None,
//!     })
//!     .await?;
//!
//! if auth.is_capturable() {
//!     payments.capture(&auth.payment.payment_intent_id, None).await?;
//! }
//! ```

pub mod error;
pub mod fee;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod payments;
pub mod store;
pub mod webhook;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-exports for convenience
pub use error::{AcademyError, AcademyResult};
pub use fee::{PlatformFee, DEFAULT_FEE_PERCENT};
pub use gateway::{
    BoxedPaymentGateway, EphemeralKey, PaymentGateway, PaymentIntent, PaymentIntentParams,
    SetupIntent,
};
pub use model::{
    Card, CardSummary, Course, NewPayment, NewUser, Payment, PaymentStatus, Training, User,
};
pub use notify::{BoxedNotifier, LoggingNotifier, Notifier};
pub use payments::{
    AuthorizeCommand, Authorization, EventOutcome, PaymentService, ReconcileReport,
    MAX_CHARGE_AMOUNT,
};
pub use store::{BoxedStore, Store};
pub use webhook::{WebhookEvent, WebhookEventType};
