//! # Payment Workflow
//!
//! Authorize, capture and reconcile payments against the processor while
//! keeping the local `payments` table in step.
//!
//! ```text
//!  authorize ──► requires_capture ──► capture ──► succeeded
//!                     │
//!                     └──► webhook / reconcile overwrite local status
//! ```
//!
//! Gateway and store writes are not transactional. A failed insert after
//! the intent was created cancels the intent; status drift is repaired by
//! webhooks and [`PaymentService::reconcile`].

use crate::error::{AcademyError, AcademyResult};
use crate::fee::PlatformFee;
use crate::gateway::{BoxedPaymentGateway, PaymentIntentParams};
use crate::model::{NewPayment, Payment, PaymentStatus};
use crate::store::BoxedStore;
use crate::webhook::{WebhookEvent, WebhookEventType};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Largest single charge the processor accepts, in minor units
pub const MAX_CHARGE_AMOUNT: i64 = 99_999_999;

/// Request to authorize a charge on a saved payment method
#[derive(Debug, Clone)]
pub struct AuthorizeCommand {
    pub user_id: i64,
    pub payment_method_id: String,
    /// Minor units, strictly positive
    pub amount: i64,
    /// ISO 4217 code, three letters
    pub currency: String,
    pub description: Option<String>,
}

/// Result of an authorization attempt
#[derive(Debug, Clone)]
pub struct Authorization {
    pub payment: Payment,
    pub client_secret: Option<String>,
}

impl Authorization {
    /// True when the funds are held and can be captured
    pub fn is_capturable(&self) -> bool {
        self.payment.status == PaymentStatus::RequiresCapture
    }
}

/// What a webhook event did to local state
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Updated(Payment),
    Ignored,
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct PaymentService {
    store: BoxedStore,
    gateway: BoxedPaymentGateway,
    fee: PlatformFee,
}

impl PaymentService {
    pub fn new(store: BoxedStore, gateway: BoxedPaymentGateway, fee: PlatformFee) -> Self {
        Self {
            store,
            gateway,
            fee,
        }
    }

    /// Create a manual-capture intent and record it locally.
    #[instrument(skip(self, cmd), fields(user_id = cmd.user_id, amount = cmd.amount))]
    pub async fn authorize(&self, cmd: AuthorizeCommand) -> AcademyResult<Authorization> {
        if cmd.amount <= 0 {
            return Err(AcademyError::InvalidRequest(
                "amount must be a positive number of minor units".into(),
            ));
        }
        if cmd.amount > MAX_CHARGE_AMOUNT {
            return Err(AcademyError::InvalidRequest(format!(
                "amount must not exceed {} minor units",
                MAX_CHARGE_AMOUNT
            )));
        }
        let currency = cmd.currency.trim().to_ascii_lowercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AcademyError::InvalidRequest(format!(
                "currency must be a three letter ISO code, got '{}'",
                cmd.currency
            )));
        }
        if cmd.payment_method_id.trim().is_empty() {
            return Err(AcademyError::InvalidRequest(
                "payment method id is required".into(),
            ));
        }

        let user = self.store.get_user(cmd.user_id).await?;

        let split = self.fee.split(cmd.amount);
        let params = PaymentIntentParams {
            amount: cmd.amount,
            currency: currency.clone(),
            customer_id: user.customer_id.clone(),
            payment_method_id: cmd.payment_method_id.clone(),
            description: cmd.description.clone(),
            application_fee_amount: split.map(|(fee, _)| fee),
            transfer_destination: split.map(|(_, dest)| dest.to_string()),
            idempotency_key: Uuid::new_v4().to_string(),
        };

        let intent = self.gateway.create_payment_intent(&params).await?;
        info!(intent_id = %intent.id, status = %intent.status, "payment intent created");

        let record = NewPayment {
            payment_intent_id: intent.id.clone(),
            payment_method_id: cmd.payment_method_id,
            user_id: user.id,
            amount: intent.amount,
            currency: intent.currency.clone(),
            status: intent.status,
        };

        let payment = match self.store.add_payment(record).await {
            Ok(payment) => payment,
            Err(e) => {
                error!(intent_id = %intent.id, error = %e, "failed to record payment, cancelling intent");
                if let Err(cancel_err) = self.gateway.cancel_payment_intent(&intent.id).await {
                    error!(intent_id = %intent.id, error = %cancel_err, "compensating cancel failed");
                }
                return Err(e);
            }
        };

        Ok(Authorization {
            payment,
            client_secret: intent.client_secret,
        })
    }

    /// Capture an authorized intent, in full or for `amount` minor units.
    #[instrument(skip(self))]
    pub async fn capture(&self, intent_id: &str, amount: Option<i64>) -> AcademyResult<Payment> {
        let mut payment = self.store.get_payment_by_intent(intent_id).await?;
        let intent = self.gateway.retrieve_payment_intent(intent_id).await?;

        if intent.status != payment.status {
            warn!(
                local = %payment.status,
                remote = %intent.status,
                "local payment status out of date, syncing"
            );
            payment = self
                .store
                .update_payment_status(intent_id, intent.status)
                .await?;
        }

        if intent.status != PaymentStatus::RequiresCapture {
            return Err(AcademyError::NotCapturable {
                status: intent.status,
            });
        }

        let to_capture = match amount {
            None => payment.amount,
            Some(a) if a > 0 && a <= payment.amount => a,
            Some(a) => {
                return Err(AcademyError::InvalidRequest(format!(
                    "capture amount must be within 1..={}, got {}",
                    payment.amount, a
                )))
            }
        };

        let captured = self
            .gateway
            .capture_payment_intent(intent_id, to_capture)
            .await?;
        info!(amount = to_capture, status = %captured.status, "payment captured");

        self.store
            .update_payment_status(intent_id, captured.status)
            .await
    }

    pub async fn get_payment(&self, intent_id: &str) -> AcademyResult<Payment> {
        self.store.get_payment_by_intent(intent_id).await
    }

    /// Apply a verified webhook event to the local payment it refers to.
    ///
    /// Delivering the same event twice writes the same status twice.
    #[instrument(skip(self, event), fields(event_id = %event.event_id))]
    pub async fn apply_event(&self, event: &WebhookEvent) -> AcademyResult<EventOutcome> {
        if !event.is_payment_event() {
            info!(event_type = ?event.event_type, "ignoring webhook event");
            return Ok(EventOutcome::Ignored);
        }

        let intent = event.payment_intent.as_ref().ok_or_else(|| {
            AcademyError::WebhookParse("payment event without a payment intent".into())
        })?;

        let status = match event.event_type {
            WebhookEventType::PaymentFailed => PaymentStatus::Failed,
            _ => intent.status,
        };

        // NotFound for intents this backend never recorded
        let payment = self.store.update_payment_status(&intent.id, status).await?;
        info!(intent_id = %intent.id, %status, "payment updated from webhook");
        Ok(EventOutcome::Updated(payment))
    }

    /// Overwrite the status of every open payment whose intent moved on.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> AcademyResult<ReconcileReport> {
        let open = self.store.list_payments_by_status(PaymentStatus::OPEN).await?;
        let mut report = ReconcileReport {
            checked: open.len(),
            ..Default::default()
        };

        for payment in open {
            match self
                .gateway
                .retrieve_payment_intent(&payment.payment_intent_id)
                .await
            {
                Ok(intent) if intent.status != payment.status => {
                    self.store
                        .update_payment_status(&payment.payment_intent_id, intent.status)
                        .await?;
                    info!(
                        intent_id = %payment.payment_intent_id,
                        from = %payment.status,
                        to = %intent.status,
                        "reconciled payment status"
                    );
                    report.updated += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(intent_id = %payment.payment_intent_id, error = %e, "could not fetch intent");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
