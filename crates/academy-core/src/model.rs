//! # Domain Model
//!
//! Users, catalog entries, stored cards and payments.

use crate::error::AcademyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A registered student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// Argon2 PHC string; never leaves the process
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Payment provider customer id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`User`]
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub customer_id: Option<String>,
}

/// A catalog course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub logo_url: String,
}

/// A lesson belonging to exactly one course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Training {
    pub id: i64,
    pub course_id: i64,
    pub sequence: i32,
    pub topic: String,
    pub name: String,
    pub url: String,
    pub is_free: bool,
    pub project_url: Option<String>,
}

/// A user's stored payment method reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub user_id: i64,
    /// Opaque payment method id issued by the provider
    pub payment_method_id: String,
    pub created_at: DateTime<Utc>,
}

/// Provider-side view of a saved card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    pub id: String,
    pub brand: String,
    pub last_four: String,
    pub exp_month: u32,
    pub exp_year: u32,
}

/// Lifecycle of a payment, mirroring the provider's payment intent status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    /// Set locally when the provider reports a failed charge
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentStatus::RequiresConfirmation => "requires_confirmation",
            PaymentStatus::RequiresAction => "requires_action",
            PaymentStatus::Processing => "processing",
            PaymentStatus::RequiresCapture => "requires_capture",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }

    /// No further transition is expected from this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded | PaymentStatus::Canceled | PaymentStatus::Failed
        )
    }

    /// Statuses the reconciliation job re-checks against the provider
    pub const OPEN: &'static [PaymentStatus] = &[
        PaymentStatus::RequiresPaymentMethod,
        PaymentStatus::RequiresConfirmation,
        PaymentStatus::RequiresAction,
        PaymentStatus::Processing,
        PaymentStatus::RequiresCapture,
    ];
}

impl FromStr for PaymentStatus {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requires_payment_method" => Ok(PaymentStatus::RequiresPaymentMethod),
            "requires_confirmation" => Ok(PaymentStatus::RequiresConfirmation),
            "requires_action" => Ok(PaymentStatus::RequiresAction),
            "processing" => Ok(PaymentStatus::Processing),
            "requires_capture" => Ok(PaymentStatus::RequiresCapture),
            "canceled" => Ok(PaymentStatus::Canceled),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(AcademyError::Serialization(format!(
                "unknown payment status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local authorization/capture record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    /// Provider payment intent id; unique, used to join webhook events
    pub payment_intent_id: String,
    pub payment_method_id: String,
    pub user_id: i64,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for [`Payment`]
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_intent_id: String,
    pub payment_method_id: String,
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_strings() {
        for status in [
            PaymentStatus::RequiresPaymentMethod,
            PaymentStatus::RequiresCapture,
            PaymentStatus::Succeeded,
            PaymentStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("captured".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_payment_status_serde_matches_as_str() {
        let json = serde_json::to_string(&PaymentStatus::RequiresCapture).unwrap();
        assert_eq!(json, "\"requires_capture\"");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PaymentStatus::Succeeded.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::RequiresCapture.is_terminal());
        assert!(PaymentStatus::OPEN.iter().all(|s| !s.is_terminal()));
    }

    #[test]
    fn test_user_serialization_hides_password() {
        let user = User {
            id: 1,
            email: "a@b.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            customer_id: Some("cus_123".to_string()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "a@b.com");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }
}
