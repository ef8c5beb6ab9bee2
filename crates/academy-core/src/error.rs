//! # Error Types
//!
//! Typed error handling shared by every academy crate.
//! All fallible operations return `Result<T, AcademyError>`.

use crate::model::PaymentStatus;
use thiserror::Error;

/// Core error type for the academy backend
#[derive(Debug, Error)]
pub enum AcademyError {
    /// Configuration errors (missing keys, invalid values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed or semantically invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violated (e.g. email already registered)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Capture attempted on an intent that is not awaiting capture
    #[error("Payment intent cannot be captured in status {status}")]
    NotCapturable { status: PaymentStatus },

    /// Payment provider answered with an error
    #[error("Provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Transport error talking to an external service
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload could not be parsed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Transactional email could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AcademyError {
    /// Shorthand for [`AcademyError::NotFound`]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AcademyError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AcademyError::InvalidRequest(_) => 400,
            AcademyError::NotCapturable { .. } => 400,
            AcademyError::WebhookParse(_) => 400,
            AcademyError::Unauthorized(_) => 401,
            AcademyError::WebhookVerificationFailed(_) => 401,
            AcademyError::NotFound { .. } => 404,
            AcademyError::Conflict(_) => 409,
            AcademyError::Configuration(_)
            | AcademyError::Provider { .. }
            | AcademyError::Network(_)
            | AcademyError::Database(_)
            | AcademyError::Notification(_)
            | AcademyError::Serialization(_)
            | AcademyError::Internal(_) => 500,
        }
    }
}

/// Result type alias for academy operations
pub type AcademyResult<T> = Result<T, AcademyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AcademyError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(AcademyError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(AcademyError::not_found("course", 7).status_code(), 404);
        assert_eq!(AcademyError::Conflict("x".into()).status_code(), 409);
        assert_eq!(
            AcademyError::NotCapturable {
                status: PaymentStatus::Succeeded
            }
            .status_code(),
            400
        );
        assert_eq!(
            AcademyError::Provider {
                provider: "stripe".into(),
                message: "card_declined".into()
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = AcademyError::not_found("payment", "pi_123");
        assert_eq!(err.to_string(), "payment not found: pi_123");
    }
}
