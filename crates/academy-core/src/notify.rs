//! # Notifications
//!
//! Transactional email sent to students.

use crate::error::AcademyResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send the welcome email after registration.
    async fn send_welcome(&self, email: &str) -> AcademyResult<()>;
}

/// Notifier that only logs (used when no mail provider is configured)
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_welcome(&self, email: &str) -> AcademyResult<()> {
        info!(%email, "welcome email not sent: no mail provider configured");
        Ok(())
    }
}

/// Type alias for a shared notifier (dynamic dispatch)
pub type BoxedNotifier = Arc<dyn Notifier>;
