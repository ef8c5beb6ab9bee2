//! Row shapes as stored in PostgreSQL and their conversion into domain
//! records.

use academy_core::{AcademyResult, Card, Course, Payment, Training, User};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            customer_id: row.stripe_customer_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CourseRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub logo_url: String,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            name: row.name,
            description: row.description,
            logo_url: row.logo_url,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TrainingRow {
    pub id: i64,
    pub course_id: i64,
    pub sequence: i32,
    pub topic: String,
    pub name: String,
    pub url: String,
    pub is_free: bool,
    pub project_url: Option<String>,
}

impl From<TrainingRow> for Training {
    fn from(row: TrainingRow) -> Self {
        Training {
            id: row.id,
            course_id: row.course_id,
            sequence: row.sequence,
            topic: row.topic,
            name: row.name,
            url: row.url,
            is_free: row.is_free,
            project_url: row.project_url,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CardRow {
    pub id: i64,
    pub user_id: i64,
    pub payment_method_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<CardRow> for Card {
    fn from(row: CardRow) -> Self {
        Card {
            id: row.id,
            user_id: row.user_id,
            payment_method_id: row.payment_method_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PaymentRow {
    pub id: i64,
    pub payment_intent_id: String,
    pub payment_method_id: String,
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRow {
    /// Fails when the stored status is not a known payment status.
    pub fn into_payment(self) -> AcademyResult<Payment> {
        Ok(Payment {
            id: self.id,
            payment_intent_id: self.payment_intent_id,
            payment_method_id: self.payment_method_id,
            user_id: self.user_id,
            amount: self.amount,
            currency: self.currency,
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::PaymentStatus;

    fn payment_row(status: &str) -> PaymentRow {
        PaymentRow {
            id: 1,
            payment_intent_id: "pi_1".into(),
            payment_method_id: "pm_1".into(),
            user_id: 1,
            amount: 5000,
            currency: "usd".into(),
            status: status.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_payment_row_status() {
        let payment = payment_row("requires_capture").into_payment().unwrap();
        assert_eq!(payment.status, PaymentStatus::RequiresCapture);
        assert!(payment_row("bogus").into_payment().is_err());
    }

    #[test]
    fn test_user_row_maps_customer_id() {
        let user: User = UserRow {
            id: 3,
            email: "ada@example.com".into(),
            password_hash: "hash".into(),
            stripe_customer_id: Some("cus_1".into()),
            created_at: Utc::now(),
        }
        .into();
        assert_eq!(user.customer_id.as_deref(), Some("cus_1"));
    }
}
