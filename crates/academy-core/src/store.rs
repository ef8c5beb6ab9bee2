//! # Persistence Trait
//!
//! Narrow repository interface over the relational store. Handlers and the
//! payment workflow only see this trait, so the concrete store can be
//! swapped (PostgreSQL in production, in-memory in tests).

use crate::error::AcademyResult;
use crate::model::{Card, Course, NewPayment, NewUser, Payment, PaymentStatus, Training, User};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a user. Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> AcademyResult<User>;

    /// Look a user up by id. Fails with `NotFound`.
    async fn get_user(&self, id: i64) -> AcademyResult<User>;

    /// Look a user up by email; `None` when nobody registered it.
    async fn find_user_by_email(&self, email: &str) -> AcademyResult<Option<User>>;

    async fn list_courses(&self) -> AcademyResult<Vec<Course>>;

    /// Fails with `NotFound`.
    async fn get_course(&self, id: i64) -> AcademyResult<Course>;

    /// Trainings of a course ordered by sequence. Fails with `NotFound` for
    /// an unknown course.
    async fn list_trainings(&self, course_id: i64) -> AcademyResult<Vec<Training>>;

    /// Fails with `NotFound`.
    async fn get_training(&self, id: i64) -> AcademyResult<Training>;

    /// Attach a provider payment method to a user. Fails with `NotFound`
    /// when the user does not exist.
    async fn add_card(&self, user_id: i64, payment_method_id: &str) -> AcademyResult<Card>;

    /// Fails with `NotFound`.
    async fn get_card(&self, id: i64) -> AcademyResult<Card>;

    /// Fails with `Conflict` when the payment intent id is already recorded.
    async fn add_payment(&self, payment: NewPayment) -> AcademyResult<Payment>;

    /// Look a payment up by its provider payment intent id. Fails with
    /// `NotFound`.
    async fn get_payment_by_intent(&self, payment_intent_id: &str) -> AcademyResult<Payment>;

    /// Overwrite the status of a payment (last write wins). Fails with
    /// `NotFound`.
    async fn update_payment_status(
        &self,
        payment_intent_id: &str,
        status: PaymentStatus,
    ) -> AcademyResult<Payment>;

    /// Payments currently in any of `statuses`, oldest first.
    async fn list_payments_by_status(
        &self,
        statuses: &[PaymentStatus],
    ) -> AcademyResult<Vec<Payment>>;
}

/// Type alias for a shared store (dynamic dispatch)
pub type BoxedStore = Arc<dyn Store>;
