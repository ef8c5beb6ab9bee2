//! # PostgreSQL Store
//!
//! [`Store`] over a `sqlx` connection pool.

use crate::rows::{CardRow, CourseRow, PaymentRow, TrainingRow, UserRow};
use academy_core::{
    AcademyError, AcademyResult, Card, Course, NewPayment, NewUser, Payment, PaymentStatus,
    Store, Training, User,
};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::instrument;

const USER_COLUMNS: &str = "id, email, password_hash, stripe_customer_id, created_at";
const TRAINING_COLUMNS: &str =
    "id, course_id, sequence, topic, name, url, is_free, project_url";
const PAYMENT_COLUMNS: &str = "id, payment_intent_id, payment_method_id, user_id, amount, \
     currency, status, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> AcademyResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| AcademyError::Database(format!("connect to database: {}", e)))?;
        Ok(Self { pool })
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> AcademyResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AcademyError::Database(format!("migration failed: {}", e)))
    }
}

/// Map driver errors, turning unique violations into `Conflict`.
fn db_error(e: sqlx::Error) -> AcademyError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AcademyError::Conflict(db.message().to_string())
        }
        other => AcademyError::Database(other.to_string()),
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> AcademyResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, password_hash, stripe_customer_id) \
             VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_error(e) {
            AcademyError::Conflict(_) => {
                AcademyError::Conflict(format!("email already registered: {}", user.email))
            }
            other => other,
        })?;
        Ok(row.into())
    }

    async fn get_user(&self, id: i64) -> AcademyResult<User> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(User::from)
            .ok_or_else(|| AcademyError::not_found("user", id))
    }

    async fn find_user_by_email(&self, email: &str) -> AcademyResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(User::from))
    }

    async fn list_courses(&self) -> AcademyResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(
            "SELECT id, name, description, logo_url FROM courses ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn get_course(&self, id: i64) -> AcademyResult<Course> {
        sqlx::query_as::<_, CourseRow>(
            "SELECT id, name, description, logo_url FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Course::from)
        .ok_or_else(|| AcademyError::not_found("course", id))
    }

    async fn list_trainings(&self, course_id: i64) -> AcademyResult<Vec<Training>> {
        self.get_course(course_id).await?;
        let rows = sqlx::query_as::<_, TrainingRow>(&format!(
            "SELECT {} FROM trainings WHERE course_id = $1 ORDER BY sequence, id",
            TRAINING_COLUMNS
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Training::from).collect())
    }

    async fn get_training(&self, id: i64) -> AcademyResult<Training> {
        sqlx::query_as::<_, TrainingRow>(&format!(
            "SELECT {} FROM trainings WHERE id = $1",
            TRAINING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Training::from)
        .ok_or_else(|| AcademyError::not_found("training", id))
    }

    #[instrument(skip(self))]
    async fn add_card(&self, user_id: i64, payment_method_id: &str) -> AcademyResult<Card> {
        let row = sqlx::query_as::<_, CardRow>(
            "INSERT INTO cards (user_id, payment_method_id) VALUES ($1, $2) \
             RETURNING id, user_id, payment_method_id, created_at",
        )
        .bind(user_id)
        .bind(payment_method_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AcademyError::not_found("user", user_id)
            }
            other => db_error(other),
        })?;
        Ok(row.into())
    }

    async fn get_card(&self, id: i64) -> AcademyResult<Card> {
        sqlx::query_as::<_, CardRow>(
            "SELECT id, user_id, payment_method_id, created_at FROM cards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Card::from)
        .ok_or_else(|| AcademyError::not_found("card", id))
    }

    #[instrument(skip(self, payment), fields(intent_id = %payment.payment_intent_id))]
    async fn add_payment(&self, payment: NewPayment) -> AcademyResult<Payment> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "INSERT INTO payments \
             (payment_intent_id, payment_method_id, user_id, amount, currency, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(&payment.payment_intent_id)
        .bind(&payment.payment_method_id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?
        .into_payment()
    }

    async fn get_payment_by_intent(&self, payment_intent_id: &str) -> AcademyResult<Payment> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE payment_intent_id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| AcademyError::not_found("payment", payment_intent_id))?
        .into_payment()
    }

    #[instrument(skip(self))]
    async fn update_payment_status(
        &self,
        payment_intent_id: &str,
        status: PaymentStatus,
    ) -> AcademyResult<Payment> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments SET status = $2, updated_at = NOW() \
             WHERE payment_intent_id = $1 RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(payment_intent_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| AcademyError::not_found("payment", payment_intent_id))?
        .into_payment()
    }

    async fn list_payments_by_status(
        &self,
        statuses: &[PaymentStatus],
    ) -> AcademyResult<Vec<Payment>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE status = ANY($1) ORDER BY created_at, id",
            PAYMENT_COLUMNS
        ))
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }
}
