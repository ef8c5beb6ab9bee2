//! # Test Doubles
//!
//! In-memory implementations of [`Store`], [`PaymentGateway`] and
//! [`Notifier`] for unit and integration tests. Enabled with the
//! `test-util` feature.

use crate::error::{AcademyError, AcademyResult};
use crate::gateway::{EphemeralKey, PaymentGateway, PaymentIntent, PaymentIntentParams, SetupIntent};
use crate::model::{
    Card, CardSummary, Course, NewPayment, NewUser, Payment, PaymentStatus, Training, User,
};
use crate::notify::Notifier;
use crate::store::Store;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// =============================================================================
// Store
// =============================================================================

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    courses: Vec<Course>,
    trainings: Vec<Training>,
    cards: Vec<Card>,
    payments: Vec<Payment>,
}

/// [`Store`] backed by vectors behind a mutex
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_payment_insert: AtomicBool,
    blind_email_lookup: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a course; returns its id
    pub fn insert_course(&self, name: &str, description: &str, logo_url: &str) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.courses.len() as i64 + 1;
        t.courses.push(Course {
            id,
            name: name.to_string(),
            description: description.to_string(),
            logo_url: logo_url.to_string(),
        });
        id
    }

    /// Seed a training for `course_id`; returns its id
    pub fn insert_training(&self, course_id: i64, sequence: i32, name: &str, is_free: bool) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.trainings.len() as i64 + 1;
        t.trainings.push(Training {
            id,
            course_id,
            sequence,
            topic: "basics".to_string(),
            name: name.to_string(),
            url: format!("https://videos.example.com/{}", id),
            is_free,
            project_url: None,
        });
        id
    }

    /// Make every following `add_payment` fail with a database error
    pub fn fail_payment_inserts(&self) {
        self.fail_payment_insert.store(true, Ordering::SeqCst);
    }

    /// Make `find_user_by_email` miss every user, as a lookup racing a
    /// concurrent insert would
    pub fn blind_email_lookups(&self) {
        self.blind_email_lookup.store(true, Ordering::SeqCst);
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn payment_count(&self) -> usize {
        self.tables.lock().unwrap().payments.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AcademyResult<User> {
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(AcademyError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }
        let created = User {
            id: t.users.len() as i64 + 1,
            email: user.email,
            password_hash: user.password_hash,
            customer_id: user.customer_id,
            created_at: Utc::now(),
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> AcademyResult<User> {
        let t = self.tables.lock().unwrap();
        t.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| AcademyError::not_found("user", id))
    }

    async fn find_user_by_email(&self, email: &str) -> AcademyResult<Option<User>> {
        if self.blind_email_lookup.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_courses(&self) -> AcademyResult<Vec<Course>> {
        Ok(self.tables.lock().unwrap().courses.clone())
    }

    async fn get_course(&self, id: i64) -> AcademyResult<Course> {
        let t = self.tables.lock().unwrap();
        t.courses
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AcademyError::not_found("course", id))
    }

    async fn list_trainings(&self, course_id: i64) -> AcademyResult<Vec<Training>> {
        let t = self.tables.lock().unwrap();
        if !t.courses.iter().any(|c| c.id == course_id) {
            return Err(AcademyError::not_found("course", course_id));
        }
        let mut trainings: Vec<Training> = t
            .trainings
            .iter()
            .filter(|tr| tr.course_id == course_id)
            .cloned()
            .collect();
        trainings.sort_by_key(|tr| tr.sequence);
        Ok(trainings)
    }

    async fn get_training(&self, id: i64) -> AcademyResult<Training> {
        let t = self.tables.lock().unwrap();
        t.trainings
            .iter()
            .find(|tr| tr.id == id)
            .cloned()
            .ok_or_else(|| AcademyError::not_found("training", id))
    }

    async fn add_card(&self, user_id: i64, payment_method_id: &str) -> AcademyResult<Card> {
        let mut t = self.tables.lock().unwrap();
        if !t.users.iter().any(|u| u.id == user_id) {
            return Err(AcademyError::not_found("user", user_id));
        }
        let card = Card {
            id: t.cards.len() as i64 + 1,
            user_id,
            payment_method_id: payment_method_id.to_string(),
            created_at: Utc::now(),
        };
        t.cards.push(card.clone());
        Ok(card)
    }

    async fn get_card(&self, id: i64) -> AcademyResult<Card> {
        let t = self.tables.lock().unwrap();
        t.cards
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AcademyError::not_found("card", id))
    }

    async fn add_payment(&self, payment: NewPayment) -> AcademyResult<Payment> {
        if self.fail_payment_insert.load(Ordering::SeqCst) {
            return Err(AcademyError::Database("connection reset".to_string()));
        }
        let mut t = self.tables.lock().unwrap();
        if t
            .payments
            .iter()
            .any(|p| p.payment_intent_id == payment.payment_intent_id)
        {
            return Err(AcademyError::Conflict(format!(
                "payment intent already recorded: {}",
                payment.payment_intent_id
            )));
        }
        let now = Utc::now();
        let created = Payment {
            id: t.payments.len() as i64 + 1,
            payment_intent_id: payment.payment_intent_id,
            payment_method_id: payment.payment_method_id,
            user_id: payment.user_id,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            created_at: now,
            updated_at: now,
        };
        t.payments.push(created.clone());
        Ok(created)
    }

    async fn get_payment_by_intent(&self, payment_intent_id: &str) -> AcademyResult<Payment> {
        let t = self.tables.lock().unwrap();
        t.payments
            .iter()
            .find(|p| p.payment_intent_id == payment_intent_id)
            .cloned()
            .ok_or_else(|| AcademyError::not_found("payment", payment_intent_id))
    }

    async fn update_payment_status(
        &self,
        payment_intent_id: &str,
        status: PaymentStatus,
    ) -> AcademyResult<Payment> {
        let mut t = self.tables.lock().unwrap();
        let payment = t
            .payments
            .iter_mut()
            .find(|p| p.payment_intent_id == payment_intent_id)
            .ok_or_else(|| AcademyError::not_found("payment", payment_intent_id))?;
        payment.status = status;
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }

    async fn list_payments_by_status(
        &self,
        statuses: &[PaymentStatus],
    ) -> AcademyResult<Vec<Payment>> {
        let t = self.tables.lock().unwrap();
        Ok(t.payments
            .iter()
            .filter(|p| statuses.contains(&p.status))
            .cloned()
            .collect())
    }
}

// =============================================================================
// Gateway
// =============================================================================

#[derive(Default)]
struct GatewayState {
    intents: HashMap<String, PaymentIntent>,
    cards: HashMap<String, Vec<CardSummary>>,
    created: Vec<PaymentIntentParams>,
    cancelled: Vec<String>,
    captured: Vec<(String, i64)>,
    customers: u32,
}

/// [`PaymentGateway`] that keeps intents in memory and mimics the
/// processor's manual-capture state machine
pub struct FakeGateway {
    state: Mutex<GatewayState>,
    /// Status given to newly created intents
    authorize_status: Mutex<PaymentStatus>,
    unavailable: AtomicBool,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            state: Mutex::new(GatewayState::default()),
            authorize_status: Mutex::new(PaymentStatus::RequiresCapture),
            unavailable: AtomicBool::new(false),
        }
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status newly created intents end up in (default `requires_capture`)
    pub fn set_authorize_status(&self, status: PaymentStatus) {
        *self.authorize_status.lock().unwrap() = status;
    }

    /// Make every call fail with a provider error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Change an intent's status behind the backend's back
    pub fn set_intent_status(&self, intent_id: &str, status: PaymentStatus) {
        if let Some(intent) = self.state.lock().unwrap().intents.get_mut(intent_id) {
            intent.status = status;
        }
    }

    pub fn add_card(&self, customer_id: &str, card: CardSummary) {
        self.state
            .lock()
            .unwrap()
            .cards
            .entry(customer_id.to_string())
            .or_default()
            .push(card);
    }

    pub fn customer_count(&self) -> u32 {
        self.state.lock().unwrap().customers
    }

    pub fn created_intents(&self) -> Vec<PaymentIntentParams> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn cancelled_intents(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    pub fn captures(&self) -> Vec<(String, i64)> {
        self.state.lock().unwrap().captured.clone()
    }

    fn check_available(&self) -> AcademyResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AcademyError::Provider {
                provider: "fake".to_string(),
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn intent(&self, intent_id: &str) -> AcademyResult<PaymentIntent> {
        self.state
            .lock()
            .unwrap()
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| AcademyError::Provider {
                provider: "fake".to_string(),
                message: format!("No such payment_intent: '{}'", intent_id),
            })
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_customer(&self, _email: &str) -> AcademyResult<String> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        state.customers += 1;
        Ok(format!("cus_test_{}", state.customers))
    }

    async fn create_ephemeral_key(
        &self,
        customer_id: &str,
        _user_id: i64,
    ) -> AcademyResult<EphemeralKey> {
        self.check_available()?;
        Ok(EphemeralKey {
            id: format!("ephkey_{}", customer_id),
            secret: Some("ek_test_secret".to_string()),
        })
    }

    async fn create_setup_intent(&self, customer_id: &str) -> AcademyResult<SetupIntent> {
        self.check_available()?;
        Ok(SetupIntent {
            id: format!("seti_{}", customer_id),
            client_secret: format!("seti_{}_secret", customer_id),
        })
    }

    async fn list_cards(&self, customer_id: &str) -> AcademyResult<Vec<CardSummary>> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .cards
            .get(customer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> AcademyResult<PaymentIntent> {
        self.check_available()?;
        let status = *self.authorize_status.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        let id = format!("pi_test_{}", state.created.len() + 1);
        let intent = PaymentIntent {
            id: id.clone(),
            status,
            amount: params.amount,
            currency: params.currency.clone(),
            payment_method_id: Some(params.payment_method_id.clone()),
            customer_id: params.customer_id.clone(),
            client_secret: Some(format!("{}_secret", id)),
        };
        state.created.push(params.clone());
        state.intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, intent_id: &str) -> AcademyResult<PaymentIntent> {
        self.check_available()?;
        self.intent(intent_id)
    }

    async fn capture_payment_intent(
        &self,
        intent_id: &str,
        amount: i64,
    ) -> AcademyResult<PaymentIntent> {
        self.check_available()?;
        let current = self.intent(intent_id)?;
        if current.status != PaymentStatus::RequiresCapture {
            return Err(AcademyError::Provider {
                provider: "fake".to_string(),
                message: format!("intent {} is {}", intent_id, current.status),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.captured.push((intent_id.to_string(), amount));
        let intent = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| AcademyError::Internal("intent vanished".to_string()))?;
        intent.status = PaymentStatus::Succeeded;
        Ok(intent.clone())
    }

    async fn cancel_payment_intent(&self, intent_id: &str) -> AcademyResult<PaymentIntent> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        state.cancelled.push(intent_id.to_string());
        let intent = state.intents.get_mut(intent_id).ok_or_else(|| AcademyError::Provider {
            provider: "fake".to_string(),
            message: format!("No such payment_intent: '{}'", intent_id),
        })?;
        intent.status = PaymentStatus::Canceled;
        Ok(intent.clone())
    }
}

// =============================================================================
// Notifier
// =============================================================================

/// [`Notifier`] that records recipients and can be told to fail
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_welcome(&self, email: &str) -> AcademyResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AcademyError::Notification("mail provider rejected message".into()));
        }
        self.sent.lock().unwrap().push(email.to_string());
        Ok(())
    }
}
