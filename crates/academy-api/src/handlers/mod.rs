//! # Request Handlers
//!
//! Axum request handlers, one module per resource.

pub mod cards;
pub mod catalog;
pub mod health;
pub mod payments;
pub mod users;
pub mod webhook;

pub use cards::{add_card, get_card, list_cards, setup_card};
pub use catalog::{get_course, get_training, list_courses, list_trainings};
pub use health::health;
pub use payments::{authorize_payment, capture_payment, get_payment};
pub use users::{create_user, get_user, signin};
pub use webhook::stripe_webhook;
