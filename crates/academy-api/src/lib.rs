//! # academy-api
//!
//! HTTP API layer for the academy backend.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Bearer-token authentication (HS256 JWT)
//! - REST endpoints for accounts, catalog, cards and payments
//! - Stripe webhook endpoint
//! - SendGrid welcome emails and the payment reconciliation job
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/users` | Register |
//! | POST | `/signin` | Sign in |
//! | GET | `/users/{id}` | User profile |
//! | GET | `/courses` | List courses |
//! | GET | `/courses/{id}` | Get course |
//! | GET | `/courses/{id}/trainings` | Trainings of a course |
//! | GET | `/trainings/{id}` | Get training |
//! | POST | `/users/{id}/card` | Card setup handshake |
//! | GET | `/users/{id}/cards` | Cards saved at the gateway |
//! | POST | `/users/{id}/cards` | Save a card |
//! | GET | `/cards/{card_id}` | Get card |
//! | POST | `/users/{id}/cards/{paym_id}/authorize` | Authorize a payment |
//! | POST | `/payment/{payment_id}/capture` | Capture a payment |
//! | GET | `/payment/{payment_id}` | Get payment |
//! | POST | `/stripe/webhook` | Stripe webhook |

pub mod auth;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod mailer;
pub mod password;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
