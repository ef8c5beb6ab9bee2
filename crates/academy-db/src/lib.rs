//! # academy-db
//!
//! PostgreSQL implementation of [`academy_core::Store`].
//!
//! Schema lives in `migrations/` and is applied by the `academy-migrate`
//! binary (or [`PgStore::migrate`]).
//!
//! ```rust,ignore
//! use academy_db::PgStore;
//!
//! let store = PgStore::connect(&database_url, 10).await?;
//! store.migrate().await?;
//! ```

mod rows;
pub mod store;

pub use store::PgStore;
