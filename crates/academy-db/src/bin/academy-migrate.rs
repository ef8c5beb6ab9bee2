//! Apply database migrations and exit.
//!
//! ```text
//! DATABASE_URL=postgres://... academy-migrate
//! ```

use academy_db::PgStore;
use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academy_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

    let store = PgStore::connect(&database_url, 1).await?;
    store.migrate().await?;

    info!("Migrations applied");
    Ok(())
}
