//! # Application State
//!
//! Shared state for the Axum application.
//! Contains configuration, the store, the payment gateway, the notifier and
//! the signing keys.

use crate::auth::JwtKeys;
use academy_core::{
    AcademyError, AcademyResult, BoxedNotifier, BoxedPaymentGateway, BoxedStore, PaymentService,
    PlatformFee, DEFAULT_FEE_PERCENT,
};
use academy_stripe::{StripeConfig, WebhookVerifier};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Service name used in logs and /health
    pub app_name: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub stripe: StripeConfig,
    pub fee: PlatformFee,
    /// Welcome mails are only logged when unset
    pub sendgrid_api_key: Option<String>,
    pub mail_from: String,
    pub shutdown_timeout: Duration,
    /// Enables the reconciliation job
    pub reconcile_interval: Option<Duration>,
}

impl AppConfig {
    /// Load from environment variables (and `.env` if present)
    pub fn from_env() -> AcademyResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (environment, test map, ...)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AcademyResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| AcademyError::Configuration(format!("{} not set", key)))
        };

        let fee_percent = parse_or(&get, "PLATFORM_FEE_PERCENT", DEFAULT_FEE_PERCENT)?;
        let fee = PlatformFee::new(fee_percent, get("PLATFORM_FEE_DESTINATION"))?;

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 8080)?,
            app_name: get("APP_NAME").unwrap_or_else(|| "academy".to_string()),
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl: Duration::from_secs(parse_or::<u64>(&get, "JWT_TTL_MINUTES", 5)? * 60),
            stripe: StripeConfig::from_lookup(&get)?,
            fee,
            sendgrid_api_key: get("SENDGRID_API_KEY"),
            mail_from: get("MAIL_FROM").unwrap_or_else(|| "no-reply@academy.local".to_string()),
            shutdown_timeout: Duration::from_secs(parse_or(&get, "SHUTDOWN_TIMEOUT_SECS", 10)?),
            reconcile_interval: get("RECONCILE_INTERVAL_SECS")
                .map(|v| parse_value::<u64>("RECONCILE_INTERVAL_SECS", &v))
                .transpose()?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> AcademyResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AcademyError::Configuration(format!("invalid bind address: {}", e)))
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> AcademyResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AcademyError::Configuration(format!("{} has an invalid value: {}", key, value)))
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> AcademyResult<T> {
    match get(key) {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: BoxedStore,
    pub gateway: BoxedPaymentGateway,
    pub notifier: BoxedNotifier,
    pub payments: PaymentService,
    pub jwt: JwtKeys,
    pub webhooks: WebhookVerifier,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: BoxedStore,
        gateway: BoxedPaymentGateway,
        notifier: BoxedNotifier,
    ) -> Self {
        let payments = PaymentService::new(store.clone(), gateway.clone(), config.fee.clone());
        let ttl = chrono::Duration::from_std(config.jwt_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let jwt = JwtKeys::new(&config.jwt_secret, ttl);
        let webhooks = WebhookVerifier::new(config.stripe.webhook_secret.clone());

        Self {
            config: Arc::new(config),
            store,
            gateway,
            notifier,
            payments,
            jwt,
            webhooks,
        }
    }
}
