//! # Stripe Webhook Handling
//!
//! Signature verification (`Stripe-Signature: t=...,v1=...`, HMAC-SHA256
//! over `"{t}.{payload}"`) and parsing of payment intent events into
//! [`WebhookEvent`].

use crate::gateway::StripePaymentIntent;
use academy_core::{AcademyError, AcademyResult, WebhookEvent, WebhookEventType};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a signed payload
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verifies and parses incoming webhook deliveries
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Option<String>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    /// `None` disables signature checks
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn is_enforcing(&self) -> bool {
        self.secret.is_some()
    }

    /// Check the signature (when a secret is configured) and parse the event.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> AcademyResult<WebhookEvent> {
        match self.secret {
            Some(ref secret) => {
                let header = signature.ok_or_else(|| {
                    AcademyError::WebhookVerificationFailed(
                        "Missing Stripe-Signature header".to_string(),
                    )
                })?;
                verify_signature(
                    payload,
                    header,
                    secret,
                    self.tolerance_secs,
                    Utc::now().timestamp(),
                )?;
            }
            None => warn!("STRIPE_WEBHOOK_SECRET not set, accepting unsigned webhook"),
        }
        parse_event(payload)
    }
}

/// Verify a `Stripe-Signature` header against `payload` at time `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> AcademyResult<()> {
    let sig_parts = parse_signature_header(header)?;

    if (now - sig_parts.timestamp).abs() > tolerance_secs {
        return Err(AcademyError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let valid = sig_parts.signatures.iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        signed_payload_mac(secret, sig_parts.timestamp, payload)
            .verify_slice(&expected)
            .is_ok()
    });

    if !valid {
        return Err(AcademyError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }
    Ok(())
}

/// Build a valid header for `payload`, as Stripe would send it.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mac = signed_payload_mac(secret, timestamp, payload);
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

fn signed_payload_mac(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> AcademyResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        AcademyError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(AcademyError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

/// Parse a webhook body. Non payment-intent events parse to
/// [`WebhookEventType::Unknown`] without touching `data.object`.
pub fn parse_event(payload: &[u8]) -> AcademyResult<WebhookEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| AcademyError::WebhookParse(format!("Failed to parse webhook: {}", e)))?;

    debug!(event_type = %event.event_type, "parsed Stripe webhook");

    let event_type = match event.event_type.as_str() {
        "payment_intent.succeeded" => WebhookEventType::PaymentSucceeded,
        "payment_intent.captured" => WebhookEventType::PaymentCaptured,
        "payment_intent.payment_failed" => WebhookEventType::PaymentFailed,
        other => WebhookEventType::Unknown(other.to_string()),
    };

    let payment_intent = match event_type {
        WebhookEventType::Unknown(_) => None,
        _ => {
            let raw: StripePaymentIntent = serde_json::from_value(event.data.object)
                .map_err(|e| {
                    AcademyError::WebhookParse(format!("Invalid payment intent object: {}", e))
                })?;
            Some(
                raw.into_intent()
                    .map_err(|e| AcademyError::WebhookParse(e.to_string()))?,
            )
        }
    };

    Ok(WebhookEvent {
        event_id: event.id,
        event_type,
        payment_intent,
        created: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}
