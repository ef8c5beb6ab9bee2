//! # Stripe Gateway
//!
//! [`PaymentGateway`] over the Stripe REST API: customers, ephemeral keys,
//! setup intents, card payment methods and manual-capture payment intents.
//! Requests are form encoded, responses JSON.

use crate::config::StripeConfig;
use academy_core::{
    AcademyError, AcademyResult, CardSummary, EphemeralKey, PaymentGateway, PaymentIntent,
    PaymentIntentParams, PaymentStatus, SetupIntent,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

type Form = Vec<(String, String)>;

/// Stripe-backed payment gateway
pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> AcademyResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AcademyError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &Form,
        idempotency_key: Option<&str>,
    ) -> AcademyResult<T> {
        let mut request = self.authorized(self.client.post(self.url(path))).form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        self.send(request).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &Form) -> AcademyResult<T> {
        let request = self.authorized(self.client.get(self.url(path))).query(query);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AcademyResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AcademyError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AcademyError::Network(e.to_string()))?;

        if !status.is_success() {
            error!(%status, %body, "Stripe API error");

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AcademyError::Provider {
                    provider: PROVIDER.to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(AcademyError::Provider {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            AcademyError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

/// Form fields for a confirmed, manually captured intent
fn payment_intent_form(params: &PaymentIntentParams) -> Form {
    let mut form: Form = vec![
        ("amount".into(), params.amount.to_string()),
        ("currency".into(), params.currency.clone()),
        ("payment_method".into(), params.payment_method_id.clone()),
        ("confirm".into(), "true".into()),
        ("confirmation_method".into(), "manual".into()),
        ("capture_method".into(), "manual".into()),
    ];
    if let Some(ref customer) = params.customer_id {
        form.push(("customer".into(), customer.clone()));
    }
    if let Some(ref description) = params.description {
        form.push(("description".into(), description.clone()));
    }
    if let (Some(fee), Some(destination)) =
        (params.application_fee_amount, &params.transfer_destination)
    {
        form.push(("application_fee_amount".into(), fee.to_string()));
        form.push(("transfer_data[destination]".into(), destination.clone()));
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, email))]
    async fn create_customer(&self, email: &str) -> AcademyResult<String> {
        let form: Form = vec![("email".into(), email.to_string())];
        let customer: StripeObject = self.post_form("customers", &form, None).await?;
        info!(customer_id = %customer.id, "created Stripe customer");
        Ok(customer.id)
    }

    #[instrument(skip(self))]
    async fn create_ephemeral_key(
        &self,
        customer_id: &str,
        user_id: i64,
    ) -> AcademyResult<EphemeralKey> {
        let form: Form = vec![
            ("customer".into(), customer_id.to_string()),
            ("metadata[user_id]".into(), user_id.to_string()),
        ];
        let key: StripeEphemeralKey = self.post_form("ephemeral_keys", &form, None).await?;
        Ok(EphemeralKey {
            id: key.id,
            secret: key.secret,
        })
    }

    #[instrument(skip(self))]
    async fn create_setup_intent(&self, customer_id: &str) -> AcademyResult<SetupIntent> {
        let form: Form = vec![("customer".into(), customer_id.to_string())];
        let intent: StripeSetupIntent = self.post_form("setup_intents", &form, None).await?;
        Ok(SetupIntent {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    #[instrument(skip(self))]
    async fn list_cards(&self, customer_id: &str) -> AcademyResult<Vec<CardSummary>> {
        let query: Form = vec![
            ("customer".into(), customer_id.to_string()),
            ("type".into(), "card".into()),
        ];
        let list: StripeList<StripePaymentMethod> = self.get("payment_methods", &query).await?;
        debug!(count = list.data.len(), "listed payment methods");

        Ok(list
            .data
            .into_iter()
            .filter_map(|pm| {
                pm.card.map(|card| CardSummary {
                    id: pm.id,
                    brand: card.brand,
                    last_four: card.last4,
                    exp_month: card.exp_month,
                    exp_year: card.exp_year,
                })
            })
            .collect())
    }

    #[instrument(skip(self, params), fields(amount = params.amount, currency = %params.currency))]
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> AcademyResult<PaymentIntent> {
        let form = payment_intent_form(params);
        let intent: StripePaymentIntent = self
            .post_form("payment_intents", &form, Some(&params.idempotency_key))
            .await?;
        intent.into_intent()
    }

    #[instrument(skip(self))]
    async fn retrieve_payment_intent(&self, intent_id: &str) -> AcademyResult<PaymentIntent> {
        let intent: StripePaymentIntent = self
            .get(&format!("payment_intents/{}", intent_id), &Form::new())
            .await?;
        intent.into_intent()
    }

    #[instrument(skip(self))]
    async fn capture_payment_intent(
        &self,
        intent_id: &str,
        amount: i64,
    ) -> AcademyResult<PaymentIntent> {
        let form: Form = vec![("amount_to_capture".into(), amount.to_string())];
        let intent: StripePaymentIntent = self
            .post_form(&format!("payment_intents/{}/capture", intent_id), &form, None)
            .await?;
        intent.into_intent()
    }

    #[instrument(skip(self))]
    async fn cancel_payment_intent(&self, intent_id: &str) -> AcademyResult<PaymentIntent> {
        let intent: StripePaymentIntent = self
            .post_form(&format!("payment_intents/{}/cancel", intent_id), &Form::new(), None)
            .await?;
        intent.into_intent()
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeEphemeralKey {
    id: String,
    #[serde(default)]
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeSetupIntent {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripePaymentMethod {
    id: String,
    #[serde(default)]
    card: Option<StripeCard>,
}

#[derive(Debug, Deserialize)]
struct StripeCard {
    brand: String,
    last4: String,
    exp_month: u32,
    exp_year: u32,
}

/// Payment intent as returned by the API and inside webhook events
#[derive(Debug, Deserialize)]
pub(crate) struct StripePaymentIntent {
    id: String,
    status: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    payment_method: Option<String>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
}

impl StripePaymentIntent {
    pub(crate) fn into_intent(self) -> AcademyResult<PaymentIntent> {
        let status: PaymentStatus = self.status.parse()?;
        Ok(PaymentIntent {
            id: self.id,
            status,
            amount: self.amount,
            currency: self.currency,
            payment_method_id: self.payment_method,
            customer_id: self.customer,
            client_secret: self.client_secret,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PaymentIntentParams {
        PaymentIntentParams {
            amount: 5000,
            currency: "usd".into(),
            customer_id: Some("cus_1".into()),
            payment_method_id: "pm_1".into(),
            description: None,
            application_fee_amount: None,
            transfer_destination: None,
            idempotency_key: "key".into(),
        }
    }

    fn has(form: &Form, key: &str, value: &str) -> bool {
        form.iter().any(|(k, v)| k == key && v == value)
    }

    #[test]
    fn test_intent_form_is_manual_capture() {
        let form = payment_intent_form(&params());
        assert!(has(&form, "confirm", "true"));
        assert!(has(&form, "confirmation_method", "manual"));
        assert!(has(&form, "capture_method", "manual"));
        assert!(has(&form, "customer", "cus_1"));
        assert!(!form.iter().any(|(k, _)| k == "application_fee_amount"));
    }

    #[test]
    fn test_intent_form_with_fee_destination() {
        let mut p = params();
        p.application_fee_amount = Some(1000);
        p.transfer_destination = Some("acct_1".into());
        let form = payment_intent_form(&p);
        assert!(has(&form, "application_fee_amount", "1000"));
        assert!(has(&form, "transfer_data[destination]", "acct_1"));
    }

    #[test]
    fn test_unknown_intent_status_is_an_error() {
        let raw: StripePaymentIntent = serde_json::from_str(
            r#"{"id":"pi_1","status":"on_fire","amount":1,"currency":"usd"}"#,
        )
        .unwrap();
        assert!(raw.into_intent().is_err());
    }
}
