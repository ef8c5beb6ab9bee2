use academy_api::{auth::JwtKeys, create_router, AppConfig, AppState};
use academy_core::testing::{FakeGateway, MemoryStore, RecordingNotifier};
use academy_core::{CardSummary, PaymentStatus};
use academy_stripe::signature_header;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const WEBHOOK_SECRET: &str = "whsec_test_secret";

struct TestApp {
    server: TestServer,
    store: Arc<MemoryStore>,
    gateway: Arc<FakeGateway>,
    notifier: Arc<RecordingNotifier>,
}

fn config(extra: &[(&str, &str)]) -> AppConfig {
    let mut env: HashMap<String, String> = [
        ("DATABASE_URL", "postgres://unused/academy"),
        ("JWT_SECRET", "integration-secret"),
        ("STRIPE_SECRET_KEY", "sk_test_integration"),
        ("APP_NAME", "academy-test"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    AppConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
}

fn app_with(extra: &[(&str, &str)]) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(FakeGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let state = AppState::new(
        config(extra),
        store.clone(),
        gateway.clone(),
        notifier.clone(),
    );
    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        store,
        gateway,
        notifier,
    }
}

fn app() -> TestApp {
    app_with(&[])
}

async fn register(app: &TestApp, email: &str, password: &str) -> String {
    let response = app
        .server
        .post("/users")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_str().unwrap().to_string()
}

async fn signin(app: &TestApp, email: &str, password: &str) -> String {
    let response = app
        .server
        .post("/signin")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["token"].as_str().unwrap().to_string()
}

async fn authorize(app: &TestApp, token: &str, user_id: &str, amount: i64) -> (StatusCode, Value) {
    let response = app
        .server
        .post(&format!("/users/{}/cards/pm_card_visa/authorize", user_id))
        .authorization_bearer(token)
        .json(&json!({ "amount": amount, "currency": "usd", "description": "Rust course" }))
        .await;
    (response.status_code(), response.json::<Value>())
}

fn event_body(event_type: &str, intent_id: &str, status: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_1",
        "type": event_type,
        "created": 1_700_000_000,
        "data": { "object": {
            "id": intent_id,
            "object": "payment_intent",
            "status": status,
            "amount": 5000,
            "currency": "usd"
        }}
    }))
    .unwrap()
}

#[tokio::test]
async fn health_reports_service_name() {
    let app = app();
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["service"], "academy-test");
}

#[tokio::test]
async fn register_signin_and_fetch_profile() {
    let app = app();
    let id = register(&app, "ada@example.com", "hunter2").await;
    assert_eq!(id, "1");
    assert_eq!(app.notifier.sent(), vec!["ada@example.com".to_string()]);

    let token = signin(&app, "ada@example.com", "hunter2").await;

    let response = app
        .server
        .get("/users/1")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let user = response.json::<Value>();
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["customer_id"], "cus_test_1");
    assert!(user.get("password_hash").is_none());
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    register(&app, "ada@example.com", "hunter2").await;

    let response = app
        .server
        .post("/users")
        .json(&json!({ "email": " ada@example.com ", "password": "other" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], 409);
}

#[tokio::test]
async fn registration_losing_insert_race_conflicts() {
    let app = app();
    register(&app, "ada@example.com", "hunter2").await;
    // the duplicate lookup misses, so only the unique insert catches it
    app.store.blind_email_lookups();

    let response = app
        .server
        .post("/users")
        .json(&json!({ "email": "ada@example.com", "password": "other" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], 409);
    assert_eq!(app.store.user_count(), 1);
    assert_eq!(app.gateway.customer_count(), 2);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn registration_validates_body() {
    let app = app();

    let response = app
        .server
        .post("/users")
        .json(&json!({ "email": "", "password": "x" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/users")
        .content_type("application/json")
        .text("{not json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], 400);
}

#[tokio::test]
async fn failing_welcome_mail_is_server_error_but_user_exists() {
    let app = app();
    app.notifier.set_failing(true);

    let response = app
        .server
        .post("/users")
        .json(&json!({ "email": "ada@example.com", "password": "hunter2" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    signin(&app, "ada@example.com", "hunter2").await;
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_unauthorized() {
    let app = app();
    register(&app, "ada@example.com", "hunter2").await;

    for (email, password) in [("ada@example.com", "wrong"), ("nobody@example.com", "x")] {
        let response = app
            .server
            .post("/signin")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn protected_routes_reject_bad_tokens() {
    let app = app();
    register(&app, "ada@example.com", "hunter2").await;

    app.server.get("/users/1").await.assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .get("/users/1")
        .authorization_bearer("not-a-jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let keys = JwtKeys::new("integration-secret", chrono::Duration::minutes(5));
    let expired = keys
        .sign_at(1, "ada@example.com", chrono::Utc::now() - chrono::Duration::minutes(6))
        .unwrap();
    let response = app
        .server
        .get("/users/1")
        .authorization_bearer(&expired)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], 401);
}

#[tokio::test]
async fn catalog_routes() {
    let app = app();
    let course = app.store.insert_course("Rust", "Systems programming", "rust.png");
    app.store.insert_training(course, 2, "Ownership", false);
    app.store.insert_training(course, 1, "Hello", true);

    let courses = app.server.get("/courses").await.json::<Value>();
    assert_eq!(courses.as_array().unwrap().len(), 1);

    let trainings = app
        .server
        .get(&format!("/courses/{}/trainings", course))
        .await
        .json::<Value>();
    let names: Vec<&str> = trainings
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Hello", "Ownership"]);

    app.server.get("/trainings/1").await.assert_status_ok();
}

#[tokio::test]
async fn missing_course_is_not_found_with_error_body() {
    let app = app();
    let response = app.server.get("/courses/42").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.json::<Value>();
    assert_eq!(body["code"], 404);
    assert!(body["error"].as_str().unwrap().contains("course"));
    assert!(body.get("name").is_none());

    app.server
        .get("/courses/abc")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn card_setup_add_get_and_list() {
    let app = app();
    let user_id = register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;

    let response = app
        .server
        .post(&format!("/users/{}/card", user_id))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::CREATED);
    let setup = response.json::<Value>();
    assert_eq!(setup["ephemeral_key_id"], "ephkey_cus_test_1");
    assert_eq!(setup["intent_client_secret"], "seti_cus_test_1_secret");

    let response = app
        .server
        .post(&format!("/users/{}/cards", user_id))
        .authorization_bearer(&token)
        .json(&json!({ "payment_method_id": "pm_card_visa" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let card_id = response.json::<Value>()["id"].as_i64().unwrap();

    let card = app
        .server
        .get(&format!("/cards/{}", card_id))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(card["user_id"], 1);
    assert_eq!(card["payment_method_id"], "pm_card_visa");

    app.gateway.add_card(
        "cus_test_1",
        CardSummary {
            id: "pm_card_visa".into(),
            brand: "visa".into(),
            last_four: "4242".into(),
            exp_month: 12,
            exp_year: 2030,
        },
    );
    let cards = app
        .server
        .get(&format!("/users/{}/cards", user_id))
        .await
        .json::<Value>();
    assert_eq!(cards[0]["last_four"], "4242");
}

#[tokio::test]
async fn adding_card_for_missing_user_is_not_found() {
    let app = app();
    register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;

    app.server
        .post("/users/99/cards")
        .authorization_bearer(&token)
        .json(&json!({ "payment_method_id": "pm_card_visa" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn authorize_then_capture() {
    let app = app_with(&[("PLATFORM_FEE_DESTINATION", "acct_instructor")]);
    let user_id = register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;

    let (status, body) = authorize(&app, &token, &user_id, 5000).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["payment_id"], "pi_test_1");
    assert_eq!(body["client_secret"], "pi_test_1_secret");
    assert_eq!(app.gateway.created_intents()[0].application_fee_amount, Some(1000));

    let response = app
        .server
        .post("/payment/pi_test_1/capture")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "succeeded");

    // already captured
    app.server
        .post("/payment/pi_test_1/capture")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let payment = app
        .server
        .get("/payment/pi_test_1")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(payment["status"], "succeeded");
    assert_eq!(payment["amount"], 5000);
}

#[tokio::test]
async fn partial_capture_and_bad_amounts() {
    let app = app();
    let user_id = register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;

    let (status, _) = authorize(&app, &token, &user_id, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = authorize(&app, &token, &user_id, 5000).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    app.server
        .post("/payment/pi_test_1/capture")
        .authorization_bearer(&token)
        .json(&json!({ "amount": 9000 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/payment/pi_test_1/capture")
        .authorization_bearer(&token)
        .json(&json!({ "amount": 2500 }))
        .await
        .assert_status_ok();
    assert_eq!(app.gateway.captures(), vec![("pi_test_1".to_string(), 2500)]);
}

#[tokio::test]
async fn authorize_requiring_action_answers_bad_request_with_secret() {
    let app = app();
    app.gateway.set_authorize_status(PaymentStatus::RequiresAction);
    let user_id = register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;

    let (status, body) = authorize(&app, &token, &user_id, 5000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["client_secret"], "pi_test_1_secret");
    assert_eq!(body["status"], "requires_action");
    assert_eq!(app.store.payment_count(), 1);
}

#[tokio::test]
async fn oversized_authorize_amount_is_bad_request() {
    let app = app_with(&[("PLATFORM_FEE_DESTINATION", "acct_1")]);
    let user_id = register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;

    let (status, body) = authorize(&app, &token, &user_id, i64::MAX).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(app.gateway.created_intents().is_empty());
    assert_eq!(app.store.payment_count(), 0);
}

#[tokio::test]
async fn gateway_outage_during_registration_creates_no_user() {
    let app = app();
    app.gateway.set_unavailable(true);

    let response = app
        .server
        .post("/users")
        .json(&json!({ "email": "ada@example.com", "password": "hunter2" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["code"], 500);
    assert_eq!(app.store.user_count(), 0);
    assert!(app.notifier.sent().is_empty());

    app.gateway.set_unavailable(false);
    assert_eq!(register(&app, "ada@example.com", "hunter2").await, "1");
}

#[tokio::test]
async fn gateway_outage_is_server_error_for_card_and_payment_routes() {
    let app = app();
    let user_id = register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;
    let (status, _) = authorize(&app, &token, &user_id, 5000).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    app.gateway.set_unavailable(true);

    let response = app
        .server
        .post(&format!("/users/{}/card", user_id))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["code"], 500);

    let (status, body) = authorize(&app, &token, &user_id, 2000).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
    assert_eq!(app.store.payment_count(), 1);

    let response = app
        .server
        .post("/payment/pi_test_1/capture")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["code"], 500);

    app.gateway.set_unavailable(false);
    let payment = app
        .server
        .get("/payment/pi_test_1")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(payment["status"], "requires_capture");
    assert!(app.gateway.captures().is_empty());
}

#[tokio::test]
async fn capture_unknown_payment_is_not_found() {
    let app = app();
    register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;

    app.server
        .post("/payment/pi_missing/capture")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signed_webhook_is_applied_idempotently() {
    let app = app_with(&[("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET)]);
    let user_id = register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;
    authorize(&app, &token, &user_id, 5000).await;

    let body = event_body("payment_intent.succeeded", "pi_test_1", "succeeded");
    let signature = signature_header(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), &body);

    for _ in 0..2 {
        let response = app
            .server
            .post("/stripe/webhook")
            .add_header(
                HeaderName::from_static("stripe-signature"),
                HeaderValue::from_str(&signature).unwrap(),
            )
            .bytes(body.clone().into())
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["handled"], true);
    }

    let payment = app
        .server
        .get("/payment/pi_test_1")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(payment["status"], "succeeded");
}

#[tokio::test]
async fn webhook_signature_is_enforced_when_configured() {
    let app = app_with(&[("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET)]);
    let body = event_body("payment_intent.succeeded", "pi_test_1", "succeeded");

    app.server
        .post("/stripe/webhook")
        .bytes(body.clone().into())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let forged = signature_header("whsec_other", chrono::Utc::now().timestamp(), &body);
    app.server
        .post("/stripe/webhook")
        .add_header(
            HeaderName::from_static("stripe-signature"),
            HeaderValue::from_str(&forged).unwrap(),
        )
        .bytes(body.into())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unsigned_webhook_cases_without_secret() {
    let app = app();
    let user_id = register(&app, "ada@example.com", "hunter2").await;
    let token = signin(&app, "ada@example.com", "hunter2").await;
    authorize(&app, &token, &user_id, 5000).await;

    // unknown event types are acknowledged
    let response = app
        .server
        .post("/stripe/webhook")
        .bytes(event_body("customer.created", "cus_1", "succeeded").into())
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["handled"], false);

    // failure event
    app.server
        .post("/stripe/webhook")
        .bytes(event_body("payment_intent.payment_failed", "pi_test_1", "requires_payment_method").into())
        .await
        .assert_status_ok();
    let payment = app
        .server
        .get("/payment/pi_test_1")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(payment["status"], "failed");

    // unknown payment
    app.server
        .post("/stripe/webhook")
        .bytes(event_body("payment_intent.captured", "pi_missing", "succeeded").into())
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // garbage
    app.server
        .post("/stripe/webhook")
        .bytes("not json".into())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_webhook_is_rejected() {
    let app = app();
    let body = vec![b' '; 70 * 1024];
    app.server
        .post("/stripe/webhook")
        .bytes(body.into())
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}
