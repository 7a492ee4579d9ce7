//! API integration tests
//!
//! Run against a live server (database and Redis up):
//! cargo test -- --ignored

use chrono::{Duration, Utc};
use evrental_server::{
    config::AuthConfig,
    models::{Role, UserClaims},
};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

const BASE_URL: &str = "http://localhost:8080/api";

/// Sign a token with the server secret, bypassing the OTP step
fn token_for(user_id: i32, role: Role) -> String {
    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| AuthConfig::default().jwt_secret);
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("user{}@test.evrental.vn", user_id),
        user_id,
        role,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&secret)
    .expect("Failed to sign token")
}

fn admin_token() -> String {
    token_for(1, Role::Admin)
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("Not a decimal: {}", other),
    }
}

async fn post(client: &Client, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn get(client: &Client, token: &str, path: &str) -> (StatusCode, Value) {
    let response = client
        .get(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Customer id and token of a freshly registered account
async fn register_customer(client: &Client) -> (i32, String) {
    let email = format!("renter-{}@test.evrental.vn", uuid::Uuid::new_v4().simple());
    let response = client
        .post(format!("{}/Authen/register", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "secret123",
            "full_name": "Nguyen Van Test",
            "phone": "0912345678",
            "identity_number": "079201001234"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse register response");
    assert_eq!(body["role"], "RENTER");
    let id = body["id"].as_i64().expect("No id in response") as i32;
    (id, token_for(id, Role::Customer))
}

/// Station and vehicle with a 1 000 000 deposit, then a paid rental in progress.
/// Returns the rental id.
async fn rental_in_progress(client: &Client) -> i32 {
    let admin = admin_token();
    let suffix = uuid::Uuid::new_v4().simple().to_string();

    let (status, station) = post(
        client,
        &admin,
        "/station",
        json!({ "name": format!("Station {}", &suffix[..6]), "address": "1 Le Loi, District 1", "capacity": 20 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let station_id = station["id"].as_i64().unwrap();

    let (status, vehicle) = post(
        client,
        &admin,
        "/vehicle",
        json!({
            "station_id": station_id,
            "license_plate": format!("T-{}", &suffix[..8]),
            "model": "VinFast VF e34",
            "price_per_hour": 50000,
            "deposit_amount": 1000000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let vehicle_id = vehicle["id"].as_i64().unwrap();

    let (_, customer) = register_customer(client).await;
    let start = Utc::now() + Duration::hours(1);
    let (status, rental) = post(
        client,
        &customer,
        "/rental",
        json!({
            "vehicle_id": vehicle_id,
            "pickup_station_id": station_id,
            "start_time": start,
            "end_time": start + Duration::hours(3)
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rental["status"], "Booking");
    assert_eq!(decimal(&rental["total_cost"]), Decimal::from(150_000));
    assert_eq!(decimal(&rental["deposit"]["amount"]), Decimal::from(1_000_000));
    let rental_id = rental["id"].as_i64().unwrap() as i32;

    let (status, _) = post(
        client,
        &customer,
        "/payment",
        json!({ "rental_id": rental_id, "amount": 150000, "method": "Cash" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, rental) = post(client, &admin, &format!("/rental/{}/checkin", rental_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rental["status"], "InProgress");

    rental_id
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/Authen/login", BASE_URL))
        .json(&json!({
            "email": "nobody@test.evrental.vn",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
#[ignore]
async fn test_unverified_customer_must_verify_email() {
    let client = Client::new();
    let email = format!("verify-{}@test.evrental.vn", uuid::Uuid::new_v4().simple());

    let response = client
        .post(format!("{}/Authen/register", BASE_URL))
        .json(&json!({ "email": email, "password": "secret123", "full_name": "Pham Thi Verify" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/Authen/login", BASE_URL))
        .json(&json!({ "email": email, "password": "secret123" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "verification_required");
    assert!(body.get("token").is_none());
}

#[tokio::test]
#[ignore]
async fn test_register_rejects_bad_phone() {
    let client = Client::new();

    let response = client
        .post(format!("{}/Authen/register", BASE_URL))
        .json(&json!({
            "email": "phone@test.evrental.vn",
            "password": "secret123",
            "full_name": "Bad Phone",
            "phone": "12345"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/rental", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);

    let (_, customer) = register_customer(&client).await;
    let (status, _) = post(&client, &customer, "/rental/1/penalties", json!({ "amount": 1000 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_penalty_lifecycle() {
    let client = Client::new();
    let admin = admin_token();
    let rental_id = rental_in_progress(&client).await;

    // Charged straight from the deposit
    let (status, first) = post(
        &client,
        &admin,
        &format!("/rental/{}/penalties", rental_id),
        json!({ "amount": 300000, "description": "Scratched door", "use_deposit_first": true }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["status"], "OffsetFromDeposit");
    assert_eq!(decimal(&first["deposit_used_amount"]), Decimal::from(300_000));
    let first_id = first["id"].as_i64().unwrap();

    // Larger than what is left of the deposit
    let (status, second) = post(
        &client,
        &admin,
        &format!("/rental/{}/penalties", rental_id),
        json!({ "amount": 900000 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["status"], "Pending");
    let second_id = second["id"].as_i64().unwrap();

    let (status, second) = post(
        &client,
        &admin,
        &format!("/rental/penalties/{}/settle", second_id),
        json!({ "use_deposit": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "Pending");
    assert_eq!(decimal(&second["deposit_used_amount"]), Decimal::from(700_000));

    // Over-payment is refused
    let (status, _) = post(
        &client,
        &admin,
        &format!("/rental/penalties/{}/settle", second_id),
        json!({ "payment_amount": 250000, "payment_method": "Cash" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, second) = post(
        &client,
        &admin,
        &format!("/rental/penalties/{}/settle", second_id),
        json!({ "payment_amount": 200000, "payment_method": "BankTransfer" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "Settled");

    let (_, deposit) = get(&client, &admin, &format!("/rental/{}/deposit", rental_id)).await;
    assert_eq!(decimal(&deposit["used_amount"]), Decimal::from(1_000_000));

    // Settled penalties are frozen
    let response = client
        .put(format!("{}/rental/penalties/{}", BASE_URL, second_id))
        .bearer_auth(&admin)
        .json(&json!({ "amount": 100000 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Lowering the first penalty hands the difference back to the deposit
    let response = client
        .put(format!("{}/rental/penalties/{}", BASE_URL, first_id))
        .bearer_auth(&admin)
        .json(&json!({ "amount": 100000 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let first: Value = response.json().await.unwrap();
    assert_eq!(decimal(&first["deposit_used_amount"]), Decimal::from(100_000));
    assert_eq!(first["status"], "OffsetFromDeposit");

    // Deleting it credits its share back
    let response = client
        .delete(format!("{}/rental/penalties/{}", BASE_URL, first_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, deposit) = get(&client, &admin, &format!("/rental/{}/deposit", rental_id)).await;
    assert_eq!(decimal(&deposit["used_amount"]), Decimal::from(700_000));

    let response = client
        .delete(format!("{}/rental/penalties/{}", BASE_URL, first_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_early_return_penalty_requires_customer_request() {
    let client = Client::new();
    let admin = admin_token();
    let rental_id = rental_in_progress(&client).await;

    let (_, catalog) = get(&client, &admin, "/penalty").await;
    let early_return_id = catalog
        .as_array()
        .expect("catalog list")
        .iter()
        .find(|p| p["violation_type"] == "EarlyReturn")
        .and_then(|p| p["id"].as_i64())
        .expect("EarlyReturn in catalog");

    let (status, _) = post(
        &client,
        &admin,
        &format!("/rental/{}/penalties", rental_id),
        json!({ "penalty_id": early_return_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_settlements_never_overdraw_deposit() {
    let client = Client::new();
    let admin = admin_token();
    let rental_id = rental_in_progress(&client).await;

    let mut ids = Vec::new();
    for _ in 0..6 {
        let (status, penalty) = post(
            &client,
            &admin,
            &format!("/rental/{}/penalties", rental_id),
            json!({ "amount": 300000 }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(penalty["id"].as_i64().unwrap());
    }

    let handles: Vec<_> = ids
        .iter()
        .map(|id| {
            let client = client.clone();
            let admin = admin.clone();
            let path = format!("/rental/penalties/{}/settle", id);
            tokio::spawn(async move { post(&client, &admin, &path, json!({ "use_deposit": true })).await })
        })
        .collect();
    for handle in handles {
        let (status, _) = handle.await.expect("settle task panicked");
        assert_eq!(status, StatusCode::OK);
    }

    let (_, deposit) = get(&client, &admin, &format!("/rental/{}/deposit", rental_id)).await;
    let used = decimal(&deposit["used_amount"]);
    assert!(used <= decimal(&deposit["amount"]));
    assert_eq!(used, Decimal::from(1_000_000));

    let (_, penalties) = get(&client, &admin, &format!("/rental/{}/penalties", rental_id)).await;
    let drawn: Decimal = penalties
        .as_array()
        .expect("penalty list")
        .iter()
        .map(|p| decimal(&p["deposit_used_amount"]))
        .sum();
    assert_eq!(drawn, used);
}

#[tokio::test]
#[ignore]
async fn test_deposit_refund_requires_closed_rental() {
    let client = Client::new();
    let admin = admin_token();
    let rental_id = rental_in_progress(&client).await;

    let (status, _) = post(&client, &admin, &format!("/rental/{}/deposit/refund", rental_id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, penalty) = post(&client, &admin, &format!("/rental/{}/penalties", rental_id), json!({ "amount": 200000, "use_deposit_first": true })).await;
    assert_eq!(status, StatusCode::CREATED);
    let penalty_id = penalty["id"].as_i64().unwrap();

    let (status, rental) = post(&client, &admin, &format!("/rental/{}/checkout", rental_id), json!({ "battery_level": 40 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rental["status"], "Completed");

    let (status, deposit) = post(&client, &admin, &format!("/rental/{}/deposit/refund", rental_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deposit["status"], "Refunded");
    assert_eq!(decimal(&deposit["refunded_amount"]), Decimal::from(800_000));

    let (status, _) = post(&client, &admin, &format!("/rental/{}/deposit/refund", rental_id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Once paid out, the deposit share of a penalty is final
    let response = client
        .delete(format!("{}/rental/penalties/{}", BASE_URL, penalty_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let (_, deposit) = get(&client, &admin, &format!("/rental/{}/deposit", rental_id)).await;
    assert_eq!(
        decimal(&deposit["refunded_amount"]) + decimal(&deposit["used_amount"]),
        decimal(&deposit["amount"])
    );
}
