use std::collections::BTreeMap;

use actix_web::{
    body::to_bytes,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::Utc;
use log::debug;
use marketplace_payment_engine::{
    db_types::{NewCart, NewCartItem, SellerProfile},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{CartManagement, PaymentIntent, PaymentIntentStatus, SellerManagement},
    SqliteDatabase,
};
use mpg_common::Cents;
use stripe_tools::{compute_signature, StripeConfig, SIGNATURE_HEADER};

use crate::{config::ServerConfig, server::json_config};

pub const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

pub async fn prepare_db() -> SqliteDatabase {
    prepare_test_env(&random_db_path()).await
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        client_url: "https://tools.example.com".into(),
        stripe: StripeConfig::new("sk_test_endpoint_tests", WEBHOOK_SECRET),
        ..Default::default()
    }
}

/// Sends `req` to an app set up by `configure` and returns the status and body. Errors raised by middleware are
/// rendered the same way the server would render them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(json_config()).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1,
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();
    (status, body)
}

pub fn json_post(path: &str, body: serde_json::Value) -> TestRequest {
    TestRequest::post().uri(path).set_json(body)
}

pub fn signed_webhook(payload: &str, secret: &str) -> TestRequest {
    let t = Utc::now().timestamp();
    let sig = compute_signature(secret, t, payload.as_bytes()).unwrap();
    TestRequest::post()
        .uri("/stripe-webhook")
        .insert_header((SIGNATURE_HEADER, format!("t={t},v1={sig}")))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload.to_string())
}

pub fn profile(name: &str) -> SellerProfile {
    SellerProfile { seller_name: name.to_string(), seller_type: "individual".to_string(), ..Default::default() }
}

pub async fn add_seller(db: &SqliteDatabase, user_id: &str, account_id: &str) {
    db.upsert_seller_profile(user_id, &format!("{user_id}@example.com"), &profile(user_id)).await.unwrap();
    db.attach_stripe_account(user_id, account_id).await.unwrap();
}

/// Seller A sells one item at 100.00, seller B two items at 50.00.
pub async fn two_seller_cart(db: &SqliteDatabase, cart_id: &str, buyer: &str) {
    let cart = NewCart::new(cart_id, buyer)
        .with_item(NewCartItem::new("hammer", Some("seller_a"), Cents::from(10_000), 1))
        .with_item(NewCartItem::new("chisel", Some("seller_b"), Cents::from(5_000), 2));
    db.insert_cart(cart).await.unwrap();
}

pub fn marketplace_metadata(cart_id: &str, buyer: &str) -> BTreeMap<String, String> {
    [("cartId", cart_id), ("userId", buyer), ("isMarketplace", "true"), ("platformFeePercent", "5")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn intent(id: &str, status: PaymentIntentStatus, metadata: BTreeMap<String, String>) -> PaymentIntent {
    PaymentIntent {
        id: id.to_string(),
        amount: Cents::from(20_000),
        currency: "usd".to_string(),
        status,
        client_secret: Some(format!("{id}_secret_xyz")),
        metadata,
        latest_charge: Some(format!("ch_{id}")),
    }
}
