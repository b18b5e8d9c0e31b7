use actix_web::{http::StatusCode, test::TestRequest, web};
use marketplace_payment_engine::{
    events::EventProducers,
    traits::{GatewayError, OrderManagement, PaymentIntentStatus},
    CheckoutApi,
    SqliteDatabase,
};
use serde_json::{json, Value};

use super::{
    helpers::{add_seller, intent, json_post, marketplace_metadata, prepare_db, send_request, two_seller_cart},
    mocks::MockGateway,
};
use crate::routes::{health, ConfirmPaymentRoute, CreatePaymentIntentRoute};

async fn checkout_request(req: TestRequest, db: &SqliteDatabase, gateway: MockGateway) -> (StatusCode, Value) {
    let api = CheckoutApi::new(db.clone(), gateway, EventProducers::default());
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api))
            .service(CreatePaymentIntentRoute::<SqliteDatabase, MockGateway>::new())
            .service(ConfirmPaymentRoute::<SqliteDatabase, MockGateway>::new());
    })
    .await;
    let json = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, json)
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/health"), |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn missing_fields_are_rejected() {
    let db = prepare_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_intent().never();
    let req = json_post("/create-payment-intent", json!({ "cartId": "cart_1" }));
    let (status, body) = checkout_request(req, &db, gateway).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: userId");
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let db = prepare_db().await;
    let req = TestRequest::post()
        .uri("/confirm-payment")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json");
    let (status, body) = checkout_request(req, &db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Could not read request body"));
}

#[actix_web::test]
async fn intent_failures_map_to_status_codes() {
    let db = prepare_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    two_seller_cart(&db, "cart_1", "buyer").await;
    let body = |user: &str, cart: &str| json!({ "cartId": cart, "userId": user });

    let (status, _) =
        checkout_request(json_post("/create-payment-intent", body("buyer", "nope")), &db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        checkout_request(json_post("/create-payment-intent", body("mallory", "cart_1")), &db, MockGateway::new())
            .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // seller_b has no connected account
    let (status, json) =
        checkout_request(json_post("/create-payment-intent", body("buyer", "cart_1")), &db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("seller_b"));
}

#[actix_web::test]
async fn marketplace_intent() {
    let db = prepare_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    add_seller(&db, "seller_b", "acct_b").await;
    two_seller_cart(&db, "cart_2", "buyer").await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_payment_intent()
        .withf(|req| req.metadata.is_marketplace() && req.amount.value() == 20_000)
        .times(1)
        .returning(|req| Ok(intent("pi_2", PaymentIntentStatus::RequiresPaymentMethod, req.metadata.to_map())));
    let req = json_post("/create-payment-intent", json!({ "cartId": "cart_2", "userId": "buyer" }));
    let (status, json) = checkout_request(req, &db, gateway).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["clientSecret"], "pi_2_secret_xyz");
    assert_eq!(json["isMarketplace"], true);
}

#[actix_web::test]
async fn gateway_errors_are_surfaced() {
    let db = prepare_db().await;
    two_seller_cart(&db, "cart_3", "buyer").await;
    let mut gateway = MockGateway::new();
    gateway.expect_retrieve_payment_intent().returning(|_| Err(GatewayError::Unavailable("connection reset".into())));
    let req = json_post("/confirm-payment", json!({ "paymentIntentId": "pi_3", "cartId": "cart_3" }));
    let (status, json) = checkout_request(req, &db, gateway).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("connection reset"));
}

#[actix_web::test]
async fn confirm_payment_is_idempotent() {
    let db = prepare_db().await;
    two_seller_cart(&db, "cart_4", "buyer").await;
    let gateway = || {
        let mut gateway = MockGateway::new();
        gateway
            .expect_retrieve_payment_intent()
            .returning(|id| Ok(intent(id, PaymentIntentStatus::Succeeded, marketplace_metadata("cart_4", "buyer"))));
        gateway
    };
    let body = json!({ "paymentIntentId": "pi_4", "cartId": "cart_4" });
    let (status, first) = checkout_request(json_post("/confirm-payment", body.clone()), &db, gateway()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["alreadyCompleted"], false);
    let (status, second) = checkout_request(json_post("/confirm-payment", body), &db, gateway()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["alreadyCompleted"], true);
    assert_eq!(first["orderId"], second["orderId"]);
    let order = db.fetch_order_for_payment_intent("pi_4").await.unwrap().unwrap();
    assert_eq!(first["orderId"], order.id.as_str());
}

#[actix_web::test]
async fn unpaid_intent_cannot_be_confirmed() {
    let db = prepare_db().await;
    two_seller_cart(&db, "cart_5", "buyer").await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_retrieve_payment_intent()
        .returning(|id| Ok(intent(id, PaymentIntentStatus::Processing, marketplace_metadata("cart_5", "buyer"))));
    let req = json_post("/confirm-payment", json!({ "paymentIntentId": "pi_5", "cartId": "cart_5" }));
    let (status, json) = checkout_request(req, &db, gateway).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("processing"));
    assert!(db.fetch_order_for_payment_intent("pi_5").await.unwrap().is_none());
}
