use actix_web::{http::StatusCode, test::TestRequest, web};
use marketplace_payment_engine::{
    db_types::TransferStatus,
    events::EventProducers,
    traits::{GatewayTransfer, SellerManagement, TransferLedger},
    SqliteDatabase,
    WebhookApi,
};
use mpg_common::Cents;
use serde_json::{json, Value};

use super::{
    helpers::{add_seller, prepare_db, send_request, signed_webhook, test_config, two_seller_cart, WEBHOOK_SECRET},
    mocks::MockGateway,
};
use crate::server::webhook_scope;

async fn webhook_request(req: TestRequest, db: &SqliteDatabase, gateway: MockGateway) -> (StatusCode, Value) {
    let config = test_config();
    let api = WebhookApi::new(db.clone(), gateway, EventProducers::default());
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api)).service(webhook_scope::<SqliteDatabase, MockGateway>(&config));
    })
    .await;
    let json = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, json)
}

fn payment_succeeded(pi: &str, cart_id: &str) -> String {
    json!({
        "id": format!("evt_{pi}"),
        "type": "payment_intent.succeeded",
        "created": 1_700_000_000,
        "livemode": false,
        "data": { "object": {
            "id": pi,
            "object": "payment_intent",
            "amount": 20000,
            "currency": "usd",
            "status": "succeeded",
            "latest_charge": format!("ch_{pi}"),
            "metadata": {
                "cartId": cart_id,
                "userId": "buyer",
                "isMarketplace": "true",
                "itemCount": "2",
                "sellerCount": "2",
                "platformFeePercent": "5"
            }
        }}
    })
    .to_string()
}

fn paying_gateway(times: usize) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_transfer().times(times).returning(|t| {
        Ok(GatewayTransfer { id: format!("tr_{}", t.destination), amount: t.amount, destination: t.destination })
    });
    gateway
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected_without_side_effects() {
    let db = prepare_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    add_seller(&db, "seller_b", "acct_b").await;
    two_seller_cart(&db, "cart_1", "buyer").await;
    let payload = payment_succeeded("pi_1", "cart_1");

    let req = TestRequest::post().uri("/stripe-webhook").set_payload(payload.clone());
    let (status, json) = webhook_request(req, &db, paying_gateway(0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("No signature header"));

    let req = signed_webhook(&payload, "whsec_someone_else");
    let (status, json) = webhook_request(req, &db, paying_gateway(0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("No signature matched"));

    assert!(db.fetch_transfers_for_payment_intent("pi_1").await.unwrap().is_empty());
}

#[actix_web::test]
async fn payment_is_split_once() {
    let db = prepare_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    add_seller(&db, "seller_b", "acct_b").await;
    two_seller_cart(&db, "cart_2", "buyer").await;
    let payload = payment_succeeded("pi_2", "cart_2");

    let (status, json) = webhook_request(signed_webhook(&payload, WEBHOOK_SECRET), &db, paying_gateway(2)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "received": true }));
    let transfers = db.fetch_transfers_for_payment_intent("pi_2").await.unwrap();
    assert_eq!(transfers.len(), 2);
    for t in &transfers {
        assert_eq!(t.status, TransferStatus::Created);
        assert_eq!(t.seller_total, Cents::from(10_000));
        assert_eq!(t.amount, Cents::from(9_500));
        assert_eq!(t.platform_fee, Cents::from(500));
    }
    assert_eq!(transfers[0].transfer_id.as_deref(), Some("tr_acct_a"));

    // Redelivery is acknowledged, but nobody is paid twice
    let (status, _) = webhook_request(signed_webhook(&payload, WEBHOOK_SECRET), &db, paying_gateway(0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.fetch_transfers_for_payment_intent("pi_2").await.unwrap().len(), 2);
}

#[actix_web::test]
async fn other_events_are_acknowledged() {
    let db = prepare_db().await;
    let payload = json!({
        "id": "evt_3",
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_3", "object": "charge" } }
    })
    .to_string();
    let (status, json) = webhook_request(signed_webhook(&payload, WEBHOOK_SECRET), &db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    let payload = json!({
        "id": "evt_4",
        "type": "account.updated",
        "data": { "object": { "id": "acct_nobody", "details_submitted": true, "payouts_enabled": true } }
    })
    .to_string();
    let (status, _) = webhook_request(signed_webhook(&payload, WEBHOOK_SECRET), &db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn account_updates_are_recorded() {
    let db = prepare_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    let payload = json!({
        "id": "evt_5",
        "type": "account.updated",
        "data": { "object": {
            "id": "acct_a",
            "details_submitted": true,
            "payouts_enabled": true,
            "charges_enabled": true,
            "requirements": { "currently_due": [] }
        }}
    })
    .to_string();
    let (status, _) = webhook_request(signed_webhook(&payload, WEBHOOK_SECRET), &db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    let user = db.fetch_user("seller_a").await.unwrap().unwrap();
    assert!(user.onboarding_notified);
    assert_eq!(user.merchant_account.unwrap().stripe_status.to_string(), "active");
}
