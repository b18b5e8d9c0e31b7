use actix_web::{http::StatusCode, test::TestRequest, web};
use marketplace_payment_engine::{
    events::EventProducers,
    traits::{AccountRequirements, ConnectedAccount, SellerManagement},
    MerchantAccountApi,
    SqliteDatabase,
};
use serde_json::{json, Value};

use super::{
    helpers::{add_seller, json_post, prepare_db, profile, send_request, test_config},
    mocks::MockGateway,
};
use crate::routes::{CreateConnectedAccountRoute, GetAccountStatusRoute, GetDashboardLinkRoute, RefreshAccountLinkRoute};

async fn seller_request(req: TestRequest, db: &SqliteDatabase, gateway: MockGateway) -> (StatusCode, Value) {
    let config = test_config();
    let api = MerchantAccountApi::new(db.clone(), gateway, EventProducers::default(), &config.client_url);
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(api))
            .service(CreateConnectedAccountRoute::<SqliteDatabase, MockGateway>::new())
            .service(GetAccountStatusRoute::<SqliteDatabase, MockGateway>::new())
            .service(RefreshAccountLinkRoute::<SqliteDatabase, MockGateway>::new())
            .service(GetDashboardLinkRoute::<SqliteDatabase, MockGateway>::new());
    })
    .await;
    let json = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, json)
}

fn connect_body() -> Value {
    json!({
        "userId": "seller_a",
        "email": "a@example.com",
        "sellerName": "Alice's Tools",
        "sellerType": "individual",
        "location": "Cape Town",
        "contactEmail": "support@alice.example",
        "contactPhone": "+27 21 555 0100",
        "sellerBio": "Hand tools"
    })
}

#[actix_web::test]
async fn connect_twice_returns_the_same_account() {
    let db = prepare_db().await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_connected_account()
        .times(1)
        .returning(|_| Ok(ConnectedAccount { id: "acct_123".into(), ..Default::default() }));
    gateway
        .expect_create_onboarding_link()
        .withf(|_, refresh, ret| {
            refresh == "https://tools.example.com/seller/onboarding/refresh" &&
                ret == "https://tools.example.com/seller/onboarding/complete"
        })
        .times(1)
        .returning(|account, _, _| Ok(format!("https://connect.example.com/setup/{account}")));
    let (status, first) = seller_request(json_post("/create-connected-account", connect_body()), &db, gateway).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["accountId"], "acct_123");
    assert_eq!(first["exists"], false);
    assert_eq!(first["url"], "https://connect.example.com/setup/acct_123");

    let mut second_gateway = MockGateway::new();
    second_gateway.expect_create_connected_account().never();
    second_gateway.expect_create_onboarding_link().returning(|_, _, _| Ok("https://connect.example.com/again".into()));
    let (status, second) =
        seller_request(json_post("/create-connected-account", connect_body()), &db, second_gateway).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["accountId"], "acct_123");
    assert_eq!(second["exists"], true);

    let user = db.fetch_user("seller_a").await.unwrap().unwrap();
    assert_eq!(user.profile.seller_bio, "Hand tools");
}

#[actix_web::test]
async fn connect_requires_user_and_email() {
    let db = prepare_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_connected_account().never();
    let mut body = connect_body();
    body.as_object_mut().unwrap().remove("email");
    let (status, json) = seller_request(json_post("/create-connected-account", body), &db, gateway).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing required field: email");
}

#[actix_web::test]
async fn status_of_a_non_seller() {
    let db = prepare_db().await;
    db.upsert_seller_profile("buyer", "buyer@example.com", &profile("Buyer")).await.unwrap();
    let mut gateway = MockGateway::new();
    gateway.expect_retrieve_connected_account().never();

    let req = TestRequest::get().uri("/get-account-status?userId=buyer");
    let (status, json) = seller_request(req, &db, gateway).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("not a seller"));

    let req = TestRequest::get().uri("/get-account-status?userId=ghost");
    let (status, _) = seller_request(req, &db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::get().uri("/get-account-status");
    let (status, json) = seller_request(req, &db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing required query parameter: userId");
}

#[actix_web::test]
async fn account_status() {
    let db = prepare_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    let mut gateway = MockGateway::new();
    gateway.expect_retrieve_connected_account().withf(|id| id == "acct_a").returning(|id| {
        Ok(ConnectedAccount {
            id: id.to_string(),
            details_submitted: true,
            payouts_enabled: false,
            charges_enabled: false,
            requirements: AccountRequirements {
                currently_due: vec!["external_account".into()],
                ..Default::default()
            },
        })
    });
    let req = TestRequest::get().uri("/get-account-status?userId=seller_a");
    let (status, json) = seller_request(req, &db, gateway).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["accountId"], "acct_a");
    assert_eq!(json["detailsSubmitted"], true);
    assert_eq!(json["payoutsEnabled"], false);
    assert_eq!(json["chargesEnabled"], false);
    assert_eq!(json["requirementsDisabledReason"], Value::Null);
    assert_eq!(json["requirements"]["currentlyDue"][0], "external_account");
    let user = db.fetch_user("seller_a").await.unwrap().unwrap();
    assert!(user.merchant_account.unwrap().details_submitted);
}

#[actix_web::test]
async fn links() {
    let db = prepare_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_dashboard_link().returning(|id| Ok(format!("https://connect.example.com/express/{id}")));
    let req = TestRequest::get().uri("/get-dashboard-link?userId=seller_a");
    let (status, json) = seller_request(req, &db, gateway).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "url": "https://connect.example.com/express/acct_a" }));

    let mut gateway = MockGateway::new();
    gateway.expect_create_onboarding_link().returning(|id, _, _| Ok(format!("https://connect.example.com/setup/{id}")));
    let req = TestRequest::get().uri("/refresh-account-link?userId=seller_a");
    let (status, json) = seller_request(req, &db, gateway).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["url"], "https://connect.example.com/setup/acct_a");
}
