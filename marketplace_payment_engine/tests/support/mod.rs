#![allow(dead_code)]
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use log::*;
use marketplace_payment_engine::{
    db_types::{Cents, NewCart, NewCartItem, SellerProfile},
    traits::{
        CartManagement,
        ConnectedAccount,
        GatewayError,
        GatewayTransfer,
        NewConnectedAccount,
        NewPaymentIntent,
        NewTransfer,
        PaymentGateway,
        PaymentIntent,
        PaymentIntentStatus,
        SellerManagement,
    },
    SqliteDatabase,
};
use mockall::mock;
use sqlx::{migrate::MigrateDatabase, Sqlite};

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError>;
        async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent, GatewayError>;
        async fn create_connected_account(&self, account: NewConnectedAccount) -> Result<ConnectedAccount, GatewayError>;
        async fn retrieve_connected_account(&self, account_id: &str) -> Result<ConnectedAccount, GatewayError>;
        async fn create_onboarding_link(&self, account_id: &str, refresh_url: &str, return_url: &str) -> Result<String, GatewayError>;
        async fn create_dashboard_link(&self, account_id: &str) -> Result<String, GatewayError>;
        async fn create_transfer(&self, transfer: NewTransfer) -> Result<GatewayTransfer, GatewayError>;
    }
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/mpe_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn prepare_test_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to database");
    db.run_migrations().await.expect("Error running migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

pub async fn tear_down(db: SqliteDatabase) {
    db.close().await;
    if let Err(e) = Sqlite::drop_database(db.url()).await {
        warn!("🚀️ Could not drop test database {}: {e}", db.url());
    }
}

pub fn profile(name: &str) -> SellerProfile {
    SellerProfile {
        seller_name: name.to_string(),
        seller_type: "individual".to_string(),
        location: "Cape Town".to_string(),
        contact_email: format!("{}@example.com", name.to_lowercase()),
        contact_phone: "+27 21 555 0100".to_string(),
        seller_bio: format!("{name} sells tools"),
    }
}

/// Registers a seller and links a connected account to them.
pub async fn add_seller(db: &SqliteDatabase, user_id: &str, account_id: &str) {
    db.upsert_seller_profile(user_id, &format!("{user_id}@example.com"), &profile(user_id))
        .await
        .expect("Error saving seller");
    db.attach_stripe_account(user_id, account_id).await.expect("Error linking account");
}

/// The cart from the split example: seller A sells one item at 100.00, seller B two items at 50.00.
pub async fn two_seller_cart(db: &SqliteDatabase, cart_id: &str, buyer: &str) {
    let cart = NewCart::new(cart_id, buyer)
        .with_item(NewCartItem::new("hammer", Some("seller_a"), Cents::from(10_000), 1))
        .with_item(NewCartItem::new("chisel", Some("seller_b"), Cents::from(5_000), 2));
    db.insert_cart(cart).await.expect("Error inserting cart");
}

pub fn succeeded_intent(id: &str, metadata: BTreeMap<String, String>, amount: i64) -> PaymentIntent {
    PaymentIntent {
        id: id.to_string(),
        amount: Cents::from(amount),
        currency: "usd".to_string(),
        status: PaymentIntentStatus::Succeeded,
        client_secret: Some(format!("{id}_secret_abc")),
        metadata,
        latest_charge: Some(format!("ch_{id}")),
    }
}

pub fn marketplace_metadata(cart_id: &str, buyer: &str, sellers: usize, items: usize) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("cartId".to_string(), cart_id.to_string());
    map.insert("userId".to_string(), buyer.to_string());
    map.insert("isMarketplace".to_string(), "true".to_string());
    map.insert("itemCount".to_string(), items.to_string());
    map.insert("sellerCount".to_string(), sellers.to_string());
    map.insert("platformFeePercent".to_string(), "5".to_string());
    map
}

#[derive(Default, Clone)]
pub struct HookCalled {
    called: Arc<AtomicUsize>,
}

impl HookCalled {
    pub fn called(&self) {
        self.called.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.called.load(Ordering::SeqCst)
    }
}
