//! `SqliteDatabase` is the SQLite backend for the marketplace payment engine.
//!
//! It implements every storage trait in [`crate::traits`]. Operations that must be atomic (turning a cart into an
//! order, reserving a transfer) run inside a single transaction.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{carts, db_url, new_pool, orders, transfers, users};
use crate::{
    db_types::{
        Cart,
        MerchantStatusUpdate,
        NewCart,
        NewTransferRecord,
        Order,
        OrderFromCartResult,
        SellerProfile,
        TransferRecord,
        TransferReservation,
        User,
    },
    traits::{CartManagement, MarketplaceDbError, OrderManagement, SellerManagement, TransferLedger},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the url in `MPG_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn user_or_not_found(&self, user_id: &str) -> Result<User, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(user_id, &mut conn).await?.ok_or_else(|| MarketplaceDbError::UserNotFound(user_id.into()))
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, cart_id: &str) -> Result<Option<Cart>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_cart(cart_id, &mut conn).await
    }

    async fn insert_cart(&self, cart: NewCart) -> Result<Cart, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        carts::insert_cart(&cart, &mut tx).await?;
        let saved = carts::fetch_cart(&cart.id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceDbError::InconsistentData(format!("Cart {} vanished after insert", cart.id)))?;
        tx.commit().await?;
        Ok(saved)
    }
}

impl OrderManagement for SqliteDatabase {
    /// Completes the cart and records the order in one transaction.
    ///
    /// The conditional status update is the first statement, so the transaction holds the write lock before it reads
    /// anything. Of several concurrent callers for the same cart, exactly one sees the update succeed and creates
    /// the order. Everyone else gets the id of that order.
    async fn create_order_from_cart(
        &self,
        cart_id: &str,
        order_id: &str,
        payment_intent_id: &str,
    ) -> Result<OrderFromCartResult, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let completed = carts::complete_active_cart(cart_id, order_id, &mut tx).await?;
        if !completed {
            tx.rollback().await?;
            let mut conn = self.pool.acquire().await?;
            let cart = carts::fetch_cart(cart_id, &mut conn)
                .await?
                .ok_or_else(|| MarketplaceDbError::CartNotFound(cart_id.into()))?;
            if !cart.is_completed() {
                return Err(MarketplaceDbError::InconsistentData(format!(
                    "Cart {cart_id} is {} but could not be completed",
                    cart.status
                )));
            }
            let existing = cart.order_id.ok_or_else(|| {
                MarketplaceDbError::InconsistentData(format!("Cart {cart_id} is completed but has no order id"))
            })?;
            debug!("🗃️ Cart {cart_id} was already completed with order {existing}");
            return Ok(OrderFromCartResult::AlreadyCompleted(existing));
        }
        let cart = carts::fetch_cart(cart_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceDbError::InconsistentData(format!("Cart {cart_id} vanished mid-transaction")))?;
        orders::insert_order_from_cart(order_id, &cart, payment_intent_id, &mut tx).await?;
        carts::zero_cart_total(cart_id, &mut tx).await?;
        let order = orders::fetch_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceDbError::InconsistentData(format!("Order {order_id} vanished after insert")))?;
        tx.commit().await?;
        debug!("🗃️ Cart {cart_id} completed. Order {order_id} created for {}", order.total_amount);
        Ok(OrderFromCartResult::Created(order))
    }

    async fn clear_cart_items(&self, cart_id: &str) -> Result<u64, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = carts::delete_cart_items(cart_id, &mut conn).await?;
        trace!("🗃️ Removed {deleted} items from cart {cart_id}");
        Ok(deleted)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<Option<Order>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_order_for_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_for_payment_intent(payment_intent_id, &mut conn).await
    }
}

impl SellerManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(user_id, &mut conn).await
    }

    async fn fetch_user_by_stripe_account(&self, account_id: &str) -> Result<Option<User>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_stripe_account(account_id, &mut conn).await
    }

    async fn upsert_seller_profile(
        &self,
        user_id: &str,
        email: &str,
        profile: &SellerProfile,
    ) -> Result<User, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        users::upsert_seller_profile(user_id, email, profile, &mut conn).await?;
        drop(conn);
        self.user_or_not_found(user_id).await
    }

    async fn attach_stripe_account(&self, user_id: &str, account_id: &str) -> Result<User, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        if users::attach_stripe_account(user_id, account_id, &mut conn).await? {
            info!("🗃️ Stripe account {account_id} linked to user {user_id}");
        }
        drop(conn);
        self.user_or_not_found(user_id).await
    }

    async fn update_merchant_status(
        &self,
        account_id: &str,
        update: MerchantStatusUpdate,
    ) -> Result<Option<User>, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        if !users::update_merchant_status(account_id, update, &mut tx).await? {
            tx.rollback().await?;
            return Ok(None);
        }
        let user = users::fetch_user_by_stripe_account(account_id, &mut tx).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn mark_onboarding_notified(&self, user_id: &str) -> Result<bool, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        users::mark_onboarding_notified(user_id, &mut conn).await
    }
}

impl TransferLedger for SqliteDatabase {
    async fn reserve_transfer(&self, transfer: NewTransferRecord) -> Result<TransferReservation, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let reservation = transfers::reserve_transfer(&transfer, &mut tx).await?;
        tx.commit().await?;
        Ok(reservation)
    }

    async fn mark_transfer_created(
        &self,
        payment_intent_id: &str,
        seller_id: &str,
        transfer_id: &str,
    ) -> Result<Option<TransferRecord>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(record) = transfers::mark_created(payment_intent_id, seller_id, transfer_id, &mut conn).await? {
            return Ok(Some(record));
        }
        match transfers::fetch_transfer(payment_intent_id, seller_id, &mut conn).await? {
            Some(_) => Ok(None),
            None => Err(missing_transfer(payment_intent_id, seller_id)),
        }
    }

    async fn mark_transfer_failed(
        &self,
        payment_intent_id: &str,
        seller_id: &str,
        reason: &str,
    ) -> Result<TransferRecord, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(record) = transfers::mark_failed(payment_intent_id, seller_id, reason, &mut conn).await? {
            return Ok(record);
        }
        transfers::fetch_transfer(payment_intent_id, seller_id, &mut conn)
            .await?
            .ok_or_else(|| missing_transfer(payment_intent_id, seller_id))
    }

    async fn fetch_transfers_for_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Vec<TransferRecord>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        transfers::fetch_transfers_for_payment_intent(payment_intent_id, &mut conn).await
    }
}

fn missing_transfer(payment_intent_id: &str, seller_id: &str) -> MarketplaceDbError {
    MarketplaceDbError::InconsistentData(format!("No transfer ledger row for {payment_intent_id}/{seller_id}"))
}
