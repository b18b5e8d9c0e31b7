use crate::{
    db_types::{Order, OrderFromCartResult},
    traits::MarketplaceDbError,
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// In a single atomic transaction:
    /// * marks the cart as `completed` and attaches `order_id`, but only if the cart is still `active`,
    /// * creates the order (and its items) from the cart's items and total,
    /// * zeroes the cart total.
    ///
    /// If the cart was already completed, nothing is written and the existing order id is returned.
    /// If the cart does not exist, [`MarketplaceDbError::CartNotFound`] is returned.
    async fn create_order_from_cart(
        &self,
        cart_id: &str,
        order_id: &str,
        payment_intent_id: &str,
    ) -> Result<OrderFromCartResult, MarketplaceDbError>;

    /// Deletes the line items of a cart. Returns the number of items removed.
    async fn clear_cart_items(&self, cart_id: &str) -> Result<u64, MarketplaceDbError>;

    async fn fetch_order(&self, order_id: &str) -> Result<Option<Order>, MarketplaceDbError>;

    async fn fetch_order_for_payment_intent(&self, payment_intent_id: &str)
        -> Result<Option<Order>, MarketplaceDbError>;
}
