use crate::{
    db_types::{Cart, NewCart},
    traits::MarketplaceDbError,
};

#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Fetches the cart, including its line items. Returns `None` if the cart does not exist.
    async fn fetch_cart(&self, cart_id: &str) -> Result<Option<Cart>, MarketplaceDbError>;

    /// Stores a new, active cart. The cart total is calculated from the line items.
    ///
    /// Carts are owned by the storefront, so this is mainly used for seeding and in tests.
    async fn insert_cart(&self, cart: NewCart) -> Result<Cart, MarketplaceDbError>;
}
