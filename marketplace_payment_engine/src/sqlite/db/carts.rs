use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cart, CartItem, NewCart},
    traits::MarketplaceDbError,
};

pub async fn fetch_cart(cart_id: &str, conn: &mut SqliteConnection) -> Result<Option<Cart>, MarketplaceDbError> {
    let cart: Option<Cart> = sqlx::query_as(
        r#"SELECT id, user_id, total_amount, status, order_id, created_at, updated_at
        FROM carts WHERE id = $1"#,
    )
    .bind(cart_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(mut cart) = cart else {
        return Ok(None);
    };
    cart.items = fetch_cart_items(cart_id, conn).await?;
    Ok(Some(cart))
}

pub async fn fetch_cart_items(cart_id: &str, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, MarketplaceDbError> {
    let items = sqlx::query_as(
        r#"SELECT id, cart_id, tool_id, seller_id, price, quantity
        FROM cart_items WHERE cart_id = $1 ORDER BY id"#,
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Inserts a cart and its items. This is not atomic. Wrap it in a transaction and pass `&mut *tx` if you need it to
/// be.
pub async fn insert_cart(cart: &NewCart, conn: &mut SqliteConnection) -> Result<(), MarketplaceDbError> {
    if let Some(item) = cart.items.iter().find(|i| i.quantity <= 0 || i.price.value() < 0) {
        return Err(MarketplaceDbError::InvalidData(format!(
            "Cart item {} has a negative price or non-positive quantity",
            item.tool_id
        )));
    }
    let total = cart.total_amount().ok_or_else(|| {
        MarketplaceDbError::InvalidData(format!("The total of cart {} is too large to be represented", cart.id))
    })?;
    let result = sqlx::query("INSERT INTO carts (id, user_id, total_amount) VALUES ($1, $2, $3)")
        .bind(&cart.id)
        .bind(&cart.user_id)
        .bind(total)
        .execute(&mut *conn)
        .await;
    match result {
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(MarketplaceDbError::CartAlreadyExists(cart.id.clone()))
        },
        Err(e) => return Err(e.into()),
        Ok(_) => {},
    }
    for item in &cart.items {
        sqlx::query("INSERT INTO cart_items (cart_id, tool_id, seller_id, price, quantity) VALUES ($1, $2, $3, $4, $5)")
            .bind(&cart.id)
            .bind(&item.tool_id)
            .bind(&item.seller_id)
            .bind(item.price)
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?;
    }
    trace!("🗃️ Cart {} saved with {} items and a total of {total}", cart.id, cart.items.len());
    Ok(())
}

/// Completes the cart and attaches the order id, but only if the cart is still active. Returns `true` if this call
/// made the transition.
pub async fn complete_active_cart(
    cart_id: &str,
    order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceDbError> {
    let result = sqlx::query(
        r#"UPDATE carts SET status = 'completed', order_id = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = 'active'"#,
    )
    .bind(order_id)
    .bind(cart_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn zero_cart_total(cart_id: &str, conn: &mut SqliteConnection) -> Result<(), MarketplaceDbError> {
    sqlx::query("UPDATE carts SET total_amount = 0, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_cart_items(cart_id: &str, conn: &mut SqliteConnection) -> Result<u64, MarketplaceDbError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(conn).await?;
    Ok(result.rows_affected())
}
