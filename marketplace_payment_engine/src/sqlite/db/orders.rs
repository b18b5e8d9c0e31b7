use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cart, Order, OrderItem},
    traits::MarketplaceDbError,
};

/// Creates a paid order from the contents of `cart`. This is not atomic; the caller is expected to run it in the
/// same transaction that completes the cart.
pub async fn insert_order_from_cart(
    order_id: &str,
    cart: &Cart,
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceDbError> {
    sqlx::query(
        r#"INSERT INTO orders (id, user_id, cart_id, total_amount, status, payment_intent_id)
        VALUES ($1, $2, $3, $4, 'paid', $5)"#,
    )
    .bind(order_id)
    .bind(&cart.user_id)
    .bind(&cart.id)
    .bind(cart.total_amount)
    .bind(payment_intent_id)
    .execute(&mut *conn)
    .await?;
    for item in &cart.items {
        sqlx::query(
            r#"INSERT INTO order_items (order_id, tool_id, seller_id, price, quantity)
            VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(order_id)
        .bind(&item.tool_id)
        .bind(&item.seller_id)
        .bind(item.price)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }
    trace!("🗃️ Order {order_id} saved with {} items", cart.items.len());
    Ok(())
}

pub async fn fetch_order(order_id: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, MarketplaceDbError> {
    let order: Option<Order> = sqlx::query_as(
        r#"SELECT id, user_id, cart_id, total_amount, status, payment_intent_id, created_at
        FROM orders WHERE id = $1"#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

pub async fn fetch_order_for_payment_intent(
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceDbError> {
    let order: Option<Order> = sqlx::query_as(
        r#"SELECT id, user_id, cart_id, total_amount, status, payment_intent_id, created_at
        FROM orders WHERE payment_intent_id = $1"#,
    )
    .bind(payment_intent_id)
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

async fn with_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, MarketplaceDbError> {
    let Some(mut order) = order else {
        return Ok(None);
    };
    order.items = sqlx::query_as::<_, OrderItem>(
        r#"SELECT id, order_id, tool_id, seller_id, price, quantity
        FROM order_items WHERE order_id = $1 ORDER BY id"#,
    )
    .bind(&order.id)
    .fetch_all(conn)
    .await?;
    Ok(Some(order))
}
