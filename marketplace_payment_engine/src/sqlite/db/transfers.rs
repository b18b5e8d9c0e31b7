use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewTransferRecord, TransferRecord, TransferReservation},
    traits::MarketplaceDbError,
};

const TRANSFER_COLUMNS: &str = r#"id, payment_intent_id, seller_id, cart_id, destination_account, seller_total, amount,
    platform_fee, transfer_id, status, failure_reason, created_at, updated_at"#;

/// Inserts a `pending` ledger row, or takes over an unfinished (`pending` or `failed`) one. Run this inside a
/// transaction so that the lookup of an existing row sees the same state as the failed insert.
pub async fn reserve_transfer(
    transfer: &NewTransferRecord,
    conn: &mut SqliteConnection,
) -> Result<TransferReservation, MarketplaceDbError> {
    let q = format!(
        r#"INSERT INTO transfers
            (payment_intent_id, seller_id, cart_id, destination_account, seller_total, amount, platform_fee)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {TRANSFER_COLUMNS}"#
    );
    let inserted = sqlx::query_as::<_, TransferRecord>(&q)
        .bind(&transfer.payment_intent_id)
        .bind(&transfer.seller_id)
        .bind(&transfer.cart_id)
        .bind(&transfer.destination_account)
        .bind(transfer.seller_total)
        .bind(transfer.amount)
        .bind(transfer.platform_fee)
        .fetch_one(&mut *conn)
        .await;
    match inserted {
        Ok(record) => {
            trace!("🗃️ Transfer ledger row reserved for {}/{}", record.payment_intent_id, record.seller_id);
            Ok(TransferReservation::Reserved(record))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            take_over_unfinished_transfer(transfer, conn).await
        },
        Err(e) => Err(e.into()),
    }
}

/// Unfinished rows are `failed`, or `pending` because an earlier delivery stopped before its outcome was written.
/// Every request for the same row reuses one gateway idempotency key.
async fn take_over_unfinished_transfer(
    transfer: &NewTransferRecord,
    conn: &mut SqliteConnection,
) -> Result<TransferReservation, MarketplaceDbError> {
    let q = format!(
        r#"UPDATE transfers SET
            status = 'pending',
            failure_reason = NULL,
            destination_account = $1,
            seller_total = $2,
            amount = $3,
            platform_fee = $4,
            updated_at = CURRENT_TIMESTAMP
        WHERE payment_intent_id = $5 AND seller_id = $6 AND status IN ('pending', 'failed')
        RETURNING {TRANSFER_COLUMNS}"#
    );
    let retried = sqlx::query_as::<_, TransferRecord>(&q)
        .bind(&transfer.destination_account)
        .bind(transfer.seller_total)
        .bind(transfer.amount)
        .bind(transfer.platform_fee)
        .bind(&transfer.payment_intent_id)
        .bind(&transfer.seller_id)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(record) = retried {
        debug!("🗃️ Unfinished transfer for {}/{} will be retried", record.payment_intent_id, record.seller_id);
        return Ok(TransferReservation::Reserved(record));
    }
    let existing = fetch_transfer(&transfer.payment_intent_id, &transfer.seller_id, conn).await?.ok_or_else(|| {
        MarketplaceDbError::InconsistentData(format!(
            "Transfer for {}/{} conflicts with an existing row that cannot be found",
            transfer.payment_intent_id, transfer.seller_id
        ))
    })?;
    Ok(TransferReservation::AlreadyRecorded(existing))
}

pub async fn fetch_transfer(
    payment_intent_id: &str,
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<TransferRecord>, MarketplaceDbError> {
    let q = format!("SELECT {TRANSFER_COLUMNS} FROM transfers WHERE payment_intent_id = $1 AND seller_id = $2");
    let record = sqlx::query_as(&q).bind(payment_intent_id).bind(seller_id).fetch_optional(conn).await?;
    Ok(record)
}

pub async fn fetch_transfers_for_payment_intent(
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<TransferRecord>, MarketplaceDbError> {
    let q = format!("SELECT {TRANSFER_COLUMNS} FROM transfers WHERE payment_intent_id = $1 ORDER BY seller_id");
    let records = sqlx::query_as(&q).bind(payment_intent_id).fetch_all(conn).await?;
    Ok(records)
}

pub async fn mark_created(
    payment_intent_id: &str,
    seller_id: &str,
    transfer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<TransferRecord>, MarketplaceDbError> {
    let q = format!(
        r#"UPDATE transfers SET status = 'created', transfer_id = $1, failure_reason = NULL,
            updated_at = CURRENT_TIMESTAMP
        WHERE payment_intent_id = $2 AND seller_id = $3 AND status <> 'created'
        RETURNING {TRANSFER_COLUMNS}"#
    );
    let record =
        sqlx::query_as(&q).bind(transfer_id).bind(payment_intent_id).bind(seller_id).fetch_optional(conn).await?;
    Ok(record)
}

pub async fn mark_failed(
    payment_intent_id: &str,
    seller_id: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<TransferRecord>, MarketplaceDbError> {
    let q = format!(
        r#"UPDATE transfers SET status = 'failed', failure_reason = $1, updated_at = CURRENT_TIMESTAMP
        WHERE payment_intent_id = $2 AND seller_id = $3 AND status <> 'created'
        RETURNING {TRANSFER_COLUMNS}"#
    );
    let record = sqlx::query_as(&q).bind(reason).bind(payment_intent_id).bind(seller_id).fetch_optional(conn).await?;
    Ok(record)
}
