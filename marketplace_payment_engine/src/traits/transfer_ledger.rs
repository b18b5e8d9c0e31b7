use crate::{
    db_types::{NewTransferRecord, TransferRecord, TransferReservation},
    traits::MarketplaceDbError,
};

#[allow(async_fn_in_trait)]
pub trait TransferLedger {
    /// Reserves the ledger row for `(payment_intent_id, seller_id)` before any money moves.
    ///
    /// * No row yet: a `pending` row is inserted and returned as [`TransferReservation::Reserved`].
    /// * A `pending` or `failed` row: it is reset to `pending` with the new amounts and returned as `Reserved` (a
    ///   retry). A `pending` row means an earlier attempt never recorded its outcome.
    /// * A `created` row: returned as [`TransferReservation::AlreadyRecorded`]; the caller must not request another
    ///   transfer.
    async fn reserve_transfer(&self, transfer: NewTransferRecord) -> Result<TransferReservation, MarketplaceDbError>;

    /// Returns `None` if the row had already been marked as created by a concurrent delivery.
    async fn mark_transfer_created(
        &self,
        payment_intent_id: &str,
        seller_id: &str,
        transfer_id: &str,
    ) -> Result<Option<TransferRecord>, MarketplaceDbError>;

    /// A `created` row is left as it is and returned unchanged.
    async fn mark_transfer_failed(
        &self,
        payment_intent_id: &str,
        seller_id: &str,
        reason: &str,
    ) -> Result<TransferRecord, MarketplaceDbError>;

    async fn fetch_transfers_for_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Vec<TransferRecord>, MarketplaceDbError>;
}
