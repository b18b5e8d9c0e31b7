//! Side effects of verified gateway webhook events.
//!
//! The gateway delivers events at least once, possibly late and in any order relative to the buyer's own
//! confirmation. Every effect here is therefore idempotent:
//! * merchant status updates are plain last-write-wins overwrites, and the onboarding notification is guarded by a
//!   flag that only one caller can flip;
//! * seller transfers are guarded by a ledger row per `(payment intent, seller)` that is reserved *before* the
//!   transfer is requested, and the request itself carries an idempotency key derived from the same pair. Only a
//!   `created` row stops a redelivery; `pending` and `failed` rows are requested again under the same key until the
//!   gateway's answer is recorded.
use std::{collections::BTreeMap, fmt::Debug};

use log::*;
use mpg_common::{Cents, DEFAULT_CURRENCY_CODE};

use crate::{
    db_types::{NewTransferRecord, TransferRecord, TransferReservation},
    events::{EventProducers, TransferCreatedEvent},
    helpers::{seller_totals, SellerLine, SellerPayout},
    mpe_api::{
        errors::WebhookError,
        merchant_sync::sync_merchant_account,
        webhook_objects::{PayoutOutcome, SellerPayoutOutcome, WebhookOutcome},
    },
    traits::{
        CartManagement,
        ConnectedAccount,
        GatewayEvent,
        MarketplaceDbError,
        NewTransfer,
        OrderManagement,
        PaymentGateway,
        PaymentIntent,
        SellerManagement,
        TransferLedger,
    },
};

pub struct WebhookApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for WebhookApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi")
    }
}

impl<B, G> WebhookApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }
}

impl<B, G> WebhookApi<B, G>
where
    B: CartManagement + OrderManagement + SellerManagement + TransferLedger,
    G: PaymentGateway,
{
    pub async fn process_event(&self, event: GatewayEvent) -> Result<WebhookOutcome, WebhookError> {
        match event {
            GatewayEvent::AccountUpdated(account) => self.on_account_updated(&account).await,
            GatewayEvent::PaymentIntentSucceeded(intent) => self.on_payment_succeeded(&intent).await,
            GatewayEvent::Ignored(event_type) => {
                trace!("🪝 Ignoring {event_type} event");
                Ok(WebhookOutcome::Ignored(event_type))
            },
        }
    }

    async fn on_account_updated(&self, account: &ConnectedAccount) -> Result<WebhookOutcome, WebhookError> {
        debug!("🪝 account.updated for {}", account.id);
        let outcome = match sync_merchant_account(&self.db, &self.producers, account).await? {
            Some(synced) => WebhookOutcome::AccountUpdated { user_id: synced.user.id, onboarded: synced.newly_onboarded },
            None => WebhookOutcome::UnknownAccount(account.id.clone()),
        };
        Ok(outcome)
    }

    async fn on_payment_succeeded(&self, intent: &PaymentIntent) -> Result<WebhookOutcome, WebhookError> {
        let Some(meta) = intent.checkout_metadata() else {
            debug!("🪝 Payment {} has no cart attached. Nothing to pay out", intent.id);
            return Ok(WebhookOutcome::Ignored(format!("{} has no cart", intent.id)));
        };
        let Some(marketplace) = meta.marketplace else {
            debug!("🪝 Payment {} for cart {} is a standard checkout. Nothing to pay out", intent.id, meta.cart_id);
            return Ok(WebhookOutcome::Ignored(format!("{} is not a marketplace payment", intent.id)));
        };
        let totals = self.seller_totals_for_payment(&meta.cart_id, &intent.id).await?;
        if totals.is_empty() {
            warn!("🪝 Payment {} for cart {} has no seller items to pay out", intent.id, meta.cart_id);
            return Ok(WebhookOutcome::Payouts(Vec::new()));
        }
        info!("💸 Splitting payment {} among {} sellers", intent.id, totals.len());
        let mut outcomes = Vec::with_capacity(totals.len());
        for (seller_id, seller_total) in totals {
            let payout = SellerPayout::new(seller_total, marketplace.platform_fee_percent);
            let outcome = self.pay_seller(intent, &meta.cart_id, &seller_id, payout).await?;
            outcomes.push(SellerPayoutOutcome { seller_id, outcome });
        }
        Ok(WebhookOutcome::Payouts(outcomes))
    }

    /// The finalizer may already have completed the cart and cleared its items, in which case the order holds the
    /// items that were paid for.
    async fn seller_totals_for_payment(
        &self,
        cart_id: &str,
        payment_intent_id: &str,
    ) -> Result<BTreeMap<String, Cents>, MarketplaceDbError> {
        let cart = self.db.fetch_cart(cart_id).await?;
        let order = match &cart {
            Some(cart) if !cart.is_completed() => return checked_seller_totals(&cart.items, cart_id),
            Some(cart) => match &cart.order_id {
                Some(order_id) => self.db.fetch_order(order_id).await?,
                None => None,
            },
            None => None,
        };
        let order = match order {
            Some(order) => Some(order),
            None => self.db.fetch_order_for_payment_intent(payment_intent_id).await?,
        };
        match order {
            Some(order) => {
                trace!("🪝 Cart {cart_id} is completed. Using the items of order {}", order.id);
                checked_seller_totals(&order.items, cart_id)
            },
            None => {
                warn!("🪝 Neither cart {cart_id} nor an order for {payment_intent_id} could be found");
                Ok(BTreeMap::new())
            },
        }
    }

    /// Transfers one seller's share, at most once. Gateway failures are confined to this seller; database failures
    /// abort the whole event.
    async fn pay_seller(
        &self,
        intent: &PaymentIntent,
        cart_id: &str,
        seller_id: &str,
        payout: SellerPayout,
    ) -> Result<PayoutOutcome, MarketplaceDbError> {
        let seller = self.db.fetch_user(seller_id).await?;
        let Some(destination) = seller.as_ref().and_then(|u| u.stripe_account_id()).map(String::from) else {
            warn!("💸 Seller {seller_id} has no connected account. Their share of {} is not transferred", intent.id);
            return Ok(PayoutOutcome::Skipped(format!("Seller {seller_id} has no connected account")));
        };
        if payout.seller_amount <= Cents::from(0) {
            debug!("💸 Seller {seller_id} is owed nothing for {}", intent.id);
            return Ok(PayoutOutcome::Skipped("Nothing to transfer".to_string()));
        }
        let record = NewTransferRecord {
            payment_intent_id: intent.id.clone(),
            seller_id: seller_id.to_string(),
            cart_id: cart_id.to_string(),
            destination_account: destination.clone(),
            seller_total: payout.seller_total,
            amount: payout.seller_amount,
            platform_fee: payout.platform_fee,
        };
        let reserved = match self.db.reserve_transfer(record).await? {
            TransferReservation::Reserved(record) => record,
            TransferReservation::AlreadyRecorded(existing) => {
                info!(
                    "💸 A {} transfer for {}/{seller_id} is already recorded. Skipping the duplicate",
                    existing.status, intent.id
                );
                return Ok(PayoutOutcome::Duplicate);
            },
        };
        let transfer = NewTransfer {
            amount: reserved.amount,
            currency: currency_of(intent),
            destination,
            source_transaction: intent.latest_charge.clone(),
            transfer_group: Some(format!("cart_{cart_id}")),
            idempotency_key: format!("transfer_{}_{seller_id}", intent.id),
            metadata: transfer_metadata(&reserved),
        };
        match self.gateway.create_transfer(transfer).await {
            Ok(transfer) => {
                let Some(record) = self.db.mark_transfer_created(&intent.id, seller_id, &transfer.id).await? else {
                    debug!("💸 Transfer {} for {}/{seller_id} was recorded by another delivery", transfer.id, intent.id);
                    return Ok(PayoutOutcome::Duplicate);
                };
                info!(
                    "💸 Transferred {} to seller {seller_id} ({}). Platform fee {}",
                    record.amount, transfer.destination, record.platform_fee
                );
                self.call_transfer_created_hook(record).await;
                Ok(PayoutOutcome::Transferred(transfer.id))
            },
            Err(e) => {
                error!("💸 Transfer of {} to seller {seller_id} for {} failed. {e}", reserved.amount, intent.id);
                let reason = e.to_string();
                self.db.mark_transfer_failed(&intent.id, seller_id, &reason).await?;
                Ok(PayoutOutcome::Failed(reason))
            },
        }
    }

    async fn call_transfer_created_hook(&self, record: TransferRecord) {
        let event = TransferCreatedEvent::new(record);
        for producer in &self.producers.transfer_created_producer {
            trace!("📬️ Publishing transfer created event for {}", event.transfer.seller_id);
            producer.publish_event(event.clone()).await;
        }
    }
}

fn checked_seller_totals<T: SellerLine>(
    items: &[T],
    cart_id: &str,
) -> Result<BTreeMap<String, Cents>, MarketplaceDbError> {
    seller_totals(items)
        .ok_or_else(|| MarketplaceDbError::InvalidData(format!("Seller totals for cart {cart_id} overflow")))
}

fn currency_of(intent: &PaymentIntent) -> String {
    if intent.currency.is_empty() {
        DEFAULT_CURRENCY_CODE.to_string()
    } else {
        intent.currency.clone()
    }
}

fn transfer_metadata(record: &TransferRecord) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("paymentIntentId".to_string(), record.payment_intent_id.clone());
    metadata.insert("sellerId".to_string(), record.seller_id.clone());
    metadata.insert("cartId".to_string(), record.cart_id.clone());
    metadata.insert("sellerTotal".to_string(), record.seller_total.value().to_string());
    metadata.insert("platformFee".to_string(), record.platform_fee.value().to_string());
    metadata
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn intent_currency_falls_back_to_default() {
        let mut intent = PaymentIntent {
            id: "pi_1".into(),
            amount: Cents::from(100),
            currency: String::new(),
            status: crate::traits::PaymentIntentStatus::Succeeded,
            client_secret: None,
            metadata: BTreeMap::new(),
            latest_charge: None,
        };
        assert_eq!(currency_of(&intent), "usd");
        intent.currency = "eur".into();
        assert_eq!(currency_of(&intent), "eur");
    }
}
