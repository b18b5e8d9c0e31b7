//! Buyer-side checkout: payment intent creation and payment confirmation.
use std::{collections::BTreeSet, fmt::Debug};

use log::*;
use mpg_common::DEFAULT_CURRENCY_CODE;

use crate::{
    db_types::{Cart, OrderFromCartResult},
    events::{EventProducers, OrderCreatedEvent},
    helpers::PLATFORM_FEE_PERCENT,
    mpe_api::{
        checkout_objects::{OrderConfirmation, PaymentIntentResult},
        errors::CheckoutError,
    },
    traits::{
        CartManagement,
        CheckoutMetadata,
        GatewayError,
        MarketplaceMetadata,
        NewPaymentIntent,
        OrderManagement,
        PaymentGateway,
        SellerManagement,
    },
};

pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    currency: String,
    producers: EventProducers,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({})", self.currency)
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, currency: DEFAULT_CURRENCY_CODE.to_string(), producers }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn currency(&self) -> &str {
        self.currency.as_str()
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: CartManagement + OrderManagement + SellerManagement,
    G: PaymentGateway,
{
    /// Requests a payment intent for the full cart total.
    ///
    /// If any item in the cart is attributed to a seller, this is a marketplace checkout. Every seller in the cart
    /// must then have a connected account, and the intent carries the metadata the webhook processor needs to split
    /// the proceeds later. Otherwise a standard intent tagged with just the cart and buyer is created.
    pub async fn create_payment_intent(
        &self,
        cart_id: &str,
        user_id: &str,
    ) -> Result<PaymentIntentResult, CheckoutError> {
        let cart = self.db.fetch_cart(cart_id).await?.ok_or_else(|| CheckoutError::CartNotFound(cart_id.into()))?;
        if cart.user_id != user_id {
            warn!("🛒 User {user_id} tried to check out cart {cart_id}, which belongs to someone else");
            return Err(CheckoutError::Unauthorized(cart_id.into()));
        }
        if cart.is_completed() {
            return Err(CheckoutError::CartAlreadyCompleted(cart_id.into()));
        }
        let metadata = if cart.is_marketplace() {
            let seller_count = self.check_sellers_are_onboarded(&cart).await?;
            CheckoutMetadata::marketplace(cart_id, user_id, MarketplaceMetadata {
                item_count: cart.items.len(),
                seller_count,
                platform_fee_percent: PLATFORM_FEE_PERCENT,
            })
        } else {
            CheckoutMetadata::standard(cart_id, user_id)
        };
        let is_marketplace = metadata.is_marketplace();
        let request = NewPaymentIntent { amount: cart.total_amount, currency: self.currency.clone(), metadata };
        let intent = self.gateway.create_payment_intent(request).await.map_err(|e| {
            error!("🛒 Could not create a payment intent for cart {cart_id}. {e}");
            e
        })?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            GatewayError::InvalidResponse(format!("Payment intent {} has no client secret", intent.id))
        })?;
        info!(
            "🛒 Payment intent {} created for cart {cart_id} ({}, {})",
            intent.id,
            cart.total_amount,
            if is_marketplace { "marketplace" } else { "standard" }
        );
        Ok(PaymentIntentResult { payment_intent_id: intent.id, client_secret, is_marketplace })
    }

    /// Returns the number of distinct sellers in the cart, or the first seller that cannot be paid.
    async fn check_sellers_are_onboarded(&self, cart: &Cart) -> Result<usize, CheckoutError> {
        let sellers = cart.items.iter().filter_map(|i| i.seller_id.as_deref()).collect::<BTreeSet<&str>>();
        for seller_id in &sellers {
            let user = self.db.fetch_user(seller_id).await?;
            if user.as_ref().and_then(|u| u.stripe_account_id()).is_none() {
                info!("🛒 Cart {} contains items from seller {seller_id}, who cannot receive payouts", cart.id);
                return Err(CheckoutError::SellerNotOnboarded(seller_id.to_string()));
            }
        }
        Ok(sellers.len())
    }

    /// Turns the cart into a paid order once the gateway confirms that the payment succeeded.
    ///
    /// Calling this again for the same cart is harmless: the existing order id is returned and nothing else changes.
    pub async fn confirm_payment(
        &self,
        payment_intent_id: &str,
        cart_id: &str,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let intent = self.gateway.retrieve_payment_intent(payment_intent_id).await?;
        if !intent.is_succeeded() {
            info!("🧾 Payment {payment_intent_id} for cart {cart_id} is {}. Not creating an order", intent.status);
            return Err(CheckoutError::PaymentNotSucceeded {
                payment_intent_id: payment_intent_id.into(),
                status: intent.status.to_string(),
            });
        }
        if let Some(meta) = intent.checkout_metadata() {
            if meta.cart_id != cart_id {
                warn!("🧾 Payment {payment_intent_id} was made for cart {}, but {cart_id} was confirmed", meta.cart_id);
                return Err(CheckoutError::CartMismatch {
                    payment_intent_id: payment_intent_id.into(),
                    paid_cart: meta.cart_id,
                    cart_id: cart_id.into(),
                });
            }
        }
        let order_id = new_order_id();
        match self.db.create_order_from_cart(cart_id, &order_id, payment_intent_id).await? {
            OrderFromCartResult::Created(order) => {
                info!("🧾 Order {} created from cart {cart_id} for {}", order.id, order.total_amount);
                match self.db.clear_cart_items(cart_id).await {
                    Ok(n) => trace!("🧾 {n} items removed from cart {cart_id}"),
                    Err(e) => warn!("🧾 Could not clear the items of completed cart {cart_id}. {e}"),
                }
                let order_id = order.id.clone();
                self.call_order_created_hook(OrderCreatedEvent::new(order)).await;
                Ok(OrderConfirmation { order_id, already_completed: false })
            },
            OrderFromCartResult::AlreadyCompleted(order_id) => {
                debug!("🧾 Cart {cart_id} was already checked out as order {order_id}");
                Ok(OrderConfirmation { order_id, already_completed: true })
            },
        }
    }

    async fn call_order_created_hook(&self, event: OrderCreatedEvent) {
        for producer in &self.producers.order_created_producer {
            trace!("📬️ Publishing order created event for {}", event.order.id);
            producer.publish_event(event.clone()).await;
        }
    }
}

fn new_order_id() -> String {
    format!("ord_{}", uuid::Uuid::new_v4().simple())
}
