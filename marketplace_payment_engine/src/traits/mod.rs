//! # Backend contracts
//!
//! The traits in this module define what the marketplace engine needs from the outside world.
//!
//! * [`CartManagement`] reads (and seeds) shopping carts.
//! * [`OrderManagement`] turns completed carts into orders, atomically.
//! * [`SellerManagement`] keeps seller profiles and the merchant account registry.
//! * [`TransferLedger`] is the append-only record of seller payouts, and the duplicate-delivery guard for webhooks.
//! * [`PaymentGateway`] is the external payment provider (connected accounts, payment intents and transfers).
//!
//! [`MarketplaceDatabase`] is implemented for every type that implements all four storage traits.
mod cart_management;
mod data_objects;
mod order_management;
mod payment_gateway;
mod seller_management;
mod transfer_ledger;

pub use cart_management::CartManagement;
pub use data_objects::{
    AccountRequirements,
    CheckoutMetadata,
    ConnectedAccount,
    GatewayEvent,
    GatewayTransfer,
    MarketplaceMetadata,
    NewConnectedAccount,
    NewPaymentIntent,
    NewTransfer,
    PaymentIntent,
    PaymentIntentStatus,
};
pub use order_management::OrderManagement;
pub use payment_gateway::{GatewayError, PaymentGateway};
pub use seller_management::SellerManagement;
use thiserror::Error;
pub use transfer_ledger::TransferLedger;

/// The full set of storage behaviour the marketplace engine requires.
pub trait MarketplaceDatabase: CartManagement + OrderManagement + SellerManagement + TransferLedger {}

impl<T> MarketplaceDatabase for T where T: CartManagement + OrderManagement + SellerManagement + TransferLedger {}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceDbError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested cart {0} does not exist")]
    CartNotFound(String),
    #[error("Cannot insert cart, since it already exists with id {0}")]
    CartAlreadyExists(String),
    #[error("The requested user {0} does not exist")]
    UserNotFound(String),
    #[error("Cannot insert invalid data. {0}")]
    InvalidData(String),
    #[error("Stored data is inconsistent. {0}")]
    InconsistentData(String),
}

impl From<sqlx::Error> for MarketplaceDbError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceDbError::DatabaseError(e.to_string())
    }
}
