use thiserror::Error;

use crate::traits::{GatewayError, MarketplaceDbError};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Cart {0} does not exist")]
    CartNotFound(String),
    #[error("Cart {0} does not belong to the requesting user")]
    Unauthorized(String),
    #[error("Cart {0} has already been checked out")]
    CartAlreadyCompleted(String),
    #[error("Seller {0} has not connected a merchant account yet")]
    SellerNotOnboarded(String),
    #[error("Payment {payment_intent_id} has not succeeded. Its status is {status}")]
    PaymentNotSucceeded { payment_intent_id: String, status: String },
    #[error("Payment {payment_intent_id} was made for cart {paid_cart}, not {cart_id}")]
    CartMismatch { payment_intent_id: String, paid_cart: String, cart_id: String },
    #[error("{0}")]
    GatewayError(#[from] GatewayError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<MarketplaceDbError> for CheckoutError {
    fn from(e: MarketplaceDbError) -> Self {
        match e {
            MarketplaceDbError::CartNotFound(id) => Self::CartNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MerchantAccountError {
    #[error("User {0} does not exist")]
    UserNotFound(String),
    #[error("User {0} is not a seller. No merchant account has been connected")]
    NotASeller(String),
    #[error("{0}")]
    GatewayError(#[from] GatewayError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<MarketplaceDbError> for MerchantAccountError {
    fn from(e: MarketplaceDbError) -> Self {
        match e {
            MarketplaceDbError::UserNotFound(id) => Self::UserNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

/// Only failures that affect the whole event end up here. The gateway should deliver the event again.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] MarketplaceDbError),
}
