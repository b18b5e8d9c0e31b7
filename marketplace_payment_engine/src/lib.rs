//! Marketplace Payment Engine
//!
//! The provider-agnostic core of the marketplace payment gateway. Buyers check out carts that may contain items from
//! many sellers; the engine collects the payment through the gateway, records the order, and pays each seller their
//! share less the platform fee through the gateway's connected accounts.
//!
//! The library is divided into these sections:
//! 1. Storage ([`traits`] and the SQLite backend in [`sqlite`]). Backends implement the storage traits; the data types
//!    they exchange live in [`db_types`].
//! 2. The payment gateway abstraction ([`traits::PaymentGateway`]). The server supplies a Stripe implementation; tests
//!    supply mocks.
//! 3. The public API ([`mpe_api`]): checkout, merchant account onboarding and webhook processing.
//!
//! The engine also emits events (a seller finished onboarding, an order was created, a seller was paid) that
//! integrations can subscribe to through [`events::EventHooks`].
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod mpe_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use mpe_api::{
    account_objects::{AccountStatus, OnboardingLink},
    checkout_api::CheckoutApi,
    checkout_objects::{OrderConfirmation, PaymentIntentResult},
    errors::{CheckoutError, MerchantAccountError, WebhookError},
    merchant_account_api::MerchantAccountApi,
    webhook_api::WebhookApi,
    webhook_objects::{PayoutOutcome, SellerPayoutOutcome, WebhookOutcome},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
