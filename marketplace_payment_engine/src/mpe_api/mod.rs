//! # Marketplace payment engine public API
//!
//! The API is split by who drives it:
//!
//! * [`checkout_api`] is driven by the buyer: it creates payment intents for carts and turns paid carts into orders.
//! * [`merchant_account_api`] is driven by sellers: it creates connected accounts and hands out onboarding and
//!   dashboard links.
//! * [`webhook_api`] is driven by the payment gateway: it applies account updates and pays sellers their share once a
//!   marketplace payment succeeds.
//!
//! Every API is created from a storage backend and a [`PaymentGateway`](crate::traits::PaymentGateway)
//! implementation:
//!
//! ```rust,ignore
//! use marketplace_payment_engine::{CheckoutApi, SqliteDatabase, events::EventProducers};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = CheckoutApi::new(db, my_gateway, EventProducers::default());
//! let intent = api.create_payment_intent("cart_1", "buyer_1").await?;
//! ```
pub mod account_objects;
pub mod checkout_api;
pub mod checkout_objects;
pub mod errors;
pub mod merchant_account_api;
pub mod merchant_sync;
pub mod webhook_api;
pub mod webhook_objects;
