//! # Stripe tools
//!
//! A small, typed client for the subset of the Stripe REST API the marketplace gateway needs:
//!
//! * Payment intents (create, retrieve)
//! * Express connected accounts (create, retrieve), onboarding account links and dashboard login links
//! * Transfers to connected accounts, with idempotency keys
//! * Webhook signature verification ([`webhook`])
//!
//! Requests are form-encoded, as the Stripe API expects. Nested parameters (e.g. `metadata[cartId]`) are built with
//! [`FormParams`].
mod api;
mod config;
mod error;

mod data_objects;
pub mod helpers;
pub mod webhook;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{
    Account,
    AccountLink,
    AccountRequirements,
    EventData,
    ExpressAccountParams,
    LoginLink,
    PaymentIntent,
    PaymentIntentParams,
    StripeEvent,
    Transfer,
    TransferParams,
};
pub use error::StripeApiError;
pub use helpers::FormParams;
pub use webhook::{compute_signature, construct_event, verify_signature, WebhookSignatureError, SIGNATURE_HEADER};
