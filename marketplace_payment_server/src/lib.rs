//! # Marketplace payment server
//! This crate hosts the HTTP front end of the marketplace payment gateway. It is responsible for:
//! * Creating payment intents for buyers' carts, and turning paid carts into orders.
//! * Onboarding sellers onto Stripe Connect Express accounts.
//! * Receiving Stripe webhooks, which keep merchant accounts up to date and trigger the seller payouts.
//!
//! The business rules live in [`marketplace_payment_engine`]; this crate supplies the Stripe gateway, the email
//! notifications and the HTTP plumbing.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /create-payment-intent`, `POST /confirm-payment`: buyer checkout.
//! * `POST /create-connected-account`, `GET /get-account-status`, `GET /refresh-account-link`,
//!   `GET /get-dashboard-link`: seller onboarding.
//! * `POST /stripe-webhook`: Stripe events. Requests must carry a valid `Stripe-Signature` header.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
