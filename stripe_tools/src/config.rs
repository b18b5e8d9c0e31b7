use std::env;

use log::*;
use mpg_common::Secret;

use crate::StripeApiError;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    /// The base url for REST calls. Only ever changed for testing.
    pub api_base: String,
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    /// Maximum age, in seconds, of a signed webhook before it is rejected.
    pub webhook_tolerance_secs: i64,
    pub request_timeout_secs: u64,
}

impl StripeConfig {
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            secret_key: Secret::new(secret_key.to_string()),
            webhook_secret: Secret::new(webhook_secret.to_string()),
            webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Loads the Stripe configuration from the environment.
    ///
    /// `MPG_STRIPE_SECRET_KEY` and `MPG_STRIPE_WEBHOOK_SECRET` are mandatory. There are no fallback values for secrets.
    pub fn try_from_env() -> Result<Self, StripeApiError> {
        let secret_key = required_secret("MPG_STRIPE_SECRET_KEY")?;
        let webhook_secret = required_secret("MPG_STRIPE_WEBHOOK_SECRET")?;
        let api_base = env::var("MPG_STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string());
        let webhook_tolerance_secs = env::var("MPG_WEBHOOK_TOLERANCE_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ {s} is not a valid value for MPG_WEBHOOK_TOLERANCE_SECS. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS);
        let request_timeout_secs = env::var("MPG_STRIPE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>().map_err(|e| warn!("🪛️ {s} is not a valid value for MPG_STRIPE_TIMEOUT_SECS. {e}")).ok()
            })
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if !secret_key.reveal().starts_with("sk_") && !secret_key.reveal().starts_with("rk_") {
            warn!("🪛️ MPG_STRIPE_SECRET_KEY does not look like a Stripe secret key. Requests will probably fail.");
        }
        Ok(Self { api_base, secret_key, webhook_secret, webhook_tolerance_secs, request_timeout_secs })
    }
}

fn required_secret(name: &str) -> Result<Secret<String>, StripeApiError> {
    match env::var(name) {
        Ok(s) if !s.trim().is_empty() => Ok(Secret::new(s)),
        _ => {
            error!("🪛️ {name} is not set. The server cannot talk to Stripe without it.");
            Err(StripeApiError::MissingConfiguration(name.to_string()))
        },
    }
}
