use std::env;

use log::*;
use mpg_common::{parse_boolean_flag, Secret, DEFAULT_CURRENCY_CODE};
use stripe_tools::StripeConfig;

use crate::errors::ServerError;

const DEFAULT_MPG_HOST: &str = "127.0.0.1";
const DEFAULT_MPG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/marketplace.db";
const DEFAULT_CLIENT_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The storefront's base url. Sellers return here after the onboarding flow.
    pub client_url: String,
    /// Three-letter currency code used for payment intents.
    pub currency: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address in the access log,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    pub stripe: StripeConfig,
    /// Seller notifications are only sent when this is configured.
    pub email: Option<EmailConfig>,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub from: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MPG_HOST.to_string(),
            port: DEFAULT_MPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            client_url: DEFAULT_CLIENT_URL.to_string(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            use_x_forwarded_for: false,
            stripe: StripeConfig::default(),
            email: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    /// Reads the configuration from `MPG_*` environment variables.
    ///
    /// Everything but the Stripe secrets has a default. Without the secrets the server cannot take payments or verify
    /// webhooks, so their absence is an error rather than a warning.
    pub fn try_from_env() -> Result<Self, ServerError> {
        let host = env::var("MPG_HOST").ok().unwrap_or_else(|| DEFAULT_MPG_HOST.into());
        let port = env::var("MPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MPG_PORT. {e} Using the default, {DEFAULT_MPG_PORT}, instead."
                    );
                    DEFAULT_MPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MPG_PORT);
        let database_url = env::var("MPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MPG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let client_url = env::var("MPG_CLIENT_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MPG_CLIENT_URL is not set. Onboarding links will return sellers to {DEFAULT_CLIENT_URL}.");
            DEFAULT_CLIENT_URL.to_string()
        });
        let currency = env::var("MPG_CURRENCY")
            .ok()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| s.len() == 3)
            .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        let use_x_forwarded_for = parse_boolean_flag(env::var("MPG_USE_X_FORWARDED_FOR").ok(), false);
        let stripe = StripeConfig::try_from_env().map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
        let email = EmailConfig::from_env();
        Ok(Self { host, port, database_url, client_url, currency, use_x_forwarded_for, stripe, email })
    }
}

impl EmailConfig {
    /// Returns `None`, with a warning, unless all of `MPG_EMAIL_API_URL`, `MPG_EMAIL_API_KEY` and `MPG_EMAIL_FROM`
    /// are set.
    pub fn from_env() -> Option<Self> {
        let api_url = env::var("MPG_EMAIL_API_URL").ok().filter(|s| !s.is_empty());
        let api_key = env::var("MPG_EMAIL_API_KEY").ok().filter(|s| !s.is_empty());
        let from = env::var("MPG_EMAIL_FROM").ok().filter(|s| !s.is_empty());
        match (api_url, api_key, from) {
            (Some(api_url), Some(api_key), Some(from)) => {
                info!("🪛️ Seller notifications will be sent from {from}");
                Some(Self { api_url, api_key: Secret::new(api_key), from })
            },
            _ => {
                warn!(
                    "🪛️ MPG_EMAIL_API_URL, MPG_EMAIL_API_KEY and MPG_EMAIL_FROM must all be set to send seller \
                     notifications. Notifications are disabled."
                );
                None
            },
        }
    }
}
