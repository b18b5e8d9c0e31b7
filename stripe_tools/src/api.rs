use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::StripeErrorResponse,
    Account,
    AccountLink,
    ExpressAccountParams,
    FormParams,
    LoginLink,
    PaymentIntent,
    PaymentIntentParams,
    StripeApiError,
    Transfer,
    TransferParams,
};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        if config.secret_key.reveal().is_empty() {
            return Err(StripeApiError::MissingConfiguration("Stripe secret key".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Sends a request to the Stripe API. Request bodies are form-encoded.
    ///
    /// When an idempotency key is given, Stripe guarantees that retries of the same request have at most one effect.
    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: Option<&FormParams>,
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url).bearer_auth(self.config.secret_key.reveal());
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        if let Some(form) = form {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            trace!("💳️ REST query successful. {status}");
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let body = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            let message = match serde_json::from_str::<StripeErrorResponse>(&body) {
                Ok(StripeErrorResponse { error }) => {
                    debug!(
                        "💳️ Stripe error. type: {}, code: {}",
                        error.error_type.as_deref().unwrap_or("unknown"),
                        error.code.as_deref().unwrap_or("none")
                    );
                    error.message.unwrap_or(body)
                },
                Err(_) => body,
            };
            Err(StripeApiError::QueryError { status: status.as_u16(), message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base.trim_end_matches('/'))
    }

    pub async fn create_payment_intent(&self, params: &PaymentIntentParams) -> Result<PaymentIntent, StripeApiError> {
        debug!("💳️ Creating payment intent for {} {}", params.amount, params.currency);
        let form = params.to_form();
        let intent = self.rest_query::<PaymentIntent>(Method::POST, "/payment_intents", Some(&form), None).await?;
        info!("💳️ Created payment intent {}", intent.id);
        Ok(intent)
    }

    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeApiError> {
        let path = format!("/payment_intents/{id}");
        debug!("💳️ Fetching payment intent {id}");
        self.rest_query::<PaymentIntent>(Method::GET, &path, None, None).await
    }

    pub async fn create_express_account(&self, params: &ExpressAccountParams) -> Result<Account, StripeApiError> {
        debug!("💳️ Creating express account for {}", params.email);
        let form = params.to_form();
        let account = self.rest_query::<Account>(Method::POST, "/accounts", Some(&form), None).await?;
        info!("💳️ Created connected account {}", account.id);
        Ok(account)
    }

    pub async fn retrieve_account(&self, account_id: &str) -> Result<Account, StripeApiError> {
        let path = format!("/accounts/{account_id}");
        debug!("💳️ Fetching connected account {account_id}");
        self.rest_query::<Account>(Method::GET, &path, None, None).await
    }

    /// Creates a single-use onboarding link for the connected account.
    pub async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink, StripeApiError> {
        let mut form = FormParams::new();
        form.push("account", account_id)
            .push("refresh_url", refresh_url)
            .push("return_url", return_url)
            .push("type", "account_onboarding");
        debug!("💳️ Creating onboarding link for {account_id}");
        self.rest_query::<AccountLink>(Method::POST, "/account_links", Some(&form), None).await
    }

    /// Creates a login link to the Express dashboard of the connected account.
    pub async fn create_login_link(&self, account_id: &str) -> Result<LoginLink, StripeApiError> {
        let path = format!("/accounts/{account_id}/login_links");
        debug!("💳️ Creating dashboard link for {account_id}");
        self.rest_query::<LoginLink>(Method::POST, &path, None, None).await
    }

    pub async fn create_transfer(
        &self,
        params: &TransferParams,
        idempotency_key: &str,
    ) -> Result<Transfer, StripeApiError> {
        debug!("💳️ Transferring {} {} to {}", params.amount, params.currency, params.destination);
        let form = params.to_form();
        let transfer =
            self.rest_query::<Transfer>(Method::POST, "/transfers", Some(&form), Some(idempotency_key)).await?;
        info!("💳️ Created transfer {} to {}", transfer.id, transfer.destination);
        Ok(transfer)
    }
}
