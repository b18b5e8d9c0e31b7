use thiserror::Error;

use crate::traits::{
    ConnectedAccount,
    GatewayTransfer,
    NewConnectedAccount,
    NewPaymentIntent,
    NewTransfer,
    PaymentIntent,
};

/// The external payment provider.
///
/// The engine only ever talks to the provider through this trait, so that it can be mocked in tests and so that the
/// provider-specific wire formats stay in the server's integration layer.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Creates an Express connected account for a seller, requesting card payment and transfer capabilities.
    async fn create_connected_account(&self, account: NewConnectedAccount) -> Result<ConnectedAccount, GatewayError>;

    async fn retrieve_connected_account(&self, account_id: &str) -> Result<ConnectedAccount, GatewayError>;

    /// Returns the url of a fresh, single-use onboarding link.
    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, GatewayError>;

    /// Returns the url of a login link to the seller's dashboard.
    async fn create_dashboard_link(&self, account_id: &str) -> Result<String, GatewayError>;

    async fn create_transfer(&self, transfer: NewTransfer) -> Result<GatewayTransfer, GatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway rejected the request ({status}). {message}")]
    RequestFailed { status: u16, message: String },
    #[error("The payment gateway could not be reached. {0}")]
    Unavailable(String),
    #[error("The payment gateway sent an unexpected response. {0}")]
    InvalidResponse(String),
}
