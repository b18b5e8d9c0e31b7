use marketplace_payment_engine::traits::{
    ConnectedAccount,
    GatewayError,
    GatewayTransfer,
    NewConnectedAccount,
    NewPaymentIntent,
    NewTransfer,
    PaymentGateway,
    PaymentIntent,
};
use mockall::mock;

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError>;
        async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent, GatewayError>;
        async fn create_connected_account(&self, account: NewConnectedAccount) -> Result<ConnectedAccount, GatewayError>;
        async fn retrieve_connected_account(&self, account_id: &str) -> Result<ConnectedAccount, GatewayError>;
        async fn create_onboarding_link(&self, account_id: &str, refresh_url: &str, return_url: &str) -> Result<String, GatewayError>;
        async fn create_dashboard_link(&self, account_id: &str) -> Result<String, GatewayError>;
        async fn create_transfer(&self, transfer: NewTransfer) -> Result<GatewayTransfer, GatewayError>;
    }
}
