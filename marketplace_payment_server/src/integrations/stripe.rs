//! Stripe as the marketplace's [`PaymentGateway`].
//!
//! This is the only place that knows both the engine's gateway types and Stripe's wire objects. Webhook events are
//! decoded here as well, so the engine only ever sees [`GatewayEvent`]s.
use std::collections::BTreeMap;

use log::*;
use marketplace_payment_engine::traits::{
    AccountRequirements,
    ConnectedAccount,
    GatewayError,
    GatewayEvent,
    GatewayTransfer,
    NewConnectedAccount,
    NewPaymentIntent,
    NewTransfer,
    PaymentGateway,
    PaymentIntent,
    PaymentIntentStatus,
};
use mpg_common::Cents;
use stripe_tools::{
    Account,
    ExpressAccountParams,
    PaymentIntent as StripePaymentIntent,
    PaymentIntentParams,
    StripeApi,
    StripeApiError,
    StripeConfig,
    StripeEvent,
    TransferParams,
};
use thiserror::Error;

pub const ACCOUNT_UPDATED: &str = "account.updated";
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Error)]
#[error("Could not decode the {event_type} event {event_id}. {message}")]
pub struct EventConversionError {
    pub event_id: String,
    pub event_type: String,
    pub message: String,
}

#[derive(Clone)]
pub struct StripeGateway {
    api: StripeApi,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let api = StripeApi::new(config)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &StripeApi {
        &self.api
    }
}

impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError> {
        let cart_id = intent.metadata.cart_id.clone();
        let transfer_group = intent.metadata.is_marketplace().then(|| format!("cart_{cart_id}"));
        let params = PaymentIntentParams {
            amount: intent.amount.value(),
            currency: intent.currency,
            metadata: intent.metadata.to_map(),
            description: Some(format!("Marketplace cart {cart_id}")),
            transfer_group,
        };
        let intent = self.api.create_payment_intent(&params).await.map_err(gateway_error)?;
        Ok(to_payment_intent(intent))
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let intent = self.api.retrieve_payment_intent(payment_intent_id).await.map_err(gateway_error)?;
        Ok(to_payment_intent(intent))
    }

    async fn create_connected_account(&self, account: NewConnectedAccount) -> Result<ConnectedAccount, GatewayError> {
        let params = express_account_params(account);
        let account = self.api.create_express_account(&params).await.map_err(gateway_error)?;
        Ok(to_connected_account(account))
    }

    async fn retrieve_connected_account(&self, account_id: &str) -> Result<ConnectedAccount, GatewayError> {
        let account = self.api.retrieve_account(account_id).await.map_err(gateway_error)?;
        Ok(to_connected_account(account))
    }

    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, GatewayError> {
        let link = self.api.create_account_link(account_id, refresh_url, return_url).await.map_err(gateway_error)?;
        Ok(link.url)
    }

    async fn create_dashboard_link(&self, account_id: &str) -> Result<String, GatewayError> {
        let link = self.api.create_login_link(account_id).await.map_err(gateway_error)?;
        Ok(link.url)
    }

    async fn create_transfer(&self, transfer: NewTransfer) -> Result<GatewayTransfer, GatewayError> {
        let NewTransfer {
            amount,
            currency,
            destination,
            source_transaction,
            transfer_group,
            idempotency_key,
            metadata,
        } = transfer;
        let params =
            TransferParams { amount: amount.value(), currency, destination, source_transaction, transfer_group, metadata };
        let transfer = self.api.create_transfer(&params, &idempotency_key).await.map_err(gateway_error)?;
        Ok(GatewayTransfer { id: transfer.id, amount: Cents::from(transfer.amount), destination: transfer.destination })
    }
}

/// Decodes a verified webhook event into the cases the engine handles.
pub fn to_gateway_event(event: StripeEvent) -> Result<GatewayEvent, EventConversionError> {
    let StripeEvent { id, event_type, data, .. } = event;
    let conversion_error = |e: serde_json::Error| EventConversionError {
        event_id: id.clone(),
        event_type: event_type.clone(),
        message: e.to_string(),
    };
    let event = match event_type.as_str() {
        ACCOUNT_UPDATED => {
            let account = serde_json::from_value::<Account>(data.object).map_err(conversion_error)?;
            GatewayEvent::AccountUpdated(to_connected_account(account))
        },
        PAYMENT_INTENT_SUCCEEDED => {
            let intent = serde_json::from_value::<StripePaymentIntent>(data.object).map_err(conversion_error)?;
            GatewayEvent::PaymentIntentSucceeded(to_payment_intent(intent))
        },
        _ => GatewayEvent::Ignored(event_type),
    };
    trace!("💳️ Decoded event {id}");
    Ok(event)
}

fn gateway_error(e: StripeApiError) -> GatewayError {
    match e {
        StripeApiError::QueryError { status, message } => GatewayError::RequestFailed { status, message },
        StripeApiError::JsonError(s) => GatewayError::InvalidResponse(s),
        StripeApiError::RestResponseError(s) => GatewayError::Unavailable(s),
        e @ (StripeApiError::Initialization(_) | StripeApiError::MissingConfiguration(_)) => {
            GatewayError::Unavailable(e.to_string())
        },
    }
}

fn to_payment_intent(intent: StripePaymentIntent) -> PaymentIntent {
    let status = intent.status.parse::<PaymentIntentStatus>().unwrap_or_else(|never| match never {});
    PaymentIntent {
        id: intent.id,
        amount: Cents::from(intent.amount),
        currency: intent.currency,
        status,
        client_secret: intent.client_secret,
        metadata: intent.metadata,
        latest_charge: intent.latest_charge,
    }
}

fn to_connected_account(account: Account) -> ConnectedAccount {
    let requirements = account
        .requirements
        .map(|r| AccountRequirements {
            currently_due: r.currently_due,
            eventually_due: r.eventually_due,
            past_due: r.past_due,
            pending_verification: r.pending_verification,
            disabled_reason: r.disabled_reason,
            current_deadline: r.current_deadline,
        })
        .unwrap_or_default();
    ConnectedAccount {
        id: account.id,
        details_submitted: account.details_submitted,
        payouts_enabled: account.payouts_enabled,
        charges_enabled: account.charges_enabled,
        requirements,
    }
}

fn express_account_params(account: NewConnectedAccount) -> ExpressAccountParams {
    let NewConnectedAccount { user_id, email, profile } = account;
    let mut metadata = BTreeMap::new();
    metadata.insert("userId".to_string(), user_id);
    metadata.insert("sellerType".to_string(), profile.seller_type);
    metadata.insert("location".to_string(), profile.location);
    metadata.retain(|_, v| !v.is_empty());
    ExpressAccountParams {
        email,
        country: None,
        business_name: non_empty(profile.seller_name),
        product_description: non_empty(profile.seller_bio),
        support_email: non_empty(profile.contact_email),
        support_phone: non_empty(profile.contact_phone),
        metadata,
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.trim().is_empty()).then_some(s)
}
