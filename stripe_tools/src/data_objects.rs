use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::FormParams;

//--------------------------------------    PaymentIntent     ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    /// One of `requires_payment_method`, `requires_confirmation`, `requires_action`, `processing`,
    /// `requires_capture`, `canceled` or `succeeded`.
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// The charge that settled the intent. Transfers are funded from this charge.
    #[serde(default)]
    pub latest_charge: Option<String>,
    #[serde(default)]
    pub created: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentIntentParams {
    pub amount: i64,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
    pub description: Option<String>,
    pub transfer_group: Option<String>,
}

impl PaymentIntentParams {
    pub fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push("amount", self.amount)
            .push("currency", &self.currency)
            .push("automatic_payment_methods[enabled]", true)
            .push_opt("description", self.description.as_ref())
            .push_opt("transfer_group", self.transfer_group.as_ref())
            .push_map("metadata", &self.metadata);
        form
    }
}

//--------------------------------------       Account        ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub requirements: Option<AccountRequirements>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRequirements {
    #[serde(default)]
    pub currently_due: Vec<String>,
    #[serde(default)]
    pub eventually_due: Vec<String>,
    #[serde(default)]
    pub past_due: Vec<String>,
    #[serde(default)]
    pub pending_verification: Vec<String>,
    #[serde(default)]
    pub disabled_reason: Option<String>,
    #[serde(default)]
    pub current_deadline: Option<i64>,
}

/// Parameters for creating an Express connected account. Card payments and transfers capabilities are always
/// requested.
#[derive(Debug, Clone, Default)]
pub struct ExpressAccountParams {
    pub email: String,
    pub country: Option<String>,
    pub business_name: Option<String>,
    pub product_description: Option<String>,
    pub support_email: Option<String>,
    pub support_phone: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl ExpressAccountParams {
    pub fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push("type", "express")
            .push("email", &self.email)
            .push_opt("country", self.country.as_ref())
            .push("capabilities[card_payments][requested]", true)
            .push("capabilities[transfers][requested]", true)
            .push_opt("business_profile[name]", self.business_name.as_ref())
            .push_opt("business_profile[product_description]", self.product_description.as_ref())
            .push_opt("business_profile[support_email]", self.support_email.as_ref())
            .push_opt("business_profile[support_phone]", self.support_phone.as_ref())
            .push_map("metadata", &self.metadata);
        form
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountLink {
    pub url: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub expires_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginLink {
    pub url: String,
    #[serde(default)]
    pub created: i64,
}

//--------------------------------------       Transfer       ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub destination: String,
    #[serde(default)]
    pub source_transaction: Option<String>,
    #[serde(default)]
    pub transfer_group: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct TransferParams {
    pub amount: i64,
    pub currency: String,
    pub destination: String,
    pub source_transaction: Option<String>,
    pub transfer_group: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl TransferParams {
    pub fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push("amount", self.amount)
            .push("currency", &self.currency)
            .push("destination", &self.destination)
            .push_opt("source_transaction", self.source_transaction.as_ref())
            .push_opt("transfer_group", self.transfer_group.as_ref())
            .push_map("metadata", &self.metadata);
        form
    }
}

//--------------------------------------        Event         ---------------------------------------------------------
/// A webhook event. The `data.object` payload is left as raw JSON and decoded based on `event_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StripeErrorResponse {
    pub error: StripeErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StripeErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
