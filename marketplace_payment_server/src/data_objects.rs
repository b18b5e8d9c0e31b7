use marketplace_payment_engine::{db_types::SellerProfile, OrderConfirmation, PaymentIntentResult};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

//--------------------------------------       Requests       ---------------------------------------------------------
// Request fields are optional at the serde level so that a missing field produces a 400 naming the field, rather than
// a generic deserialization error.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    pub cart_id: Option<String>,
    pub user_id: Option<String>,
}

impl CreatePaymentIntentRequest {
    /// Returns `(cart_id, user_id)`.
    pub fn validate(self) -> Result<(String, String), ServerError> {
        let cart_id = required(self.cart_id, "cartId")?;
        let user_id = required(self.user_id, "userId")?;
        Ok((cart_id, user_id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: Option<String>,
    pub cart_id: Option<String>,
}

impl ConfirmPaymentRequest {
    /// Returns `(payment_intent_id, cart_id)`.
    pub fn validate(self) -> Result<(String, String), ServerError> {
        let payment_intent_id = required(self.payment_intent_id, "paymentIntentId")?;
        let cart_id = required(self.cart_id, "cartId")?;
        Ok((payment_intent_id, cart_id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectAccountRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub seller_name: Option<String>,
    #[serde(default)]
    pub seller_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub seller_bio: String,
}

pub struct ValidConnectAccountRequest {
    pub user_id: String,
    pub email: String,
    pub profile: SellerProfile,
}

impl ConnectAccountRequest {
    pub fn validate(self) -> Result<ValidConnectAccountRequest, ServerError> {
        let user_id = required(self.user_id, "userId")?;
        let email = required(self.email, "email")?;
        if !email.contains('@') {
            return Err(ServerError::InvalidRequestBody(format!("{email} is not a valid email address")));
        }
        let seller_name = required(self.seller_name, "sellerName")?;
        let profile = SellerProfile {
            seller_name,
            seller_type: self.seller_type,
            location: self.location,
            contact_email: self.contact_email,
            contact_phone: self.contact_phone,
            seller_bio: self.seller_bio,
        };
        Ok(ValidConnectAccountRequest { user_id, email, profile })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

impl UserQuery {
    pub fn validate(self) -> Result<String, ServerError> {
        self.user_id.filter(|s| !s.trim().is_empty()).ok_or(ServerError::MissingQueryParameter("userId"))
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ServerError> {
    value.filter(|s| !s.trim().is_empty()).ok_or(ServerError::MissingField(name))
}

//--------------------------------------       Responses      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub is_marketplace: bool,
}

impl From<PaymentIntentResult> for PaymentIntentResponse {
    fn from(r: PaymentIntentResult) -> Self {
        Self { client_secret: r.client_secret, payment_intent_id: r.payment_intent_id, is_marketplace: r.is_marketplace }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    pub order_id: String,
    pub already_completed: bool,
}

impl From<OrderConfirmation> for ConfirmPaymentResponse {
    fn from(c: OrderConfirmation) -> Self {
        Self { success: true, order_id: c.order_id, already_completed: c.already_completed }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookReceipt {
    pub received: bool,
}
