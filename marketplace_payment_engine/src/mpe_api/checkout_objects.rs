use serde::{Deserialize, Serialize};

/// What the buyer's browser needs to complete the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentResult {
    pub payment_intent_id: String,
    pub client_secret: String,
    pub is_marketplace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    /// `true` if the order had been created by an earlier call.
    pub already_completed: bool,
}
