use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookOutcome {
    /// A merchant account status was refreshed. `onboarded` is set if this event completed onboarding.
    AccountUpdated { user_id: String, onboarded: bool },
    /// The connected account does not belong to any local user.
    UnknownAccount(String),
    /// The payment was split among sellers. One entry per seller.
    Payouts(Vec<SellerPayoutOutcome>),
    /// Nothing to do for this event.
    Ignored(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerPayoutOutcome {
    pub seller_id: String,
    pub outcome: PayoutOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutOutcome {
    /// The gateway accepted a transfer with this id.
    Transferred(String),
    /// A transfer for this payment and seller is already in the ledger.
    Duplicate,
    Skipped(String),
    Failed(String),
}
