use serde::{Deserialize, Serialize};

use crate::db_types::{Order, TransferRecord};

/// Emitted once per seller, the first time their connected account is seen with details submitted and payouts
/// enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerOnboardedEvent {
    pub user_id: String,
    pub email: Option<String>,
    pub seller_name: String,
    pub stripe_account_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCreatedEvent {
    pub transfer: TransferRecord,
}

impl TransferCreatedEvent {
    pub fn new(transfer: TransferRecord) -> Self {
        Self { transfer }
    }
}
