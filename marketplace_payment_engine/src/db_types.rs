use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use mpg_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------      CartStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    /// The cart is still being filled and can be checked out.
    #[default]
    Active,
    /// The cart has been paid for. It carries the order id and is immutable.
    Completed,
}

impl Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartStatus::Active => write!(f, "active"),
            CartStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for CartStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            s => Err(ConversionError(format!("Invalid cart status: {s}"))),
        }
    }
}

//--------------------------------------        Cart          ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub total_amount: Cents,
    pub status: CartStatus,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn is_completed(&self) -> bool {
        self.status == CartStatus::Completed
    }

    /// True if any line item is attributed to a seller, i.e. the checkout must split proceeds.
    pub fn is_marketplace(&self) -> bool {
        self.items.iter().any(|i| i.seller_id.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: String,
    pub tool_id: String,
    pub seller_id: Option<String>,
    pub price: Cents,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewCart {
    pub id: String,
    pub user_id: String,
    pub items: Vec<NewCartItem>,
}

impl NewCart {
    pub fn new<S: Into<String>>(id: S, user_id: S) -> Self {
        Self { id: id.into(), user_id: user_id.into(), items: Vec::new() }
    }

    pub fn with_item(mut self, item: NewCartItem) -> Self {
        self.items.push(item);
        self
    }

    /// The sum of `price * quantity` over all items, or `None` if it does not fit in [`Cents`].
    pub fn total_amount(&self) -> Option<Cents> {
        self.items.iter().try_fold(Cents::default(), |total, i| total.checked_add(i.price.checked_mul(i.quantity)?))
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCartItem {
    pub tool_id: String,
    pub seller_id: Option<String>,
    pub price: Cents,
    pub quantity: i64,
}

impl NewCartItem {
    pub fn new(tool_id: &str, seller_id: Option<&str>, price: Cents, quantity: i64) -> Self {
        Self { tool_id: tool_id.to_string(), seller_id: seller_id.map(String::from), price, quantity }
    }
}

//--------------------------------------     OrderStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The payment for the order has been confirmed by the gateway.
    #[default]
    Paid,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Paid => write!(f, "paid"),
        }
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub cart_id: String,
    pub total_amount: Cents,
    pub status: OrderStatus,
    pub payment_intent_id: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: String,
    pub tool_id: String,
    pub seller_id: Option<String>,
    pub price: Cents,
    pub quantity: i64,
}

/// The outcome of turning a cart into an order.
#[derive(Debug, Clone)]
pub enum OrderFromCartResult {
    /// A new order was created and the cart is now completed.
    Created(Order),
    /// The cart had already been completed. Carries the id of the existing order.
    AlreadyCompleted(String),
}

//--------------------------------------  MerchantAccountStatus  -------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MerchantAccountStatus {
    /// Onboarding has been started but the account cannot receive payouts yet.
    #[default]
    Pending,
    /// Details are submitted and payouts are enabled.
    Active,
    /// The gateway has disabled the account.
    Restricted,
}

impl MerchantAccountStatus {
    /// Derives the local status from the gateway's view of the account. A disabled reason always wins.
    pub fn derive(details_submitted: bool, payouts_enabled: bool, disabled_reason: Option<&str>) -> Self {
        match disabled_reason {
            Some(r) if !r.is_empty() => Self::Restricted,
            _ if details_submitted && payouts_enabled => Self::Active,
            _ => Self::Pending,
        }
    }
}

impl Display for MerchantAccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MerchantAccountStatus::Pending => write!(f, "pending"),
            MerchantAccountStatus::Active => write!(f, "active"),
            MerchantAccountStatus::Restricted => write!(f, "restricted"),
        }
    }
}

impl FromStr for MerchantAccountStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "restricted" => Ok(Self::Restricted),
            s => Err(ConversionError(format!("Invalid merchant account status: {s}"))),
        }
    }
}

impl From<String> for MerchantAccountStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid merchant account status: {value}. But this conversion cannot fail. Defaulting to Pending");
            MerchantAccountStatus::Pending
        })
    }
}

//--------------------------------------    MerchantAccount    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantAccount {
    pub stripe_account_id: String,
    pub stripe_status: MerchantAccountStatus,
    pub details_submitted: bool,
    pub payouts_enabled: bool,
    pub last_status_update: Option<DateTime<Utc>>,
}

impl MerchantAccount {
    pub fn is_fully_onboarded(&self) -> bool {
        self.details_submitted && self.payouts_enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerchantStatusUpdate {
    pub stripe_status: MerchantAccountStatus,
    pub details_submitted: bool,
    pub payouts_enabled: bool,
}

//--------------------------------------     SellerProfile     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SellerProfile {
    pub seller_name: String,
    pub seller_type: String,
    pub location: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub seller_bio: String,
}

//--------------------------------------         User          ---------------------------------------------------------
/// A marketplace user. Every user can buy; a user becomes a seller once they have a merchant account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub profile: SellerProfile,
    pub merchant_account: Option<MerchantAccount>,
    pub onboarding_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn stripe_account_id(&self) -> Option<&str> {
        self.merchant_account.as_ref().map(|m| m.stripe_account_id.as_str()).filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRow {
    pub id: String,
    pub email: Option<String>,
    #[sqlx(flatten)]
    pub profile: SellerProfile,
    pub stripe_account_id: Option<String>,
    pub stripe_status: Option<String>,
    pub details_submitted: bool,
    pub payouts_enabled: bool,
    pub last_status_update: Option<DateTime<Utc>>,
    pub onboarding_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let merchant_account = row.stripe_account_id.map(|stripe_account_id| MerchantAccount {
            stripe_account_id,
            stripe_status: row.stripe_status.map(MerchantAccountStatus::from).unwrap_or_default(),
            details_submitted: row.details_submitted,
            payouts_enabled: row.payouts_enabled,
            last_status_update: row.last_status_update,
        });
        Self {
            id: row.id,
            email: row.email,
            profile: row.profile,
            merchant_account,
            onboarding_notified: row.onboarding_notified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

//--------------------------------------    TransferStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// The ledger row is reserved and the transfer request is in flight.
    #[default]
    Pending,
    /// The gateway accepted the transfer.
    Created,
    /// The gateway rejected the transfer. A redelivered webhook will retry it.
    Failed,
}

impl Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStatus::Pending => write!(f, "pending"),
            TransferStatus::Created => write!(f, "created"),
            TransferStatus::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------    TransferRecord     ---------------------------------------------------------
/// A ledger entry for a seller payout.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: i64,
    pub payment_intent_id: String,
    pub seller_id: String,
    pub cart_id: String,
    pub destination_account: String,
    pub seller_total: Cents,
    pub amount: Cents,
    pub platform_fee: Cents,
    pub transfer_id: Option<String>,
    pub status: TransferStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransferRecord {
    pub payment_intent_id: String,
    pub seller_id: String,
    pub cart_id: String,
    pub destination_account: String,
    pub seller_total: Cents,
    pub amount: Cents,
    pub platform_fee: Cents,
}

#[derive(Debug, Clone)]
pub enum TransferReservation {
    /// The caller owns this row and must now request the transfer.
    Reserved(TransferRecord),
    /// A completed transfer already exists for this payment and seller.
    AlreadyRecorded(TransferRecord),
}
