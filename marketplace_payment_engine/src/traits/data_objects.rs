use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use mpg_common::Cents;
use serde::{Deserialize, Serialize};

use crate::db_types::SellerProfile;

//--------------------------------------   CheckoutMetadata   ---------------------------------------------------------
const CART_ID: &str = "cartId";
const USER_ID: &str = "userId";
const IS_MARKETPLACE: &str = "isMarketplace";
const ITEM_COUNT: &str = "itemCount";
const SELLER_COUNT: &str = "sellerCount";
const PLATFORM_FEE_PERCENT: &str = "platformFeePercent";

/// The metadata attached to every payment intent created at checkout.
///
/// Gateway metadata is a flat string map. This type is the typed view of it, so that the checkout that writes it and
/// the webhook that reads it agree on the keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub cart_id: String,
    pub user_id: String,
    /// Present for marketplace checkouts only.
    pub marketplace: Option<MarketplaceMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceMetadata {
    pub item_count: usize,
    pub seller_count: usize,
    pub platform_fee_percent: i64,
}

impl CheckoutMetadata {
    pub fn standard(cart_id: &str, user_id: &str) -> Self {
        Self { cart_id: cart_id.to_string(), user_id: user_id.to_string(), marketplace: None }
    }

    pub fn marketplace(cart_id: &str, user_id: &str, marketplace: MarketplaceMetadata) -> Self {
        Self { cart_id: cart_id.to_string(), user_id: user_id.to_string(), marketplace: Some(marketplace) }
    }

    pub fn is_marketplace(&self) -> bool {
        self.marketplace.is_some()
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(CART_ID.to_string(), self.cart_id.clone());
        map.insert(USER_ID.to_string(), self.user_id.clone());
        if let Some(m) = &self.marketplace {
            map.insert(IS_MARKETPLACE.to_string(), "true".to_string());
            map.insert(ITEM_COUNT.to_string(), m.item_count.to_string());
            map.insert(SELLER_COUNT.to_string(), m.seller_count.to_string());
            map.insert(PLATFORM_FEE_PERCENT.to_string(), m.platform_fee_percent.to_string());
        }
        map
    }

    /// Reads checkout metadata back from a gateway metadata map. Returns `None` if there is no cart id, i.e. the
    /// intent was not created by checkout.
    pub fn from_map(map: &BTreeMap<String, String>) -> Option<Self> {
        let cart_id = map.get(CART_ID).filter(|s| !s.is_empty())?.clone();
        let user_id = map.get(USER_ID).cloned().unwrap_or_default();
        let is_marketplace = map.get(IS_MARKETPLACE).map(|s| s == "true").unwrap_or(false);
        let marketplace = is_marketplace.then(|| MarketplaceMetadata {
            item_count: parse_or(map, ITEM_COUNT, 0),
            seller_count: parse_or(map, SELLER_COUNT, 0),
            platform_fee_percent: parse_or(map, PLATFORM_FEE_PERCENT, crate::helpers::PLATFORM_FEE_PERCENT),
        });
        Some(Self { cart_id, user_id, marketplace })
    }
}

fn parse_or<T: FromStr>(map: &BTreeMap<String, String>, key: &str, default: T) -> T {
    map.get(key).and_then(|s| s.parse::<T>().ok()).unwrap_or(default)
}

//--------------------------------------    PaymentIntent     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    Other(String),
}

impl FromStr for PaymentIntentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_confirmation" => Self::RequiresConfirmation,
            "requires_action" => Self::RequiresAction,
            "processing" => Self::Processing,
            "requires_capture" => Self::RequiresCapture,
            "canceled" => Self::Canceled,
            "succeeded" => Self::Succeeded,
            other => Self::Other(other.to_string()),
        };
        Ok(status)
    }
}

impl Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequiresPaymentMethod => write!(f, "requires_payment_method"),
            Self::RequiresConfirmation => write!(f, "requires_confirmation"),
            Self::RequiresAction => write!(f, "requires_action"),
            Self::Processing => write!(f, "processing"),
            Self::RequiresCapture => write!(f, "requires_capture"),
            Self::Canceled => write!(f, "canceled"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentIntent {
    pub amount: Cents,
    pub currency: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: Cents,
    pub currency: String,
    pub status: PaymentIntentStatus,
    pub client_secret: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// The charge that settled this intent. Seller transfers are funded from it.
    pub latest_charge: Option<String>,
}

impl PaymentIntent {
    pub fn checkout_metadata(&self) -> Option<CheckoutMetadata> {
        CheckoutMetadata::from_map(&self.metadata)
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == PaymentIntentStatus::Succeeded
    }
}

//--------------------------------------   ConnectedAccount   ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequirements {
    pub currently_due: Vec<String>,
    pub eventually_due: Vec<String>,
    pub past_due: Vec<String>,
    pub pending_verification: Vec<String>,
    pub disabled_reason: Option<String>,
    pub current_deadline: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectedAccount {
    pub id: String,
    pub details_submitted: bool,
    pub payouts_enabled: bool,
    pub charges_enabled: bool,
    pub requirements: AccountRequirements,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConnectedAccount {
    pub user_id: String,
    pub email: String,
    pub profile: SellerProfile,
}

//--------------------------------------       Transfer       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransfer {
    pub amount: Cents,
    pub currency: String,
    pub destination: String,
    /// The charge to fund the transfer from. Using it ties the transfer to the availability of those funds.
    pub source_transaction: Option<String>,
    pub transfer_group: Option<String>,
    /// Repeating a request with the same key has at most one effect at the gateway.
    pub idempotency_key: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayTransfer {
    pub id: String,
    pub amount: Cents,
    pub destination: String,
}

//--------------------------------------     GatewayEvent     ---------------------------------------------------------
/// A verified webhook event, decoded into the cases the engine acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    AccountUpdated(ConnectedAccount),
    PaymentIntentSucceeded(PaymentIntent),
    /// Any other event type. Acknowledged and otherwise ignored.
    Ignored(String),
}
