use serde::{Deserialize, Serialize};

use crate::{db_types::MerchantAccountStatus, traits::AccountRequirements};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingLink {
    pub url: String,
    pub account_id: String,
    /// `true` if the seller already had a connected account before this request.
    pub exists: bool,
}

/// The live state of a seller's connected account, as last seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    pub account_id: String,
    pub status: MerchantAccountStatus,
    pub details_submitted: bool,
    pub payouts_enabled: bool,
    pub charges_enabled: bool,
    pub requirements_disabled_reason: Option<String>,
    pub requirements: AccountRequirements,
}
