//! Reconciles the local merchant account record with the gateway's view of a connected account.
//!
//! Account status reaches us two ways: pushed in `account.updated` webhooks, and pulled when a seller asks for their
//! status. Both paths run [`sync_merchant_account`], so whichever path first sees a fully onboarded account sends the
//! one and only onboarding notification.
use log::*;

use crate::{
    db_types::{MerchantAccountStatus, MerchantStatusUpdate, User},
    events::{EventProducers, SellerOnboardedEvent},
    traits::{ConnectedAccount, MarketplaceDbError, SellerManagement},
};

#[derive(Debug, Clone)]
pub struct SyncResult {
    pub user: User,
    /// Set if this call recorded the completion of onboarding.
    pub newly_onboarded: bool,
}

/// Writes the gateway's view of `account` to the owning user. Returns `None` if no user owns the account.
pub async fn sync_merchant_account<B: SellerManagement>(
    db: &B,
    producers: &EventProducers,
    account: &ConnectedAccount,
) -> Result<Option<SyncResult>, MarketplaceDbError> {
    let stripe_status = MerchantAccountStatus::derive(
        account.details_submitted,
        account.payouts_enabled,
        account.requirements.disabled_reason.as_deref(),
    );
    let update = MerchantStatusUpdate {
        stripe_status,
        details_submitted: account.details_submitted,
        payouts_enabled: account.payouts_enabled,
    };
    let Some(user) = db.update_merchant_status(&account.id, update).await? else {
        info!("🏦 No user owns connected account {}. Nothing to update", account.id);
        return Ok(None);
    };
    debug!("🏦 Merchant account {} for user {} is now {stripe_status}", account.id, user.id);
    let fully_onboarded = account.details_submitted && account.payouts_enabled;
    let newly_onboarded = fully_onboarded && db.mark_onboarding_notified(&user.id).await?;
    if newly_onboarded {
        info!("🏦 User {} has completed merchant onboarding", user.id);
        notify_seller_onboarded(producers, &user, &account.id).await;
    }
    Ok(Some(SyncResult { user, newly_onboarded }))
}

async fn notify_seller_onboarded(producers: &EventProducers, user: &User, account_id: &str) {
    let event = SellerOnboardedEvent {
        user_id: user.id.clone(),
        email: user.email.clone(),
        seller_name: user.profile.seller_name.clone(),
        stripe_account_id: account_id.to_string(),
    };
    for producer in &producers.seller_onboarded_producer {
        trace!("📬️ Publishing seller onboarded event for {}", user.id);
        producer.publish_event(event.clone()).await;
    }
}
