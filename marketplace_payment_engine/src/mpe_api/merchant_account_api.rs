//! Seller onboarding through connected accounts.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{MerchantAccountStatus, SellerProfile, User},
    events::EventProducers,
    mpe_api::{
        account_objects::{AccountStatus, OnboardingLink},
        errors::MerchantAccountError,
        merchant_sync::sync_merchant_account,
    },
    traits::{NewConnectedAccount, PaymentGateway, SellerManagement},
};

pub struct MerchantAccountApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
    refresh_url: String,
    return_url: String,
}

impl<B, G> Debug for MerchantAccountApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MerchantAccountApi (return to {})", self.return_url)
    }
}

impl<B, G> MerchantAccountApi<B, G> {
    /// `client_url` is the storefront's base url. Sellers are sent back there when they leave or finish the
    /// gateway's onboarding flow.
    pub fn new(db: B, gateway: G, producers: EventProducers, client_url: &str) -> Self {
        let base = client_url.trim_end_matches('/');
        let refresh_url = format!("{base}/seller/onboarding/refresh");
        let return_url = format!("{base}/seller/onboarding/complete");
        Self { db, gateway, producers, refresh_url, return_url }
    }
}

impl<B, G> MerchantAccountApi<B, G>
where
    B: SellerManagement,
    G: PaymentGateway,
{
    /// Saves the seller's profile and returns an onboarding link for their connected account, creating the account
    /// first if the seller does not have one yet.
    ///
    /// An unknown `user_id` is not an error here: the user record is created on first use, so this call never fails
    /// with [`MerchantAccountError::UserNotFound`].
    pub async fn create_connected_account(
        &self,
        user_id: &str,
        email: &str,
        profile: SellerProfile,
    ) -> Result<OnboardingLink, MerchantAccountError> {
        let user = self.db.upsert_seller_profile(user_id, email, &profile).await?;
        if let Some(account_id) = user.stripe_account_id() {
            debug!("🏦 User {user_id} already has connected account {account_id}. Issuing a fresh onboarding link");
            let url = self.onboarding_link(account_id).await?;
            return Ok(OnboardingLink { url, account_id: account_id.to_string(), exists: true });
        }
        let request = NewConnectedAccount { user_id: user_id.to_string(), email: email.to_string(), profile };
        let account = self.gateway.create_connected_account(request).await.map_err(|e| {
            error!("🏦 Could not create a connected account for user {user_id}. {e}");
            e
        })?;
        info!("🏦 Connected account {} created for user {user_id}", account.id);
        let user = self.db.attach_stripe_account(user_id, &account.id).await.map_err(|e| {
            error!(
                "🏦 Connected account {} was created for user {user_id}, but could not be saved. The account is \
                 orphaned at the gateway and must be cleaned up manually. {e}",
                account.id
            );
            e
        })?;
        let account_id = match user.stripe_account_id() {
            Some(stored) if stored != account.id => {
                warn!(
                    "🏦 User {user_id} was linked to {stored} by a concurrent request. Connected account {} is orphaned",
                    account.id
                );
                stored.to_string()
            },
            _ => account.id,
        };
        let url = self.onboarding_link(&account_id).await?;
        Ok(OnboardingLink { url, account_id, exists: false })
    }

    /// Pulls the live account status from the gateway and records it locally.
    pub async fn get_account_status(&self, user_id: &str) -> Result<AccountStatus, MerchantAccountError> {
        let account_id = self.seller_account_id(user_id).await?;
        let account = self.gateway.retrieve_connected_account(&account_id).await?;
        let synced = sync_merchant_account(&self.db, &self.producers, &account).await?;
        let status = synced
            .as_ref()
            .and_then(|s| s.user.merchant_account.as_ref())
            .map(|m| m.stripe_status)
            .unwrap_or_else(|| {
                MerchantAccountStatus::derive(
                    account.details_submitted,
                    account.payouts_enabled,
                    account.requirements.disabled_reason.as_deref(),
                )
            });
        Ok(AccountStatus {
            account_id: account.id,
            status,
            details_submitted: account.details_submitted,
            payouts_enabled: account.payouts_enabled,
            charges_enabled: account.charges_enabled,
            requirements_disabled_reason: account.requirements.disabled_reason.clone(),
            requirements: account.requirements,
        })
    }

    pub async fn refresh_account_link(&self, user_id: &str) -> Result<String, MerchantAccountError> {
        let account_id = self.seller_account_id(user_id).await?;
        self.onboarding_link(&account_id).await
    }

    pub async fn get_dashboard_link(&self, user_id: &str) -> Result<String, MerchantAccountError> {
        let account_id = self.seller_account_id(user_id).await?;
        let url = self.gateway.create_dashboard_link(&account_id).await?;
        trace!("🏦 Dashboard link issued for {account_id}");
        Ok(url)
    }

    pub async fn fetch_seller(&self, user_id: &str) -> Result<User, MerchantAccountError> {
        self.db.fetch_user(user_id).await?.ok_or_else(|| MerchantAccountError::UserNotFound(user_id.into()))
    }

    async fn seller_account_id(&self, user_id: &str) -> Result<String, MerchantAccountError> {
        let user = self.fetch_seller(user_id).await?;
        user.stripe_account_id().map(String::from).ok_or_else(|| MerchantAccountError::NotASeller(user_id.into()))
    }

    async fn onboarding_link(&self, account_id: &str) -> Result<String, MerchantAccountError> {
        let url = self.gateway.create_onboarding_link(account_id, &self.refresh_url, &self.return_url).await?;
        trace!("🏦 Onboarding link issued for {account_id}");
        Ok(url)
    }
}
