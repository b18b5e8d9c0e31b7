use crate::{
    db_types::{MerchantStatusUpdate, SellerProfile, User},
    traits::MarketplaceDbError,
};

#[allow(async_fn_in_trait)]
pub trait SellerManagement {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, MarketplaceDbError>;

    /// Looks up the user that owns the given connected account.
    async fn fetch_user_by_stripe_account(&self, account_id: &str) -> Result<Option<User>, MarketplaceDbError>;

    /// Creates the user if necessary, and stores the email address and seller profile.
    async fn upsert_seller_profile(
        &self,
        user_id: &str,
        email: &str,
        profile: &SellerProfile,
    ) -> Result<User, MarketplaceDbError>;

    /// Links a connected account to the user, with an initial `pending` status.
    ///
    /// An account is only ever linked once. If the user already has an account, nothing changes. In both cases the
    /// current user record is returned, so callers can compare account ids.
    async fn attach_stripe_account(&self, user_id: &str, account_id: &str) -> Result<User, MarketplaceDbError>;

    /// Records the latest status of a connected account. Returns `None` if no user owns the account.
    async fn update_merchant_status(
        &self,
        account_id: &str,
        update: MerchantStatusUpdate,
    ) -> Result<Option<User>, MarketplaceDbError>;

    /// Sets the onboarding-notified flag. Returns `true` only for the call that changed it, so that at most one
    /// notification is ever sent per seller.
    async fn mark_onboarding_notified(&self, user_id: &str) -> Result<bool, MarketplaceDbError>;
}
