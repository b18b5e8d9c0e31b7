use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{MerchantAccountStatus, MerchantStatusUpdate, SellerProfile, User, UserRow},
    traits::MarketplaceDbError,
};

const USER_COLUMNS: &str = r#"id, email, seller_name, seller_type, location, contact_email, contact_phone, seller_bio,
    stripe_account_id, stripe_status, details_submitted, payouts_enabled, last_status_update, onboarding_notified,
    created_at, updated_at"#;

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, MarketplaceDbError> {
    let q = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row: Option<UserRow> = sqlx::query_as(&q).bind(user_id).fetch_optional(conn).await?;
    Ok(row.map(User::from))
}

pub async fn fetch_user_by_stripe_account(
    account_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, MarketplaceDbError> {
    let q = format!("SELECT {USER_COLUMNS} FROM users WHERE stripe_account_id = $1 LIMIT 1");
    let row: Option<UserRow> = sqlx::query_as(&q).bind(account_id).fetch_optional(conn).await?;
    Ok(row.map(User::from))
}

pub async fn upsert_seller_profile(
    user_id: &str,
    email: &str,
    profile: &SellerProfile,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceDbError> {
    sqlx::query(
        r#"INSERT INTO users (id, email, seller_name, seller_type, location, contact_email, contact_phone, seller_bio)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            email = excluded.email,
            seller_name = excluded.seller_name,
            seller_type = excluded.seller_type,
            location = excluded.location,
            contact_email = excluded.contact_email,
            contact_phone = excluded.contact_phone,
            seller_bio = excluded.seller_bio,
            updated_at = CURRENT_TIMESTAMP"#,
    )
    .bind(user_id)
    .bind(email)
    .bind(&profile.seller_name)
    .bind(&profile.seller_type)
    .bind(&profile.location)
    .bind(&profile.contact_email)
    .bind(&profile.contact_phone)
    .bind(&profile.seller_bio)
    .execute(conn)
    .await?;
    trace!("🗃️ Seller profile for {user_id} saved");
    Ok(())
}

/// Links the account to the user if the user has no account yet. Returns `true` if the account was linked.
pub async fn attach_stripe_account(
    user_id: &str,
    account_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceDbError> {
    let result = sqlx::query(
        r#"UPDATE users SET
            stripe_account_id = $1,
            stripe_status = $2,
            details_submitted = 0,
            payouts_enabled = 0,
            last_status_update = $3,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $4 AND stripe_account_id IS NULL"#,
    )
    .bind(account_id)
    .bind(MerchantAccountStatus::Pending)
    .bind(Utc::now())
    .bind(user_id)
    .execute(conn)
    .await?;
    let attached = result.rows_affected() == 1;
    debug!("🗃️ Attach account {account_id} to {user_id}: {}", if attached { "linked" } else { "unchanged" });
    Ok(attached)
}

/// Returns `true` if a user owns the account and was updated.
pub async fn update_merchant_status(
    account_id: &str,
    update: MerchantStatusUpdate,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceDbError> {
    let result = sqlx::query(
        r#"UPDATE users SET
            stripe_status = $1,
            details_submitted = $2,
            payouts_enabled = $3,
            last_status_update = $4,
            updated_at = CURRENT_TIMESTAMP
        WHERE stripe_account_id = $5"#,
    )
    .bind(update.stripe_status)
    .bind(update.details_submitted)
    .bind(update.payouts_enabled)
    .bind(Utc::now())
    .bind(account_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_onboarding_notified(user_id: &str, conn: &mut SqliteConnection) -> Result<bool, MarketplaceDbError> {
    let result = sqlx::query(
        "UPDATE users SET onboarding_notified = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND \
         onboarding_notified = 0",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
