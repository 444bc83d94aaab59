//! User domain type.
//!
//! Validated domain object, separate from the database row type.

use chrono::{DateTime, Utc};

use referral_rewards_core::{Email, ShareToken, UserId};

/// A registered user of the rewards program.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address (the primary identifier at signup).
    pub email: Email,
    /// The user's own share token, embedded in their referral link.
    pub share_token: ShareToken,
    /// Source address the signup request came from.
    pub source_ip: String,
    /// Share token of the user who referred this one, if any.
    ///
    /// A back-reference for attribution only; it may point at nobody if the
    /// signup carried an unknown referral code.
    pub invited_by_token: Option<ShareToken>,
    /// How many signups have credited this user as inviter.
    pub friends_joined: i32,
    /// Whether the account is active.
    pub enabled: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
