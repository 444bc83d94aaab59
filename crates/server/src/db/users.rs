//! User repository for database operations.
//!
//! All uniqueness and quota guarantees live here, at the storage layer:
//! concurrent requests cannot observe a stale snapshot and sneak past the
//! checks, because the checks are constraints and locks, not reads.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use referral_rewards_core::{Email, ShareToken, UserId};

use super::RepositoryError;
use crate::models::user::User;

/// Columns selected for every user query, in `UserRow` order.
const USER_COLUMNS: &str = "id, email, share_token, source_ip, invited_by_token, \
     friends_joined, enabled, created_at, updated_at";

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    share_token: String,
    source_ip: String,
    invited_by_token: Option<String>,
    friends_joined: i32,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let share_token = ShareToken::parse(&row.share_token).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid share token in database: {e}"))
        })?;

        let invited_by_token = row
            .invited_by_token
            .as_deref()
            .map(ShareToken::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid inviter token in database: {e}"))
            })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            share_token,
            source_ip: row.source_ip,
            invited_by_token,
            friends_joined: row.friends_joined,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields for a user about to be inserted.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    /// Normalized registrant email.
    pub email: &'a Email,
    /// Freshly generated share token.
    pub share_token: &'a ShareToken,
    /// Source address of the signup request.
    pub source_ip: &'a str,
    /// Referral token supplied with the signup, if any.
    pub invited_by: Option<&'a ShareToken>,
}

/// Result of a successful insert.
#[derive(Debug)]
pub struct CreatedUser {
    /// The persisted user.
    pub user: User,
    /// Whether `invited_by` resolved to an existing user whose
    /// `friends_joined` count was credited in the same transaction.
    pub inviter_credited: bool,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM rewards.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Check whether a share token is already assigned to some user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn token_in_use(&self, token: &ShareToken) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM rewards.user WHERE share_token = $1)",
        )
        .bind(token.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Count users registered from a source address.
    ///
    /// A read error propagates instead of being treated as zero: the signup
    /// cap must hold even (especially) when the database is unhealthy.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn signups_from_ip(&self, source_ip: &str) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM rewards.user WHERE source_ip = $1")
                .bind(source_ip)
                .fetch_one(self.pool)
                .await?;

        Ok(count)
    }

    /// Insert a new user and credit the inviter, atomically.
    ///
    /// The whole operation runs in one transaction under a per-address
    /// advisory lock, which serializes the count-then-insert against
    /// concurrent signups from the same address. Crediting the inviter
    /// commits or rolls back together with the insert, so an inviter is
    /// never credited for a user that was not persisted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::QuotaExceeded` if the address already has
    /// `max_per_ip` users.
    /// Returns `RepositoryError::Conflict` if the email or share token is
    /// already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        new_user: NewUser<'_>,
        max_per_ip: i64,
    ) -> Result<CreatedUser, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Advisory lock keyed on the source address; held until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
            .bind(new_user.source_ip)
            .execute(&mut *tx)
            .await?;

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM rewards.user WHERE source_ip = $1")
                .bind(new_user.source_ip)
                .fetch_one(&mut *tx)
                .await?;

        if count >= max_per_ip {
            return Err(RepositoryError::QuotaExceeded);
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO rewards.user (email, share_token, source_ip, invited_by_token) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new_user.email.as_str())
        .bind(new_user.share_token.as_str())
        .bind(new_user.source_ip)
        .bind(new_user.invited_by.map(ShareToken::as_str))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                let what = match db_err.constraint() {
                    Some(name) if name.contains("share_token") => "share token",
                    _ => "email",
                };
                return RepositoryError::Conflict(format!("{what} already exists"));
            }
            RepositoryError::Database(e)
        })?;

        let mut inviter_credited = false;
        if let Some(inviter_token) = new_user.invited_by {
            let updated = sqlx::query(
                "UPDATE rewards.user \
                 SET friends_joined = friends_joined + 1, updated_at = NOW() \
                 WHERE share_token = $1",
            )
            .bind(inviter_token.as_str())
            .execute(&mut *tx)
            .await?;

            // Zero rows means the referral code resolved to nobody; the new
            // user still keeps the code they signed up with.
            inviter_credited = updated.rows_affected() > 0;
        }

        tx.commit().await?;

        Ok(CreatedUser {
            user: row.try_into()?,
            inviter_credited,
        })
    }

    /// List users, newest first, capped at `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn list(&self, limit: i64) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM rewards.user ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
