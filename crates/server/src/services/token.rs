//! Share token generation.
//!
//! Draws random 4-character alphanumeric candidates and accepts the first one
//! not yet assigned. The attempt count is bounded: with a 62^4 token space a
//! handful of collisions in a row already means the space is close to full,
//! and looping further would only spin against the database.

use rand::Rng;
use thiserror::Error;

use referral_rewards_core::ShareToken;

use crate::db::{RepositoryError, UserRepository};

/// How many random candidates to try before giving up.
pub const MAX_ATTEMPTS: usize = 32;

/// Errors from share token generation.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No unused token was found within [`MAX_ATTEMPTS`] draws.
    #[error("no unused share token found after {attempts} attempts")]
    SpaceExhausted {
        /// Number of candidates tried.
        attempts: usize,
    },

    /// The uniqueness check against storage failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Generate a share token that is not currently assigned to any user.
///
/// The check-then-insert window between this function and the actual insert
/// is closed by the UNIQUE constraint on `share_token`; this function only
/// keeps collisions rare, it does not have to make them impossible.
///
/// # Errors
///
/// Returns [`TokenError::SpaceExhausted`] after [`MAX_ATTEMPTS`] collisions,
/// or [`TokenError::Repository`] if a uniqueness check fails.
pub async fn generate_share_token(
    repo: &UserRepository<'_>,
) -> Result<ShareToken, TokenError> {
    for _ in 0..MAX_ATTEMPTS {
        let candidate = random_token();
        if !repo.token_in_use(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(TokenError::SpaceExhausted {
        attempts: MAX_ATTEMPTS,
    })
}

/// Draw one random candidate token.
fn random_token() -> ShareToken {
    let s: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(ShareToken::LENGTH)
        .map(char::from)
        .collect();

    // The alphanumeric distribution can only produce valid tokens.
    ShareToken::parse(&s).expect("alphanumeric sample of token length is a valid share token")
}
