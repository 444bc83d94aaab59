//! Share token type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShareToken`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ShareTokenError {
    /// The input is not exactly [`ShareToken::LENGTH`] characters long.
    #[error("share token must be exactly {expected} characters (got {actual})")]
    WrongLength {
        /// Required length.
        expected: usize,
        /// Length of the rejected input.
        actual: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9]`.
    #[error("share token must contain only ASCII letters and digits")]
    InvalidCharacter,
}

/// A share token: the short random code embedded in a user's referral link.
///
/// Tokens are case-sensitive, exactly 4 ASCII-alphanumeric characters, and
/// unique per user (enforced by a database constraint). They appear in URLs
/// as `?r=<token>`, so the alphabet is deliberately URL-safe with no escaping
/// required.
///
/// ## Examples
///
/// ```
/// use referral_rewards_core::ShareToken;
///
/// let token = ShareToken::parse("aB3x").unwrap();
/// assert_eq!(token.as_str(), "aB3x");
///
/// assert!(ShareToken::parse("abc").is_err());   // too short
/// assert!(ShareToken::parse("abcde").is_err()); // too long
/// assert!(ShareToken::parse("ab-d").is_err());  // bad character
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ShareToken(String);

impl ShareToken {
    /// Length of every share token.
    pub const LENGTH: usize = 4;

    /// Parse a `ShareToken` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly [`Self::LENGTH`]
    /// ASCII-alphanumeric characters.
    pub fn parse(s: &str) -> Result<Self, ShareTokenError> {
        if s.len() != Self::LENGTH {
            return Err(ShareTokenError::WrongLength {
                expected: Self::LENGTH,
                actual: s.len(),
            });
        }

        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ShareTokenError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ShareToken` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShareToken {
    type Err = ShareTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ShareToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ShareToken {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShareToken {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ShareToken {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_tokens() {
        assert!(ShareToken::parse("abcd").is_ok());
        assert!(ShareToken::parse("AB12").is_ok());
        assert!(ShareToken::parse("0000").is_ok());
        assert!(ShareToken::parse("zZ9a").is_ok());
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!(matches!(
            ShareToken::parse(""),
            Err(ShareTokenError::WrongLength {
                expected: 4,
                actual: 0
            })
        ));
        assert!(matches!(
            ShareToken::parse("abc"),
            Err(ShareTokenError::WrongLength { .. })
        ));
        assert!(matches!(
            ShareToken::parse("abcde"),
            Err(ShareTokenError::WrongLength { .. })
        ));
    }

    #[test]
    fn test_parse_invalid_characters() {
        assert!(matches!(
            ShareToken::parse("ab-d"),
            Err(ShareTokenError::InvalidCharacter)
        ));
        assert!(matches!(
            ShareToken::parse("ab d"),
            Err(ShareTokenError::InvalidCharacter)
        ));
        assert!(matches!(
            ShareToken::parse("ab_1"),
            Err(ShareTokenError::InvalidCharacter)
        ));
    }

    #[test]
    fn test_tokens_are_case_sensitive() {
        let lower = ShareToken::parse("abcd").unwrap();
        let upper = ShareToken::parse("ABCD").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_display_and_as_str() {
        let token = ShareToken::parse("aB3x").unwrap();
        assert_eq!(token.as_str(), "aB3x");
        assert_eq!(format!("{token}"), "aB3x");
    }

    #[test]
    fn test_from_str() {
        let token: ShareToken = "xY7q".parse().unwrap();
        assert_eq!(token.as_str(), "xY7q");
    }

    #[test]
    fn test_serde_roundtrip() {
        let token = ShareToken::parse("aB3x").unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"aB3x\"");

        let parsed: ShareToken = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, token);
    }
}
