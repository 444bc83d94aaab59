//! Signup and referral landing route handlers.
//!
//! The signup flow over one request:
//!
//! 1. look up the email; an existing registrant just gets their share view
//!    back (no mutation),
//! 2. check the per-address signup cap,
//! 3. generate a fresh share token,
//! 4. insert the user and credit the inviter in one transaction,
//! 5. dispatch the welcome mail fire-and-forget,
//! 6. render the share view.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use referral_rewards_core::{Email, ShareToken};

use crate::db::{NewUser, RepositoryError};
use crate::error::AppError;
use crate::middleware::ClientIp;
use crate::models::User;
use crate::services::token::generate_share_token;
use crate::state::AppState;

/// Persistent cap on users registered from one source address.
pub const MAX_SIGNUPS_PER_IP: i64 = 2;

/// Message shown when the source address has used up its signups.
const QUOTA_MESSAGE: &str = "Too many signups from the same IP address.";

/// Message shown when the submitted email does not parse.
const INVALID_EMAIL_MESSAGE: &str = "Invalid email address, please try again.";

// =============================================================================
// Form and Query Types
// =============================================================================

/// Signup form data.
///
/// `invited_by` carries the inviter's share token. The legacy field name
/// `invitedByUserId` (which never held a user id) is accepted as an alias so
/// old share links and cached forms keep working.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    #[serde(alias = "invitedByUserId")]
    pub invited_by: Option<String>,
}

/// Query parameters for the referral landing page.
#[derive(Debug, Deserialize)]
pub struct ReferralQuery {
    /// Referral code from a share link (`/q?r=<token>`).
    pub r: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Landing page template: the signup form, optionally pre-filled with a
/// referral code and carrying a message (quota rejection, invalid email).
#[derive(Template, WebTemplate)]
#[template(path = "landing.html")]
pub struct LandingTemplate {
    pub referral_code: Option<String>,
    pub message: Option<String>,
}

/// Share page template: the user's referral URL and current credit.
#[derive(Template, WebTemplate)]
#[template(path = "share.html")]
pub struct ShareTemplate {
    pub referral_url: String,
    pub friends_joined: i32,
}

impl ShareTemplate {
    fn for_user(state: &AppState, user: &User) -> Self {
        Self {
            referral_url: state.config().share_url(&user.share_token).into(),
            friends_joined: user.friends_joined,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the landing page.
pub async fn landing() -> impl IntoResponse {
    LandingTemplate {
        referral_code: None,
        message: None,
    }
}

/// Referral landing: a visited share link pre-fills the signup form.
#[instrument]
pub async fn referral_landing(Query(query): Query<ReferralQuery>) -> impl IntoResponse {
    LandingTemplate {
        referral_code: query.r,
        message: None,
    }
}

/// Handle signup form submission.
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn create(
    State(state): State<AppState>,
    client_ip: ClientIp,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let Ok(email) = Email::parse(&form.email) else {
        return Ok(LandingTemplate {
            referral_code: form.invited_by,
            message: Some(INVALID_EMAIL_MESSAGE.to_string()),
        }
        .into_response());
    };

    let repo = state.users();

    // An existing registrant gets their original token back, however often
    // they re-submit the form. Nothing is mutated and nobody is credited.
    if let Some(user) = repo.get_by_email(&email).await? {
        tracing::info!(token = %user.share_token, "Existing user, returning current share link");
        return Ok(ShareTemplate::for_user(&state, &user).into_response());
    }

    let source_ip = client_ip.to_string();
    if repo.signups_from_ip(&source_ip).await? >= MAX_SIGNUPS_PER_IP {
        tracing::info!(source_ip = %source_ip, "Signup rejected, address quota reached");
        return Ok(rejection_view().into_response());
    }

    let share_token = generate_share_token(&repo).await?;
    let invited_by = parse_referral_code(form.invited_by.as_deref());

    let created = match repo
        .create(
            NewUser {
                email: &email,
                share_token: &share_token,
                source_ip: &source_ip,
                invited_by: invited_by.as_ref(),
            },
            MAX_SIGNUPS_PER_IP,
        )
        .await
    {
        Ok(created) => created,
        // Lost a race against a concurrent signup with the same email; the
        // outcome for this caller is the same as finding the user up front.
        Err(RepositoryError::Conflict(_)) => {
            return match repo.get_by_email(&email).await? {
                Some(user) => Ok(ShareTemplate::for_user(&state, &user).into_response()),
                None => Err(AppError::Internal(
                    "user missing after unique conflict".to_string(),
                )),
            };
        }
        // Lost a race against concurrent signups from the same address.
        Err(RepositoryError::QuotaExceeded) => {
            tracing::info!(source_ip = %source_ip, "Signup rejected in transaction, address quota reached");
            return Ok(rejection_view().into_response());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        token = %created.user.share_token,
        inviter_credited = created.inviter_credited,
        "User created"
    );

    let share_url = state.config().share_url(&created.user.share_token);
    state.mailer().spawn_welcome(&created.user.email, share_url);

    Ok(ShareTemplate::for_user(&state, &created.user).into_response())
}

/// The quota rejection view.
fn rejection_view() -> LandingTemplate {
    LandingTemplate {
        referral_code: None,
        message: Some(QUOTA_MESSAGE.to_string()),
    }
}

/// Parse the optional referral code from the signup form.
///
/// Malformed codes (wrong length or alphabet) cannot match any stored token,
/// so they are dropped here rather than carried into the database.
fn parse_referral_code(raw: Option<&str>) -> Option<ShareToken> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;

    match ShareToken::parse(raw) {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::debug!(error = %e, "Discarding malformed referral code");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_referral_code_valid() {
        let token = parse_referral_code(Some("aB3x")).unwrap();
        assert_eq!(token.as_str(), "aB3x");
    }

    #[test]
    fn test_parse_referral_code_trims() {
        let token = parse_referral_code(Some("  aB3x ")).unwrap();
        assert_eq!(token.as_str(), "aB3x");
    }

    #[test]
    fn test_parse_referral_code_absent_or_empty() {
        assert!(parse_referral_code(None).is_none());
        assert!(parse_referral_code(Some("")).is_none());
        assert!(parse_referral_code(Some("   ")).is_none());
    }

    #[test]
    fn test_parse_referral_code_malformed() {
        assert!(parse_referral_code(Some("abc")).is_none());
        assert!(parse_referral_code(Some("toolong")).is_none());
        assert!(parse_referral_code(Some("ab-d")).is_none());
    }

    #[test]
    fn test_landing_template_renders_message() {
        let html = rejection_view().render().unwrap();
        assert!(html.contains(QUOTA_MESSAGE));
    }

    #[test]
    fn test_landing_template_prefills_referral_code() {
        let html = LandingTemplate {
            referral_code: Some("aB3x".to_string()),
            message: None,
        }
        .render()
        .unwrap();
        assert!(html.contains("aB3x"));
    }

    #[test]
    fn test_landing_template_escapes_referral_code() {
        let html = LandingTemplate {
            referral_code: Some("<script>".to_string()),
            message: None,
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_share_template_renders_url_and_count() {
        let html = ShareTemplate {
            referral_url: "https://rewards.example.net/q?r=aB3x".to_string(),
            friends_joined: 3,
        }
        .render()
        .unwrap();
        assert!(html.contains("https://rewards.example.net/q?r=aB3x"));
        assert!(html.contains('3'));
    }
}
