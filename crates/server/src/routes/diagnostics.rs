//! Diagnostics route handlers.
//!
//! A read-only listing of registered users, gated by a shared secret in the
//! query string. Meant for eyeballing signups during a campaign, not for
//! programmatic access.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Row cap for the listing. There is no pagination past this.
const MAX_ROWS: i64 = 1000;

/// Query parameters for the diagnostics listing.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

/// Per-user display row.
pub struct UserView {
    pub email: String,
    pub share_token: String,
    pub source_ip: String,
    pub invited_by: String,
    pub friends_joined: i32,
    pub enabled: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_string(),
            share_token: user.share_token.to_string(),
            source_ip: user.source_ip.clone(),
            invited_by: user
                .invited_by_token
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            friends_joined: user.friends_joined,
            enabled: user.enabled,
        }
    }
}

/// Diagnostics listing template.
#[derive(Template, WebTemplate)]
#[template(path = "diagnostics/users.html")]
pub struct UsersTemplate {
    pub users: Vec<UserView>,
}

/// Display the user listing if the supplied key matches the configured
/// diagnostics secret; 403 otherwise.
#[instrument(skip_all)]
pub async fn xrayvision(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<impl IntoResponse, AppError> {
    let authorized = query
        .key
        .as_deref()
        .is_some_and(|key| key == state.config().diagnostics_key.expose_secret());

    if !authorized {
        tracing::warn!("Diagnostics listing requested with missing or wrong key");
        return Err(AppError::Forbidden);
    }

    let users = state.users().list(MAX_ROWS).await?;
    tracing::info!(count = users.len(), "Diagnostics listing rendered");

    Ok(UsersTemplate {
        users: users.iter().map(UserView::from).collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use referral_rewards_core::{Email, ShareToken, UserId};

    fn sample_user() -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("a@x.com").unwrap(),
            share_token: ShareToken::parse("aB3x").unwrap(),
            source_ip: "1.1.1.1".to_string(),
            invited_by_token: Some(ShareToken::parse("zZ9a").unwrap()),
            friends_joined: 2,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_view_from_user() {
        let view = UserView::from(&sample_user());
        assert_eq!(view.email, "a@x.com");
        assert_eq!(view.share_token, "aB3x");
        assert_eq!(view.invited_by, "zZ9a");
        assert_eq!(view.friends_joined, 2);
        assert!(view.enabled);
    }

    #[test]
    fn test_user_view_without_inviter() {
        let user = User {
            invited_by_token: None,
            ..sample_user()
        };
        let view = UserView::from(&user);
        assert_eq!(view.invited_by, "");
    }

    #[test]
    fn test_users_template_renders_rows() {
        let html = UsersTemplate {
            users: vec![UserView::from(&sample_user())],
        }
        .render()
        .unwrap();
        assert!(html.contains("a@x.com"));
        assert!(html.contains("aB3x"));
        assert!(html.contains("1.1.1.1"));
    }

    #[test]
    fn test_users_template_renders_empty() {
        let html = UsersTemplate { users: Vec::new() }.render().unwrap();
        assert!(html.contains("0 users"));
    }
}
