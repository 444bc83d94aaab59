//! Integration tests for the signup and referral flow.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//!   (cargo run -p referral-rewards-cli -- migrate)
//! - The server running (cargo run -p referral-rewards-server)
//!
//! Run with: cargo test -p referral-rewards-integration-tests -- --ignored
//!
//! Each test spoofs its own source address via `X-Forwarded-For`, so tests
//! do not interfere with each other's signup quota.

use reqwest::{Client, StatusCode, redirect};
use uuid::Uuid;

use referral_rewards_core::ShareToken;

/// Base URL for the rewards server (configurable via environment).
fn server_base_url() -> String {
    std::env::var("REWARDS_SERVER_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Create a client that does not follow redirects, so the disabled-endpoint
/// redirects stay observable.
fn client() -> Client {
    Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// A unique email address for this test run.
fn unique_email() -> String {
    format!("it-{}@example.net", Uuid::new_v4().simple())
}

/// A unique source address for this test run (TEST-NET-3 range).
fn unique_ip() -> String {
    let id = Uuid::new_v4();
    let bytes = id.as_bytes();
    format!("203.0.{}.{}", bytes[0], bytes[1])
}

/// Sign up an email from a source address, optionally with a referral code.
async fn signup(client: &Client, email: &str, source_ip: &str, invited_by: Option<&str>) -> String {
    let mut form = vec![("email", email)];
    if let Some(code) = invited_by {
        form.push(("invited_by", code));
    }

    let resp = client
        .post(format!("{}/user/create", server_base_url()))
        .header("x-forwarded-for", source_ip)
        .form(&form)
        .send()
        .await
        .expect("Failed to send signup request");

    assert_eq!(resp.status(), StatusCode::OK);
    resp.text().await.expect("Failed to read signup response")
}

/// Extract the share token from a share-view response body.
///
/// The share view contains the referral URL `<base>/q?r=<token>`.
fn extract_token(body: &str) -> ShareToken {
    let marker = "?r=";
    let start = body
        .find(marker)
        .expect("share view should contain a referral URL")
        + marker.len();
    let raw: String = body
        .get(start..)
        .expect("marker is on a char boundary")
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    ShareToken::parse(&raw).expect("referral URL should carry a valid token")
}

/// Derive a well-formed referral code guaranteed to differ from `token`.
///
/// Tokens are case-sensitive, so flipping every letter (and squashing digits
/// to a letter) changes every position.
fn bogus_code(token: &ShareToken) -> String {
    token
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                'Q'
            } else if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

/// Extract the "friends joined" count from a share-view response body.
fn extract_friend_count(body: &str) -> i32 {
    let marker = "<strong>";
    let start = body
        .find(marker)
        .expect("share view should contain the friend count")
        + marker.len();
    let raw: String = body
        .get(start..)
        .expect("marker is on a char boundary")
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    raw.parse().expect("friend count should be a number")
}

// ============================================================================
// Signup & Idempotency
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_new_signup_returns_share_link() {
    let client = client();
    let email = unique_email();

    let body = signup(&client, &email, &unique_ip(), None).await;

    let token = extract_token(&body);
    assert_eq!(token.as_str().len(), 4);
    assert_eq!(extract_friend_count(&body), 0);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_repeat_signup_returns_same_token() {
    let client = client();
    let email = unique_email();
    let ip = unique_ip();

    let first = signup(&client, &email, &ip, None).await;
    let second = signup(&client, &email, &ip, None).await;

    assert_eq!(extract_token(&first), extract_token(&second));
    // Re-submitting must not create credit out of thin air
    assert_eq!(extract_friend_count(&second), 0);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_email_is_normalized_before_lookup() {
    let client = client();
    let email = unique_email();
    let ip = unique_ip();

    let first = signup(&client, &email, &ip, None).await;
    let second = signup(&client, &email.to_uppercase(), &ip, None).await;

    assert_eq!(extract_token(&first), extract_token(&second));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_invalid_email_creates_no_user() {
    let client = client();

    let body = signup(&client, "not-an-email", &unique_ip(), None).await;

    // Landing view with an error message, not a share view
    assert!(body.contains("Invalid email address"));
    assert!(!body.contains("?r="));
}

// ============================================================================
// Per-Address Quota
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_third_signup_from_one_address_is_rejected() {
    let client = client();
    let ip = unique_ip();

    let first = signup(&client, &unique_email(), &ip, None).await;
    let second = signup(&client, &unique_email(), &ip, None).await;
    assert!(first.contains("?r="));
    assert!(second.contains("?r="));

    let third_email = unique_email();
    let third = signup(&client, &third_email, &ip, None).await;
    assert!(third.contains("Too many signups"));
    assert!(!third.contains("?r="));

    // The rejected email must not have been persisted: signing it up again
    // from a fresh address must create it anew rather than find it.
    let retry = signup(&client, &third_email, &unique_ip(), None).await;
    assert_eq!(extract_friend_count(&retry), 0);
    assert!(retry.contains("?r="));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_existing_user_is_served_even_over_quota() {
    let client = client();
    let ip = unique_ip();

    let email = unique_email();
    let first = signup(&client, &email, &ip, None).await;
    signup(&client, &unique_email(), &ip, None).await;

    // The address is now at its cap, but an existing registrant asking for
    // their link again is a lookup, not a signup.
    let again = signup(&client, &email, &ip, None).await;
    assert_eq!(extract_token(&first), extract_token(&again));
}

// ============================================================================
// Referral Attribution
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_referred_signup_credits_the_inviter() {
    let client = client();

    let inviter_email = unique_email();
    let inviter_body = signup(&client, &inviter_email, &unique_ip(), None).await;
    let inviter_token = extract_token(&inviter_body);

    signup(
        &client,
        &unique_email(),
        &unique_ip(),
        Some(inviter_token.as_str()),
    )
    .await;

    // Re-fetch the inviter's share view; the count must have gone up by one
    let inviter_after = signup(&client, &inviter_email, &unique_ip(), None).await;
    assert_eq!(extract_friend_count(&inviter_after), 1);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_unknown_referral_code_credits_nobody() {
    let client = client();

    let inviter_email = unique_email();
    let inviter_body = signup(&client, &inviter_email, &unique_ip(), None).await;
    let inviter_token = extract_token(&inviter_body);

    let bogus = bogus_code(&inviter_token);
    let body = signup(&client, &unique_email(), &unique_ip(), Some(&bogus)).await;

    // The new user still signs up fine, with zero credit of their own
    assert_eq!(extract_friend_count(&body), 0);

    // And our inviter was not credited
    let inviter_after = signup(&client, &inviter_email, &unique_ip(), None).await;
    assert_eq!(extract_friend_count(&inviter_after), 0);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_referral_landing_prefills_the_form() {
    let client = client();

    let resp = client
        .get(format!("{}/q?r=aB3x", server_base_url()))
        .send()
        .await
        .expect("Failed to request referral landing");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read landing page");
    assert!(body.contains("aB3x"));
}

// ============================================================================
// Diagnostics
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_diagnostics_with_wrong_key_is_forbidden() {
    let client = client();

    let resp = client
        .get(format!(
            "{}/user/xrayvision?key=wrong-key",
            server_base_url()
        ))
        .send()
        .await
        .expect("Failed to request diagnostics");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = resp.text().await.expect("Failed to read response");
    assert!(!body.contains("@example.net"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_diagnostics_without_key_is_forbidden() {
    let client = client();

    let resp = client
        .get(format!("{}/user/xrayvision", server_base_url()))
        .send()
        .await
        .expect("Failed to request diagnostics");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Disabled Endpoints
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_disabled_endpoints_redirect_to_landing() {
    let client = client();

    for endpoint in [
        "edit",
        "update",
        "destroy",
        "reset",
        "login",
        "loginfailed",
        "logout",
        "process",
        "index",
    ] {
        let resp = client
            .get(format!("{}/user/{endpoint}", server_base_url()))
            .send()
            .await
            .expect("Failed to request disabled endpoint");

        assert!(
            resp.status().is_redirection(),
            "expected redirect from /user/{endpoint}, got {}",
            resp.status()
        );
        assert_eq!(
            resp.headers()
                .get("location")
                .and_then(|v| v.to_str().ok()),
            Some("/")
        );
    }
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_health_endpoints() {
    let client = client();

    let resp = client
        .get(format!("{}/health", server_base_url()))
        .send()
        .await
        .expect("Failed to request health");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/health/ready", server_base_url()))
        .send()
        .await
        .expect("Failed to request readiness");
    assert_eq!(resp.status(), StatusCode::OK);
}
