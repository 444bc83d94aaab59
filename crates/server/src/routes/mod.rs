//! HTTP route handlers for the rewards server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Landing page (signup form)
//! GET  /q                      - Referral landing (?r=<token> pre-fills the form)
//! GET  /health                 - Health check
//!
//! # Signup
//! POST /user/create            - Sign up (or fetch the existing share link)
//!
//! # Diagnostics
//! GET  /user/xrayvision        - User listing (?key=<secret>, 403 otherwise)
//!
//! # Disabled (redirect to /)
//! GET  /user/edit
//! GET  /user/update
//! GET  /user/destroy
//! GET  /user/reset
//! GET  /user/login
//! GET  /user/loginfailed
//! GET  /user/logout
//! GET  /user/process
//! GET  /user/index
//! ```

pub mod diagnostics;
pub mod disabled;
pub mod signup;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::rate_limit::signup_rate_limiter;
use crate::state::AppState;

/// Create the user routes router.
///
/// Signup is rate limited per source address; the rest are redirects and the
/// key-gated diagnostics listing.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/create",
            post(signup::create).layer(signup_rate_limiter()),
        )
        .route("/xrayvision", get(diagnostics::xrayvision))
        .route("/edit", get(disabled::edit))
        .route("/update", get(disabled::update))
        .route("/destroy", get(disabled::destroy))
        .route("/reset", get(disabled::reset))
        .route("/login", get(disabled::login))
        .route("/loginfailed", get(disabled::loginfailed))
        .route("/logout", get(disabled::logout))
        .route("/process", get(disabled::process))
        .route("/index", get(disabled::index))
}

/// Create all routes for the rewards server.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Landing pages
        .route("/", get(signup::landing))
        .route("/q", get(signup::referral_landing))
        // User routes
        .nest("/user", user_routes())
}
