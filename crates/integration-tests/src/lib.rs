//! Integration tests for Referral Rewards.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and run migrations
//! docker compose up -d postgres
//! cargo run -p referral-rewards-cli -- migrate
//!
//! # Start the server
//! cargo run -p referral-rewards-server
//!
//! # Run integration tests (ignored by default)
//! cargo test -p referral-rewards-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `signup_flow` - Signup, idempotency, referral attribution, the per-IP
//!   cap, diagnostics access, and the disabled endpoints
//!
//! The tests drive a running server over HTTP and spoof the source address
//! via `X-Forwarded-For`, so each test can operate from its own address.
