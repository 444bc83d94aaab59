//! Core types for Referral Rewards.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod token;

pub use email::{Email, EmailError};
pub use id::UserId;
pub use token::{ShareToken, ShareTokenError};
