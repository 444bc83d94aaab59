//! Domain models for the referral rewards service.

pub mod user;

pub use user::User;
