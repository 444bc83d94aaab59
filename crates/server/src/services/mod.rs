//! Application services: share token generation and outbound mail.

pub mod mailer;
pub mod token;

pub use mailer::Mailer;
