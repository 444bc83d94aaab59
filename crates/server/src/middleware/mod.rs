//! HTTP middleware: client address extraction and rate limiting.

pub mod client_ip;
pub mod rate_limit;

pub use client_ip::ClientIp;
