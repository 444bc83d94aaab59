//! Client source address extraction.
//!
//! The source address is business data here, not just telemetry: the signup
//! cap is keyed on it. Behind a reverse proxy the socket peer is the proxy,
//! so proxy headers are consulted first, in trust order, before falling back
//! to the connection peer.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, StatusCode, request::Parts},
};

/// Proxy headers that may carry the real client address, in trust order.
const IP_HEADERS: &[&str] = &[
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// The source address of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl std::fmt::Display for ClientIp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Walk the proxy headers and return the first parseable address.
///
/// `X-Forwarded-For` may hold a comma-separated chain; only the first entry
/// (the original client) counts.
pub fn ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ip) = ip_from_headers(&parts.headers) {
            return Ok(Self(ip));
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self(addr.ip()))
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "client address unavailable",
            ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_no_headers() {
        assert_eq!(ip_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cf_connecting_ip_wins() {
        let map = headers(&[
            ("cf-connecting-ip", "1.1.1.1"),
            ("x-forwarded-for", "2.2.2.2"),
        ]);
        assert_eq!(ip_from_headers(&map), Some("1.1.1.1".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_for_takes_first_in_chain() {
        let map = headers(&[("x-forwarded-for", "3.3.3.3, 10.0.0.1, 10.0.0.2")]);
        assert_eq!(ip_from_headers(&map), Some("3.3.3.3".parse().unwrap()));
    }

    #[test]
    fn test_unparseable_header_falls_through() {
        let map = headers(&[("cf-connecting-ip", "not-an-ip"), ("x-real-ip", "4.4.4.4")]);
        assert_eq!(ip_from_headers(&map), Some("4.4.4.4".parse().unwrap()));
    }

    #[test]
    fn test_ipv6() {
        let map = headers(&[("x-real-ip", "2001:db8::1")]);
        assert_eq!(ip_from_headers(&map), Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_display() {
        let ip = ClientIp("5.5.5.5".parse().unwrap());
        assert_eq!(ip.to_string(), "5.5.5.5");
    }
}
