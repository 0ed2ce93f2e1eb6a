//! Client IP extraction
//!
//! Used to key the login failure limiter. `X-Forwarded-For` is only trusted as far as the
//! configured number of reverse proxies.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::state::AppState;

/// Client IP of the current request, or `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let socket_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(extract_client_ip(
            &parts.headers,
            socket_addr.as_ref(),
            state.trusted_proxy_count,
        )))
    }
}

/// Extract and validate client IP from request headers
///
/// Tries `X-Forwarded-For` (honouring `trusted_proxy_count`), then `X-Real-IP`, then the
/// socket address.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(header_value) = forwarded_for.to_str() {
            if let Some(ip) = extract_from_forwarded_for(header_value, trusted_proxy_count) {
                return ip;
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(header_value) = real_ip.to_str() {
            let trimmed = header_value.trim();
            if is_valid_ip(trimmed) {
                return trimmed.to_string();
            }
        }
    }

    if let Some(addr) = socket_addr {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// The chain reads `client, proxy1, proxy2, ...`. With N trusted proxies the client is the
/// entry just before the last N; with none, only the closest hop is used.
fn extract_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let candidate = if trusted_proxy_count == 0 || ips.len() <= trusted_proxy_count {
        ips.last()
    } else {
        ips.get(ips.len() - trusted_proxy_count - 1)
    }?;

    is_valid_ip(candidate).then(|| candidate.to_string())
}

fn is_valid_ip(ip_str: &str) -> bool {
    ip_str.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn create_headers_with_xff(xff_value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(xff_value).unwrap());
        headers
    }

    #[test]
    fn test_extract_from_forwarded_for_single_ip() {
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1", 0).as_deref(),
            Some("192.168.1.1")
        );
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1", 1).as_deref(),
            Some("192.168.1.1")
        );
    }

    #[test]
    fn test_extract_from_forwarded_for_with_proxies() {
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1, 10.0.0.1", 1).as_deref(),
            Some("192.168.1.1")
        );
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1, 10.0.0.1, 10.0.0.2", 2).as_deref(),
            Some("192.168.1.1")
        );
    }

    #[test]
    fn test_spoofed_prefix_is_ignored() {
        // Client prepended a fake entry; only the hop added by our proxy counts.
        assert_eq!(
            extract_from_forwarded_for("1.2.3.4, 192.168.1.1, 10.0.0.1", 1).as_deref(),
            Some("192.168.1.1")
        );
    }

    #[test]
    fn test_extract_from_forwarded_for_no_trusted_proxies() {
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1, 10.0.0.1", 0).as_deref(),
            Some("10.0.0.1")
        );
    }

    #[test]
    fn test_extract_from_forwarded_for_invalid_ip() {
        assert_eq!(extract_from_forwarded_for("not.an.ip.address", 0), None);
        assert_eq!(extract_from_forwarded_for(" , ", 1), None);
    }

    #[test]
    fn test_extract_client_ip_fallbacks() {
        let headers = create_headers_with_xff("garbage");
        let socket = SocketAddr::from(([127, 0, 0, 1], 8080));
        assert_eq!(extract_client_ip(&headers, Some(&socket), 1), "127.0.0.1");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(extract_client_ip(&headers, Some(&socket), 1), "203.0.113.9");

        assert_eq!(extract_client_ip(&HeaderMap::new(), None, 0), "unknown");
    }
}
