//! Host header allow list.
//!
//! Mirrors a preview server's `allowedHosts` setting: when the list is
//! non-empty, requests must name an allowed host (or a loopback / IP literal
//! host) in their `Host` header.

use std::net::IpAddr;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Middleware rejecting requests whose `Host` is not allowed with 403.
pub async fn require_allowed_host(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok());

    if is_allowed(host, &state.config.server.allowed_hosts) {
        return next.run(req).await;
    }

    let shown = host.unwrap_or("<missing>");
    warn!(host = shown, "Rejected request for disallowed host");
    ApiError::Forbidden(format!("Host '{shown}' is not allowed")).into_response()
}

/// Decide whether a `Host` header value passes the allow list.
///
/// - An empty list allows everything.
/// - `localhost` and IP literals are always allowed.
/// - Entries starting with `.` match the domain and all of its subdomains.
/// - Matching ignores case and any `:port` suffix.
pub fn is_allowed(host: Option<&str>, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let Some(host) = host else {
        return false;
    };

    let name = hostname(host).to_ascii_lowercase();
    if name == "localhost" || name.parse::<IpAddr>().is_ok() {
        return true;
    }

    allowed.iter().any(|entry| {
        let entry = entry.to_ascii_lowercase();
        match entry.strip_prefix('.') {
            Some(domain) => name == domain || name.ends_with(&entry),
            None => name == entry,
        }
    })
}

/// Strip the port from a `Host` value, unwrapping bracketed IPv6.
fn hostname(host: &str) -> &str {
    let host = host.trim();
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_list_allows_anything() {
        assert!(is_allowed(Some("evil.example"), &[]));
        assert!(is_allowed(None, &[]));
    }

    #[test]
    fn test_exact_match_ignores_port_and_case() {
        let allowed = list(&["demo.example.com"]);
        assert!(is_allowed(Some("demo.example.com"), &allowed));
        assert!(is_allowed(Some("Demo.Example.com:4173"), &allowed));
        assert!(!is_allowed(Some("other.example.com"), &allowed));
        assert!(!is_allowed(Some("sub.demo.example.com"), &allowed));
    }

    #[test]
    fn test_dot_prefix_allows_subdomains() {
        let allowed = list(&[".example.com"]);
        assert!(is_allowed(Some("example.com"), &allowed));
        assert!(is_allowed(Some("a.b.example.com:80"), &allowed));
        assert!(!is_allowed(Some("badexample.com"), &allowed));
    }

    #[test]
    fn test_loopback_and_ip_literals_always_allowed() {
        let allowed = list(&["demo.example.com"]);
        assert!(is_allowed(Some("localhost:3030"), &allowed));
        assert!(is_allowed(Some("127.0.0.1:3030"), &allowed));
        assert!(is_allowed(Some("[::1]:3030"), &allowed));
        assert!(is_allowed(Some("10.0.0.7"), &allowed));
    }

    #[test]
    fn test_missing_host_rejected_when_list_set() {
        assert!(!is_allowed(None, &list(&["demo.example.com"])));
    }

    #[test]
    fn test_hostname() {
        assert_eq!(hostname("example.com:8080"), "example.com");
        assert_eq!(hostname("example.com"), "example.com");
        assert_eq!(hostname("[::1]:3030"), "::1");
        assert_eq!(hostname("[::1]"), "::1");
    }
}
