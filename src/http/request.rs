//! Request inspection.
//!
//! # Responsibilities
//! - Extract the caller's origin IP
//! - Expose the request ID assigned by the request-id layer

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// The origin IP of a request.
///
/// The peer address recorded by axum's `ConnectInfo` is the origin. Only
/// when that peer is one of `trusted_proxies` are the forwarding headers
/// consulted: the first `X-Forwarded-For` entry, then `X-Real-IP`.
/// Headers from any other peer are client-controlled and ignored.
pub fn origin_ip<B>(req: &Request<B>, trusted_proxies: &[IpAddr]) -> Option<String> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())?;

    if trusted_proxies.contains(&peer) {
        if let Some(ip) = forwarded_ip(req) {
            return Some(ip.to_string());
        }
    }

    Some(peer.to_string())
}

fn forwarded_ip<B>(req: &Request<B>) -> Option<&str> {
    header_str(req, X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(req, X_REAL_IP).map(str::trim).filter(|v| !v.is_empty()))
}

fn header_str<'a, B>(req: &'a Request<B>, name: &'static str) -> Option<&'a str> {
    req.headers()
        .get(HeaderName::from_static(name))
        .and_then(|v| v.to_str().ok())
}

/// Access to the request ID set by the request-id layer.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        header_str(self, X_REQUEST_ID).unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn from_peer(peer: &str) -> axum::http::request::Builder {
        let addr: SocketAddr = format!("{peer}:40000").parse().unwrap();
        Request::builder().extension(ConnectInfo(addr))
    }

    fn proxies() -> Vec<IpAddr> {
        vec!["10.0.0.1".parse().unwrap()]
    }

    #[test]
    fn test_peer_address_is_origin() {
        let req = from_peer("127.0.0.1").body(Body::default()).unwrap();
        assert_eq!(origin_ip(&req, &[]).as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_headers_ignored_from_untrusted_peer() {
        let req = from_peer("127.0.0.1")
            .header("X-Forwarded-For", "1.2.3.4")
            .header("X-Real-IP", "9.9.9.9")
            .body(Body::default())
            .unwrap();
        assert_eq!(origin_ip(&req, &proxies()).as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_forwarded_for_first_entry_from_trusted_proxy() {
        let req = from_peer("10.0.0.1")
            .header("X-Forwarded-For", " 1.2.3.4 , 10.0.0.1")
            .header("X-Real-IP", "9.9.9.9")
            .body(Body::default())
            .unwrap();
        assert_eq!(origin_ip(&req, &proxies()).as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn test_real_ip_from_trusted_proxy() {
        let req = from_peer("10.0.0.1")
            .header("X-Real-IP", "9.9.9.9")
            .body(Body::default())
            .unwrap();
        assert_eq!(origin_ip(&req, &proxies()).as_deref(), Some("9.9.9.9"));

        let bare = from_peer("10.0.0.1").body(Body::default()).unwrap();
        assert_eq!(origin_ip(&bare, &proxies()).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_no_peer_no_origin() {
        let req = Request::builder()
            .header("X-Forwarded-For", "1.2.3.4")
            .body(Body::default())
            .unwrap();
        assert_eq!(origin_ip(&req, &proxies()), None);
    }

    #[test]
    fn test_request_id() {
        let req = Request::builder()
            .header(X_REQUEST_ID, "abc")
            .body(Body::default())
            .unwrap();
        assert_eq!(req.request_id(), "abc");
        assert_eq!(Request::new(Body::default()).request_id(), "unknown");
    }
}
