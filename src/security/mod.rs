//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → http/request.rs (peer IP; forwarding headers only from trustedProxies)
//!     → origins.rs (match against allowedOrigins)
//!     → http/middleware/access_control.rs (403 / 503 / pass)
//! ```
//!
//! # Design Decisions
//! - Exact, case-sensitive matching; no CIDR or pattern support
//! - Fail closed: a request with no extractable origin only passes `*`
//! - Forwarding headers are client-controlled unless the peer is a listed proxy

pub mod origins;

pub use origins::{parse_trusted_proxies, AllowedOrigins, ORIGIN_DELIMITER, WILDCARD_ORIGIN};
