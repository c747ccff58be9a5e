//! Origin allow-list.

use std::fmt;
use std::net::IpAddr;

pub const WILDCARD_ORIGIN: &str = "*";
pub const ORIGIN_DELIMITER: char = ',';

/// Origins allowed to reach the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin.
    #[default]
    Any,
    /// Only these exact origins, in configuration order.
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parse a comma-delimited list. Entries are trimmed; a list made of the
    /// single entry `*` allows any origin. A `*` among other entries is just
    /// a string that no origin matches.
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(ORIGIN_DELIMITER)
            .map(|origin| origin.trim().to_string())
            .collect();

        match origins.as_slice() {
            [only] if only == WILDCARD_ORIGIN => AllowedOrigins::Any,
            _ => AllowedOrigins::List(origins),
        }
    }

    /// True if `origin` is allowed. `None` (no extractable origin) only
    /// passes the wildcard.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match self {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(list) => origin.is_some_and(|o| list.iter().any(|allowed| allowed == o)),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, AllowedOrigins::Any)
    }
}

impl fmt::Display for AllowedOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedOrigins::Any => f.write_str(WILDCARD_ORIGIN),
            AllowedOrigins::List(list) => f.write_str(&list.join(", ")),
        }
    }
}

/// Parse a comma-delimited list of proxy IPs. Blank and unparsable
/// entries are skipped; settings validation reports them.
pub fn parse_trusted_proxies(raw: &str) -> Vec<IpAddr> {
    raw.split(ORIGIN_DELIMITER)
        .filter_map(|entry| entry.trim().parse().ok())
        .collect()
}
