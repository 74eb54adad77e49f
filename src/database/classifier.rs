//! Driver failure classification.
//!
//! # Responsibilities
//! - Map raw driver/network failures to an [`ErrorCategory`]
//! - Keep the driver's message for logs; classification never rewrites it
//!
//! # Design Decisions
//! - Pattern matching on code first, then on the lowercased message
//! - Name resolution and authentication are checked before timeout: drivers
//!   report both wrapped inside a server-selection timeout
//! - Anything unmatched is `Unknown`

use crate::database::error::{DriverError, ErrorCategory};

const NAME_RESOLUTION_CODES: &[&str] = &["ENOTFOUND", "EAI_AGAIN", "DnsResolve"];
const NAME_RESOLUTION_PATTERNS: &[&str] = &[
    "getaddrinfo",
    "failed to lookup address",
    "no such host",
    "dns",
    "querysrv",
    "srv record",
];

const AUTHENTICATION_CODES: &[&str] = &["8000", "18", "AuthenticationFailed"];
const AUTHENTICATION_PATTERNS: &[&str] = &["authentication", "auth failed", "bad auth"];

const TIMEOUT_CODES: &[&str] = &["ETIMEDOUT", "ESOCKETTIMEDOUT"];
const TIMEOUT_PATTERNS: &[&str] = &["timeout", "timed out"];

/// Classify a driver failure.
pub fn classify(err: &DriverError) -> ErrorCategory {
    let message = err.message.to_lowercase();
    let code = err.code.as_deref();

    let matches = |codes: &[&str], patterns: &[&str]| {
        code.is_some_and(|c| codes.contains(&c)) || patterns.iter().any(|p| message.contains(p))
    };

    if matches(NAME_RESOLUTION_CODES, NAME_RESOLUTION_PATTERNS) {
        ErrorCategory::NameResolutionFailed
    } else if matches(AUTHENTICATION_CODES, AUTHENTICATION_PATTERNS) {
        ErrorCategory::AuthenticationFailed
    } else if matches(TIMEOUT_CODES, TIMEOUT_PATTERNS) {
        ErrorCategory::Timeout
    } else {
        ErrorCategory::Unknown
    }
}
