//! Helpers shared by the HTTP clients.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Log-safe digest of a response body. Bodies may echo tokens or user data,
/// so only the length and a hash are recorded.
pub fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// `Authorization` header value for a bearer token.
pub fn bearer_header(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Join a base URL and an absolute endpoint path.
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
