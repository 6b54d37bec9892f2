//! Cache key formats.
//!
//! Feed pages live under the `feed:` namespace so a single prefix delete
//! drops every page. Profiles are keyed by username and invalidated one at
//! a time.

/// Namespace holding every cached feed page.
pub const FEED_PREFIX: &str = "feed:";
/// Namespace holding cached profiles.
pub const PROFILE_PREFIX: &str = "profile:";

/// `feed:<page>:<limit>`
pub fn feed(page: u64, limit: u64) -> String {
    format!("{FEED_PREFIX}{page}:{limit}")
}

/// `profile:<username>`, username lower-cased.
pub fn profile(username: &str) -> String {
    format!("{PROFILE_PREFIX}{}", username.to_lowercase())
}
