//! Content limits and token extraction for user-authored text.

use crate::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum tweet length in characters.
pub const MAX_TWEET_CHARS: usize = 280;
/// Maximum direct message length in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;
/// Maximum display name length in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;
/// Maximum bio length in characters.
pub const MAX_BIO_CHARS: usize = 160;
pub const MIN_USERNAME_CHARS: usize = 3;
pub const MAX_USERNAME_CHARS: usize = 30;

static HASHTAG_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"#(\w+)"));
static MENTION_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"@(\w+)"));
static USERNAME_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$"));

fn captures(re: &Lazy<Result<Regex, regex::Error>>, content: &str) -> Vec<String> {
    let Ok(re) = re.as_ref() else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for cap in re.captures_iter(content) {
        if let Some(m) = cap.get(1) {
            let token = m.as_str().to_lowercase();
            if !out.contains(&token) {
                out.push(token);
            }
        }
    }
    out
}

/// Extract `#tag` tokens, lower-cased and de-duplicated in first-seen order.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    captures(&HASHTAG_RE, content)
}

/// Extract `@username` tokens, lower-cased and de-duplicated in first-seen order.
pub fn extract_mentions(content: &str) -> Vec<String> {
    captures(&MENTION_RE, content)
}

/// Trim and check that `value` is non-empty and at most `max` characters.
pub fn validate_text(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(trimmed.to_string())
}

/// Like [`validate_text`] but an empty value is allowed.
pub fn validate_optional_text(
    field: &str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(trimmed.to_string())
}

/// Normalize a username: trimmed, lower-cased, 3-30 word characters.
pub fn normalize_username(raw: &str) -> Result<String, ValidationError> {
    let username = raw.trim().to_lowercase();
    let len = username.chars().count();
    if !(MIN_USERNAME_CHARS..=MAX_USERNAME_CHARS).contains(&len) {
        return Err(ValidationError::InvalidValue {
            field: "username".to_string(),
            reason: format!(
                "must be between {} and {} characters",
                MIN_USERNAME_CHARS, MAX_USERNAME_CHARS
            ),
        });
    }
    let valid = USERNAME_RE
        .as_ref()
        .map(|re| re.is_match(&username))
        .unwrap_or(false);
    if !valid {
        return Err(ValidationError::InvalidValue {
            field: "username".to_string(),
            reason: "may only contain letters, numbers and underscores".to_string(),
        });
    }
    Ok(username)
}
