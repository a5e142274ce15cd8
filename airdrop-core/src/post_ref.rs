//! Post URL parsing
//!
//! Two patterns with different strictness: [`validate_url`] gates what a user
//! may submit, [`extract_id`] pulls the numeric post id out of anything that
//! looks like a post link (including `#!/` and legacy `statuses` paths).

use once_cell::sync::Lazy;
use regex::Regex;

/// Full-URL shape accepted from participants
static POST_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(www\.)?(twitter\.com|x\.com)/[A-Za-z0-9_]+/status(es)?/[0-9]+(\?.*)?$")
        .expect("Invalid post URL regex")
});

/// Looser pattern used to locate the post id
static POST_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:twitter\.com|x\.com)/(?:#!/)?([A-Za-z0-9_]+)/status(?:es)?/([0-9]+)")
        .expect("Invalid post id regex")
});

/// Whether `url` is an acceptable public post URL
pub fn validate_url(url: &str) -> bool {
    POST_URL_PATTERN.is_match(url)
}

/// Extract the numeric post identifier
pub fn extract_id(url: &str) -> Option<String> {
    POST_ID_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Extract the handle segment of a post URL
pub fn extract_handle(url: &str) -> Option<String> {
    POST_ID_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
