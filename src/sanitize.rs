//! Storage resource name sanitization
//!
//! Turns an expanded template into a legal container/blob name:
//! lowercase, `[a-z0-9-]` for the characters we rewrite, no leading,
//! trailing or doubled hyphens, 3 to 63 characters.
//!
//! The step order is significant. Truncation runs before the trailing
//! hyphen cleanup and before the minimum-length pad, so both later steps
//! see the truncated string.

use tracing::trace;

/// Maximum length of a storage container name
pub const MAX_NAME_LEN: usize = 63;

/// Minimum length of a storage container name
pub const MIN_NAME_LEN: usize = 3;

/// Character used for prefixing and padding
const FILLER: char = 'a';

/// Sanitize a raw expanded string into a legal resource name.
///
/// Total and deterministic: every input yields a name, and sanitizing a
/// sanitized name returns it unchanged.
///
/// ```
/// use ams_migrate::sanitize::sanitize_resource_name;
///
/// assert_eq!(sanitize_resource_name("My_Video (1).mp4"), "my-video-1-mp4");
/// assert_eq!(sanitize_resource_name(""), "aaa");
/// ```
pub fn sanitize_resource_name(name: &str) -> String {
    // 1. separators become hyphens, parentheses vanish
    let mut sanitized: String = name
        .chars()
        .filter(|c| !matches!(c, '(' | ')'))
        .map(|c| match c {
            ' ' | '_' | ':' | '.' => '-',
            other => other,
        })
        .collect::<String>()
        .to_lowercase();

    // 2. leading and trailing hyphens
    sanitized = sanitized.trim_matches('-').to_string();

    // 3. hyphen runs
    sanitized = collapse_hyphens(&sanitized);

    // 4. must start with a letter or digit
    if !sanitized.chars().next().is_some_and(char::is_alphanumeric) {
        sanitized.insert(0, FILLER);
    }

    // 5. clamp length
    if sanitized.chars().count() > MAX_NAME_LEN {
        sanitized = sanitized.chars().take(MAX_NAME_LEN).collect();
    }

    // 6. truncation may have exposed a hyphen
    if sanitized.ends_with('-') {
        sanitized.truncate(sanitized.trim_end_matches('-').len());
    }

    // 7. minimum length
    while sanitized.chars().count() < MIN_NAME_LEN {
        sanitized.push(FILLER);
    }

    trace!(input = name, sanitized = %sanitized, "sanitized resource name");
    sanitized
}

fn collapse_hyphens(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut previous_hyphen = false;
    for ch in s.chars() {
        let is_hyphen = ch == '-';
        if !(is_hyphen && previous_hyphen) {
            result.push(ch);
        }
        previous_hyphen = is_hyphen;
    }
    result
}
