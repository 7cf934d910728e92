//! Field checks shared by the services.

/// Accepts addresses of 5 to 255 characters with a non-empty local part
/// and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let len = email.chars().count();
    if !(5..=255).contains(&len) || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// Normalises an address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// True when `value` has at least `min` characters after trimming.
pub fn has_min_chars(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}
