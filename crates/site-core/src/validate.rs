//! Input validation for sign-in and registration forms.
//!
//! Validation runs before any network call so obviously bad input never
//! reaches the identity provider.

/// Check whether a string is a plausible email address.
///
/// Requires exactly one `@` with a non-empty local part and a domain that
/// contains a dot with characters on both sides. Whitespace anywhere makes
/// the address invalid.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() || domain.is_empty() {
        return false;
    }

    // Domain needs a dot with at least one character on each side.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Score a password on a 0..=4 scale.
///
/// One point each for length of at least 8, a lowercase letter, an uppercase
/// letter, a digit, and a symbol, minus one, clamped to the 0..=4 range.
/// Returns `None` for an empty password, which callers render as "no meter"
/// rather than "weakest".
pub fn password_strength(password: &str) -> Option<u8> {
    if password.is_empty() {
        return None;
    }

    let mut score: u8 = 0;
    if password.chars().count() >= 8 {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if password
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace())
    {
        score += 1;
    }

    Some(score.saturating_sub(1).min(4))
}

/// Check whether a password meets the registration requirements: at least
/// 8 characters with a lowercase letter, an uppercase letter, a digit, and
/// a symbol.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password
            .chars()
            .any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace())
}
