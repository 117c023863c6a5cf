use std::sync::OnceLock;

use regex::Regex;

/// The OTP input accepts at most this many characters.
pub const OTP_MAX_LEN: usize = 6;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

/// Syntactic `local@domain.tld` check. Callers trim first.
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Trim the code and cap it at [`OTP_MAX_LEN`] characters. Returns `None`
/// when nothing is left; the code is otherwise opaque.
pub fn normalize_otp(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(OTP_MAX_LEN).collect())
}
