use lazy_static::lazy_static;
use regex::Regex;

/// Emails are case-sensitive identities (they are the token subject key),
/// so only surrounding whitespace is stripped; case is preserved.
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_string()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Link placed in the verification email.
pub(crate) fn verification_link(base_url: &str, token: &str) -> String {
    format!("{}/verify-email?token={}", base_url.trim_end_matches('/'), token)
}

/// Link placed in the password reset email.
pub(crate) fn reset_link(base_url: &str, token: &str) -> String {
    format!(
        "{}/reset-password/confirm?token={}",
        base_url.trim_end_matches('/'),
        token
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_preserves_case() {
        assert_eq!(normalize_email(" A@X.com "), "A@X.com");
        assert_ne!(normalize_email("A@x.com"), normalize_email("a@x.com"));
    }

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("@x.com"));
    }

    #[test]
    fn links_do_not_double_slash() {
        assert_eq!(
            verification_link("http://localhost:8080/", "tok"),
            "http://localhost:8080/verify-email?token=tok"
        );
        assert_eq!(
            reset_link("http://localhost:8080", "tok"),
            "http://localhost:8080/reset-password/confirm?token=tok"
        );
    }
}
