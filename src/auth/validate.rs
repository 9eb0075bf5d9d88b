//! Field validators shared by registration, profile edits and the CLI.
//!
//! Each validator has the `validator::ValidationError` signature so it can be
//! plugged into `#[validate(custom(function = ...))]` on DTOs.

use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;
use validator::ValidationError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("email regex")
});

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("username regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9\-]{10,15}$").expect("phone regex"));

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_SPECIALS: &str = r#"!@#$%^&*(),.?":{}|<>"#;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(invalid(
            "password_too_short",
            "Password must contain at least 8 characters.",
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(
            "password_entirely_numeric",
            "Password cannot be entirely numeric.",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(invalid(
            "password_no_upper",
            "Password must contain at least one uppercase letter.",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(invalid(
            "password_no_lower",
            "Password must contain at least one lowercase letter.",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid(
            "password_no_digit",
            "Password must contain at least one digit.",
        ));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(invalid(
            "password_no_special",
            "Password must contain at least one special character.",
        ));
    }
    Ok(())
}

pub fn validate_email_format(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email) {
        return Err(invalid("email", "Enter a valid email address."));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if !USERNAME_RE.is_match(username) {
        return Err(invalid(
            "username",
            "Username may contain only letters, digits and @/./+/-/_ characters (max 150).",
        ));
    }
    Ok(())
}

pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    if !PHONE_RE.is_match(phone) {
        return Err(invalid(
            "phone_no",
            "Phone number must be 10-15 digits, can start with + and contain hyphens.",
        ));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Keeps a leading `+` and drops every other non-digit.
pub fn normalize_phone_number(phone: &str) -> String {
    let mut out = String::with_capacity(phone.len());
    for (i, c) in phone.chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strong_password_passes() {
        assert!(validate_password_strength("Str0ng!Pass").is_ok());
    }

    #[test]
    fn weak_passwords_fail_with_specific_codes() {
        let cases = [
            ("Ab1!", "password_too_short"),
            ("12345678", "password_entirely_numeric"),
            ("lowercase1!", "password_no_upper"),
            ("UPPERCASE1!", "password_no_lower"),
            ("NoDigits!!", "password_no_digit"),
            ("NoSpecial1", "password_no_special"),
        ];
        for (password, code) in cases {
            let err = validate_password_strength(password).unwrap_err();
            assert_eq!(err.code, code, "password `{password}`");
        }
    }

    #[test]
    fn email_format() {
        assert!(validate_email_format("john.doe+1@example.com").is_ok());
        assert!(validate_email_format("john@localhost").is_err());
        assert!(validate_email_format("no-at-sign.com").is_err());
        assert_eq!(normalize_email(" John@Example.COM "), "john@example.com");
    }

    #[test]
    fn username_format() {
        assert!(validate_username("student_01").is_ok());
        assert!(validate_username("with space").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn phone_number_format_and_normalization() {
        assert!(validate_phone_number("+977-9812345678").is_ok());
        assert!(validate_phone_number("12345").is_err());
        assert!(validate_phone_number("98123abc45678").is_err());
        assert_eq!(normalize_phone_number("+977-9812345678"), "+9779812345678");
        assert_eq!(normalize_phone_number("981-234-5678"), "9812345678");
    }
}
