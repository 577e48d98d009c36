//! Field rules for the login and registration forms.

use std::sync::LazyLock;

use regex_lite::Regex;
use thiserror::Error;

const EMAIL_PATTERN: &str = r"^[\w.-]+@([\w-]+\.)+[\w-]{2,4}$";
const PASSWORD_PATTERN: &str = r"^[\w!@#$%^&*()_+|{}:;<>?~`-]{6,}$";

type CompiledPattern = LazyLock<Result<Regex, regex_lite::Error>>;

static EMAIL_RE: CompiledPattern = LazyLock::new(|| Regex::new(EMAIL_PATTERN));
static PASSWORD_RE: CompiledPattern = LazyLock::new(|| Regex::new(PASSWORD_PATTERN));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("`{value}` is not a valid email address")]
    InvalidEmail { value: String },
    #[error(
        "password must be at least 6 characters of letters, digits or !@#$%^&*()_+|{{}}:;<>?~`-"
    )]
    InvalidPassword,
    #[error("username must be 1 to 32 characters without whitespace")]
    InvalidUsername,
    #[error("invalid {field} rule: {message}")]
    Pattern {
        field: &'static str,
        message: String,
    },
}

pub fn validate_email(value: &str, required: bool) -> Result<(), ValidationError> {
    if value.is_empty() {
        return if required {
            Err(ValidationError::Required { field: "email" })
        } else {
            Ok(())
        };
    }
    if compiled("email", &EMAIL_RE)?.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail {
            value: value.to_string(),
        })
    }
}

/// Empty passwords pass when the field is optional, e.g. an admin editing a
/// user without changing the password.
pub fn validate_password(value: &str, required: bool) -> Result<(), ValidationError> {
    if value.is_empty() {
        return if required {
            Err(ValidationError::Required { field: "password" })
        } else {
            Ok(())
        };
    }
    if compiled("password", &PASSWORD_RE)?.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPassword)
    }
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required { field: "username" });
    }
    let length = value.chars().count();
    if length > 32 || value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}

fn compiled(
    field: &'static str,
    pattern: &'static CompiledPattern,
) -> Result<&'static Regex, ValidationError> {
    pattern.as_ref().map_err(|err| ValidationError::Pattern {
        field,
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn email_rule() {
        assert_eq!(validate_email("jane.doe@example.com", true), Ok(()));
        assert_eq!(validate_email("dev-ops@mail.example.io", true), Ok(()));
        assert_eq!(
            validate_email("not-an-email", true),
            Err(ValidationError::InvalidEmail {
                value: "not-an-email".to_string()
            })
        );
        assert_eq!(
            validate_email("", true),
            Err(ValidationError::Required { field: "email" })
        );
        assert_eq!(validate_email("", false), Ok(()));
    }

    #[test]
    fn password_rule() {
        assert_eq!(validate_password("hunter2!", true), Ok(()));
        assert_eq!(
            validate_password("short", true),
            Err(ValidationError::InvalidPassword)
        );
        assert_eq!(
            validate_password("has space", true),
            Err(ValidationError::InvalidPassword)
        );
        assert_eq!(validate_password("", false), Ok(()));
    }

    #[test]
    fn username_rule() {
        assert_eq!(validate_username("admin"), Ok(()));
        assert_eq!(validate_username("a b"), Err(ValidationError::InvalidUsername));
        assert_eq!(
            validate_username(""),
            Err(ValidationError::Required { field: "username" })
        );
    }

    #[test]
    fn patterns_compile_once_and_are_reused() {
        let email = compiled("email", &EMAIL_RE).expect("email pattern compiles");
        let again = compiled("email", &EMAIL_RE).expect("email pattern compiles");
        assert!(std::ptr::eq(email, again));
        assert!(compiled("password", &PASSWORD_RE).is_ok());
    }
}
