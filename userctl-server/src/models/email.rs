//! Email address validation
//!
//! Syntactic check only: `local@domain.tld`, no whitespace, one `@`.
//! The value is stored exactly as given; uniqueness is the store's job.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Maximum length for emails (matches `VARCHAR(255)`)
pub const MAX_EMAIL_LEN: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("invalid email regex")
});

/// Validated email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Create a new email, validating its format.
    ///
    /// # Example
    /// ```
    /// use userctl_server::models::Email;
    ///
    /// assert!(Email::new("alice@example.com").is_ok());
    /// assert!(Email::new("alice").is_err());
    /// assert!(Email::new("alice@localhost").is_err()); // no TLD
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.trim().is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }

        if s.chars().count() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }

        if !EMAIL_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "must be a valid email address",
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
