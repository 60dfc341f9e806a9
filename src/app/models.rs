//! User records and payload validation.

use serde::{Deserialize, Serialize};

use crate::faults::FieldErrors;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

/// Body of `POST /api/users`. Missing fields deserialize as empty so that
/// they are reported as validation errors rather than rejected outright.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Accepted for realism; never stored or echoed.
    #[serde(default)]
    pub password: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.name.trim().is_empty() {
            errors
                .entry("name".into())
                .or_default()
                .push("Name is required".into());
        }

        if self.email.trim().is_empty() {
            errors
                .entry("email".into())
                .or_default()
                .push("Email is required".into());
        } else if !is_valid_email(self.email.trim()) {
            errors
                .entry("email".into())
                .or_default()
                .push("Invalid email format".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// `local@domain.tld`, no whitespace, one `@`.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, _)| !host.is_empty())
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b@mail.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada@example."));
        assert!(!is_valid_email("a da@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn test_validate_collects_field_errors() {
        let user = NewUser {
            email: "not-an-email".into(),
            ..Default::default()
        };
        let errors = user.validate().unwrap_err();
        assert_eq!(errors["email"], vec!["Invalid email format"]);
        assert_eq!(errors["name"], vec!["Name is required"]);

        let user = NewUser {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: None,
        };
        assert!(user.validate().is_ok());
    }
}
