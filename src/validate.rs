//! Client-side form validation, run before any request leaves the
//! process. Collects every problem at once instead of failing on the
//! first, so a form can highlight all offending fields.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

const MIN_PASSWORD_LEN: usize = 8;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub fn login_form(username: &str, password: &str) -> Result<(), ValidationError> {
    let mut issues = Vec::new();
    if username.trim().is_empty() {
        issues.push("username is required".to_string());
    }
    if password.is_empty() {
        issues.push("password is required".to_string());
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}

pub fn registration_form(form: &RegistrationForm) -> Result<(), ValidationError> {
    let mut issues = Vec::new();
    if form.name.trim().is_empty() {
        issues.push("name is required".to_string());
    }
    if form.username.trim().is_empty() {
        issues.push("username is required".to_string());
    }
    if form.email.trim().is_empty() {
        issues.push("email is required".to_string());
    } else if !email_regex().is_match(form.email.trim()) {
        issues.push("email is not a valid address".to_string());
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        issues.push(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if form.password != form.confirm_password {
        issues.push("passwords do not match".to_string());
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            name: "Ada Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
            confirm_password: "correct horse".to_string(),
        }
    }

    #[test]
    fn test_login_form_requires_both_fields() {
        assert!(login_form("ada", "secret").is_ok());
        let err = login_form(" ", "").unwrap_err();
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(registration_form(&valid_form()).is_ok());
    }

    #[test]
    fn test_bad_email_shapes_rejected() {
        for bad in ["not-an-email", "a@b", "a @b.com", "@b.com", "a@.com x"] {
            let form = RegistrationForm { email: bad.to_string(), ..valid_form() };
            let err = registration_form(&form).unwrap_err();
            assert!(
                err.issues.iter().any(|i| i.contains("email")),
                "expected email issue for {bad:?}"
            );
        }
    }

    #[test]
    fn test_password_mismatch_and_length_both_reported() {
        let form = RegistrationForm {
            password: "short".to_string(),
            confirm_password: "different".to_string(),
            ..valid_form()
        };
        let err = registration_form(&form).unwrap_err();
        assert!(err.issues.iter().any(|i| i.contains("at least")));
        assert!(err.issues.iter().any(|i| i.contains("do not match")));
    }
}
