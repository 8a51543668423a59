/// Account management system
///
/// Handles registration, login, profile updates and account deletion.

pub mod manager;

pub use manager::AccountManager;

use crate::{db::account::Profile, error::FieldError};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// Registration request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "First name must be 2-50 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50, message = "Last name must be 2-50 characters"))]
    pub last_name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl RegisterRequest {
    /// Trim names and normalise the email before validation
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
            confirm_password: self.confirm_password,
        }
    }
}

/// Login request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Profile update; omitted or blank fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "First name must be 2-50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Last name must be 2-50 characters"))]
    pub last_name: Option<String>,
    #[validate(email(message = "A valid email address is required"))]
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    pub fn normalized(self) -> Self {
        let keep = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            first_name: keep(self.first_name),
            last_name: keep(self.last_name),
            email: keep(self.email).map(|e| normalize_email(&e)),
        }
    }
}

/// Registration / login response
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: Profile,
    pub token: String,
}

/// Validated identity resolved from a bearer token
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub account_id: String,
    pub email: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Flatten validator output into field errors, camelCased and sorted by field
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = to_camel_case(field.as_ref());
            errs.iter().map(move |e| FieldError {
                field: field.clone(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", e.code)),
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_collects_every_field_error() {
        let req = RegisterRequest {
            first_name: "A".into(),
            last_name: "".into(),
            email: "not-an-email".into(),
            password: "123".into(),
            confirm_password: "456".into(),
        }
        .normalized();

        let errors = req.validate().unwrap_err();
        let fields: Vec<String> = field_errors(&errors).into_iter().map(|e| e.field).collect();

        assert!(fields.contains(&"firstName".to_string()));
        assert!(fields.contains(&"lastName".to_string()));
        assert!(fields.contains(&"email".to_string()));
        assert!(fields.contains(&"password".to_string()));
        assert!(fields.contains(&"confirmPassword".to_string()));
    }

    #[test]
    fn test_register_normalizes() {
        let req = RegisterRequest {
            first_name: "  Ada ".into(),
            last_name: " Lovelace".into(),
            email: " Ada@Example.COM ".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
        .normalized();

        assert_eq!(req.first_name, "Ada");
        assert_eq!(req.email, "ada@example.com");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_profile_blank_fields_dropped() {
        let req = UpdateProfileRequest {
            first_name: Some("   ".into()),
            last_name: None,
            email: Some("NEW@example.com".into()),
        }
        .normalized();

        assert_eq!(req.first_name, None);
        assert_eq!(req.email.as_deref(), Some("new@example.com"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("confirm_password"), "confirmPassword");
        assert_eq!(to_camel_case("email"), "email");
    }
}
