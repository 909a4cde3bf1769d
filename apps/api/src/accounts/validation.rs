use serde::Deserialize;

use crate::errors::{AppError, FieldErrors};
use crate::models::user::UserRole;

pub const NAME_MAX_CHARS: usize = 30;
const EMAIL_MAX_CHARS: usize = 254;

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Body of `POST /signup`. Missing fields deserialize as empty and are
/// reported by [`validate_signup`] rather than by the JSON extractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: Option<String>,
}

/// A signup request that passed validation, with the email normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSignup {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserRole,
}

impl ValidSignup {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Trimmed and lower-cased; the form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    if email.len() > EMAIL_MAX_CHARS || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') || domain.is_empty() {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}

fn check_name(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if value.chars().count() > NAME_MAX_CHARS {
        errors.add(
            field,
            format!("Ensure this field has no more than {NAME_MAX_CHARS} characters."),
        );
    }
    value.to_string()
}

/// Collects every field problem at once; nothing touches the store until this passes.
pub fn validate_signup(request: &SignupRequest) -> Result<ValidSignup, AppError> {
    let mut errors = FieldErrors::new();

    let email = normalize_email(&request.email);
    if email.is_empty() {
        errors.add("email", REQUIRED);
    } else if !is_valid_email(&email) {
        errors.add("email", INVALID_EMAIL);
    }

    if request.password.is_empty() {
        errors.add("password", REQUIRED);
    }

    let first_name = check_name(&mut errors, "first_name", &request.first_name);
    let last_name = check_name(&mut errors, "last_name", &request.last_name);

    let user_type = match request.user_type.as_deref() {
        None | Some("") => UserRole::default(),
        Some(raw) => raw.parse::<UserRole>().unwrap_or_else(|message| {
            errors.add("user_type", message);
            UserRole::default()
        }),
    };

    errors.into_result()?;

    Ok(ValidSignup {
        email,
        password: request.password.clone(),
        first_name,
        last_name,
        user_type,
    })
}
