//! Field validation applied at the boundary, before any payload reaches
//! the auth core.

use crate::error::ValidationErrors;

pub const EMAIL_MAX_LENGTH: usize = 80;
pub const USERNAME_MIN_LENGTH: usize = 5;
pub const USERNAME_MAX_LENGTH: usize = 80;
pub const NAME_MIN_LENGTH: usize = 1;
pub const NAME_MAX_LENGTH: usize = 80;
pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const PASSWORD_MAX_LENGTH: usize = 80;
pub const TOKEN_MAX_LENGTH: usize = 1024;

/// Implemented by every request payload
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

fn length_between(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
    max: usize,
) -> bool {
    let len = value.chars().count();
    if len < min {
        errors.push(field, format!("{label} must be at least {min} characters long"));
        return false;
    }
    if len > max {
        errors.push(field, format!("{label} must be at most {max} characters long"));
        return false;
    }
    true
}

/// Minimal structural email check: one `@`, non-empty local part, a dotted
/// domain with no empty labels and no whitespace anywhere.
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

pub fn check_email(errors: &mut ValidationErrors, value: &str) {
    if value.chars().count() > EMAIL_MAX_LENGTH {
        errors.push(
            "email",
            format!("Email must be equal or shorter than {EMAIL_MAX_LENGTH} symbols"),
        );
    } else if !is_email(value) {
        errors.push("email", "Email must be an email");
    }
}

pub fn check_username(errors: &mut ValidationErrors, value: &str) {
    if length_between(
        errors,
        "username",
        "Username",
        value,
        USERNAME_MIN_LENGTH,
        USERNAME_MAX_LENGTH,
    ) && !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
    {
        errors.push(
            "username",
            "Username can contain just latin symbols, digits, and dots",
        );
    }
}

pub fn check_name(errors: &mut ValidationErrors, field: &'static str, label: &str, value: &str) {
    if length_between(errors, field, label, value, NAME_MIN_LENGTH, NAME_MAX_LENGTH)
        && !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '\'')
    {
        errors.push(
            field,
            format!("{label} can contain just latin symbols, digits, underscores and single quotes"),
        );
    }
}

pub fn check_password(errors: &mut ValidationErrors, value: &str) {
    length_between(
        errors,
        "password",
        "Password",
        value,
        PASSWORD_MIN_LENGTH,
        PASSWORD_MAX_LENGTH,
    );
}

pub fn check_token(errors: &mut ValidationErrors, field: &'static str, label: &str, value: &str) {
    length_between(errors, field, label, value, 1, TOKEN_MAX_LENGTH);
}
