//! Request and response payloads for each operation

use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::token::TokenPair;
use crate::user::User;
use crate::validation::{
    check_email, check_name, check_password, check_token, check_username, Validate,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Validate for SignUpRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        check_name(&mut errors, "firstName", "First name", &self.first_name);
        check_name(&mut errors, "lastName", "Last name", &self.last_name);
        if let Some(middle) = &self.middle_name {
            check_name(&mut errors, "middleName", "Middle name", middle);
        }
        if let Some(username) = &self.username {
            check_username(&mut errors, username);
        }
        errors.into_result()
    }
}

/// How a sign-in names its account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identifier<'a> {
    Email(&'a str),
    Username(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
}

impl SignInRequest {
    /// Email wins when both are present
    pub fn identifier(&self) -> Option<Identifier<'_>> {
        match (&self.email, &self.username) {
            (Some(email), _) => Some(Identifier::Email(email)),
            (None, Some(username)) => Some(Identifier::Username(username)),
            (None, None) => None,
        }
    }
}

impl Validate for SignInRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        match (&self.email, &self.username) {
            (None, None) => errors.push("email", "Email or username must be provided"),
            (Some(email), _) => check_email(&mut errors, email),
            (None, Some(username)) => check_username(&mut errors, username),
        }
        check_password(&mut errors, &self.password);
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_token(&mut errors, "refreshToken", "Refresh token", &self.refresh_token);
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    pub access_token: String,
}

impl Validate for AuthenticateRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_token(&mut errors, "accessToken", "Access token", &self.access_token);
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub refresh_token: String,
}

impl Validate for LogoutRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(access) = &self.access_token {
            check_token(&mut errors, "accessToken", "Access token", access);
        }
        check_token(&mut errors, "refreshToken", "Refresh token", &self.refresh_token);
        errors.into_result()
    }
}

/// Reply to sign-up, sign-in and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    pub valid: bool,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {}
