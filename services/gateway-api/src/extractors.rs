//! Axum extractors for authentication

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use warden_types::{AuthenticateRequest, AuthenticateResponse, Operation, User, UserId, Validate};

use crate::cookies;
use crate::error::ApiError;
use crate::state::AppState;

/// Token from `Authorization: Bearer` or, failing that, the named cookie
pub fn token_from(headers: &HeaderMap, cookie: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);
    bearer.or_else(|| cookies::read(headers, cookie))
}

/// User resolved through the `authenticate` operation
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    /// Owners reach their own record; admins and superadmins reach any
    pub fn can_access(&self, id: UserId) -> bool {
        self.0.id == id || self.0.role.is_admin()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let access_token =
            token_from(&parts.headers, cookies::ACCESS_TOKEN).ok_or(ApiError::Unauthorized)?;
        let request = AuthenticateRequest { access_token };
        request.validate()?;

        let response: AuthenticateResponse = app_state
            .rpc
            .call(Operation::Authenticate, &request)
            .await?
            .into_result()
            .map_err(|errors| {
                tracing::debug!(?errors, "Authentication rejected");
                ApiError::Rejected(errors)
            })?;

        Ok(AuthUser(response.user))
    }
}
