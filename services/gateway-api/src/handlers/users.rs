//! User handlers

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use warden_types::{User, UserId};

use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extractors::AuthUser;

pub const ACCESS_DENIED: &str = "Access denied. You are not allowed to access this resource.";

#[derive(Debug, Serialize)]
pub struct OneUserResponse {
    pub user: User,
}

/// GET /api/v1/users/me
pub async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    ApiResponse::ok(StatusCode::OK, user)
}

/// GET /api/v1/users/one/:id
///
/// The caller must own the record or be an admin. The body carries the
/// authenticated user, since the broker catalogue has no lookup by id.
pub async fn one(auth_user: AuthUser, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let id = UserId::parse(&id)
        .map_err(|_| ApiError::BadRequest(vec!["id must be a valid user id".to_string()]))?;

    if !auth_user.can_access(id) {
        tracing::debug!(user_id = %auth_user.0.id, target = %id, "User access denied");
        return Err(ApiError::Forbidden(ACCESS_DENIED.to_string()));
    }

    Ok(ApiResponse::ok(
        StatusCode::OK,
        OneUserResponse { user: auth_user.0 },
    ))
}
