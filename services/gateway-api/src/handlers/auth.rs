//! Authentication handlers (sign-up, sign-in, refresh, logout)

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use warden_types::{
    AuthSession, LogoutRequest, LogoutResponse, Operation, RefreshRequest, SignInRequest,
    SignUpRequest, Validate,
};

use crate::cookies;
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extractors::token_from;
use crate::state::AppState;

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/auth/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<Response> {
    req.validate()?;
    let session: AuthSession = forward(&state, Operation::SignUp, &req).await?;
    Ok(with_session(&state, StatusCode::CREATED, session))
}

/// POST /api/v1/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Response> {
    req.validate()?;
    let session: AuthSession = forward(&state, Operation::SignIn, &req).await?;
    Ok(with_session(&state, StatusCode::OK, session))
}

/// POST /api/v1/auth/refresh
///
/// Refresh token from the `refreshToken` cookie or a bearer header
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let refresh_token =
        token_from(&headers, cookies::REFRESH_TOKEN).ok_or(ApiError::Unauthorized)?;
    let req = RefreshRequest { refresh_token };
    req.validate()?;

    let session: AuthSession = forward(&state, Operation::Refresh, &req).await?;
    Ok(with_session(&state, StatusCode::OK, session))
}

/// POST /api/v1/auth/logout
///
/// Revokes the presented tokens when there are any, then clears the
/// cookies whatever the outcome. The refresh token comes from the cookie or
/// a bearer header like [`refresh`]; the access token only from its cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let clear = AppendHeaders(cookies::clear_tokens(state.config.cookie_secure));

    let result = match token_from(&headers, cookies::REFRESH_TOKEN) {
        Some(refresh_token) => {
            let req = LogoutRequest {
                access_token: cookies::read(&headers, cookies::ACCESS_TOKEN),
                refresh_token,
            };
            match req.validate() {
                Ok(()) => forward::<_, LogoutResponse>(&state, Operation::Logout, &req).await,
                Err(errors) => Err(errors.into()),
            }
        }
        None => Ok(LogoutResponse {}),
    };

    match result {
        Ok(data) => (clear, ApiResponse::ok(StatusCode::OK, data)).into_response(),
        Err(err) => (clear, err).into_response(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// One RPC; a rejection becomes [`ApiError::Rejected`]
async fn forward<Req, Res>(state: &AppState, operation: Operation, req: &Req) -> ApiResult<Res>
where
    Req: Serialize,
    Res: DeserializeOwned,
{
    state
        .rpc
        .call(operation, req)
        .await?
        .into_result()
        .map_err(|errors| {
            tracing::debug!(operation = %operation, ?errors, "Request rejected");
            ApiError::Rejected(errors)
        })
}

fn with_session(state: &AppState, status: StatusCode, session: AuthSession) -> Response {
    let cookies = cookies::set_tokens(&session.tokens, state.config.cookie_secure);
    (AppendHeaders(cookies), ApiResponse::ok(status, session)).into_response()
}
