//! RPC handlers: boundary validation, then the auth core
//!
//! Every handler validates its payload before touching the core and maps
//! [`AuthError`] onto [`HandlerError`]. Domain rejections keep their exact
//! messages; anything else is logged and reported as internal.

use std::sync::Arc;

use warden_auth_core::{AuthError, AuthService};
use warden_broker::SharedTransport;
use warden_db::{TokenRepository, UserRepository};
use warden_rpc::{HandlerError, RpcServer, RpcTopology};
use warden_types::{
    AuthenticateRequest, LogoutRequest, Operation, RefreshRequest, SignInRequest, SignUpRequest,
    Validate,
};

/// Build the dispatcher with a route for every operation
pub fn build_server<U, T>(
    transport: SharedTransport,
    topology: RpcTopology,
    auth: Arc<AuthService<U, T>>,
) -> RpcServer
where
    U: UserRepository + 'static,
    T: TokenRepository + 'static,
{
    let sign_up = Arc::clone(&auth);
    let sign_in = Arc::clone(&auth);
    let refresh = Arc::clone(&auth);
    let authenticate = Arc::clone(&auth);
    let logout = auth;

    RpcServer::new(transport, topology)
        .route(Operation::SignUp, move |req: SignUpRequest| {
            let auth = Arc::clone(&sign_up);
            async move {
                validate(&req)?;
                auth.sign_up(req).await.map_err(handler_error)
            }
        })
        .route(Operation::SignIn, move |req: SignInRequest| {
            let auth = Arc::clone(&sign_in);
            async move {
                validate(&req)?;
                auth.sign_in(req).await.map_err(handler_error)
            }
        })
        .route(Operation::Refresh, move |req: RefreshRequest| {
            let auth = Arc::clone(&refresh);
            async move {
                validate(&req)?;
                auth.refresh(&req.refresh_token).await.map_err(handler_error)
            }
        })
        .route(Operation::Authenticate, move |req: AuthenticateRequest| {
            let auth = Arc::clone(&authenticate);
            async move {
                validate(&req)?;
                auth.authenticate(&req.access_token)
                    .await
                    .map_err(handler_error)
            }
        })
        .route(Operation::Logout, move |req: LogoutRequest| {
            let auth = Arc::clone(&logout);
            async move {
                validate(&req)?;
                auth.logout(req).await.map_err(handler_error)
            }
        })
}

fn validate(payload: &impl Validate) -> Result<(), HandlerError> {
    payload
        .validate()
        .map_err(|errors| HandlerError::Domain(errors.messages()))
}

fn handler_error(err: AuthError) -> HandlerError {
    if err.is_domain() {
        tracing::debug!(code = err.error_code(), "Request rejected");
        HandlerError::Domain(err.messages())
    } else {
        tracing::error!(code = err.error_code(), error = %err, "Request failed");
        HandlerError::Internal(err.to_string())
    }
}
