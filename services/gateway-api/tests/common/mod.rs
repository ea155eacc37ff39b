//! Gateway over an in-process broker with a stubbed users service

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::Utc;
use gateway_api::{router, AppState, Config};
use warden_broker::{MemoryBroker, SharedTransport};
use warden_rpc::{ClientOptions, HandlerError, RpcClient, RpcServer, RpcTopology, ServerHandle};
use warden_types::{
    AuthSession, AuthenticateRequest, AuthenticateResponse, LogoutRequest, LogoutResponse,
    Operation, RefreshRequest, Role, SignInRequest, SignUpRequest, TokenPair, User, UserId,
};

pub const GOOD_PASSWORD: &str = "s3cret-pass";
pub const ACCESS: &str = "access-token";
pub const REFRESH: &str = "refresh-token";
/// Access token that authenticates as [`admin`]
pub const ADMIN_ACCESS: &str = "admin-access-token";

pub const OWNER_ID: &str = "5b1d2c9e-3f4a-4b6c-8d7e-9f0a1b2c3d4e";
pub const ADMIN_ID: &str = "0a9b8c7d-6e5f-4a3b-9c1d-2e3f4a5b6c7d";

pub struct Gateway {
    pub app: Router,
    pub server: Option<ServerHandle>,
    pub logouts: Arc<Mutex<Vec<LogoutRequest>>>,
}

pub fn user(email: &str) -> User {
    user_with(UserId::new(), Role::User, email)
}

/// The user behind [`ACCESS`]
pub fn owner() -> User {
    user_with(fixed_id(OWNER_ID), Role::User, "a@x.com")
}

/// The user behind [`ADMIN_ACCESS`]
pub fn admin() -> User {
    user_with(fixed_id(ADMIN_ID), Role::Admin, "admin@x.com")
}

fn fixed_id(id: &str) -> UserId {
    UserId::parse(id).expect("fixed id")
}

fn user_with(id: UserId, role: Role, email: &str) -> User {
    let now = Utc::now();
    User {
        id,
        username: None,
        avatar: String::new(),
        role,
        first_name: "Ray".into(),
        middle_name: None,
        last_name: "Bradbury".into(),
        email: email.into(),
        phone_number: None,
        email_confirmed: false,
        phone_confirmed: false,
        deactivated: false,
        created_at: now,
        updated_at: now,
    }
}

fn session(email: &str) -> AuthSession {
    AuthSession {
        user: user(email),
        tokens: TokenPair {
            access_token: ACCESS.into(),
            refresh_token: REFRESH.into(),
            access_token_expired_after: 1_700_000_000_000,
            refresh_token_expired_after: 1_700_000_000_000,
        },
    }
}

fn stub_server(transport: SharedTransport, logouts: Arc<Mutex<Vec<LogoutRequest>>>) -> RpcServer {
    RpcServer::new(transport, RpcTopology::default())
        .route(Operation::SignUp, |req: SignUpRequest| async move {
            if req.email == "taken@x.com" {
                return Err(HandlerError::domain("Email is already occupied"));
            }
            Ok(session(&req.email))
        })
        .route(Operation::SignIn, |req: SignInRequest| async move {
            if req.password != GOOD_PASSWORD {
                return Err(HandlerError::domain("Invalid email, username, or password"));
            }
            Ok(session(req.email.as_deref().unwrap_or("a@x.com")))
        })
        .route(Operation::Refresh, |req: RefreshRequest| async move {
            if req.refresh_token != REFRESH {
                return Err(HandlerError::domain("Refresh token cannot be decrypted"));
            }
            Ok(session("a@x.com"))
        })
        .route(Operation::Authenticate, |req: AuthenticateRequest| async move {
            let user = match req.access_token.as_str() {
                ACCESS => owner(),
                ADMIN_ACCESS => admin(),
                _ => return Err(HandlerError::domain("Access token cannot be decrypted")),
            };
            Ok(AuthenticateResponse { valid: true, user })
        })
        .route(Operation::Logout, move |req: LogoutRequest| {
            let logouts = Arc::clone(&logouts);
            async move {
                if let Ok(mut seen) = logouts.lock() {
                    seen.push(req);
                }
                Ok::<_, HandlerError>(LogoutResponse {})
            }
        })
}

async fn gateway_with(serve: bool, timeout: Duration) -> Gateway {
    let transport: SharedTransport = Arc::new(MemoryBroker::new());
    let logouts = Arc::new(Mutex::new(Vec::new()));

    let server = if serve {
        Some(
            stub_server(Arc::clone(&transport), Arc::clone(&logouts))
                .serve()
                .await
                .expect("serve"),
        )
    } else {
        None
    };

    let rpc = RpcClient::start(
        transport,
        RpcTopology::default(),
        ClientOptions::default().with_timeout(timeout),
    )
    .await
    .expect("client");
    let config = Config::from_lookup(|_| None).expect("config");

    Gateway {
        app: router(AppState::new(Arc::new(rpc), config)),
        server,
        logouts,
    }
}

pub async fn gateway() -> Gateway {
    gateway_with(true, Duration::from_secs(10)).await
}

/// No users service behind the broker
pub async fn gateway_without_backend() -> Gateway {
    gateway_with(false, Duration::from_millis(100)).await
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
