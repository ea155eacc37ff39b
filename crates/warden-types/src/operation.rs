//! The fixed catalogue of RPC operations

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SignUp,
    SignIn,
    Refresh,
    Authenticate,
    Logout,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::SignUp,
        Self::SignIn,
        Self::Refresh,
        Self::Authenticate,
        Self::Logout,
    ];

    /// Name used in default routing keys and queue names
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SignUp => "sign_up",
            Self::SignIn => "sign_in",
            Self::Refresh => "refresh",
            Self::Authenticate => "authenticate",
            Self::Logout => "logout",
        }
    }

    /// Infix used by the topology environment variables
    pub const fn env_prefix(&self) -> &'static str {
        match self {
            Self::SignUp => "SIGN_UP",
            Self::SignIn => "SIGN_IN",
            Self::Refresh => "REFRESH",
            Self::Authenticate => "AUTHENTICATE",
            Self::Logout => "LOGOUT",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
