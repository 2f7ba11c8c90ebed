use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// AuthError
///
/// Failures reported by the identity provider. These are the only errors a user
/// ever sees (a failed sign-in); they travel as values and are never thrown past
/// the sign-in contract.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("no active session")]
    NoSession,

    #[error("identity provider did not answer within {0} ms")]
    Timeout(u128),

    #[error("identity provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl AuthError {
    /// Stable machine-readable code for the login form.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::NoSession => "no_session",
            AuthError::Timeout(_) => "timeout",
            AuthError::Provider { .. } => "provider_error",
            AuthError::Transport(_) => "unreachable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::NoSession => StatusCode::UNAUTHORIZED,
            AuthError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Provider { .. } | AuthError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// AuthFailure
///
/// JSON body returned for a failed sign-in.
#[derive(Debug, Clone, Serialize, ToSchema, TS)]
#[ts(export)]
pub struct AuthFailure {
    pub error: String,
    pub message: String,
}

impl From<&AuthError> for AuthFailure {
    fn from(e: &AuthError) -> Self {
        Self {
            error: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(AuthFailure::from(&self))).into_response()
    }
}

/// DirectoryError
///
/// Failures while reading profile, role, property or department data. Always
/// recovered locally by the session loader.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no signed-in session to authorize the request")]
    NotSignedIn,
}

#[derive(Debug, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);
