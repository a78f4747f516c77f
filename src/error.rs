use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Failures of the account flows. All are terminal for the call that raised them.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("account not found")]
    AccountNotFound,

    #[error("password does not match")]
    PasswordMismatch,

    #[error("account is locked")]
    AccountLocked,

    #[error("username already taken")]
    DuplicateUsername,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AccountResult<T> = Result<T, AccountError>;

impl AccountError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::AccountNotFound
            | AccountError::PasswordMismatch
            | AccountError::InvalidToken
            | AccountError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AccountError::AccountLocked => StatusCode::FORBIDDEN,
            AccountError::DuplicateUsername => StatusCode::CONFLICT,
            AccountError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AccountError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-visible code. A wrong password reports the same code as an
    /// unknown username so usernames cannot be enumerated.
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::AccountNotFound | AccountError::PasswordMismatch => "ACCOUNT_NOT_FOUND",
            AccountError::AccountLocked => "ACCOUNT_LOCKED",
            AccountError::DuplicateUsername => "DUPLICATE_USERNAME",
            AccountError::InvalidToken => "INVALID_TOKEN",
            AccountError::ExpiredToken => "EXPIRED_TOKEN",
            AccountError::InvalidInput(_) => "INVALID_INPUT",
            AccountError::Internal(_) => "INTERNAL",
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            AccountError::AccountNotFound | AccountError::PasswordMismatch => {
                "invalid username or password".into()
            }
            AccountError::Internal(_) => "internal server error".into(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        if let AccountError::Internal(e) = &self {
            error!(error = %e, "request failed with internal error");
        }
        let body = ErrorBody {
            code: self.code(),
            message: self.public_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
