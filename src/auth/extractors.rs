use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use tracing::debug;

use crate::error::AccountError;
use crate::state::AppState;

/// Raw session token taken from the configured token header.
///
/// Accepts both `Bearer <token>` and a bare token. The token is not
/// verified here; that happens in the service.
pub struct SessionToken(pub String);

#[async_trait]
impl FromRequestParts<AppState> for SessionToken {
    type Rejection = AccountError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = state.config.token_header.as_str();
        let raw = parts
            .headers
            .get(header)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .ok_or_else(|| {
                debug!(%header, "missing token header");
                AccountError::InvalidToken
            })?;

        let token = raw
            .strip_prefix("Bearer ")
            .or_else(|| raw.strip_prefix("bearer "))
            .unwrap_or(raw)
            .trim();
        if token.is_empty() {
            return Err(AccountError::InvalidToken);
        }

        Ok(SessionToken(token.to_string()))
    }
}

/// `Json` body that rejects with the service's `{code, message}` error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AccountError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "request body rejected");
                Err(AccountError::InvalidInput(rejection.body_text()))
            }
        }
    }
}
