use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, ProfileResponse, RegisterRequest, RegisterResponse},
        extractors::{ApiJson, SessionToken},
    },
    context::RequestContext,
    error::AccountResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/info", get(get_profile))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AccountResult<Json<LoginResponse>> {
    let token = state
        .accounts
        .login(&ctx, &payload.username, &payload.password)
        .await?;
    Ok(Json(LoginResponse { token }))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AccountResult<(StatusCode, Json<RegisterResponse>)> {
    let id = state
        .accounts
        .register(
            &ctx,
            &payload.username,
            &payload.password,
            &payload.email,
            &payload.display_name,
        )
        .await?;
    info!(user_id = %id, request_id = %ctx.request_id, "registration complete");
    Ok((StatusCode::CREATED, Json(RegisterResponse { id })))
}

#[instrument(skip_all)]
pub async fn get_profile(
    State(state): State<AppState>,
    ctx: RequestContext,
    SessionToken(token): SessionToken,
) -> AccountResult<Json<ProfileResponse>> {
    let profile = state.accounts.get_profile(&ctx, &token).await?;
    Ok(Json(profile))
}
