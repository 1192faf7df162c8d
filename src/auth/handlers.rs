use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    extractors::{AuthUser, Identity, TOKEN_FAILED},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
};
use crate::{
    db::models::{normalize_email, Role, User},
    error::{ApiError, ApiResponse, ApiResult},
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(get_me))
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed value, `None` when missing or blank.
fn present(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let token = keys
        .sign_access(&user.id)
        .map_err(|e| ApiError::internal("Failed to issue token", e))?;
    let refresh_token = keys
        .sign_refresh(&user.id)
        .map_err(|e| ApiError::internal("Failed to issue token", e))?;
    Ok(AuthResponse::new(user, token, refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<ApiResponse<AuthResponse>> {
    let (Some(name), Some(email), Some(password), Some(role)) = (
        present(payload.name),
        present(payload.email),
        payload.password.filter(|p| !p.is_empty()),
        present(payload.role),
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };

    let role: Role = role.parse().map_err(|_| {
        warn!(%role, "unknown role on register");
        ApiError::validation("Role must be either employer or candidate")
    })?;

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::validation("Please provide a valid email"));
    }

    if state.db.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::validation("User already exists"));
    }

    let hash =
        hash_password(&password).map_err(|e| ApiError::internal("Registration failed", e))?;
    let user = state.db.create_user(&name, &email, &hash, role).await?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
    let body = issue_tokens(&state, user)?;
    Ok(ApiResponse::created(body).with_message("Registration successful"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<ApiResponse<AuthResponse>> {
    let (Some(email), Some(password)) = (
        present(payload.email),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::validation("Email and password are required"));
    };
    let email = normalize_email(&email);

    let Some(user) = state.db.find_user_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(ApiError::unauthenticated("Invalid email or password"));
    };

    let ok = verify_password(&password, &user.password_hash)
        .map_err(|e| ApiError::internal("Login failed", e))?;
    if !ok {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthenticated("Invalid email or password"));
    }

    info!(user_id = %user.id, "user logged in");
    let body = issue_tokens(&state, user)?;
    Ok(ApiResponse::ok(body).with_message("Login successful"))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> ApiResult<ApiResponse<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        ApiError::unauthenticated(TOKEN_FAILED)
    })?;

    let Some(user) = state.db.find_user_by_id(claims.sub.as_str()).await? else {
        warn!(user_id = %claims.sub, "refresh for missing user");
        return Err(ApiError::unauthenticated(TOKEN_FAILED));
    };

    let body = issue_tokens(&state, user)?;
    Ok(ApiResponse::ok(body))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(identity): AuthUser) -> ApiResponse<Identity> {
    ApiResponse::ok(identity)
}
