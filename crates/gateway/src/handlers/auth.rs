//! Account handlers: register, login and the current user

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::blocking;
use crate::extract::ApiJson;
use crate::AppState;
use pagemark_common::{
    auth::{hash_password, verify_password, AuthUser},
    db::{models::User, Repository, DUPLICATE_EMAIL},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "A valid email address is required"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create an account and sign it in
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    request.name = request.name.trim().to_string();
    request.email = normalize_email(&request.email);
    request.validate()?;

    let repo = Repository::new(state.db.clone());

    if repo.find_user_by_email(&request.email).await?.is_some() {
        return Err(AppError::Duplicate {
            message: DUPLICATE_EMAIL.to_string(),
        });
    }

    let password = request.password;
    let password_hash = blocking(move || hash_password(&password)).await??;

    let user = repo
        .create_user(request.name, request.email, password_hash)
        .await?;
    let token = state.jwt.generate_token(user.id, &user.email)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// Exchange email and password for a token
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let repo = Repository::new(state.db.clone());

    let Some(user) = repo.find_user_by_email(&normalize_email(&request.email)).await? else {
        return Err(AppError::InvalidCredentials);
    };

    let stored_hash = user.password_hash.clone();
    let password = request.password;
    if !blocking(move || verify_password(&password, &stored_hash)).await? {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.jwt.generate_token(user.id, &user.email)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}

/// The account behind the bearer token
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<MeResponse>> {
    let repo = Repository::new(state.db.clone());

    let user = repo
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized {
            message: "User no longer exists".to_string(),
        })?;

    Ok(Json(MeResponse { user }))
}
