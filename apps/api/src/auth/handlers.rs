use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{bearer_token, AuthUser, Session};
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsRequest {
    fn require_fields(&self) -> Result<(), AppError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: Session,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// POST /api/auth/signup
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let identity = state.identity()?;
    req.require_fields()?;
    let session = identity.sign_up(&req.email, &req.password).await?;
    Ok(Json(SessionResponse {
        session,
        message: "Account created successfully",
    }))
}

/// POST /api/auth/signin
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let identity = state.identity()?;
    req.require_fields()?;
    let session = identity.sign_in(&req.email, &req.password).await?;
    Ok(Json(SessionResponse {
        session,
        message: "Signed in successfully",
    }))
}

/// POST /api/auth/signin-anonymous
pub async fn handle_sign_in_anonymous(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.identity()?.sign_in_anonymous().await?;
    Ok(Json(SessionResponse {
        session,
        message: "Signed in anonymously",
    }))
}

/// POST /api/auth/signout
///
/// Revokes the presented token, if any. Always succeeds for the client.
pub async fn handle_sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    if let Some(token) = bearer_token(&headers) {
        state.identity()?.sign_out(token).await?;
    }
    Ok(Json(MessageResponse {
        message: "Signed out successfully",
    }))
}

/// GET /api/auth/me
pub async fn handle_me(auth: AuthUser) -> Json<UserResponse> {
    Json(UserResponse { user: auth.user })
}
