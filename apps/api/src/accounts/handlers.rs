use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;

use crate::accounts::login::{authenticate, LoginRequest};
use crate::accounts::signup::{register, FirebaseStatus};
use crate::accounts::validation::SignupRequest;
use crate::auth::AuthenticatedUser;
use crate::errors::AppError;
use crate::extract::JsonBody;
use crate::models::user::UserView;
use crate::state::AppState;
use crate::store::tokens;

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    pub user: UserView,
    pub firebase_status: FirebaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserView,
}

/// POST /signup
pub async fn handle_signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let registration = register(&state.db, state.provider.as_ref(), &req).await?;

    let firebase_uid = match registration.firebase_status {
        FirebaseStatus::Success => registration.user.firebase_uid.clone(),
        FirebaseStatus::Skipped | FirebaseStatus::Failed => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "User registered successfully",
            token: registration.token,
            user: UserView::from(&registration.user),
            firebase_status: registration.firebase_status,
            firebase_uid,
        }),
    ))
}

/// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let session = authenticate(&state.db, &req).await?;
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        token: session.token,
        user: UserView::from(&session.user),
    }))
}

/// POST /logout
///
/// Succeeds whether or not the caller still holds a token. Failures other
/// than missing or unknown credentials are still reported.
pub async fn handle_logout(
    State(state): State<AppState>,
    caller: Result<AuthenticatedUser, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    match caller {
        Ok(AuthenticatedUser(user)) => {
            if tokens::delete_for_user(&state.db, user.id).await? {
                info!("User {} logged out", user.id);
            }
        }
        Err(AppError::Unauthorized) => {}
        Err(e) => return Err(e),
    }
    Ok(Json(MessageResponse {
        success: true,
        message: "Logout successful",
    }))
}

/// GET /profile
pub async fn handle_profile(AuthenticatedUser(user): AuthenticatedUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        user: UserView::from(&user),
    })
}
