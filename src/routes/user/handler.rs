use axum::{
    Extension,
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::{
    AppState,
    error::AppError,
    utils::{
        Claims, Role, generate_token, message_to_api_response, success_to_api_response,
        verify_password,
    },
};

use super::model::{
    DeactivateRequest, LoginRequest, LoginResponse, RegisterRequest, UpdatePasswordRequest,
    UpdateProfileRequest, User,
};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let registration = req.validate()?;

    // Possession check for manager accounts, before any database work.
    if registration.role == Role::Manager {
        let supplied = headers
            .get("x-admin-secret")
            .and_then(|value| value.to_str().ok());
        if supplied != Some(state.config.admin_secret.as_str()) {
            return Err(AppError::Forbidden(
                "not authorized to create manager accounts".into(),
            ));
        }
    }

    let user = User::create(&state.pool, registration).await?;

    Ok((
        StatusCode::CREATED,
        success_to_api_response(Some("user registered"), user),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (email, password) = req.validate()?;

    // One generic failure for unknown email, deactivated account and
    // wrong password alike.
    let Some(user) = User::find_active_by_email(&state.pool, &email).await? else {
        return Err(AppError::Authentication("invalid credentials".into()));
    };

    if !verify_password(&password, &user.password_hash).await? {
        return Err(AppError::Authentication("invalid credentials".into()));
    }

    let role = user.parsed_role()?;
    let token = generate_token(user.id, &user.email, &user.name, role, &state.config)?;

    Ok((
        StatusCode::OK,
        success_to_api_response(
            Some("login successful"),
            LoginResponse {
                token,
                user: user.into_public(),
            },
        ),
    ))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (email, phone) = req.validate()?;
    let user = User::update_profile(&state.pool, claims.sub, email, phone).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(Some("profile updated"), user),
    ))
}

#[axum::debug_handler]
pub async fn update_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (current_password, new_password) = req.validate()?;
    User::change_password(&state.pool, claims.sub, &current_password, &new_password).await?;

    Ok((StatusCode::OK, message_to_api_response("password changed")))
}

#[axum::debug_handler]
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeactivateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(password) = req.password.filter(|p| !p.trim().is_empty()) else {
        return Err(AppError::Validation(
            "password is required to deactivate the account".into(),
        ));
    };

    User::deactivate(&state.pool, claims.sub, &password).await?;

    Ok((StatusCode::OK, message_to_api_response("account deactivated")))
}
