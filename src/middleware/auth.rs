use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    error::AppError,
    utils::{Claims, Role, verify_token},
};

/// Session gate. Every protected route passes through here; on success
/// the verified claims ride along in the request extensions so handlers
/// know who is calling.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(AppError::InvalidToken("access denied: no token supplied".into()));
    };

    let claims = verify_token(token, &state.config)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Role gate for manager-only routes. Layered after `auth_middleware`,
/// which guarantees the claims extension is present.
pub async fn require_manager(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let Some(claims) = request.extensions().get::<Claims>() else {
        // Only reachable if a route was wired up without the session gate.
        tracing::error!("require_manager ran on a request without verified claims");
        return Err(AppError::Internal);
    };

    match claims.role {
        Role::Manager => Ok(next.run(request).await),
        Role::Citizen => Err(AppError::Forbidden("managers only".into())),
    }
}
