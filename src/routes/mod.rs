use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    AppState,
    middleware::{auth_middleware, log_errors, require_manager},
};

pub mod complaint;
pub mod health;
pub mod user;

/// Full application router: public routes, session-gated routes, the
/// manager-gated status route, CORS and server-error logging.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/auth/register", post(user::register))
        .route("/auth/login", post(user::login));

    let protected_routes = Router::new()
        .route(
            "/users/me",
            put(user::update_profile).delete(user::deactivate),
        )
        .route("/users/me/password", put(user::update_password))
        .route(
            "/complaints",
            post(complaint::create_complaint).get(complaint::list_complaints),
        )
        .route("/complaints/{id}", put(complaint::update_complaint))
        .route("/complaints/{id}/delete", put(complaint::delete_complaint))
        .route(
            "/complaints/{id}/status",
            put(complaint::change_status).layer(axum::middleware::from_fn(require_manager)),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // The web and mobile frontends live on other origins; the admin
    // secret header has to survive preflight.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-admin-secret"),
        ]);

    let api_base_uri = state.config.api_base_uri.clone();

    Router::new()
        .nest(
            &api_base_uri,
            Router::new().merge(public_routes).merge(protected_routes),
        )
        .layer(axum::middleware::from_fn(log_errors))
        .layer(cors)
        .with_state(state)
}
