use crate::assets;
use crate::state;

use axum::Router;
use axum::middleware;
use axum::response::Redirect;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

mod auth;
mod backend;
mod dashboard;

pub fn app(state: state::AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route(
            "/login",
            get(auth::admin_login_form).post(auth::admin_login_submit),
        )
        .route("/logout", get(auth::admin_logout))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/STBS", get(backend::backend_dashboard))
        .route(
            "/STBS/login",
            get(auth::backend_login_form).post(auth::backend_login_submit),
        )
        .route("/STBS/logout", get(auth::backend_logout))
        .route(
            "/STBS/toggle-maintenance",
            post(backend::toggle_maintenance),
        )
        .route(
            "/STBS/toggle-soryn-sleep",
            post(backend::toggle_sleep_banner),
        )
        .route("/static/style.css", get(assets::stylesheet))
        .route("/favicon.svg", get(assets::favicon))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Redirect {
    Redirect::to("/dashboard")
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
