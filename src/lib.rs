pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod invites;
pub mod middlewares;
pub mod models;
pub mod queries;
pub mod routes;

use axum::Router;
use tower_sessions::{SessionManagerLayer, SessionStore};

/// Full application router: routes, session layer and state.
pub fn build_app<S>(state: app_state::AppState, session_store: S, secure_cookies: bool) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = SessionManagerLayer::new(session_store).with_secure(secure_cookies);
    routes::create_routes()
        .layer(session_layer)
        .with_state(state)
}
