use crate::handlers::v1::invites;
use crate::{app_state::AppState, middlewares::auth::auth_middleware};
use axum::routing::{get, post};
use axum::{middleware, Router};

pub fn invites_routes() -> Router<AppState> {
    // Host routes require a session
    let host_routes = Router::new()
        .route("/", post(invites::issue_invite).get(invites::list_invites))
        .route("/self-test", post(invites::run_self_test))
        .layer(middleware::from_fn(auth_middleware));

    // Guests arrive without an account
    let public_routes = Router::new()
        .route("/{code}", get(invites::validate_invite))
        .route("/{code}/redeem", post(invites::redeem_invite));

    host_routes.merge(public_routes)
}
