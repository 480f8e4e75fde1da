pub mod invites;
use crate::app_state::AppState;
use axum::Router;

pub fn v1_routes() -> Router<AppState> {
    Router::new().nest("/invites", invites::invites_routes())
}
