use anyhow::anyhow;
use axum::{extract::Request, middleware::Next, response::Response};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::sessions::{UserSession, USER_SESSION_KEY};

/// Rejects requests without a host session and hands the host identity to
/// handlers as an `Extension<UserSession>`.
pub async fn auth_middleware(
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match session.get::<UserSession>(USER_SESSION_KEY).await {
        Ok(Some(user_session)) => {
            req.extensions_mut().insert(user_session);
            Ok(next.run(req).await)
        }
        Ok(None) => Err(AppError::Unauthorized(anyhow!("Unauthorized"))),
        Err(e) => Err(AppError::InternalServerError(anyhow!(
            "Failed to read session: {}",
            e
        ))),
    }
}
