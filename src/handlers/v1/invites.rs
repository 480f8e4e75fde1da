use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::invites::{self_test, share_url};
use crate::models::invites::{iso_millis, EventTag};
use crate::models::sessions::UserSession;

#[derive(Deserialize, Validate)]
pub struct IssueInvitePayload {
    #[validate(length(min = 1, max = 64, message = "Event is required and cannot be empty"))]
    pub event: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedInviteResponse {
    pub code: String,
    pub url: String,
    pub event: EventTag,
    #[serde(with = "iso_millis")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedeemResponse {
    pub redeemed: bool,
}

// Host: create a shareable invite for one of their events.
pub async fn issue_invite(
    State(state): State<AppState>,
    Extension(host): Extension<UserSession>,
    Json(mut payload): Json<IssueInvitePayload>,
) -> AppResult<impl IntoResponse> {
    payload.event = payload.event.trim().to_string();
    payload.validate().map_err(|e| {
        let mut error_messages = String::new();
        for (field, errors) in e.field_errors() {
            for error in errors {
                error_messages.push_str(&format!(
                    "{}: {} ",
                    field,
                    error
                        .message
                        .as_ref()
                        .map_or("invalid value", |m| m.as_ref())
                ));
            }
        }
        AppError::BadRequest(anyhow!(error_messages.trim().to_string()))
    })?;

    let event: EventTag = payload.event.parse()?;
    let issued = state.invites.issue(event, &host.user_id).await?;
    let url = share_url(&state.public_base_url, &issued.code);

    Ok((
        StatusCode::CREATED,
        Json(IssuedInviteResponse {
            url: url.to_string(),
            code: issued.code,
            event: issued.event,
            expires_at: issued.expires_at,
        }),
    ))
}

// Host: everything they've issued, newest first.
pub async fn list_invites(
    State(state): State<AppState>,
    Extension(host): Extension<UserSession>,
) -> AppResult<impl IntoResponse> {
    let invites = state.invites.list_for_host(&host.user_id).await?;
    Ok(Json(invites))
}

pub async fn run_self_test(
    State(state): State<AppState>,
    Extension(host): Extension<UserSession>,
) -> AppResult<impl IntoResponse> {
    let report = self_test::run_self_test(&state.invites, &host.user_id).await;
    let status = if report.passed {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((status, Json(report)))
}

// Public: the redemption page checks the code from its URL.
pub async fn validate_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.invites.validate(code.trim()).await?;
    Ok(Json(outcome))
}

// Public: called by the guest submission flow once the guest record exists.
pub async fn redeem_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let redeemed = state.invites.redeem(code.trim()).await?;
    Ok(Json(RedeemResponse { redeemed }))
}
