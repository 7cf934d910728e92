//! Vendor registration and email verification.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use common::{RequestContext, UserId};
use domain::Notification;
use domain::notification::EmailChannel;
use event_bus::{EventBusExt, Topic, UserCreated, events};
use saga::{RegistrationOutcome, VendorRegistration};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::context::Ctx;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedResponse {
    pub message: &'static str,
    pub user_id: UserId,
    pub email: String,
}

/// POST /auth/register/vendor: run the registration saga and hand back the
/// payment link.
#[tracing::instrument(skip(state, ctx, req), fields(correlation_id = %ctx.correlation_id()))]
pub async fn register_vendor(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Json(req): Json<VendorRegistration>,
) -> Result<(StatusCode, Json<RegistrationOutcome>), ApiError> {
    let outcome = state.registrations.register(&ctx, req).await?;

    match state.identity.get_user(outcome.user_id).await {
        Ok(user) => {
            let created = UserCreated {
                user_id: user.id,
                email: user.email.clone(),
                name: user.name.clone(),
            };
            if let Err(e) = state
                .bus
                .publish_event(&ctx, Topic::Auth, events::USER_CREATED, &created)
                .await
            {
                tracing::warn!(user_id = %user.id, error = %e, "failed to publish user created");
            }
            spawn_verification_email(state.clone(), &ctx, user.id, user.email);
        }
        Err(e) => {
            tracing::warn!(user_id = %outcome.user_id, error = %e, "registered user not readable");
        }
    }

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Sends the verification link in the background. The request has already
/// been answered, so failures are only logged.
fn spawn_verification_email(
    state: Arc<AppState>,
    ctx: &RequestContext,
    user_id: UserId,
    email: String,
) {
    let span = tracing::info_span!(
        "verification_email",
        correlation_id = %ctx.correlation_id(),
        %user_id
    );

    tokio::spawn(
        async move {
            let token = match state.identity.issue_verification_token(user_id).await {
                Ok(token) => token,
                Err(e) => {
                    tracing::warn!(error = %e, "could not issue verification token");
                    return;
                }
            };
            let Some(channel) = state.notifications.channel(EmailChannel::NAME) else {
                tracing::warn!("no email channel configured");
                return;
            };

            let link = format!("{}/auth/verify?token={}", state.public_url, token.token);
            let notification = Notification {
                email,
                phone: None,
                title: "Verify your email".to_string(),
                content: format!("Confirm your email address by opening {link}"),
            };
            match channel.send(&notification).await {
                Ok(()) => tracing::info!("verification email sent"),
                Err(e) => tracing::warn!(error = %e, "verification email failed"),
            }
        }
        .instrument(span),
    );
}

/// GET /auth/verify?token=: consume a verification token.
#[tracing::instrument(skip(state, ctx, query), fields(correlation_id = %ctx.correlation_id()))]
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifiedResponse>, ApiError> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("token is required".to_string()))?;

    let user = state.identity.verify_email(token.trim()).await?;

    let payload = serde_json::json!({ "userId": user.id, "email": user.email });
    if let Err(e) = state
        .bus
        .publish_event(&ctx, Topic::Auth, events::USER_VERIFIED, &payload)
        .await
    {
        tracing::warn!(user_id = %user.id, error = %e, "failed to publish user verified");
    }

    Ok(Json(VerifiedResponse {
        message: "email verified",
        user_id: user.id,
        email: user.email,
    }))
}
