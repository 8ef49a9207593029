use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use murmur_types::api::{ApiResponse, Claims, MessageResponse, MessagesResponse, SendMessageRequest};
use murmur_types::models::Account;

use crate::auth::AppState;
use crate::error::AppError;
use crate::{db_call, validation};

/// The acceptance gate: an account that switched messages off gets nothing.
pub fn ensure_accepting(account: &Account) -> Result<(), AppError> {
    if account.is_accepting_messages {
        Ok(())
    } else {
        Err(AppError::NotAccepting)
    }
}

/// POST /send-message: anonymous, unauthenticated delivery to a username.
pub async fn send_message(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("Username and content are required".into()));
    }
    validation::message_content(&req.content)?;

    let account = db_call(&state, move |db| {
        db.get_user_by_username(&username)?
            .map(|row| row.into_account())
            .transpose()
    })
    .await?
    .ok_or(AppError::NotFound("User not found"))?;

    ensure_accepting(&account)?;

    let message_id = Uuid::new_v4();
    let user_id = account.id.to_string();
    let content = req.content;
    db_call(&state, move |db| {
        db.insert_message(&message_id.to_string(), &user_id, &content, Utc::now())
    })
    .await?;

    debug!("Message {} delivered to {}", message_id, account.username);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Message sent successfully"))))
}

/// GET /get-messages: the caller's inbox, newest first.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.to_string();

    let rows = db_call(&state, move |db| {
        if db.get_user_by_id(&user_id)?.is_none() {
            return Ok(None);
        }
        db.get_messages(&user_id).map(Some)
    })
    .await?
    .ok_or(AppError::NotFound("User not found"))?;

    let messages = rows
        .into_iter()
        .map(|row| row.into_message().map(MessageResponse::from))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(MessagesResponse {
        success: true,
        messages,
    }))
}

/// DELETE /delete-message/{message_id}: remove one message from the caller's inbox.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let message_id: Uuid = message_id
        .parse()
        .map_err(|_| AppError::Validation("Invalid message id".into()))?;
    let user_id = claims.sub.to_string();

    let deleted = db_call(&state, move |db| {
        db.delete_message(&user_id, &message_id.to_string())
    })
    .await?;

    if !deleted {
        return Err(AppError::NotFound("Message not found or already deleted"));
    }

    Ok(Json(ApiResponse::ok("Message deleted")))
}
