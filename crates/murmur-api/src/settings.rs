use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::info;

use murmur_types::api::{AcceptMessagesRequest, AcceptMessagesResponse, Claims};

use crate::auth::AppState;
use crate::db_call;
use crate::error::AppError;

pub async fn get_accept_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.to_string();

    let user = db_call(&state, move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    Ok(Json(AcceptMessagesResponse {
        success: true,
        message: None,
        is_accepting_messages: user.is_accepting_messages,
    }))
}

pub async fn set_accept_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<AcceptMessagesRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.to_string();
    let accepting = req.accept_messages;

    let found = db_call(&state, move |db| db.set_accepting_messages(&user_id, accepting)).await?;
    if !found {
        return Err(AppError::NotFound("User not found"));
    }

    info!("{} now {} messages", claims.username, if accepting { "accepts" } else { "refuses" });
    Ok(Json(AcceptMessagesResponse {
        success: true,
        message: Some("Message acceptance status updated successfully".into()),
        is_accepting_messages: accepting,
    }))
}
