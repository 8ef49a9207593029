pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod settings;
pub mod validation;
pub mod verification;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use tracing::error;

use murmur_db::Database;
use murmur_types::api::ApiResponse;

pub use auth::{AppState, AppStateInner};
pub use error::AppError;

/// Build the full API router. Layers such as CORS and tracing are left to
/// the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-in", post(auth::sign_in))
        .route("/check-username-unique", get(auth::check_username_unique))
        .route("/resend-verification", post(verification::resend_verification))
        .route("/verify-code", post(verification::verify_code))
        .route("/send-message", post(messages::send_message))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/get-messages", get(messages::get_messages))
        .route("/delete-message/{message_id}", delete(messages::delete_message))
        .route(
            "/accept-messages",
            get(settings::get_accept_messages).post(settings::set_accept_messages),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<ApiResponse> {
    Json(ApiResponse::ok("ok"))
}

/// Run a blocking database call off the async runtime.
pub(crate) async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(e.into())
        })?
        .map_err(AppError::from)
}
