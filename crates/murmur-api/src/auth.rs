use std::sync::{Arc, LazyLock};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use murmur_db::{Database, models::NewUser};
use murmur_mail::Mailer;
use murmur_types::api::{
    ApiResponse, Claims, SessionUser, SignInRequest, SignInResponse, SignUpRequest, SignUpResponse,
    UsernameQuery,
};

use crate::error::AppError;
use crate::verification::{issue_code, send_code};
use crate::{db_call, validation};

pub type AppState = Arc<AppStateInner>;

/// Verified against when the identifier matches no account, so unknown
/// identifiers cost as much argon2 work as wrong passwords.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("murmur-unknown-account").ok());

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub mailer: Arc<dyn Mailer>,
}

/// What sign-up should do with an incoming registration.
enum Registration {
    Create,
    /// Unverified account with the same username and email: refresh it.
    Refresh { id: String },
}

pub async fn sign_up(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignUpRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();
    validation::username(&username)?;
    validation::email(&email)?;
    validation::password(&req.password)?;

    let (by_username, by_email) = {
        let (u, e) = (username.clone(), email.clone());
        db_call(&state, move |db| {
            Ok((db.get_user_by_username(&u)?, db.get_user_by_email(&e)?))
        })
        .await?
    };

    let registration = match (by_username, by_email) {
        (Some(existing), _) if existing.is_verified => {
            return Err(AppError::Validation("Username is already taken".into()));
        }
        (_, Some(existing)) if existing.is_verified => {
            return Err(AppError::Validation("User already exists with this email".into()));
        }
        (_, Some(existing)) if existing.username != username => {
            return Err(AppError::Validation(
                "Email is already registered to another username".into(),
            ));
        }
        (_, Some(existing)) => Registration::Refresh { id: existing.id },
        (Some(_), None) => {
            return Err(AppError::Validation("Username is already taken".into()));
        }
        (None, None) => Registration::Create,
    };

    let password_hash = hash_password(&req.password)?;
    let issued = issue_code(Utc::now());

    match registration {
        Registration::Create => {
            let id = Uuid::new_v4().to_string();
            let (u, e, code) = (username.clone(), email.clone(), issued.code.clone());
            let expiry = issued.expires_at;
            let created = db_call(&state, move |db| {
                db.create_user(&NewUser {
                    id: &id,
                    username: &u,
                    email: &e,
                    password_hash: &password_hash,
                    verify_code: &code,
                    verify_code_expiry: expiry,
                })
            })
            .await?;
            if !created {
                // Lost a race with a concurrent sign-up.
                return Err(AppError::Validation("Username or email is already taken".into()));
            }
            info!("Account created for {}", username);
        }
        Registration::Refresh { id } => {
            let code = issued.code.clone();
            let expiry = issued.expires_at;
            let refreshed = db_call(&state, move |db| {
                db.refresh_unverified_user(&id, &password_hash, &code, expiry)
            })
            .await?;
            if !refreshed {
                // Verified (or removed) since the lookup above.
                return Err(AppError::Validation("User already exists with this email".into()));
            }
            info!("Unverified account refreshed for {}", username);
        }
    }

    let email_sent = match send_code(state.mailer.as_ref(), &email, &username, &issued.code).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Verification email to {} failed: {:#}", username, e);
            false
        }
    };

    let message = if email_sent {
        "User registered successfully. Please verify your account."
    } else {
        "User registered, but the verification email could not be sent. Please request a new code."
    };

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            success: true,
            message: message.to_string(),
            email_sent,
        }),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignInRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let identifier = normalize_identifier(&req.identifier);

    let Some(user) = db_call(&state, move |db| db.get_user_by_identifier(&identifier)).await?
    else {
        burn_password_check(&req.password);
        return Err(AppError::InvalidCredentials);
    };

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored password hash is unreadable: {}", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::InvalidCredentials)?;

    if !user.is_verified {
        return Err(AppError::NotVerified);
    }

    let account = user.into_account()?;
    let token = create_token(&state.jwt_secret, account.id, &account.username)?;

    Ok(Json(SignInResponse {
        success: true,
        token,
        user: SessionUser {
            id: account.id,
            username: account.username,
            is_verified: account.is_verified,
            is_accepting_messages: account.is_accepting_messages,
        },
    }))
}

/// A username counts as available until a verified account claims it.
pub async fn check_username_unique(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<UsernameQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let username = query.username.trim().to_string();
    validation::username(&username)?;

    let existing = db_call(&state, move |db| db.get_user_by_username(&username)).await?;

    match existing {
        Some(user) if user.is_verified => {
            Err(AppError::Validation("Username is already taken".into()))
        }
        _ => Ok(Json(ApiResponse::ok("Username is available"))),
    }
}

fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('@') {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

fn burn_password_check(password: &str) {
    if let Some(parsed) = DUMMY_HASH.as_deref().and_then(|h| PasswordHash::new(h).ok()) {
        let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_identifiers_are_lowercased() {
        assert_eq!(normalize_identifier("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_identifier("Alice"), "Alice");
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"hunter22", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"hunter23", &parsed).is_err());
    }

    #[test]
    fn unknown_account_hash_is_a_real_argon2_hash() {
        let hash = DUMMY_HASH.as_deref().expect("dummy hash was not computed");
        let parsed = PasswordHash::new(hash).unwrap();
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert!(Argon2::default().verify_password(b"hunter22", &parsed).is_err());
    }
}
