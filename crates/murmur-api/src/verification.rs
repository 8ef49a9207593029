//! One-time verification codes: issuing, checking, and the two endpoints
//! that drive them.
//!
//! A code is six decimal digits, valid for one hour from issuance, and may
//! be guessed any number of times inside that window. Issuing persists the
//! code before the email goes out, so a failed delivery still leaves a
//! usable code behind.

use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;

use murmur_mail::{Mailer, template};
use murmur_types::api::{ApiResponse, ResendVerificationRequest, VerifyCodeRequest};
use murmur_types::models::Account;

use crate::auth::AppState;
use crate::error::AppError;
use crate::{db_call, validation};

/// How long an issued code stays valid.
pub fn code_ttl() -> Duration {
    Duration::hours(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Uniform over `100000..=999999`.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.random_range(100_000..=999_999u32).to_string()
}

pub fn issue_code(now: DateTime<Utc>) -> IssuedCode {
    IssuedCode {
        code: generate_code(&mut rand::rng()),
        expires_at: now + code_ttl(),
    }
}

/// Accepts iff the account is unverified, the code matches exactly, and
/// `now` is not past the stored expiry.
pub fn check_code(account: &Account, submitted: &str, now: DateTime<Utc>) -> Result<(), AppError> {
    if account.is_verified {
        return Err(AppError::AlreadyVerified);
    }
    if submitted != account.verify_code {
        return Err(AppError::CodeMismatch);
    }
    if now > account.verify_code_expiry {
        return Err(AppError::ExpiredCode);
    }
    Ok(())
}

/// Single delivery attempt.
pub async fn send_code(
    mailer: &dyn Mailer,
    to: &str,
    username: &str,
    code: &str,
) -> anyhow::Result<()> {
    let email = template::verification_email(to, username, code);
    mailer.send(&email).await
}

/// POST /resend-verification: issue a fresh code for an unverified account.
pub async fn resend_verification(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<ResendVerificationRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim().to_string();

    let account = db_call(&state, move |db| {
        db.get_user_by_username(&username)?
            .map(|row| row.into_account())
            .transpose()
    })
    .await?
    .ok_or(AppError::NotFound("User not found"))?;

    if account.is_verified {
        return Err(AppError::AlreadyVerified);
    }

    let issued = issue_code(Utc::now());
    {
        let id = account.id.to_string();
        let (code, expiry) = (issued.code.clone(), issued.expires_at);
        db_call(&state, move |db| db.set_verify_code(&id, &code, expiry)).await?;
    }

    send_code(state.mailer.as_ref(), &account.email, &account.username, &issued.code)
        .await
        .map_err(AppError::EmailDelivery)?;

    info!("Verification code reissued for {}", account.username);
    Ok(Json(ApiResponse::ok("Verification email sent successfully")))
}

/// POST /verify-code: mark the account verified if the code checks out.
pub async fn verify_code(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<VerifyCodeRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim().to_string();
    let code = req.code.trim().to_string();
    validation::code(&code)?;

    let account = db_call(&state, move |db| {
        db.get_user_by_username(&username)?
            .map(|row| row.into_account())
            .transpose()
    })
    .await?
    .ok_or(AppError::NotFound("User not found"))?;

    check_code(&account, &code, Utc::now())?;

    let id = account.id.to_string();
    db_call(&state, move |db| db.mark_verified(&id)).await?;

    info!("Account verified: {}", account.username);
    Ok(Json(ApiResponse::ok("Account verified successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use uuid::Uuid;

    fn unverified(code: &str, issued_at: DateTime<Utc>) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            is_verified: false,
            verify_code: code.into(),
            verify_code_expiry: issued_at + code_ttl(),
            is_accepting_messages: true,
            created_at: issued_at,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn generated_codes_are_six_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn issue_sets_one_hour_expiry() {
        let issued = issue_code(t0());
        assert_eq!(issued.expires_at, t0() + Duration::hours(1));
        assert!(validation::code(&issued.code).is_ok());
    }

    #[test]
    fn scenario_within_and_after_the_hour() {
        let account = unverified("482913", t0());

        assert!(check_code(&account, "482913", t0() + Duration::minutes(59)).is_ok());
        assert!(matches!(
            check_code(&account, "482913", t0() + Duration::minutes(61)),
            Err(AppError::ExpiredCode)
        ));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let account = unverified("482913", t0());
        let expiry = t0() + Duration::hours(1);

        assert!(check_code(&account, "482913", expiry).is_ok());
        assert!(matches!(
            check_code(&account, "482913", expiry + Duration::seconds(1)),
            Err(AppError::ExpiredCode)
        ));
    }

    #[test]
    fn wrong_code_is_a_mismatch_even_after_expiry() {
        let account = unverified("482913", t0());

        assert!(matches!(
            check_code(&account, "482914", t0() + Duration::minutes(1)),
            Err(AppError::CodeMismatch)
        ));
        assert!(matches!(
            check_code(&account, "000000", t0() + Duration::hours(2)),
            Err(AppError::CodeMismatch)
        ));
    }

    #[test]
    fn any_issued_code_checks_only_inside_its_window() {
        let mut rng = StdRng::seed_from_u64(42);
        for minutes in [0, 1, 30, 59, 60, 61, 120] {
            let code = generate_code(&mut rng);
            let account = unverified(&code, t0());
            let at = t0() + Duration::minutes(minutes);

            assert_eq!(check_code(&account, &code, at).is_ok(), minutes <= 60);
        }
    }

    #[test]
    fn retired_code_never_gates_a_verified_account() {
        let mut account = unverified("482913", t0());
        account.is_verified = true;

        assert!(matches!(
            check_code(&account, "482913", t0()),
            Err(AppError::AlreadyVerified)
        ));
    }
}
