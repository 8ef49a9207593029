//! Input checks shared by the handlers. Failures become
//! [`AppError::Validation`] with a message suitable for showing to the user.

use crate::error::AppError;

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 6;
pub const MESSAGE_MAX: usize = 500;

pub fn username(raw: &str) -> Result<(), AppError> {
    let len = raw.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::Validation(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        )));
    }
    if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::Validation(
            "Username may only contain letters, digits and underscores".into(),
        ));
    }
    Ok(())
}

pub fn email(raw: &str) -> Result<(), AppError> {
    let invalid = || AppError::Validation("Invalid email address".into());

    if raw.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = raw.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty() || tld.is_empty() {
        return Err(invalid());
    }
    Ok(())
}

pub fn password(raw: &str) -> Result<(), AppError> {
    if raw.chars().count() < PASSWORD_MIN {
        return Err(AppError::Validation(format!(
            "Password must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

pub fn code(raw: &str) -> Result<(), AppError> {
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Validation("Verification code must be 6 digits".into()));
    }
    Ok(())
}

pub fn message_content(raw: &str) -> Result<(), AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::Validation("Message content is required".into()));
    }
    if raw.chars().count() > MESSAGE_MAX {
        return Err(AppError::Validation(format!(
            "Message must be no longer than {MESSAGE_MAX} characters"
        )));
    }
    Ok(())
}
