//! Input validation for accounts and keychain entries.
//!
//! Every validator is pure. Keychain validators must pass before a payload
//! is handed to the envelope encryptor.

use thiserror::Error;

/// Maximum title length in characters (after trimming).
const MAX_TITLE_CHARS: usize = 128;

/// Login length bounds in bytes.
const MIN_LOGIN_LEN: usize = 4;
const MAX_LOGIN_LEN: usize = 64;

/// Minimum password length in bytes.
const MIN_PASSWORD_LEN: usize = 8;

/// Required CVV length in characters.
const CVV_LEN: usize = 3;

/// Caller input rejected before touching storage or crypto.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title cannot be empty")]
    TitleEmpty,

    #[error("title cannot be greater than 128 characters")]
    TitleTooLong,

    #[error("login field is required")]
    EmptyLogin,

    #[error("invalid card number")]
    InvalidCardNumber,

    #[error("invalid CVV, should be 3 chars")]
    InvalidCvv,

    #[error("text field is required")]
    EmptyText,

    #[error("login is too short, minimum length is 4")]
    LoginTooShort,

    #[error("login is too long, maximum length is 64")]
    LoginTooLong,

    #[error("password is too short, minimum length is 8")]
    PasswordTooShort,

    #[error("refresh token isn't provided")]
    EmptyRefreshToken,
}

/// Validate a keychain entry title: non-blank, at most 128 characters.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

/// Validate the login of a stored credential.
pub fn validate_credential(login: &str) -> Result<(), ValidationError> {
    if login.trim().is_empty() {
        return Err(ValidationError::EmptyLogin);
    }
    Ok(())
}

/// Validate a bank card: Luhn checksum on the number, 3-char CVV.
pub fn validate_card(number: &str, cvv: &str) -> Result<(), ValidationError> {
    if !is_valid_luhn(number.trim()) {
        return Err(ValidationError::InvalidCardNumber);
    }
    if cvv.trim().chars().count() != CVV_LEN {
        return Err(ValidationError::InvalidCvv);
    }
    Ok(())
}

/// Validate a free-text secret.
pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(())
}

/// Validate an account login (4..=64 bytes).
pub fn validate_login(login: &str) -> Result<(), ValidationError> {
    if login.len() < MIN_LOGIN_LEN {
        return Err(ValidationError::LoginTooShort);
    }
    if login.len() > MAX_LOGIN_LEN {
        return Err(ValidationError::LoginTooLong);
    }
    Ok(())
}

/// Validate an account password (at least 8 bytes).
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Reject an empty refresh token before it reaches the token codec.
pub fn validate_refresh_token(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::EmptyRefreshToken);
    }
    Ok(())
}

/// Luhn checksum over a card number. Spaces are ignored; any other
/// non-digit, or no digits at all, fails.
fn is_valid_luhn(number: &str) -> bool {
    let mut sum = 0u32;
    let mut digits = 0usize;
    let mut double = false;

    for c in number.chars().rev().filter(|c| *c != ' ') {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        digits += 1;
        double = !double;
    }

    digits > 0 && sum % 10 == 0
}
