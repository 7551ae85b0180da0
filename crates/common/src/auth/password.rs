//! Password hashing with argon2id

use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AppError::Internal {
        message: format!("Stored password hash is malformed: {}", e),
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Minimum length, at least one letter and one digit
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<()> {
    if password.chars().count() < min_length {
        return Err(AppError::invalid_field(
            "senha",
            format!("password must have at least {} characters", min_length),
        ));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(AppError::invalid_field(
            "senha",
            "password must contain letters and digits",
        ));
    }
    Ok(())
}
