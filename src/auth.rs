//! Accounts: registration, login, identity checks and password/username recovery.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::mail::{EmailMessage, Mailer};
use crate::models::{PasswordReset, TIMESTAMP_FORMAT, User};

/// Minutes a password reset code stays valid
pub const RESET_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please fill in all required fields")]
    MissingFields,
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Email already exists")]
    EmailTaken,
    #[error("Registration failed. Please try again.")]
    RegistrationFailed,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid username or email combination")]
    IdentityMismatch,
    #[error("Invalid or expired reset code")]
    InvalidResetToken,
    #[error("Failed to send email. Please try again later.")]
    EmailFailed,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

/// Argon2id hash with a random salt, in PHC string format
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Unsalted SHA-256 hex digest, the format of accounts created before Argon2 was adopted
fn legacy_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn is_legacy_hash(stored: &str) -> bool {
    stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Check a password against a stored hash of either format
pub fn verify_password(password: &str, stored: &str) -> bool {
    if is_legacy_hash(stored) {
        return legacy_digest(password).eq_ignore_ascii_case(stored);
    }
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

pub fn register_user(db: &Database, username: &str, email: &str, password: &str) -> Result<User, AuthError> {
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let mut user = User::new(username.to_string(), email.to_string(), hash_password(password)?);
    match db.insert_user(&user) {
        Ok(id) => {
            user.id = Some(id);
            tracing::info!(username = %username, "user registered");
            Ok(user)
        }
        Err(DatabaseError::UniqueViolation { column }) if column.ends_with("username") => {
            Err(AuthError::UsernameTaken)
        }
        Err(DatabaseError::UniqueViolation { column }) if column.ends_with("email") => {
            Err(AuthError::EmailTaken)
        }
        Err(e) => {
            tracing::error!(error = %e, "registration error");
            Err(AuthError::RegistrationFailed)
        }
    }
}

/// Verify credentials and record today's login. Unknown users and wrong
/// passwords produce the same error.
pub fn login_user(db: &Database, username: &str, password: &str) -> Result<User, AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let Some(mut user) = db.get_user_by_username(username)? else {
        // Same Argon2 cost as a real account, so timing does not reveal which usernames exist
        if let Some(hash) = dummy_hash() {
            verify_password(password, hash);
        }
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash) {
        tracing::info!(username = %username, "failed login");
        return Err(AuthError::InvalidCredentials);
    }

    if is_legacy_hash(&user.password_hash) {
        let upgraded = hash_password(password)?;
        db.update_password_hash(&user.username, &upgraded)?;
        user.password_hash = upgraded;
        tracing::info!(username = %username, "legacy password hash upgraded");
    }

    record_login(db, &user.username);
    Ok(user)
}

/// Argon2 hash of a random secret, computed once per process
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| {
            let mut secret = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut secret);
            hash_password(&hex::encode(secret)).ok()
        })
        .as_deref()
}

/// Upsert today's row in `logins`; failures are logged, never surfaced
pub fn record_login(db: &Database, username: &str) {
    if let Err(e) = db.record_login(username, &crate::utils::get_current_date_string()) {
        tracing::error!(username = %username, error = %e, "login tracking failed");
    }
}

pub fn verify_user_identity(db: &Database, username: &str, email: &str) -> Result<User, AuthError> {
    db.get_user_by_username_and_email(username.trim(), email.trim())?
        .ok_or(AuthError::IdentityMismatch)
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Prove identity by username and email, then mail a one-time reset code.
/// Only the SHA-256 of the code is stored.
pub fn request_password_reset(
    db: &Database,
    mailer: &dyn Mailer,
    username: &str,
    email: &str,
) -> Result<(), AuthError> {
    let user = verify_user_identity(db, username, email)?;

    let now = chrono::Utc::now();
    if let Err(e) = db.purge_expired_resets(&now.format(TIMESTAMP_FORMAT).to_string()) {
        tracing::warn!(error = %e, "could not purge expired reset tokens");
    }

    let token = generate_token();
    let expires_at = now + chrono::Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    db.insert_password_reset(&PasswordReset {
        token_hash: token_digest(&token),
        username: user.username.clone(),
        expires_at: expires_at.format(TIMESTAMP_FORMAT).to_string(),
        used: false,
    })?;

    let message = EmailMessage::password_reset(&user.email, &user.username, &token, RESET_TOKEN_TTL_MINUTES);
    mailer.send(&message).map_err(|e| {
        tracing::error!(error = %e, "password reset email failed");
        AuthError::EmailFailed
    })?;
    tracing::info!(username = %user.username, "password reset requested");
    Ok(())
}

/// Consume a reset code and replace the password
pub fn reset_password(db: &Database, token: &str, new_password: &str) -> Result<(), AuthError> {
    if token.trim().is_empty() || new_password.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let token_hash = token_digest(token);
    let reset = db
        .get_password_reset(&token_hash)?
        .ok_or(AuthError::InvalidResetToken)?;
    let now = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
    if reset.used || reset.expires_at < now {
        return Err(AuthError::InvalidResetToken);
    }

    let new_hash = hash_password(new_password)?;
    if !db.complete_password_reset(&token_hash, &reset.username, &new_hash)? {
        return Err(AuthError::InvalidResetToken);
    }
    tracing::info!(username = %reset.username, "password reset completed");
    Ok(())
}

/// Mail the username registered to `email`. Unknown addresses get the same
/// `Ok(())` so callers cannot tell whether an account exists.
pub fn request_username_reminder(db: &Database, mailer: &dyn Mailer, email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let Some(username) = db.get_username_by_email(email)? else {
        tracing::debug!("username reminder requested for unknown email");
        return Ok(());
    };

    let response = crate::mail::handle_username_email(
        &serde_json::json!({ "email": email, "username": username }).to_string(),
        mailer,
    );
    if !response.is_success() {
        tracing::error!(status = response.status, body = %response.body, "email sending error");
        return Err(AuthError::EmailFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::testing::RecordingMailer;

    fn db_with_ana() -> Database {
        let db = Database::open_in_memory().unwrap();
        register_user(&db, "ana", "ana@example.com", "s3cret").unwrap();
        db
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(!verify_password("other", &a));
    }

    #[test]
    fn unknown_users_are_checked_against_an_argon2_hash() {
        let db = db_with_ana();
        let hash = dummy_hash().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!verify_password("s3cret", hash));
        assert_eq!(dummy_hash(), Some(hash));

        let err = login_user(&db, "nobody", "s3cret").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid username or password");
    }

    #[test]
    fn duplicate_username_is_rejected_without_mutation() {
        let db = db_with_ana();
        let err = register_user(&db, "ana", "new@example.com", "x").unwrap_err();

        assert!(matches!(err, AuthError::UsernameTaken));
        assert_eq!(err.to_string(), "Username already exists");
        assert_eq!(db.count_users().unwrap(), 1);
        assert!(db.get_username_by_email("new@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = db_with_ana();
        let err = register_user(&db, "bob", "ana@example.com", "x").unwrap_err();
        assert_eq!(err.to_string(), "Email already exists");
    }

    #[test]
    fn wrong_password_and_unknown_user_look_the_same() {
        let db = db_with_ana();
        let wrong = login_user(&db, "ana", "nope").unwrap_err();
        let unknown = login_user(&db, "zoe", "nope").unwrap_err();

        assert_eq!(wrong.to_string(), "Invalid username or password");
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn login_records_the_day() {
        let db = db_with_ana();
        login_user(&db, "  ana ", "s3cret").unwrap();
        assert_eq!(db.get_login_dates("ana").unwrap(), vec![crate::utils::get_current_date_string()]);
    }

    #[test]
    fn legacy_hash_verifies_and_is_upgraded() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&User::new("old".into(), "old@example.com".into(), legacy_digest("pw"))).unwrap();

        login_user(&db, "old", "pw").unwrap();

        let stored = db.get_user_by_username("old").unwrap().unwrap().password_hash;
        assert!(stored.starts_with("$argon2"));
        assert!(verify_password("pw", &stored));
    }

    #[test]
    fn reset_flow_requires_identity_and_a_valid_code() {
        let db = db_with_ana();
        let mailer = RecordingMailer::default();

        let err = request_password_reset(&db, &mailer, "ana", "wrong@example.com").unwrap_err();
        assert_eq!(err.to_string(), "Invalid username or email combination");
        assert!(mailer.sent.borrow().is_empty());

        request_password_reset(&db, &mailer, "ana", "ana@example.com").unwrap();
        let text = mailer.sent.borrow()[0].text.clone();
        let token = text
            .split_whitespace()
            .find(|word| word.len() == 32)
            .unwrap()
            .to_string();

        assert!(matches!(reset_password(&db, "bogus", "new"), Err(AuthError::InvalidResetToken)));
        reset_password(&db, &token, "brand-new").unwrap();
        assert!(matches!(reset_password(&db, &token, "again"), Err(AuthError::InvalidResetToken)));

        assert!(login_user(&db, "ana", "s3cret").is_err());
        login_user(&db, "ana", "brand-new").unwrap();
    }

    #[test]
    fn username_reminder_does_not_reveal_unknown_emails() {
        let db = db_with_ana();
        let mailer = RecordingMailer::default();

        request_username_reminder(&db, &mailer, "nobody@example.com").unwrap();
        assert!(mailer.sent.borrow().is_empty());

        request_username_reminder(&db, &mailer, "ana@example.com").unwrap();
        assert_eq!(mailer.sent.borrow()[0].text, "Your username is: ana");
    }

    #[test]
    fn username_reminder_surfaces_mail_failures() {
        let db = db_with_ana();
        let err = request_username_reminder(&db, &RecordingMailer::failing(), "ana@example.com").unwrap_err();
        assert_eq!(err.to_string(), "Failed to send email. Please try again later.");
    }
}
