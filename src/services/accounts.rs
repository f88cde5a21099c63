use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

use rand::rngs::OsRng;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::models::{OrderSummary, User};

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Username must not be empty")]
    EmptyUsername,
    #[error("Password must not be empty")]
    EmptyPassword,
    #[error("Username already exists. Please choose a different one.")]
    UsernameTaken,
    #[error("Invalid credentials. Please try again.")]
    InvalidCredentials,
    #[error("User {0} was not found")]
    UnknownUser(i64),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl AccountError {
    /// Whether the error is the user's to fix rather than a server fault.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            AccountError::Hashing(_) | AccountError::Sqlx(_) | AccountError::UnknownUser(_)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
}

fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hashing(e.to_string()))
}

/// Hash checked against when the username is unknown, so a failed login
/// costs the same Argon2 work either way.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| match hash_password("not-a-real-password") {
            Ok(hash) => Some(hash),
            Err(e) => {
                log::error!("Could not prepare dummy password hash: {}", e);
                None
            }
        })
        .as_deref()
}

#[cfg(test)]
thread_local! {
    static VERIFICATIONS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    #[cfg(test)]
    VERIFICATIONS.with(|count| count.set(count.get() + 1));

    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn validate_username(username: &str) -> Result<&str, AccountError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AccountError::EmptyUsername);
    }
    Ok(username)
}

async fn username_exists(
    pool: &SqlitePool,
    username: &str,
    except_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id IS NOT $2)",
    )
    .bind(username)
    .bind(except_id)
    .fetch_one(pool)
    .await
}

/// Creates a new account with an argon2-hashed password.
pub async fn register(pool: &SqlitePool, account: NewAccount) -> Result<User, AccountError> {
    let username = validate_username(&account.username)?;
    if account.password.is_empty() {
        return Err(AccountError::EmptyPassword);
    }

    if username_exists(pool, username, None).await? {
        return Err(AccountError::UsernameTaken);
    }

    let password_hash = hash_password(&account.password)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password_hash, first_name, last_name) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(username)
    .bind(&password_hash)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AccountError::UsernameTaken
        } else {
            AccountError::Sqlx(e)
        }
    })?;

    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

/// Checks a username/password pair.
///
/// Unknown usernames and wrong passwords both come back as
/// [`AccountError::InvalidCredentials`].
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<User, AccountError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username.trim())
        .fetch_optional(pool)
        .await?;

    let verified = match &user {
        Some(user) => verify_password(password, &user.password_hash),
        None => {
            if let Some(hash) = dummy_hash() {
                verify_password(password, hash);
            }
            false
        }
    };

    match user {
        Some(user) if verified => {
            log::info!("User {} logged in", user.id);
            Ok(user)
        }
        _ => {
            log::warn!("Failed login attempt");
            Err(AccountError::InvalidCredentials)
        }
    }
}

pub async fn find_user(pool: &SqlitePool, user_id: i64) -> Result<Option<User>, AccountError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Replaces the profile fields of an existing user.
pub async fn update_profile(
    pool: &SqlitePool,
    user_id: i64,
    profile: Profile,
) -> Result<User, AccountError> {
    let username = validate_username(&profile.username)?;

    if username_exists(pool, username, Some(user_id)).await? {
        return Err(AccountError::UsernameTaken);
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET username = $1, first_name = $2, last_name = $3, city = $4, state = $5, country = $6, zip = $7
         WHERE id = $8 RETURNING *",
    )
    .bind(username)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(&profile.city)
    .bind(&profile.state)
    .bind(&profile.country)
    .bind(&profile.zip)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AccountError::UsernameTaken
        } else {
            AccountError::Sqlx(e)
        }
    })?
    .ok_or(AccountError::UnknownUser(user_id))?;

    log::info!("Updated profile of user {}", user.id);
    Ok(user)
}

/// A user's order lines, newest first.
pub async fn orders_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<OrderSummary>, AccountError> {
    let orders = sqlx::query_as::<_, OrderSummary>(
        "SELECT o.id, o.medicine_id, m.name AS medicine_name, o.quantity, o.status, o.checkout_id, o.created_at
         FROM orders o JOIN medicines m ON m.id = o.medicine_id
         WHERE o.user_id = $1
         ORDER BY o.created_at DESC, o.id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(orders)
}
