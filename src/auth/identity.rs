use std::sync::OnceLock;

use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::db::models::{User, UserSummary};
use crate::db::{is_constraint_violation, text_enum};
use crate::domain::Role;
use crate::extractors::CurrentUser;

const MIN_PASSWORD_LEN: usize = 6;
const UNKNOWN_ACCOUNT_SECRET: &str = "joinfutbol-unknown-account";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Covers both an unknown email and a wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Role {0:?} cannot be chosen at registration")]
    InvalidRole(String),

    #[error("Email is already registered")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error("Hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password: &'a str,
    pub role: &'a str,
}

const USER_COLUMNS: &str = "id, name, email, role, avatar, password_hash, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: text_enum(row, 3)?,
        avatar: row.get(4)?,
        password_hash: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Check an email/password pair. Email matching is exact and case-sensitive.
///
/// An unknown email is still checked against a stand-in hash, so both
/// failures take one bcrypt verification.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<User, AuthError> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            params![email],
            user_from_row,
        )
        .optional()?;

    let Some(user) = user else {
        if let Some(hash) = unknown_account_hash() {
            let _ = bcrypt::verify(password, hash);
        }
        return Err(AuthError::InvalidCredentials);
    };

    if bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

/// Hashed once, at the default cost, on first use.
fn unknown_account_hash() -> Option<&'static str> {
    static HASH: OnceLock<Option<String>> = OnceLock::new();
    HASH.get_or_init(|| bcrypt::hash(UNKNOWN_ACCOUNT_SECRET, bcrypt::DEFAULT_COST).ok())
        .as_deref()
}

/// Pure role membership test.
pub fn authorize(user: &CurrentUser, allowed: &[Role]) -> bool {
    allowed.contains(&user.role)
}

/// Create an account. No session is issued; the caller logs in separately.
pub fn register(
    conn: &Connection,
    new: NewUser<'_>,
    bcrypt_cost: u32,
) -> Result<User, RegistrationError> {
    let role = new
        .role
        .parse::<Role>()
        .ok()
        .filter(Role::is_self_assignable)
        .ok_or_else(|| RegistrationError::InvalidRole(new.role.to_string()))?;

    let email = new.email.trim();
    let name = new.name.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(RegistrationError::Validation(
            "A valid email is required".into(),
        ));
    }
    if name.is_empty() {
        return Err(RegistrationError::Validation("Name is required".into()));
    }
    if new.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RegistrationError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
        params![email],
        |r| r.get(0),
    )?;
    if taken {
        return Err(RegistrationError::EmailTaken);
    }

    let hash = bcrypt::hash(new.password, bcrypt_cost)?;
    conn.execute(
        "INSERT INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
        params![name, email, hash, role.as_str()],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            RegistrationError::EmailTaken
        } else {
            RegistrationError::Store(e)
        }
    })?;

    let id = conn.last_insert_rowid();
    tracing::info!("Registered user {} as {}", id, role);
    Ok(find_user(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?)
}

pub fn find_user(conn: &Connection, id: i64) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![id],
        user_from_row,
    )
    .optional()
}

pub fn find_summary(conn: &Connection, id: i64) -> Result<Option<UserSummary>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, name, avatar FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                avatar: row.get(2)?,
            })
        },
    )
    .optional()
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        CurrentUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            avatar: user.avatar,
        }
    }
}
