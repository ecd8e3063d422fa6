use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::text_enum;
use crate::extractors::CurrentUser;

const TOKEN_BYTES: usize = 32;

/// Create a new session for a user. Returns the session token.
/// Earlier sessions for the same user stay valid.
pub fn create_session(conn: &Connection, user_id: i64, hours: u64) -> Result<String, rusqlite::Error> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Resolve a token to the user it belongs to, sliding its expiry forward.
///
/// Absent, malformed, expired or unknown tokens all come back as `None`, as
/// does a session whose user row no longer carries a usable role.
pub fn resolve_session(
    conn: &Connection,
    token: &str,
    hours: u64,
) -> Result<Option<CurrentUser>, rusqlite::Error> {
    if !is_well_formed(token) {
        return Ok(None);
    }

    let user = conn
        .query_row(
            "SELECT u.id, u.name, u.email, u.role, u.avatar FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| {
                Ok(CurrentUser {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    role: text_enum(row, 3)?,
                    avatar: row.get(4)?,
                })
            },
        )
        .optional();

    let user = match user {
        Ok(user) => user,
        Err(rusqlite::Error::FromSqlConversionFailure(..)) => {
            tracing::warn!("Session references a user with an unreadable role");
            None
        }
        Err(e) => return Err(e),
    };

    if user.is_some() {
        conn.execute(
            "UPDATE sessions SET expires_at = datetime('now', ?2) WHERE token = ?1",
            params![token, format!("+{} hours", hours)],
        )?;
    }

    Ok(user)
}

/// Delete a session by token. Unknown tokens are not an error.
pub fn delete_session(conn: &Connection, token: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Remove every expired session. Returns how many were deleted.
pub fn purge_expired(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; TOKEN_BYTES] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.chars().all(|c| c.is_ascii_hexdigit())
}
