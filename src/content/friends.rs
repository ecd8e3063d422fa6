use rusqlite::{params, Connection, TransactionBehavior};

use crate::auth::identity;
use crate::content::ContentError;
use crate::db::is_constraint_violation;
use crate::db::models::UserSummary;
use crate::extractors::CurrentUser;

/// Friendship is symmetric: one row is stored per direction.
pub fn add_friend(
    conn: &mut Connection,
    user: &CurrentUser,
    friend_id: i64,
) -> Result<UserSummary, ContentError> {
    if friend_id == user.id {
        return Err(ContentError::Validation(
            "You cannot add yourself as a friend".into(),
        ));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let friend = identity::find_summary(&tx, friend_id)?.ok_or(ContentError::NotFound("user"))?;

    for (a, b) in [(user.id, friend_id), (friend_id, user.id)] {
        tx.execute(
            "INSERT INTO friendships (user_id, friend_id) VALUES (?1, ?2)",
            params![a, b],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                ContentError::Conflict("Already friends".into())
            } else {
                ContentError::Store(e)
            }
        })?;
    }
    tx.commit()?;

    Ok(friend)
}

pub fn list_friends(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<UserSummary>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.name, u.avatar FROM friendships f
         JOIN users u ON u.id = f.friend_id
         WHERE f.user_id = ?1
         ORDER BY u.name ASC",
    )?;
    let friends = stmt
        .query_map(params![user_id], |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                avatar: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(friends)
}

pub fn are_friends(conn: &Connection, a: i64, b: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
        params![a, b],
        |r| r.get(0),
    )
}
