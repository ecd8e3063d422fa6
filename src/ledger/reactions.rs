//! Reaction ledger: per (item, user) set of held reaction kinds.
//!
//! A user holds at most one reaction of each kind on an item; the primary key
//! on `reactions` enforces it. Counts are recomputed from the held rows inside
//! the same transaction as every mutation, so they never drift or go negative.

use rusqlite::{params, Connection, TransactionBehavior};
use serde::Serialize;
use thiserror::Error;

use crate::db::{is_constraint_violation, text_enum};
use crate::domain::{ReactionCounts, ReactionKind};

/// Matches, posts and comments each have their own id namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTarget {
    Match(i64),
    Post(i64),
    Comment(i64),
}

impl ReactionTarget {
    fn kind_str(&self) -> &'static str {
        match self {
            ReactionTarget::Match(_) => "match",
            ReactionTarget::Post(_) => "post",
            ReactionTarget::Comment(_) => "comment",
        }
    }

    fn id(&self) -> i64 {
        match self {
            ReactionTarget::Match(id) | ReactionTarget::Post(id) | ReactionTarget::Comment(id) => {
                *id
            }
        }
    }

    fn exists(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let sql = match self {
            ReactionTarget::Match(_) => "SELECT COUNT(*) > 0 FROM matches WHERE id = ?1",
            ReactionTarget::Post(_) => "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
            ReactionTarget::Comment(_) => "SELECT COUNT(*) > 0 FROM comments WHERE id = ?1",
        };
        conn.query_row(sql, params![self.id()], |r| r.get(0))
    }
}

#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("Reaction target not found")]
    TargetNotFound,

    #[error("You already reacted with this type")]
    AlreadyReacted,

    #[error("You have not reacted with this type")]
    NotReacted,

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionState {
    pub counts: ReactionCounts,
    pub held_by_user: Vec<ReactionKind>,
}

pub fn add_reaction(
    conn: &mut Connection,
    user_id: i64,
    target: ReactionTarget,
    kind: ReactionKind,
) -> Result<ReactionState, ReactionError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if !target.exists(&tx)? {
        return Err(ReactionError::TargetNotFound);
    }

    tx.execute(
        "INSERT INTO reactions (target_kind, target_id, user_id, kind) VALUES (?1, ?2, ?3, ?4)",
        params![target.kind_str(), target.id(), user_id, kind.as_str()],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            ReactionError::AlreadyReacted
        } else {
            ReactionError::Store(e)
        }
    })?;

    let state = reaction_state(&tx, target, Some(user_id))?;
    tx.commit()?;
    Ok(state)
}

pub fn remove_reaction(
    conn: &mut Connection,
    user_id: i64,
    target: ReactionTarget,
    kind: ReactionKind,
) -> Result<ReactionState, ReactionError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if !target.exists(&tx)? {
        return Err(ReactionError::TargetNotFound);
    }

    let removed = tx.execute(
        "DELETE FROM reactions WHERE target_kind = ?1 AND target_id = ?2 AND user_id = ?3 AND kind = ?4",
        params![target.kind_str(), target.id(), user_id, kind.as_str()],
    )?;
    if removed == 0 {
        return Err(ReactionError::NotReacted);
    }

    let state = reaction_state(&tx, target, Some(user_id))?;
    tx.commit()?;
    Ok(state)
}

/// Current counts for `target` plus the kinds `viewer` holds on it.
pub fn reaction_state(
    conn: &Connection,
    target: ReactionTarget,
    viewer: Option<i64>,
) -> rusqlite::Result<ReactionState> {
    let mut counts = ReactionCounts::new();
    let mut stmt = conn.prepare_cached(
        "SELECT kind, COUNT(*) FROM reactions WHERE target_kind = ?1 AND target_id = ?2 GROUP BY kind",
    )?;
    let rows = stmt.query_map(params![target.kind_str(), target.id()], |row| {
        Ok((text_enum::<ReactionKind>(row, 0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (kind, count) = row?;
        counts.set(kind, count.max(0) as u64);
    }

    let held_by_user = match viewer {
        Some(user_id) => {
            let mut stmt = conn.prepare_cached(
                "SELECT kind FROM reactions WHERE target_kind = ?1 AND target_id = ?2 AND user_id = ?3",
            )?;
            let mut held = stmt
                .query_map(params![target.kind_str(), target.id(), user_id], |row| {
                    text_enum::<ReactionKind>(row, 0)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            held.sort();
            held
        }
        None => Vec::new(),
    };

    Ok(ReactionState {
        counts,
        held_by_user,
    })
}

/// Drop every reaction on `target`. Used when the item itself is deleted.
pub(crate) fn clear_reactions(conn: &Connection, target: ReactionTarget) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM reactions WHERE target_kind = ?1 AND target_id = ?2",
        params![target.kind_str(), target.id()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;
    use crate::domain::Role;

    fn post_by(conn: &Connection, user_id: i64) -> i64 {
        conn.execute(
            "INSERT INTO posts (user_id, body) VALUES (?1, 'gol!')",
            params![user_id],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn add_increments_and_marks_held() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);
        let target = ReactionTarget::Post(post_by(&conn, user.id));

        let before = reaction_state(&conn, target, Some(user.id)).unwrap();
        let after = add_reaction(&mut conn, user.id, target, ReactionKind::Love).unwrap();

        assert_eq!(
            after.counts.get(ReactionKind::Love),
            before.counts.get(ReactionKind::Love) + 1
        );
        assert_eq!(after.held_by_user, vec![ReactionKind::Love]);
    }

    #[test]
    fn second_add_of_same_kind_is_rejected() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);
        let target = ReactionTarget::Post(post_by(&conn, user.id));

        add_reaction(&mut conn, user.id, target, ReactionKind::Like).unwrap();
        let err = add_reaction(&mut conn, user.id, target, ReactionKind::Like).unwrap_err();
        assert!(matches!(err, ReactionError::AlreadyReacted));

        let state = reaction_state(&conn, target, Some(user.id)).unwrap();
        assert_eq!(state.counts.get(ReactionKind::Like), 1);
    }

    #[test]
    fn one_user_may_hold_several_kinds() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);
        let target = ReactionTarget::Post(post_by(&conn, user.id));

        add_reaction(&mut conn, user.id, target, ReactionKind::Wow).unwrap();
        let state = add_reaction(&mut conn, user.id, target, ReactionKind::Like).unwrap();
        assert_eq!(state.held_by_user, vec![ReactionKind::Like, ReactionKind::Wow]);
        assert_eq!(state.counts.total(), 2);
    }

    #[test]
    fn remove_restores_previous_count() {
        let mut conn = test_support::conn();
        let ana = test_support::user(&conn, "Ana", Role::Player);
        let beto = test_support::user(&conn, "Beto", Role::Player);
        let target = ReactionTarget::Post(post_by(&conn, ana.id));

        add_reaction(&mut conn, beto.id, target, ReactionKind::Sad).unwrap();
        let before = reaction_state(&conn, target, Some(ana.id)).unwrap();

        add_reaction(&mut conn, ana.id, target, ReactionKind::Sad).unwrap();
        let after = remove_reaction(&mut conn, ana.id, target, ReactionKind::Sad).unwrap();

        assert_eq!(after.counts, before.counts);
        assert!(after.held_by_user.is_empty());

        let err = remove_reaction(&mut conn, ana.id, target, ReactionKind::Sad).unwrap_err();
        assert!(matches!(err, ReactionError::NotReacted));
    }

    #[test]
    fn namespaces_are_independent() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);
        let post_id = post_by(&conn, user.id);
        conn.execute(
            "INSERT INTO comments (parent_kind, parent_id, author_id, author_name, body)
             VALUES ('post', ?1, ?2, 'Ana', 'hola')",
            params![post_id, user.id],
        )
        .unwrap();
        let comment_id = conn.last_insert_rowid();

        add_reaction(&mut conn, user.id, ReactionTarget::Post(post_id), ReactionKind::Like)
            .unwrap();
        let comment_state = add_reaction(
            &mut conn,
            user.id,
            ReactionTarget::Comment(comment_id),
            ReactionKind::Like,
        )
        .unwrap();
        assert_eq!(comment_state.counts.get(ReactionKind::Like), 1);
    }

    #[test]
    fn missing_target_is_not_found() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);
        let err = add_reaction(&mut conn, user.id, ReactionTarget::Match(77), ReactionKind::Like)
            .unwrap_err();
        assert!(matches!(err, ReactionError::TargetNotFound));
    }

    #[test]
    fn anonymous_viewer_holds_nothing() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);
        let target = ReactionTarget::Post(post_by(&conn, user.id));
        add_reaction(&mut conn, user.id, target, ReactionKind::Angry).unwrap();

        let state = reaction_state(&conn, target, None).unwrap();
        assert_eq!(state.counts.get(ReactionKind::Angry), 1);
        assert!(state.held_by_user.is_empty());
    }
}
