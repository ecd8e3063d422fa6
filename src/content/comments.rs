//! Comments on matches and posts.
//!
//! Both parents share one table but are separate namespaces: a reply must sit
//! under the same parent as the comment it answers. Deleting a comment removes
//! its direct replies only; deeper replies are left in place.

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::content::{clean_text, ContentError};
use crate::db::models::{Comment, CommentAuthor};
use crate::extractors::CurrentUser;
use crate::ledger::reactions::{clear_reactions, reaction_state, ReactionTarget};

const MAX_COMMENT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentParent {
    Match(i64),
    Post(i64),
}

impl CommentParent {
    /// Exactly one of the two ids must be given.
    pub fn from_ids(match_id: Option<i64>, post_id: Option<i64>) -> Result<Self, ContentError> {
        match (match_id, post_id) {
            (Some(id), None) => Ok(CommentParent::Match(id)),
            (None, Some(id)) => Ok(CommentParent::Post(id)),
            (None, None) => Err(ContentError::Validation(
                "match_id or post_id is required".into(),
            )),
            (Some(_), Some(_)) => Err(ContentError::Validation(
                "Give either match_id or post_id, not both".into(),
            )),
        }
    }

    fn kind_str(&self) -> &'static str {
        match self {
            CommentParent::Match(_) => "match",
            CommentParent::Post(_) => "post",
        }
    }

    fn id(&self) -> i64 {
        match self {
            CommentParent::Match(id) | CommentParent::Post(id) => *id,
        }
    }

    fn ensure_exists(&self, conn: &Connection) -> Result<(), ContentError> {
        let (sql, what) = match self {
            CommentParent::Match(_) => ("SELECT COUNT(*) > 0 FROM matches WHERE id = ?1", "match"),
            CommentParent::Post(_) => ("SELECT COUNT(*) > 0 FROM posts WHERE id = ?1", "post"),
        };
        let exists: bool = conn.query_row(sql, params![self.id()], |r| r.get(0))?;
        if exists {
            Ok(())
        } else {
            Err(ContentError::NotFound(what))
        }
    }
}

pub struct NewComment<'a> {
    pub parent: CommentParent,
    pub text: &'a str,
    pub reply_to_id: Option<i64>,
}

pub fn create_comment(
    conn: &mut Connection,
    author: &CurrentUser,
    new: NewComment<'_>,
) -> Result<Comment, ContentError> {
    let text = clean_text(new.text, "Comment", MAX_COMMENT_CHARS)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    new.parent.ensure_exists(&tx)?;

    if let Some(reply_to) = new.reply_to_id {
        let reply_parent: (String, i64) = tx
            .query_row(
                "SELECT parent_kind, parent_id FROM comments WHERE id = ?1",
                params![reply_to],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .ok_or(ContentError::NotFound("comment"))?;
        if reply_parent != (new.parent.kind_str().to_string(), new.parent.id()) {
            return Err(ContentError::Validation(
                "Reply must belong to the same thread".into(),
            ));
        }
    }

    tx.execute(
        "INSERT INTO comments (parent_kind, parent_id, author_id, author_name, author_avatar, body, reply_to_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.parent.kind_str(),
            new.parent.id(),
            author.id,
            author.name,
            author.avatar,
            text,
            new.reply_to_id
        ],
    )?;
    let id = tx.last_insert_rowid();
    let comment = find_comment(&tx, id, Some(author.id))?.ok_or(ContentError::NotFound("comment"))?;
    tx.commit()?;

    Ok(comment)
}

/// Delete a comment written by `requester` plus its direct replies.
/// Returns the ids removed, the comment itself first.
pub fn delete_comment(
    conn: &mut Connection,
    requester: &CurrentUser,
    comment_id: i64,
) -> Result<Vec<i64>, ContentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let author_id: i64 = tx
        .query_row(
            "SELECT author_id FROM comments WHERE id = ?1",
            params![comment_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(ContentError::NotFound("comment"))?;
    if author_id != requester.id {
        return Err(ContentError::Forbidden);
    }

    let mut removed = vec![comment_id];
    {
        let mut stmt = tx.prepare("SELECT id FROM comments WHERE reply_to_id = ?1 ORDER BY id")?;
        let replies = stmt
            .query_map(params![comment_id], |r| r.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        removed.extend(replies);
    }

    for id in &removed {
        clear_reactions(&tx, ReactionTarget::Comment(*id))?;
    }
    tx.execute(
        "DELETE FROM comments WHERE id = ?1 OR reply_to_id = ?1",
        params![comment_id],
    )?;
    tx.commit()?;

    tracing::info!("Deleted comment {} and {} replies", comment_id, removed.len() - 1);
    Ok(removed)
}

/// Comments under `parent`, oldest first.
pub fn list_comments(
    conn: &Connection,
    parent: CommentParent,
    viewer: Option<i64>,
) -> Result<Vec<Comment>, ContentError> {
    parent.ensure_exists(conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM comments WHERE parent_kind = ?1 AND parent_id = ?2 ORDER BY id ASC",
        COMMENT_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![parent.kind_str(), parent.id()], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|c| with_reactions(conn, c, viewer).map_err(ContentError::from))
        .collect()
}

pub fn find_comment(
    conn: &Connection,
    id: i64,
    viewer: Option<i64>,
) -> rusqlite::Result<Option<Comment>> {
    let comment = conn
        .query_row(
            &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
            params![id],
            comment_from_row,
        )
        .optional()?;
    comment.map(|c| with_reactions(conn, c, viewer)).transpose()
}

pub fn comment_count(conn: &Connection, parent: CommentParent) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE parent_kind = ?1 AND parent_id = ?2",
        params![parent.kind_str(), parent.id()],
        |r| r.get(0),
    )
}

/// Remove every comment under `parent` and the reactions on them.
pub(crate) fn clear_comments(conn: &Connection, parent: CommentParent) -> rusqlite::Result<usize> {
    let ids = {
        let mut stmt =
            conn.prepare("SELECT id FROM comments WHERE parent_kind = ?1 AND parent_id = ?2")?;
        let ids = stmt
            .query_map(params![parent.kind_str(), parent.id()], |r| r.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    for id in &ids {
        clear_reactions(conn, ReactionTarget::Comment(*id))?;
    }
    conn.execute(
        "DELETE FROM comments WHERE parent_kind = ?1 AND parent_id = ?2",
        params![parent.kind_str(), parent.id()],
    )
}

const COMMENT_COLUMNS: &str =
    "id, parent_kind, parent_id, author_id, author_name, author_avatar, body, reply_to_id, created_at";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        parent_kind: row.get(1)?,
        parent_id: row.get(2)?,
        author: CommentAuthor {
            id: row.get(3)?,
            name: row.get(4)?,
            avatar: row.get(5)?,
        },
        text: row.get(6)?,
        reply_to_id: row.get(7)?,
        created_at: row.get(8)?,
        reactions: Default::default(),
        my_reactions: Vec::new(),
    })
}

fn with_reactions(
    conn: &Connection,
    mut comment: Comment,
    viewer: Option<i64>,
) -> rusqlite::Result<Comment> {
    let state = reaction_state(conn, ReactionTarget::Comment(comment.id), viewer)?;
    comment.reactions = state.counts;
    comment.my_reactions = state.held_by_user;
    Ok(comment)
}
