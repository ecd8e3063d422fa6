use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Deserialize;

use crate::content::comments::{clear_comments, comment_count, CommentParent};
use crate::content::{clean_text, ContentError};
use crate::db::models::{Post, UserSummary};
use crate::domain::Role;
use crate::extractors::CurrentUser;
use crate::ledger::reactions::{clear_reactions, reaction_state, ReactionTarget};

const MAX_POST_CHARS: usize = 2000;
const MAX_IMAGES: usize = 10;
pub const FEED_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct NewPost {
    pub text: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Strip a leading `#`, trim, and drop empties and repeats (first wins).
pub fn normalize_hashtags(raw: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.trim().trim_start_matches('#').trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

pub fn create_post(
    conn: &mut Connection,
    author: &CurrentUser,
    new: &NewPost,
) -> Result<Post, ContentError> {
    let text = clean_text(&new.text, "Post", MAX_POST_CHARS)?;
    let hashtags = normalize_hashtags(&new.hashtags);
    let images: Vec<&str> = new
        .images
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .collect();
    if images.len() > MAX_IMAGES {
        return Err(ContentError::Validation(format!(
            "A post can carry at most {} images",
            MAX_IMAGES
        )));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO posts (user_id, body) VALUES (?1, ?2)",
        params![author.id, text],
    )?;
    let id = tx.last_insert_rowid();

    for (position, tag) in hashtags.iter().enumerate() {
        tx.execute(
            "INSERT INTO post_hashtags (post_id, tag, position) VALUES (?1, ?2, ?3)",
            params![id, tag, position as i64],
        )?;
    }
    for (position, url) in images.iter().enumerate() {
        tx.execute(
            "INSERT INTO post_images (post_id, url, position) VALUES (?1, ?2, ?3)",
            params![id, url, position as i64],
        )?;
    }

    let post = get_post(&tx, id, Some(author.id))?;
    tx.commit()?;
    Ok(post)
}

pub fn get_post(conn: &Connection, id: i64, viewer: Option<i64>) -> Result<Post, ContentError> {
    load_post(conn, id, viewer)?.ok_or(ContentError::NotFound("post"))
}

/// Newest posts first.
pub fn list_posts(conn: &Connection, viewer: Option<i64>, limit: i64) -> rusqlite::Result<Vec<Post>> {
    let ids = {
        let mut stmt = conn.prepare("SELECT id FROM posts ORDER BY id DESC LIMIT ?1")?;
        let ids = stmt
            .query_map(params![limit], |r| r.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };

    let mut posts = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(post) = load_post(conn, id, viewer)? {
            posts.push(post);
        }
    }
    Ok(posts)
}

/// Owners and admins may delete a post. Its comments and every reaction on
/// the post or those comments go with it.
pub fn delete_post(
    conn: &mut Connection,
    requester: &CurrentUser,
    id: i64,
) -> Result<(), ContentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let owner_id: i64 = tx
        .query_row("SELECT user_id FROM posts WHERE id = ?1", params![id], |r| {
            r.get(0)
        })
        .optional()?
        .ok_or(ContentError::NotFound("post"))?;

    let allowed = match requester.role {
        Role::Admin => true,
        Role::VenueAdmin | Role::Player => owner_id == requester.id,
    };
    if !allowed {
        return Err(ContentError::Forbidden);
    }

    clear_comments(&tx, CommentParent::Post(id))?;
    clear_reactions(&tx, ReactionTarget::Post(id))?;
    tx.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    tx.commit()?;

    tracing::info!("Post {} deleted by user {}", id, requester.id);
    Ok(())
}

fn load_post(conn: &Connection, id: i64, viewer: Option<i64>) -> rusqlite::Result<Option<Post>> {
    let row = conn
        .query_row(
            "SELECT p.id, p.body, p.created_at, u.id, u.name, u.avatar
             FROM posts p JOIN users u ON u.id = p.user_id
             WHERE p.id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    UserSummary {
                        id: row.get(3)?,
                        name: row.get(4)?,
                        avatar: row.get(5)?,
                    },
                ))
            },
        )
        .optional()?;

    let Some((id, text, created_at, author)) = row else {
        return Ok(None);
    };

    let reactions = reaction_state(conn, ReactionTarget::Post(id), viewer)?;

    Ok(Some(Post {
        id,
        author,
        text,
        hashtags: ordered_strings(
            conn,
            "SELECT tag FROM post_hashtags WHERE post_id = ?1 ORDER BY position",
            id,
        )?,
        images: ordered_strings(
            conn,
            "SELECT url FROM post_images WHERE post_id = ?1 ORDER BY position",
            id,
        )?,
        created_at,
        comment_count: comment_count(conn, CommentParent::Post(id))?,
        reactions: reactions.counts,
        my_reactions: reactions.held_by_user,
    }))
}

fn ordered_strings(conn: &Connection, sql: &str, post_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let values = stmt
        .query_map(params![post_id], |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::comments::{create_comment, NewComment};
    use crate::db::test_support;
    use crate::domain::ReactionKind;
    use crate::ledger::reactions::add_reaction;

    fn new_post(text: &str) -> NewPost {
        NewPost {
            text: text.into(),
            hashtags: vec!["#futbol".into(), "futbol".into(), " #7v7 ".into(), "#".into()],
            images: vec!["https://img.example/1.jpg".into()],
        }
    }

    #[test]
    fn hashtags_are_normalized() {
        let tags = normalize_hashtags(&["#Gol".into(), "  ".into(), "Gol".into(), "#copa".into()]);
        assert_eq!(tags, vec!["Gol", "copa"]);
    }

    #[test]
    fn create_post_stores_tags_and_images() {
        let mut conn = test_support::conn();
        let ana = test_support::user(&conn, "Ana", Role::Player);

        let post = create_post(&mut conn, &ana, &new_post("Buscamos arquero")).unwrap();
        assert_eq!(post.text, "Buscamos arquero");
        assert_eq!(post.hashtags, vec!["futbol", "7v7"]);
        assert_eq!(post.images, vec!["https://img.example/1.jpg"]);
        assert_eq!(post.comment_count, 0);
        assert_eq!(post.author.id, ana.id);
    }

    #[test]
    fn empty_post_is_rejected() {
        let mut conn = test_support::conn();
        let ana = test_support::user(&conn, "Ana", Role::Player);
        assert!(matches!(
            create_post(&mut conn, &ana, &new_post("   ")),
            Err(ContentError::Validation(_))
        ));
    }

    #[test]
    fn feed_is_newest_first() {
        let mut conn = test_support::conn();
        let ana = test_support::user(&conn, "Ana", Role::Player);
        let first = create_post(&mut conn, &ana, &new_post("uno")).unwrap();
        let second = create_post(&mut conn, &ana, &new_post("dos")).unwrap();

        let ids: Vec<i64> = list_posts(&conn, None, FEED_LIMIT)
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn delete_post_removes_comments_and_reactions() {
        let mut conn = test_support::conn();
        let ana = test_support::user(&conn, "Ana", Role::Player);
        let beto = test_support::user(&conn, "Beto", Role::Player);
        let post = create_post(&mut conn, &ana, &new_post("hola")).unwrap();

        let comment = create_comment(
            &mut conn,
            &beto,
            NewComment {
                parent: CommentParent::Post(post.id),
                text: "buenas",
                reply_to_id: None,
            },
        )
        .unwrap();
        add_reaction(&mut conn, beto.id, ReactionTarget::Post(post.id), ReactionKind::Like).unwrap();
        add_reaction(&mut conn, ana.id, ReactionTarget::Comment(comment.id), ReactionKind::Love)
            .unwrap();

        assert_eq!(get_post(&conn, post.id, None).unwrap().comment_count, 1);
        assert!(matches!(
            delete_post(&mut conn, &beto, post.id),
            Err(ContentError::Forbidden)
        ));

        delete_post(&mut conn, &ana, post.id).unwrap();
        let counts: (i64, i64) = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM comments), (SELECT COUNT(*) FROM reactions)",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(counts, (0, 0));
        assert!(matches!(
            get_post(&conn, post.id, None),
            Err(ContentError::NotFound("post"))
        ));
    }

    #[test]
    fn admin_may_delete_any_post() {
        let mut conn = test_support::conn();
        let ana = test_support::user(&conn, "Ana", Role::Player);
        let admin = test_support::user(&conn, "Root", Role::Admin);
        let post = create_post(&mut conn, &ana, &new_post("hola")).unwrap();
        delete_post(&mut conn, &admin, post.id).unwrap();
    }
}
