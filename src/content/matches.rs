use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Deserialize;

use crate::auth::identity::{self, authorize};
use crate::content::comments::{comment_count, CommentParent};
use crate::content::venues::{find_venue, venue_from_row};
use crate::content::{clean_text, friends, ContentError};
use crate::db::models::{Invitation, Match, RosterPlayer, TeamRoster, UserSummary};
use crate::db::{is_constraint_violation, text_enum};
use crate::domain::{MatchFormat, MatchStatus, Role, Team};
use crate::extractors::CurrentUser;
use crate::ledger::reactions::{reaction_state, ReactionTarget};

const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
pub struct NewMatch {
    pub title: String,
    pub venue_id: i64,
    pub starts_at: String,
    pub commission: i64,
    pub format: MatchFormat,
    /// Places per team; defaults to the format's team size.
    pub capacity: Option<u32>,
}

/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM[:SS]` (taken as UTC) and returns
/// the database representation.
pub fn parse_start_time(raw: &str) -> Result<String, ContentError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc).format(DB_TIME_FORMAT).to_string());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.format(DB_TIME_FORMAT).to_string())
        .ok_or_else(|| ContentError::Validation(format!("Invalid start time: {:?}", raw)))
}

pub fn create_match(
    conn: &Connection,
    creator: &CurrentUser,
    new: &NewMatch,
) -> Result<Match, ContentError> {
    if !authorize(creator, &[Role::Admin, Role::VenueAdmin]) {
        return Err(ContentError::Forbidden);
    }
    let title = clean_text(&new.title, "Title", 120)?;
    let starts_at = parse_start_time(&new.starts_at)?;
    if new.commission < 0 {
        return Err(ContentError::Validation(
            "Commission cannot be negative".into(),
        ));
    }
    let capacity = new.capacity.unwrap_or(new.format.players_per_team());
    if capacity == 0 {
        return Err(ContentError::Validation(
            "Capacity must be at least one".into(),
        ));
    }

    let venue = find_venue(conn, new.venue_id)?.ok_or(ContentError::NotFound("venue"))?;
    if creator.role == Role::VenueAdmin && venue.owner_id != creator.id {
        return Err(ContentError::Forbidden);
    }

    conn.execute(
        "INSERT INTO matches (title, venue_id, starts_at, commission, format, local_capacity, visitante_capacity, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7)",
        params![
            title,
            venue.id,
            starts_at,
            new.commission,
            new.format.as_str(),
            capacity,
            creator.id
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!("Match {} created at venue {} by user {}", id, venue.id, creator.id);

    load_match(conn, id, Some(creator.id))?.ok_or(ContentError::NotFound("match"))
}

pub fn get_match(conn: &Connection, id: i64, viewer: Option<i64>) -> Result<Match, ContentError> {
    load_match(conn, id, viewer)?.ok_or(ContentError::NotFound("match"))
}

pub fn list_matches(
    conn: &Connection,
    status: Option<MatchStatus>,
    viewer: Option<i64>,
) -> rusqlite::Result<Vec<Match>> {
    let ids = query_ids(
        conn,
        "SELECT id FROM matches WHERE ?1 IS NULL OR status = ?1 ORDER BY starts_at ASC, id ASC",
        params![status.map(|s| s.as_str())],
    )?;
    load_all(conn, ids, viewer)
}

/// Matches the user holds a roster slot in, soonest first.
pub fn matches_for_player(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Match>> {
    let ids = query_ids(
        conn,
        "SELECT m.id FROM matches m JOIN match_players p ON p.match_id = m.id
         WHERE p.user_id = ?1 ORDER BY m.starts_at ASC, m.id ASC",
        params![user_id],
    )?;
    load_all(conn, ids, Some(user_id))
}

/// Matches hosted at venues owned by `owner_id`.
pub fn matches_for_owner(conn: &Connection, owner_id: i64) -> rusqlite::Result<Vec<Match>> {
    let ids = query_ids(
        conn,
        "SELECT m.id FROM matches m JOIN venues v ON v.id = m.venue_id
         WHERE v.owner_id = ?1 ORDER BY m.starts_at ASC, m.id ASC",
        params![owner_id],
    )?;
    load_all(conn, ids, Some(owner_id))
}

pub fn update_status(
    conn: &mut Connection,
    user: &CurrentUser,
    match_id: i64,
    next: MatchStatus,
) -> Result<Match, ContentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let (current, owner_id): (MatchStatus, i64) = tx
        .query_row(
            "SELECT m.status, v.owner_id FROM matches m JOIN venues v ON v.id = m.venue_id
             WHERE m.id = ?1",
            params![match_id],
            |row| Ok((text_enum(row, 0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or(ContentError::NotFound("match"))?;

    let allowed = match user.role {
        Role::Admin => true,
        Role::VenueAdmin => owner_id == user.id,
        Role::Player => false,
    };
    if !allowed {
        return Err(ContentError::Forbidden);
    }
    if !current.can_transition_to(next) {
        return Err(ContentError::InvalidTransition {
            from: current,
            to: next,
        });
    }

    tx.execute(
        "UPDATE matches SET status = ?2 WHERE id = ?1",
        params![match_id, next.as_str()],
    )?;
    tx.commit()?;
    tracing::info!("Match {} moved from {} to {}", match_id, current, next);

    get_match(conn, match_id, Some(user.id))
}

pub fn join_team(
    conn: &mut Connection,
    user: &CurrentUser,
    match_id: i64,
    team: Team,
    position: &str,
) -> Result<Match, ContentError> {
    if !authorize(user, &[Role::Player]) {
        return Err(ContentError::Forbidden);
    }
    let position = clean_text(position, "Position", 40)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = get_match(&tx, match_id, Some(user.id))?;

    if !current.status.is_open_for_players() {
        return Err(ContentError::Conflict(format!(
            "Match is {} and not open for players",
            current.status
        )));
    }
    if current.has_player(user.id) {
        return Err(ContentError::AlreadyJoined);
    }
    if current.roster(team).is_full() {
        return Err(ContentError::CapacityExceeded);
    }

    tx.execute(
        "INSERT INTO match_players (match_id, user_id, team, position) VALUES (?1, ?2, ?3, ?4)",
        params![match_id, user.id, team.as_str(), position],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            ContentError::AlreadyJoined
        } else {
            ContentError::Store(e)
        }
    })?;
    tx.commit()?;
    tracing::info!("User {} joined match {} ({})", user.id, match_id, team.as_str());

    get_match(conn, match_id, Some(user.id))
}

pub fn cancel_participation(
    conn: &mut Connection,
    user: &CurrentUser,
    match_id: i64,
) -> Result<Match, ContentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = get_match(&tx, match_id, Some(user.id))?;

    if !current.has_player(user.id) {
        return Err(ContentError::NotFound("participation"));
    }
    if !current.status.is_open_for_players() {
        return Err(ContentError::Conflict(format!(
            "Match is {}; participation can no longer be cancelled",
            current.status
        )));
    }

    tx.execute(
        "DELETE FROM match_players WHERE match_id = ?1 AND user_id = ?2",
        params![match_id, user.id],
    )?;
    tx.commit()?;
    tracing::info!("User {} left match {}", user.id, match_id);

    get_match(conn, match_id, Some(user.id))
}

/// Invite a friend to an open match. Nothing is delivered; the invitation is
/// listed for the invitee.
pub fn invite_friend(
    conn: &mut Connection,
    inviter: &CurrentUser,
    match_id: i64,
    invitee_id: i64,
) -> Result<Invitation, ContentError> {
    if !authorize(inviter, &[Role::Player]) {
        return Err(ContentError::Forbidden);
    }
    if invitee_id == inviter.id {
        return Err(ContentError::Validation(
            "You cannot invite yourself".into(),
        ));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = get_match(&tx, match_id, None)?;
    if !current.status.is_open_for_players() {
        return Err(ContentError::Conflict(format!(
            "Match is {} and not open for players",
            current.status
        )));
    }
    identity::find_summary(&tx, invitee_id)?.ok_or(ContentError::NotFound("user"))?;
    if !friends::are_friends(&tx, inviter.id, invitee_id)? {
        return Err(ContentError::Forbidden);
    }
    if current.has_player(invitee_id) {
        return Err(ContentError::Conflict(
            "Friend is already playing in this match".into(),
        ));
    }

    tx.execute(
        "INSERT INTO match_invitations (match_id, inviter_id, invitee_id) VALUES (?1, ?2, ?3)",
        params![match_id, inviter.id, invitee_id],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            ContentError::Conflict("Friend was already invited".into())
        } else {
            ContentError::Store(e)
        }
    })?;
    let id = tx.last_insert_rowid();
    let invitation = load_invitations(&tx, "i.id = ?1", id)?
        .pop()
        .ok_or(ContentError::NotFound("invitation"))?;
    tx.commit()?;

    Ok(invitation)
}

/// Invitations received by `user_id`, newest first.
pub fn list_invitations(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Invitation>> {
    load_invitations(conn, "i.invitee_id = ?1", user_id)
}

fn load_invitations(
    conn: &Connection,
    filter: &str,
    value: i64,
) -> rusqlite::Result<Vec<Invitation>> {
    let sql = format!(
        "SELECT i.id, i.match_id, m.title, u.id, u.name, u.avatar, i.invitee_id, i.created_at
         FROM match_invitations i
         JOIN matches m ON m.id = i.match_id
         JOIN users u ON u.id = i.inviter_id
         WHERE {}
         ORDER BY i.id DESC",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let invitations = stmt
        .query_map(params![value], |row| {
            Ok(Invitation {
                id: row.get(0)?,
                match_id: row.get(1)?,
                match_title: row.get(2)?,
                inviter: UserSummary {
                    id: row.get(3)?,
                    name: row.get(4)?,
                    avatar: row.get(5)?,
                },
                invitee_id: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(invitations)
}

// --- Loading ---

fn query_ids(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(args, |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn load_all(conn: &Connection, ids: Vec<i64>, viewer: Option<i64>) -> rusqlite::Result<Vec<Match>> {
    let mut matches = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(m) = load_match(conn, id, viewer)? {
            matches.push(m);
        }
    }
    Ok(matches)
}

fn load_match(conn: &Connection, id: i64, viewer: Option<i64>) -> rusqlite::Result<Option<Match>> {
    let row = conn
        .query_row(
            "SELECT m.id, m.title, m.starts_at, m.commission, m.status, m.format,
                    m.local_capacity, m.visitante_capacity,
                    v.id, v.name, v.address, v.owner_id
             FROM matches m JOIN venues v ON v.id = m.venue_id
             WHERE m.id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    text_enum::<MatchStatus>(row, 4)?,
                    text_enum::<MatchFormat>(row, 5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, u32>(7)?,
                    venue_from_row(row, 8)?,
                ))
            },
        )
        .optional()?;

    let Some((id, title, starts_at, commission, status, format, local_cap, visitante_cap, venue)) =
        row
    else {
        return Ok(None);
    };

    let reactions = reaction_state(conn, ReactionTarget::Match(id), viewer)?;

    Ok(Some(Match {
        id,
        title,
        starts_at,
        commission,
        status,
        format,
        venue,
        local: load_roster(conn, id, Team::Local, local_cap)?,
        visitante: load_roster(conn, id, Team::Visitante, visitante_cap)?,
        comment_count: comment_count(conn, CommentParent::Match(id))?,
        reactions: reactions.counts,
        my_reactions: reactions.held_by_user,
    }))
}

fn load_roster(
    conn: &Connection,
    match_id: i64,
    team: Team,
    capacity: u32,
) -> rusqlite::Result<TeamRoster> {
    let mut stmt = conn.prepare_cached(
        "SELECT u.id, u.name, u.avatar, p.position FROM match_players p
         JOIN users u ON u.id = p.user_id
         WHERE p.match_id = ?1 AND p.team = ?2
         ORDER BY p.joined_at ASC, u.id ASC",
    )?;
    let players = stmt
        .query_map(params![match_id, team.as_str()], |row| {
            Ok(RosterPlayer {
                user_id: row.get(0)?,
                name: row.get(1)?,
                avatar: row.get(2)?,
                position: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let places_left = capacity.saturating_sub(players.len() as u32);
    Ok(TeamRoster {
        team,
        puestos_disponibles: capacity,
        places_left,
        players,
    })
}
