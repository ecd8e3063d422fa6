//! Role-dependent landing data for the signed-in user.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::Connection;
use serde::Serialize;

use crate::content::{matches, venues};
use crate::db::models::{BalanceSnapshot, Invitation, Match, Venue};
use crate::domain::{MatchStatus, Role};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::ledger::credits;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PlatformTotals {
    pub users: i64,
    pub matches: i64,
    pub posts: i64,
    pub matches_by_status: BTreeMap<&'static str, i64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    Admin {
        totals: PlatformTotals,
    },
    AdminRecinto {
        venues: Vec<Venue>,
        matches: Vec<Match>,
    },
    Jugador {
        matches: Vec<Match>,
        invitations: Vec<Invitation>,
        credits: BalanceSnapshot,
    },
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<DashboardView>> {
    let conn = state.db.get()?;

    let view = match user.role {
        Role::Admin => DashboardView::Admin {
            totals: platform_totals(&conn)?,
        },
        Role::VenueAdmin => DashboardView::AdminRecinto {
            venues: venues::list_venues(&conn, Some(user.id))?,
            matches: matches::matches_for_owner(&conn, user.id)?,
        },
        Role::Player => DashboardView::Jugador {
            matches: matches::matches_for_player(&conn, user.id)?,
            invitations: matches::list_invitations(&conn, user.id)?,
            credits: credits::balance(&conn, user.id)?,
        },
    };

    Ok(Json(view))
}

fn platform_totals(conn: &Connection) -> rusqlite::Result<PlatformTotals> {
    let (users, matches, posts) = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM matches),
                (SELECT COUNT(*) FROM posts)",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;

    let mut matches_by_status = BTreeMap::new();
    for status in MatchStatus::ALL {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM matches WHERE status = ?1",
            [status.as_str()],
            |r| r.get(0),
        )?;
        matches_by_status.insert(status.as_str(), count);
    }

    Ok(PlatformTotals {
        users,
        matches,
        posts,
        matches_by_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;

    #[test]
    fn totals_cover_every_status() {
        let conn = test_support::conn();
        test_support::user(&conn, "Root", Role::Admin);

        let totals = platform_totals(&conn).unwrap();
        assert_eq!(totals.users, 1);
        assert_eq!(totals.matches, 0);
        assert_eq!(totals.matches_by_status.len(), MatchStatus::ALL.len());
        assert!(totals.matches_by_status.values().all(|&n| n == 0));
    }

    #[test]
    fn view_is_tagged_by_role() {
        let view = DashboardView::AdminRecinto {
            venues: vec![],
            matches: vec![],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["view"], "admin_recinto");
    }
}
