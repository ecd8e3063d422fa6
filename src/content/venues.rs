use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;

use crate::auth::identity::authorize;
use crate::content::{clean_text, ContentError};
use crate::db::models::Venue;
use crate::domain::Role;
use crate::extractors::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct NewVenue {
    pub name: String,
    pub address: String,
}

pub(crate) fn venue_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        address: row.get(offset + 2)?,
        owner_id: row.get(offset + 3)?,
    })
}

/// Admins and venue admins may register venues; the creator owns it.
pub fn create_venue(
    conn: &Connection,
    owner: &CurrentUser,
    new: &NewVenue,
) -> Result<Venue, ContentError> {
    if !authorize(owner, &[Role::Admin, Role::VenueAdmin]) {
        return Err(ContentError::Forbidden);
    }
    let name = clean_text(&new.name, "Venue name", 120)?;
    let address = clean_text(&new.address, "Venue address", 240)?;

    conn.execute(
        "INSERT INTO venues (name, address, owner_id) VALUES (?1, ?2, ?3)",
        params![name, address, owner.id],
    )?;

    Ok(Venue {
        id: conn.last_insert_rowid(),
        name,
        address,
        owner_id: owner.id,
    })
}

pub fn find_venue(conn: &Connection, id: i64) -> rusqlite::Result<Option<Venue>> {
    conn.query_row(
        "SELECT id, name, address, owner_id FROM venues WHERE id = ?1",
        params![id],
        |row| venue_from_row(row, 0),
    )
    .optional()
}

pub fn list_venues(conn: &Connection, owner_id: Option<i64>) -> rusqlite::Result<Vec<Venue>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, address, owner_id FROM venues
         WHERE ?1 IS NULL OR owner_id = ?1
         ORDER BY name ASC",
    )?;
    let venues = stmt
        .query_map(params![owner_id], |row| venue_from_row(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(venues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;

    fn venue() -> NewVenue {
        NewVenue {
            name: "Cancha Norte".into(),
            address: "Calle 1".into(),
        }
    }

    #[test]
    fn venue_admin_creates_and_owns_venue() {
        let conn = test_support::conn();
        let owner = test_support::user(&conn, "Recinto", Role::VenueAdmin);

        let created = create_venue(&conn, &owner, &venue()).unwrap();
        assert_eq!(created.owner_id, owner.id);
        assert_eq!(find_venue(&conn, created.id).unwrap().unwrap().name, "Cancha Norte");
        assert_eq!(list_venues(&conn, Some(owner.id)).unwrap().len(), 1);
        assert_eq!(list_venues(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn players_cannot_create_venues() {
        let conn = test_support::conn();
        let player = test_support::user(&conn, "Ana", Role::Player);
        assert!(matches!(
            create_venue(&conn, &player, &venue()),
            Err(ContentError::Forbidden)
        ));
    }
}
