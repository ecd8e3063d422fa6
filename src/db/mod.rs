pub mod models;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, ErrorCode, Row};
use std::path::Path;
use std::str::FromStr;

use crate::domain::ParseEnumError;
use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_identity",
        include_str!("../../migrations/001_identity.sql"),
    ),
    (
        "002_matches",
        include_str!("../../migrations/002_matches.sql"),
    ),
    (
        "003_content",
        include_str!("../../migrations/003_content.sql"),
    ),
    (
        "004_credits",
        include_str!("../../migrations/004_credits.sql"),
    ),
];

pub const DEMO_PASSWORD: &str = "123456";

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )
    });
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;
    apply_migrations(&conn)?;
    tracing::info!("Database migrations complete");
    Ok(())
}

/// Apply every migration not yet recorded in `schema_version`.
pub fn apply_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    Ok(())
}

/// Insert the demo accounts, one venue and one open match.
/// Existing rows are left alone, so this is safe on every start.
pub fn seed_demo(pool: &DbPool, bcrypt_cost: u32) -> anyhow::Result<()> {
    let conn = pool.get()?;
    let hash = bcrypt::hash(DEMO_PASSWORD, bcrypt_cost)?;

    for (name, email, role) in [
        ("Administrador", "admin@joinfutbol.com", "admin"),
        ("Recinto Central", "recinto@joinfutbol.com", "admin_recinto"),
        ("Jugador Demo", "jugador@joinfutbol.com", "jugador"),
    ] {
        conn.execute(
            "INSERT OR IGNORE INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, hash, role],
        )?;
    }

    let venues: i64 = conn.query_row("SELECT COUNT(*) FROM venues", [], |r| r.get(0))?;
    if venues == 0 {
        let owner_id: i64 = conn.query_row(
            "SELECT id FROM users WHERE email = 'recinto@joinfutbol.com'",
            [],
            |r| r.get(0),
        )?;
        conn.execute(
            "INSERT INTO venues (name, address, owner_id) VALUES ('Cancha Central', 'Av. Principal 123', ?1)",
            params![owner_id],
        )?;
        let venue_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO matches (title, venue_id, starts_at, commission, format, local_capacity, visitante_capacity, created_by)
             VALUES ('Partido amistoso', ?1, datetime('now', '+3 days'), 2500, '7v7', 7, 7, ?2)",
            params![venue_id, owner_id],
        )?;
        tracing::info!("Seeded demo venue and match");
    }

    Ok(())
}

/// Read a TEXT column into one of the closed domain enums.
pub fn text_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}


#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool() -> DbPool {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        let conn = pool.get().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        pool
    }

    #[test]
    fn create_pool_creates_db_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("sub/dir/test.db");
        let pool = create_pool(&db_path).unwrap();
        assert!(db_path.exists());
        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn migrations_run_successfully() {
        let pool = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };
        for table in [
            "users",
            "sessions",
            "friendships",
            "venues",
            "matches",
            "match_players",
            "match_invitations",
            "posts",
            "comments",
            "reactions",
            "credit_transactions",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let pool = test_pool();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn seed_demo_is_repeatable() {
        let pool = test_pool();
        run_migrations(&pool).unwrap();
        seed_demo(&pool, 4).unwrap();
        seed_demo(&pool, 4).unwrap();

        let conn = pool.get().unwrap();
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap();
        let matches: i64 = conn
            .query_row("SELECT COUNT(*) FROM matches", [], |r| r.get(0))
            .unwrap();
        assert_eq!(users, 3);
        assert_eq!(matches, 1);
    }

    #[test]
    fn duplicate_email_is_a_constraint_violation() {
        let conn = test_support::conn();
        let insert = |conn: &Connection| {
            conn.execute(
                "INSERT INTO users (name, email, password_hash, role) VALUES ('a', 'a@x.com', 'h', 'jugador')",
                [],
            )
        };
        insert(&conn).unwrap();
        let err = insert(&conn).unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn foreign_keys_enforced() {
        let conn = test_support::conn();
        let result = conn.execute(
            "INSERT INTO posts (user_id, body) VALUES (?1, ?2)",
            params![999, "hello"],
        );
        assert!(result.is_err());
    }
}
