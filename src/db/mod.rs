//! SQLite database layer for hunchworks
//!
//! Schema creation and the lookup tables live here; entity operations are
//! split across the submodules, all as methods on [`Database`].

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

use crate::config::HunchworksPaths;
use crate::models::{Named, Skill};

mod accounts;
mod groups;
mod hunches;
mod social;

pub use groups::GroupPage;

/// Storage failures that callers branch on
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("No user profile with id {0}")]
    UnknownProfile(i64),
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

/// Tables in creation order
const SCHEMA: &[(&str, &str)] = &[
    (
        "accounts",
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            username     TEXT NOT NULL UNIQUE,
            email        TEXT NOT NULL DEFAULT '',
            date_joined  TEXT NOT NULL
        )
        "#,
    ),
    (
        "languages",
        "CREATE TABLE IF NOT EXISTS languages (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE)",
    ),
    (
        "locations",
        "CREATE TABLE IF NOT EXISTS locations (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE)",
    ),
    (
        "tags",
        "CREATE TABLE IF NOT EXISTS tags (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
    ),
    (
        "skills",
        r#"
        CREATE TABLE IF NOT EXISTS skills (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            name          TEXT NOT NULL UNIQUE,
            is_language   INTEGER NOT NULL DEFAULT 0,
            is_technical  INTEGER NOT NULL DEFAULT 0
        )
        "#,
    ),
    (
        "invitations",
        r#"
        CREATE TABLE IF NOT EXISTS invitations (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            email       TEXT NOT NULL,
            invited_by  INTEGER NOT NULL,
            hunch_id    INTEGER,
            FOREIGN KEY (invited_by) REFERENCES user_profiles(account_id),
            FOREIGN KEY (hunch_id) REFERENCES hunches(id) ON DELETE SET NULL
        )
        "#,
    ),
    (
        "user_profiles",
        r#"
        CREATE TABLE IF NOT EXISTS user_profiles (
            account_id             INTEGER PRIMARY KEY,
            title                  INTEGER NOT NULL DEFAULT 0,
            show_profile_reminder  INTEGER NOT NULL DEFAULT 0,
            privacy                INTEGER NOT NULL DEFAULT 0,
            bio_text               TEXT NOT NULL DEFAULT '',
            phone                  TEXT NOT NULL DEFAULT '',
            skype_name             TEXT NOT NULL DEFAULT '',
            website                TEXT NOT NULL DEFAULT '',
            screen_name            TEXT NOT NULL DEFAULT '',
            messenger_service      INTEGER DEFAULT 0,
            default_language_id    INTEGER,
            invitation_id          INTEGER UNIQUE,
            FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE,
            FOREIGN KEY (default_language_id) REFERENCES languages(id),
            FOREIGN KEY (invitation_id) REFERENCES invitations(id)
        )
        "#,
    ),
    (
        "profile_skills",
        r#"
        CREATE TABLE IF NOT EXISTS profile_skills (
            user_profile_id  INTEGER NOT NULL,
            skill_id         INTEGER NOT NULL,
            PRIMARY KEY (user_profile_id, skill_id),
            FOREIGN KEY (user_profile_id) REFERENCES user_profiles(account_id) ON DELETE CASCADE,
            FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "connections",
        r#"
        CREATE TABLE IF NOT EXISTS connections (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            user_profile_id        INTEGER NOT NULL,
            other_user_profile_id  INTEGER NOT NULL,
            status                 INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (user_profile_id) REFERENCES user_profiles(account_id) ON DELETE CASCADE,
            FOREIGN KEY (other_user_profile_id) REFERENCES user_profiles(account_id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "hunches",
        r#"
        CREATE TABLE IF NOT EXISTS hunches (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            creator_id     INTEGER NOT NULL,
            time_created   TEXT NOT NULL,
            time_modified  TEXT NOT NULL,
            status         INTEGER NOT NULL DEFAULT 2,
            title          TEXT NOT NULL,
            privacy        INTEGER NOT NULL DEFAULT 0,
            language_id    INTEGER NOT NULL,
            location_id    INTEGER,
            description    TEXT NOT NULL,
            FOREIGN KEY (creator_id) REFERENCES user_profiles(account_id),
            FOREIGN KEY (language_id) REFERENCES languages(id),
            FOREIGN KEY (location_id) REFERENCES locations(id)
        )
        "#,
    ),
    (
        "hunch_tags",
        r#"
        CREATE TABLE IF NOT EXISTS hunch_tags (
            hunch_id  INTEGER NOT NULL,
            tag_id    INTEGER NOT NULL,
            PRIMARY KEY (hunch_id, tag_id),
            FOREIGN KEY (hunch_id) REFERENCES hunches(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "hunch_skills",
        r#"
        CREATE TABLE IF NOT EXISTS hunch_skills (
            hunch_id  INTEGER NOT NULL,
            skill_id  INTEGER NOT NULL,
            PRIMARY KEY (hunch_id, skill_id),
            FOREIGN KEY (hunch_id) REFERENCES hunches(id) ON DELETE CASCADE,
            FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "hunch_users",
        r#"
        CREATE TABLE IF NOT EXISTS hunch_users (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            hunch_id         INTEGER NOT NULL,
            user_profile_id  INTEGER NOT NULL,
            status           INTEGER NOT NULL,
            FOREIGN KEY (hunch_id) REFERENCES hunches(id) ON DELETE CASCADE,
            FOREIGN KEY (user_profile_id) REFERENCES user_profiles(account_id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "evidence",
        r#"
        CREATE TABLE IF NOT EXISTS evidence (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            strength       INTEGER NOT NULL DEFAULT 0,
            time_created   TEXT NOT NULL,
            time_modified  TEXT NOT NULL,
            description    TEXT NOT NULL DEFAULT '',
            hunch_id       INTEGER NOT NULL,
            creator_id     INTEGER NOT NULL,
            FOREIGN KEY (hunch_id) REFERENCES hunches(id) ON DELETE CASCADE,
            FOREIGN KEY (creator_id) REFERENCES user_profiles(account_id)
        )
        "#,
    ),
    (
        "evidence_tags",
        r#"
        CREATE TABLE IF NOT EXISTS evidence_tags (
            evidence_id  INTEGER NOT NULL,
            tag_id       INTEGER NOT NULL,
            PRIMARY KEY (evidence_id, tag_id),
            FOREIGN KEY (evidence_id) REFERENCES evidence(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "groups",
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            name          TEXT NOT NULL UNIQUE,
            abbreviation  TEXT,
            group_type    INTEGER NOT NULL DEFAULT 0,
            privacy       INTEGER NOT NULL DEFAULT 0,
            location_id   INTEGER,
            FOREIGN KEY (location_id) REFERENCES locations(id)
        )
        "#,
    ),
    (
        "user_profile_groups",
        r#"
        CREATE TABLE IF NOT EXISTS user_profile_groups (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_profile_id  INTEGER NOT NULL,
            group_id         INTEGER NOT NULL,
            access_level     INTEGER NOT NULL,
            status           INTEGER NOT NULL,
            FOREIGN KEY (user_profile_id) REFERENCES user_profiles(account_id) ON DELETE CASCADE,
            FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "user_invites",
        r#"
        CREATE TABLE IF NOT EXISTS user_invites (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            invitation_id  INTEGER NOT NULL,
            account_id     INTEGER NOT NULL,
            status         INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (invitation_id) REFERENCES invitations(id) ON DELETE CASCADE,
            FOREIGN KEY (account_id) REFERENCES accounts(id)
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_hunches_creator ON hunches(creator_id)",
    "CREATE INDEX IF NOT EXISTS idx_hunch_users_hunch ON hunch_users(hunch_id)",
    "CREATE INDEX IF NOT EXISTS idx_evidence_hunch ON evidence(hunch_id)",
    "CREATE INDEX IF NOT EXISTS idx_memberships_group ON user_profile_groups(group_id)",
    "CREATE INDEX IF NOT EXISTS idx_connections_from ON connections(user_profile_id)",
];

/// Language every fresh database starts with, so hunches have a default
pub const DEFAULT_LANGUAGE: &str = "English";

impl Database {
    /// Open an existing database
    pub fn open(paths: &HunchworksPaths) -> Result<Self> {
        Self::open_file(&paths.db_file)
    }

    /// Initialize a new database with schema
    pub fn init(paths: &HunchworksPaths) -> Result<Self> {
        Self::init_file(&paths.db_file)
    }

    pub fn open_file(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open hunchworks database")?;
        Self::configure(conn)
    }

    pub fn init_file(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to create hunchworks database")?;
        let db = Self::configure(conn)?;
        db.create_schema()?;
        Ok(db)
    }

    /// Fresh in-memory database with schema
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let db = Self::configure(conn)?;
        db.create_schema()?;
        Ok(db)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)
            .context("Failed to enable foreign keys")?;
        Ok(Self { conn })
    }

    fn create_schema(&self) -> Result<()> {
        for (table, sql) in SCHEMA {
            self.conn
                .execute(sql, [])
                .with_context(|| format!("Failed to create {} table", table))?;
        }
        for sql in INDEXES {
            self.conn.execute(sql, [])?;
        }
        self.ensure_language(DEFAULT_LANGUAGE)?;
        debug!("schema ready");
        Ok(())
    }

    /// Get or create a language by name
    pub fn ensure_language(&self, name: &str) -> Result<Named> {
        ensure_named(&self.conn, "languages", name)
    }

    /// Get or create a location by name
    pub fn ensure_location(&self, name: &str) -> Result<Named> {
        ensure_named(&self.conn, "locations", name)
    }

    /// Get or create a tag by name. Tag names are not unique in storage, so
    /// this returns the oldest tag with the name.
    pub fn ensure_tag(&self, name: &str) -> Result<Named> {
        ensure_named(&self.conn, "tags", name)
    }

    pub fn language_exists(&self, id: i64) -> Result<bool> {
        row_exists(&self.conn, "languages", id)
    }

    pub fn location_exists(&self, id: i64) -> Result<bool> {
        row_exists(&self.conn, "locations", id)
    }

    pub fn tag_exists(&self, id: i64) -> Result<bool> {
        row_exists(&self.conn, "tags", id)
    }

    pub fn skill_exists(&self, id: i64) -> Result<bool> {
        row_exists(&self.conn, "skills", id)
    }

    pub fn list_languages(&self) -> Result<Vec<Named>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM languages ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Named {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut languages = Vec::new();
        for row in rows {
            languages.push(row?);
        }
        Ok(languages)
    }

    /// Get or create a skill by name
    pub fn ensure_skill(&self, name: &str, is_language: bool, is_technical: bool) -> Result<Skill> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO skills (name, is_language, is_technical) VALUES (?1, ?2, ?3)",
                params![name, is_language, is_technical],
            )
            .context("Failed to insert skill")?;

        self.conn
            .query_row(
                "SELECT id, name, is_language, is_technical FROM skills WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Skill {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        is_language: row.get(2)?,
                        is_technical: row.get(3)?,
                    })
                },
            )
            .context("Failed to load skill")
    }
}

fn ensure_named(conn: &Connection, table: &str, name: &str) -> Result<Named> {
    let existing = conn.query_row(
        &format!("SELECT id, name FROM {} WHERE name = ?1 ORDER BY id LIMIT 1", table),
        params![name],
        |row| {
            Ok(Named {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    );

    match existing {
        Ok(named) => Ok(named),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            conn.execute(
                &format!("INSERT INTO {} (name) VALUES (?1)", table),
                params![name],
            )
            .with_context(|| format!("Failed to insert into {}", table))?;
            Ok(Named {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn row_exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", table),
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Decode an integer-coded enum column, falling back to the default for
/// codes this build does not know
pub(crate) fn decode<T: Default>(code: i64, from_code: fn(i64) -> Option<T>) -> T {
    from_code(code).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_seeds_default_language() {
        let db = Database::in_memory().unwrap();
        let languages = db.list_languages().unwrap();
        assert_eq!(languages.len(), 1);
        assert_eq!(languages[0].name, DEFAULT_LANGUAGE);
    }

    #[test]
    fn ensure_named_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let first = db.ensure_location("Nairobi").unwrap();
        let second = db.ensure_location("Nairobi").unwrap();
        assert_eq!(first, second);
        assert!(db.location_exists(first.id).unwrap());
        assert!(!db.location_exists(first.id + 1).unwrap());
    }

    #[test]
    fn ensure_skill_keeps_first_flags() {
        let db = Database::in_memory().unwrap();
        let swahili = db.ensure_skill("Swahili", true, false).unwrap();
        let again = db.ensure_skill("Swahili", false, true).unwrap();
        assert_eq!(swahili, again);
        assert!(again.is_language);
    }
}
