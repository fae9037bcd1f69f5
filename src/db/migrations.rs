use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys=ON", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version = Self::get_version(conn).unwrap_or(0);

        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            log::debug!("Applied schema migration v{}", version);
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> {
    let mut migrations: HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: stages, leads, lead notes
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE TABLE stages (
            id INTEGER PRIMARY KEY,
            stage_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            position INTEGER NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;
    // Note: position is not UNIQUE at the SQL level. Bulk reorders write
    // every row inside one transaction and the API validates density.

    tx.execute(
        "CREATE TABLE leads (
            id INTEGER PRIMARY KEY,
            stage TEXT NOT NULL REFERENCES stages(stage_id),
            status TEXT NOT NULL CHECK(status IN ('active','converted','lost')),
            full_name TEXT NOT NULL,
            email TEXT NULL,
            phone TEXT NULL,
            source TEXT NULL,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_leads_stage ON leads(stage)", [])?;

    tx.execute(
        "CREATE TABLE lead_notes (
            id INTEGER PRIMARY KEY,
            lead_id INTEGER NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
            note TEXT NOT NULL,
            from_stage TEXT NULL,
            to_stage TEXT NULL,
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_lead_notes_lead_id ON lead_notes(lead_id)", [])?;

    Ok(())
}

/// Migration v2: seed the default pipeline
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    let now = chrono::Utc::now().timestamp();
    let seed: [(&str, &str, bool); 4] = [
        ("new", "New", true),
        ("contacted", "Contacted", false),
        ("qualified", "Qualified", false),
        ("converted", "Converted", false),
    ];

    for (position, (stage_id, title, is_default)) in seed.iter().enumerate() {
        tx.execute(
            "INSERT INTO stages (stage_id, title, position, is_default, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            rusqlite::params![stage_id, title, position as i64, *is_default as i64, now],
        )?;
    }

    Ok(())
}
