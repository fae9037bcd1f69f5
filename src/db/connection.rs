use rusqlite::Connection;
use std::path::PathBuf;
use anyhow::{Context, Result};
use crate::config::RcConfig;
use crate::db::migrations::MigrationManager;

/// Database connection manager
pub struct DbConnection;

impl DbConnection {
    /// Get the default database path
    pub fn default_path() -> Result<PathBuf> {
        Ok(RcConfig::home_dir()?.join("crm.db"))
    }

    /// Get database path from configuration file or default
    pub fn resolve_path() -> Result<PathBuf> {
        match RcConfig::load()?.data_location {
            Some(path) => Ok(path),
            None => Self::default_path(),
        }
    }

    /// Connect to the database, creating it and parent directories if needed
    pub fn connect() -> Result<Connection> {
        let db_path = Self::resolve_path()?;
        Self::connect_at(&db_path)
    }

    /// Connect to a database file at an explicit path
    pub fn connect_at(db_path: &std::path::Path) -> Result<Connection> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        log::debug!("Opened database at {}", db_path.display());
        Ok(conn)
    }

    /// Connect to an in-memory database (for testing)
    pub fn connect_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }
}
