use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::{Lead, LeadStatus};
use anyhow::{Context, Result};

const LEAD_COLUMNS: &str =
    "id, stage, status, full_name, email, phone, source, created_ts, modified_ts";

/// Lead repository for database operations
pub struct LeadRepo;

impl LeadRepo {
    fn from_row(row: &Row) -> rusqlite::Result<Lead> {
        let status_str: String = row.get(2)?;
        let status = LeadStatus::from_str(&status_str).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(2, "status".to_string(), rusqlite::types::Type::Text)
        })?;
        Ok(Lead {
            id: row.get(0)?,
            stage: row.get(1)?,
            status,
            full_name: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            source: row.get(6)?,
            created_ts: row.get(7)?,
            modified_ts: row.get(8)?,
        })
    }

    /// Create a lead in the given stage
    pub fn create(
        conn: &Connection,
        full_name: &str,
        stage: &str,
        email: Option<&str>,
        phone: Option<&str>,
        source: Option<&str>,
    ) -> Result<Lead> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO leads (stage, status, full_name, email, phone, source, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            rusqlite::params![stage, LeadStatus::Active.as_str(), full_name, email, phone, source, now],
        )
        .with_context(|| format!("Failed to create lead: {}", full_name))?;

        Ok(Lead {
            id: conn.last_insert_rowid(),
            stage: stage.to_string(),
            status: LeadStatus::Active,
            full_name: full_name.to_string(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            source: source.map(str::to_string),
            created_ts: now,
            modified_ts: now,
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Lead>> {
        let lead = conn
            .query_row(
                &format!("SELECT {} FROM leads WHERE id = ?1", LEAD_COLUMNS),
                [id],
                Self::from_row,
            )
            .optional()?;
        Ok(lead)
    }

    /// List all leads ordered by id
    pub fn list_all(conn: &Connection) -> Result<Vec<Lead>> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM leads ORDER BY id", LEAD_COLUMNS))?;
        let rows = stmt.query_map([], Self::from_row)?;

        let mut leads = Vec::new();
        for row in rows {
            leads.push(row?);
        }
        Ok(leads)
    }

    pub fn count_in_stage(conn: &Connection, stage: &str) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM leads WHERE stage = ?1",
            [stage],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Move a lead to another stage
    pub fn set_stage(conn: &Connection, id: i64, stage: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let updated = conn
            .execute(
                "UPDATE leads SET stage = ?1, modified_ts = ?2 WHERE id = ?3",
                rusqlite::params![stage, now, id],
            )
            .with_context(|| format!("Failed to move lead {} to stage {}", id, stage))?;
        if updated == 0 {
            anyhow::bail!("Lead {} not found", id);
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        let deleted = conn
            .execute("DELETE FROM leads WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete lead {}", id))?;
        if deleted == 0 {
            anyhow::bail!("Lead {} not found", id);
        }
        Ok(())
    }
}
