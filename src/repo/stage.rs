use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::{slugify, Stage, StagePosition};
use anyhow::{Context, Result};

const STAGE_COLUMNS: &str = "id, title, position, stage_id, is_default";

/// Stage repository for database operations
///
/// Stages are the pipeline columns. `stage_id` is assigned once at creation
/// and never rewritten; reorders only touch `position`.
pub struct StageRepo;

impl StageRepo {
    fn from_row(row: &Row) -> rusqlite::Result<Stage> {
        Ok(Stage {
            id: row.get(0)?,
            title: row.get(1)?,
            position: row.get(2)?,
            stage_id: row.get(3)?,
            is_default: row.get::<_, i64>(4)? != 0,
        })
    }

    /// List all stages ordered by position
    pub fn list_all(conn: &Connection) -> Result<Vec<Stage>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stages ORDER BY position, id",
            STAGE_COLUMNS
        ))?;
        let rows = stmt.query_map([], Self::from_row)?;

        let mut stages = Vec::new();
        for row in rows {
            stages.push(row?);
        }
        Ok(stages)
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Stage>> {
        let stage = conn
            .query_row(
                &format!("SELECT {} FROM stages WHERE id = ?1", STAGE_COLUMNS),
                [id],
                Self::from_row,
            )
            .optional()?;
        Ok(stage)
    }

    pub fn get_by_key(conn: &Connection, stage_id: &str) -> Result<Option<Stage>> {
        let stage = conn
            .query_row(
                &format!("SELECT {} FROM stages WHERE stage_id = ?1", STAGE_COLUMNS),
                [stage_id],
                Self::from_row,
            )
            .optional()?;
        Ok(stage)
    }

    pub fn get_default(conn: &Connection) -> Result<Option<Stage>> {
        let stage = conn
            .query_row(
                &format!("SELECT {} FROM stages WHERE is_default = 1 LIMIT 1", STAGE_COLUMNS),
                [],
                Self::from_row,
            )
            .optional()?;
        Ok(stage)
    }

    /// Pick an unused stage key for a title
    fn unique_key(conn: &Connection, title: &str) -> Result<String> {
        let base = match slugify(title) {
            s if s.is_empty() => "stage".to_string(),
            s => s,
        };
        if Self::get_by_key(conn, &base)?.is_none() {
            return Ok(base);
        }
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Ok(format!("{}-{}", base, &suffix[..6]))
    }

    /// Create a stage at the end of the ordering
    pub fn create(conn: &Connection, title: &str, is_default: bool) -> Result<Stage> {
        let stage_id = Self::unique_key(conn, title)?;
        let position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM stages",
            [],
            |row| row.get(0),
        )?;
        let now = chrono::Utc::now().timestamp();

        let tx = conn.unchecked_transaction()?;
        if is_default {
            tx.execute("UPDATE stages SET is_default = 0 WHERE is_default = 1", [])?;
        }
        tx.execute(
            "INSERT INTO stages (stage_id, title, position, is_default, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            rusqlite::params![stage_id, title, position, is_default as i64, now],
        )
        .with_context(|| format!("Failed to create stage: {}", title))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Stage {
            id,
            title: title.to_string(),
            position,
            stage_id,
            is_default,
        })
    }

    /// Apply a title change and/or default promotion in one transaction.
    /// Promoting a stage clears the default flag on every other stage.
    pub fn update(conn: &Connection, id: i64, title: Option<&str>, make_default: bool) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let tx = conn.unchecked_transaction()?;
        if let Some(title) = title {
            let updated = tx
                .execute(
                    "UPDATE stages SET title = ?1, modified_ts = ?2 WHERE id = ?3",
                    rusqlite::params![title, now, id],
                )
                .with_context(|| format!("Failed to rename stage id={}", id))?;
            if updated == 0 {
                anyhow::bail!("No stage found with id={}", id);
            }
        }
        if make_default {
            tx.execute("UPDATE stages SET is_default = 0 WHERE is_default = 1", [])?;
            let updated = tx.execute(
                "UPDATE stages SET is_default = 1, modified_ts = ?1 WHERE id = ?2",
                rusqlite::params![now, id],
            )?;
            if updated == 0 {
                anyhow::bail!("No stage found with id={}", id);
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Write every `{id, position}` pair atomically.
    /// Fails without changes if any id is unknown.
    pub fn update_positions(conn: &Connection, positions: &[StagePosition]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let tx = conn.unchecked_transaction()?;
        for entry in positions {
            let updated = tx.execute(
                "UPDATE stages SET position = ?1, modified_ts = ?2 WHERE id = ?3",
                rusqlite::params![entry.position, now, entry.id],
            )?;
            if updated == 0 {
                // Dropping the transaction rolls back earlier rows
                anyhow::bail!("No stage found with id={}", entry.id);
            }
        }
        tx.commit().context("Failed to commit stage positions")?;
        Ok(())
    }

    /// Delete a stage and close the gap it leaves in the ordering
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM stages WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete stage id={}", id))?;
        if deleted == 0 {
            anyhow::bail!("No stage found with id={}", id);
        }

        let remaining: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM stages ORDER BY position, id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };
        for (position, id) in remaining.iter().enumerate() {
            tx.execute(
                "UPDATE stages SET position = ?1 WHERE id = ?2",
                rusqlite::params![position as i64, id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
