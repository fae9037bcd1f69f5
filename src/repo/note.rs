use rusqlite::Connection;
use crate::models::LeadNote;
use anyhow::{Context, Result};

/// Lead activity notes (stage change history)
pub struct NoteRepo;

impl NoteRepo {
    pub fn create(
        conn: &Connection,
        lead_id: i64,
        note: &str,
        from_stage: Option<&str>,
        to_stage: Option<&str>,
    ) -> Result<LeadNote> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO lead_notes (lead_id, note, from_stage, to_stage, created_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![lead_id, note, from_stage, to_stage, now],
        )
        .with_context(|| format!("Failed to record note for lead {}", lead_id))?;

        Ok(LeadNote {
            id: conn.last_insert_rowid(),
            lead_id,
            note: note.to_string(),
            from_stage: from_stage.map(str::to_string),
            to_stage: to_stage.map(str::to_string),
            created_ts: now,
        })
    }

    /// Notes for a lead, oldest first
    pub fn list_for_lead(conn: &Connection, lead_id: i64) -> Result<Vec<LeadNote>> {
        let mut stmt = conn.prepare(
            "SELECT id, lead_id, note, from_stage, to_stage, created_ts
             FROM lead_notes WHERE lead_id = ?1 ORDER BY created_ts, id",
        )?;
        let rows = stmt.query_map([lead_id], |row| {
            Ok(LeadNote {
                id: row.get(0)?,
                lead_id: row.get(1)?,
                note: row.get(2)?,
                from_stage: row.get(3)?,
                to_stage: row.get(4)?,
                created_ts: row.get(5)?,
            })
        })?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?);
        }
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::repo::LeadRepo;

    #[test]
    fn test_notes_are_removed_with_lead() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let lead = LeadRepo::create(&conn, "Alan Turing", "new", None, None, None).unwrap();
        NoteRepo::create(&conn, lead.id, "Moved from New to Contacted", Some("new"), Some("contacted")).unwrap();
        assert_eq!(NoteRepo::list_for_lead(&conn, lead.id).unwrap().len(), 1);

        LeadRepo::delete(&conn, lead.id).unwrap();
        assert!(NoteRepo::list_for_lead(&conn, lead.id).unwrap().is_empty());
    }
}
