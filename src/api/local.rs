use rusqlite::Connection;
use crate::api::{ApiError, CrmApi, PERMISSION_DENIED_MESSAGE};
use crate::models::{Lead, LeadNote, NewLead, NewStage, Stage, StagePosition, StageUpdate};
use crate::repo::{LeadRepo, NoteRepo, StageRepo};
use std::collections::HashSet;

/// `CrmApi` backed by the local SQLite database
///
/// Applies the same validation a remote backend would: unknown stages are
/// rejected, bulk reorders must produce a dense ordering, and the default
/// stage or a stage that still holds leads cannot be deleted.
pub struct LocalApi {
    conn: Connection,
    read_only: bool,
}

impl LocalApi {
    pub fn new(conn: Connection) -> Self {
        Self { conn, read_only: false }
    }

    /// Reject every mutation with the permission message
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Direct access for assertions and tooling
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn check_writable(&self) -> Result<(), ApiError> {
        if self.read_only {
            return Err(ApiError::from_server_message(PERMISSION_DENIED_MESSAGE));
        }
        Ok(())
    }

    fn require_stage(&self, id: i64) -> Result<Stage, ApiError> {
        StageRepo::get_by_id(&self.conn, id)
            .map_err(ApiError::Storage)?
            .ok_or(ApiError::NotFound { resource: "Stage", id: id.to_string() })
    }

    fn require_lead(&self, id: i64) -> Result<Lead, ApiError> {
        LeadRepo::get_by_id(&self.conn, id)
            .map_err(ApiError::Storage)?
            .ok_or(ApiError::NotFound { resource: "Lead", id: id.to_string() })
    }
}

impl CrmApi for LocalApi {
    fn list_leads(&mut self) -> Result<Vec<Lead>, ApiError> {
        LeadRepo::list_all(&self.conn).map_err(ApiError::Storage)
    }

    fn list_stages(&mut self) -> Result<Vec<Stage>, ApiError> {
        StageRepo::list_all(&self.conn).map_err(ApiError::Storage)
    }

    fn update_lead_stage(&mut self, id: i64, stage: &str, note: Option<&str>) -> Result<Lead, ApiError> {
        self.check_writable()?;
        let lead = self.require_lead(id)?;
        if StageRepo::get_by_key(&self.conn, stage).map_err(ApiError::Storage)?.is_none() {
            return Err(ApiError::rejected(format!("Stage '{}' does not exist", stage)));
        }

        let tx = self.conn.unchecked_transaction().map_err(|e| ApiError::Storage(e.into()))?;
        LeadRepo::set_stage(&tx, id, stage).map_err(ApiError::Storage)?;
        if let Some(note) = note {
            NoteRepo::create(&tx, id, note, Some(&lead.stage), Some(stage)).map_err(ApiError::Storage)?;
        }
        tx.commit().map_err(|e| ApiError::Storage(e.into()))?;

        log::debug!("Lead {} stage {} -> {}", id, lead.stage, stage);
        self.require_lead(id)
    }

    fn update_stage_positions(&mut self, positions: &[StagePosition]) -> Result<(), ApiError> {
        self.check_writable()?;

        let stages = StageRepo::list_all(&self.conn).map_err(ApiError::Storage)?;
        let known: HashSet<i64> = stages.iter().map(|s| s.id).collect();
        let submitted: HashSet<i64> = positions.iter().map(|p| p.id).collect();
        if submitted != known || submitted.len() != positions.len() {
            return Err(ApiError::rejected("Stage positions must cover every stage exactly once"));
        }
        let mut values: Vec<i64> = positions.iter().map(|p| p.position).collect();
        values.sort_unstable();
        if values.iter().enumerate().any(|(i, p)| *p != i as i64) {
            return Err(ApiError::rejected("Stage positions must be 0..N-1 without gaps"));
        }

        StageRepo::update_positions(&self.conn, positions).map_err(ApiError::Storage)
    }

    fn create_stage(&mut self, stage: &NewStage) -> Result<Stage, ApiError> {
        self.check_writable()?;
        let title = stage.title.trim();
        if title.is_empty() {
            return Err(ApiError::rejected("Stage title cannot be empty"));
        }
        StageRepo::create(&self.conn, title, stage.is_default).map_err(ApiError::Storage)
    }

    fn update_stage(&mut self, id: i64, update: &StageUpdate) -> Result<Stage, ApiError> {
        self.check_writable()?;
        let current = self.require_stage(id)?;

        let title = match update.title.as_deref().map(str::trim) {
            Some("") => return Err(ApiError::rejected("Stage title cannot be empty")),
            other => other,
        };
        if update.is_default == Some(false) && current.is_default {
            return Err(ApiError::rejected(
                "A default stage is required; mark another stage as default instead",
            ));
        }
        let make_default = update.is_default == Some(true) && !current.is_default;

        StageRepo::update(&self.conn, id, title, make_default).map_err(ApiError::Storage)?;
        self.require_stage(id)
    }

    fn delete_stage(&mut self, id: i64) -> Result<(), ApiError> {
        self.check_writable()?;
        let stage = self.require_stage(id)?;
        if stage.is_default {
            return Err(ApiError::rejected(format!(
                "Cannot delete default stage '{}'",
                stage.title
            )));
        }
        let count = LeadRepo::count_in_stage(&self.conn, &stage.stage_id).map_err(ApiError::Storage)?;
        if count > 0 {
            return Err(ApiError::rejected(format!(
                "Stage '{}' still has {} lead(s)",
                stage.title, count
            )));
        }
        StageRepo::delete(&self.conn, id).map_err(ApiError::Storage)
    }

    fn create_lead(&mut self, lead: &NewLead) -> Result<Lead, ApiError> {
        self.check_writable()?;
        let full_name = lead.full_name.trim();
        if full_name.is_empty() {
            return Err(ApiError::rejected("Full name is required"));
        }

        let stage = match &lead.stage {
            Some(key) => StageRepo::get_by_key(&self.conn, key)
                .map_err(ApiError::Storage)?
                .ok_or_else(|| ApiError::rejected(format!("Stage '{}' does not exist", key)))?,
            None => StageRepo::get_default(&self.conn)
                .map_err(ApiError::Storage)?
                .ok_or_else(|| ApiError::rejected("No default stage configured"))?,
        };

        LeadRepo::create(
            &self.conn,
            full_name,
            &stage.stage_id,
            lead.email.as_deref(),
            lead.phone.as_deref(),
            lead.source.as_deref(),
        )
        .map_err(ApiError::Storage)
    }

    fn delete_lead(&mut self, id: i64) -> Result<(), ApiError> {
        self.check_writable()?;
        self.require_lead(id)?;
        LeadRepo::delete(&self.conn, id).map_err(ApiError::Storage)
    }

    fn lead_notes(&mut self, id: i64) -> Result<Vec<LeadNote>, ApiError> {
        self.require_lead(id)?;
        NoteRepo::list_for_lead(&self.conn, id).map_err(ApiError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    fn api() -> LocalApi {
        LocalApi::new(DbConnection::connect_in_memory().unwrap())
    }

    #[test]
    fn test_update_lead_stage_records_note() {
        let mut api = api();
        let lead = api.create_lead(&NewLead::named("Ada Lovelace")).unwrap();
        assert_eq!(lead.stage, "new");

        let moved = api
            .update_lead_stage(lead.id, "contacted", Some("Moved from New to Contacted"))
            .unwrap();
        assert_eq!(moved.stage, "contacted");

        let notes = api.lead_notes(lead.id).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].from_stage.as_deref(), Some("new"));
        assert_eq!(notes[0].to_stage.as_deref(), Some("contacted"));
    }

    #[test]
    fn test_update_lead_stage_unknown_stage_rejected() {
        let mut api = api();
        let lead = api.create_lead(&NewLead::named("Ada Lovelace")).unwrap();

        let err = api.update_lead_stage(lead.id, "nowhere", None).unwrap_err();
        assert_eq!(err.server_message(), Some("Stage 'nowhere' does not exist"));
    }

    #[test]
    fn test_positions_must_be_dense_and_complete() {
        let mut api = api();
        let stages = api.list_stages().unwrap();

        let partial: Vec<StagePosition> = stages.iter().take(2).map(StagePosition::from).collect();
        assert!(api.update_stage_positions(&partial).is_err());

        let mut gapped: Vec<StagePosition> = stages.iter().map(StagePosition::from).collect();
        gapped[0].position = 7;
        assert!(api.update_stage_positions(&gapped).is_err());

        let mut reversed: Vec<StagePosition> = stages.iter().map(StagePosition::from).collect();
        let n = reversed.len() as i64;
        for entry in reversed.iter_mut() {
            entry.position = n - 1 - entry.position;
        }
        api.update_stage_positions(&reversed).unwrap();
        let keys: Vec<String> = api.list_stages().unwrap().into_iter().map(|s| s.stage_id).collect();
        assert_eq!(keys, vec!["converted", "qualified", "contacted", "new"]);
    }

    #[test]
    fn test_delete_stage_rules() {
        let mut api = api();
        let stages = api.list_stages().unwrap();
        let default = stages.iter().find(|s| s.is_default).unwrap();
        assert!(api.delete_stage(default.id).is_err());

        let contacted = stages.iter().find(|s| s.stage_id == "contacted").unwrap();
        let mut lead = NewLead::named("Grace Hopper");
        lead.stage = Some("contacted".to_string());
        api.create_lead(&lead).unwrap();
        let err = api.delete_stage(contacted.id).unwrap_err();
        assert!(err.user_message().contains("still has 1 lead"));

        let qualified = stages.iter().find(|s| s.stage_id == "qualified").unwrap();
        api.delete_stage(qualified.id).unwrap();
        assert_eq!(api.list_stages().unwrap().len(), 3);
    }

    #[test]
    fn test_read_only_denies_mutations() {
        let mut api = api().read_only(true);
        let err = api.create_lead(&NewLead::named("Ada")).unwrap_err();
        assert!(err.is_permission_denied());
        assert!(api.list_stages().is_ok());
    }

    #[test]
    fn test_cannot_unset_default_directly() {
        let mut api = api();
        let default = api.list_stages().unwrap().into_iter().find(|s| s.is_default).unwrap();
        let update = StageUpdate { title: None, is_default: Some(false) };
        assert!(api.update_stage(default.id, &update).is_err());
    }

    #[test]
    fn test_rejected_stage_update_changes_nothing() {
        let mut api = api();
        let default = api.list_stages().unwrap().into_iter().find(|s| s.is_default).unwrap();
        let update = StageUpdate {
            title: Some("Renamed".to_string()),
            is_default: Some(false),
        };
        assert!(api.update_stage(default.id, &update).is_err());

        let after = api.list_stages().unwrap().into_iter().find(|s| s.id == default.id).unwrap();
        assert_eq!(after.title, default.title);
        assert!(after.is_default);
    }

    #[test]
    fn test_stage_update_renames_and_promotes_together() {
        let mut api = api();
        let contacted = api.list_stages().unwrap().into_iter().find(|s| s.stage_id == "contacted").unwrap();
        let update = StageUpdate {
            title: Some("  Reached  ".to_string()),
            is_default: Some(true),
        };
        let updated = api.update_stage(contacted.id, &update).unwrap();
        assert_eq!(updated.title, "Reached");
        assert!(updated.is_default);
        let defaults = api.list_stages().unwrap().iter().filter(|s| s.is_default).count();
        assert_eq!(defaults, 1);
    }
}
