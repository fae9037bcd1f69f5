//! Board coordinator.
//!
//! Owns the stage and lead caches, the drag coordinator, and the backend.
//! Every drag-driven mutation is optimistic: the local change lands first,
//! then the backend is called, then the change is committed or reverted.
//! Each mutation is split into a `begin_*` half and a `settle_*` half so that
//! callers driving their own I/O can interleave them; the plain methods
//! (`move_lead`, `reorder_stages`, `delete_lead`) run both halves around a
//! backend call.

use crate::api::{ApiError, CrmApi};
use crate::board::drag::{DragCoordinator, DragEvent, Intent, LeadMove};
use crate::board::notify::{Notice, Notifier};
use crate::board::reconcile::{columns, Column, FetchTicket, LeadStore, StageStore};
use crate::board::store::{Settled, Transaction};
use crate::config::BoardConfig;
use crate::models::{Lead, LeadNote, NewLead, NewStage, Stage, StagePosition, StageUpdate};
use thiserror::Error;

/// Errors the board cannot recover from locally
#[derive(Debug, Error)]
pub enum BoardError {
    /// Shown as a full-page error; the board state has been reverted
    #[error("{0}")]
    PermissionDenied(String),

    #[error("Failed to load {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: ApiError,
    },

    /// A server-confirmed (non-optimistic) request was refused
    #[error("{0}")]
    Rejected(#[source] ApiError),
}

/// Result of a board mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do; no backend call was made
    Noop,
    Persisted,
    RolledBack,
    /// Failed after a later change had already landed; canonical state was refetched
    Superseded,
}

impl From<Settled> for Outcome {
    fn from(settled: Settled) -> Self {
        match settled {
            Settled::Persisted => Outcome::Persisted,
            Settled::RolledBack => Outcome::RolledBack,
            Settled::Superseded => Outcome::Superseded,
        }
    }
}

/// Observable phases of a single lead move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePhase {
    Idle,
    OptimisticallyMoved,
    Persisted,
    RolledBack,
}

/// An optimistic lead move awaiting its backend result
#[must_use]
#[derive(Debug)]
pub struct PendingMove {
    mv: LeadMove,
    tx: Transaction<Vec<Lead>>,
}

/// An optimistic stage reorder awaiting its backend result
#[must_use]
#[derive(Debug)]
pub struct PendingReorder {
    positions: Vec<StagePosition>,
    tx: Transaction<Vec<Stage>>,
}

impl PendingReorder {
    pub fn positions(&self) -> &[StagePosition] {
        &self.positions
    }
}

/// An optimistic lead delete awaiting its backend result
#[must_use]
#[derive(Debug)]
pub struct PendingDelete {
    lead_id: i64,
    tx: Transaction<Vec<Lead>>,
}

type PhaseObserver = Box<dyn FnMut(i64, MovePhase)>;

pub struct Board<A, N> {
    api: A,
    notifier: N,
    config: BoardConfig,
    stages: StageStore,
    leads: LeadStore,
    drag: DragCoordinator,
    phase_observers: Vec<PhaseObserver>,
}

impl<A: CrmApi, N: Notifier> Board<A, N> {
    pub fn new(api: A, notifier: N, config: BoardConfig) -> Self {
        Self {
            api,
            notifier,
            config,
            stages: StageStore::new(),
            leads: LeadStore::new(),
            drag: DragCoordinator::new(),
            phase_observers: Vec::new(),
        }
    }

    pub fn stages(&self) -> &StageStore {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut StageStore {
        &mut self.stages
    }

    pub fn leads(&self) -> &LeadStore {
        &self.leads
    }

    pub fn leads_mut(&mut self) -> &mut LeadStore {
        &mut self.leads
    }

    pub fn columns(&self) -> Vec<Column<'_>> {
        columns(&self.stages, &self.leads)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn drag(&self) -> &DragCoordinator {
        &self.drag
    }

    /// Observe lead-move phases as `(lead_id, phase)`
    pub fn on_move_phase(&mut self, observer: impl FnMut(i64, MovePhase) + 'static) {
        self.phase_observers.push(Box::new(observer));
    }

    fn emit_phase(&mut self, lead_id: i64, phase: MovePhase) {
        for observer in self.phase_observers.iter_mut() {
            observer(lead_id, phase);
        }
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    pub fn fetch_stages(&mut self) -> Result<(), BoardError> {
        let payload = self.api.list_stages().map_err(|e| fetch_error("stages", e))?;
        self.stages.replace(payload);
        Ok(())
    }

    pub fn begin_lead_fetch(&mut self) -> FetchTicket {
        self.leads.begin_fetch()
    }

    pub fn settle_lead_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Lead>, ApiError>,
    ) -> Result<(), BoardError> {
        let payload = result.map_err(|e| fetch_error("leads", e))?;
        self.leads.replace(ticket, payload);
        Ok(())
    }

    pub fn fetch_leads(&mut self) -> Result<(), BoardError> {
        let ticket = self.begin_lead_fetch();
        let result = self.api.list_leads();
        self.settle_lead_fetch(ticket, result)
    }

    pub fn refresh(&mut self) -> Result<(), BoardError> {
        self.fetch_stages()?;
        self.fetch_leads()
    }

    /// Refetch after a successful mutation, when configured or when the
    /// store was left stale by a superseded rollback
    fn refetch_leads_if_needed(&mut self) {
        if self.config.refetch_after_mutation || self.leads.store().is_stale() {
            if let Err(e) = self.fetch_leads() {
                log::warn!("Refetch of leads failed: {}", e);
            }
        }
    }

    fn refetch_stages_if_needed(&mut self) {
        if self.config.refetch_after_mutation || self.stages.store().is_stale() {
            if let Err(e) = self.fetch_stages() {
                log::warn!("Refetch of stages failed: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Drag handling
    // ------------------------------------------------------------------

    /// Feed a drag event through the coordinator and apply the resulting intent
    pub fn handle_drag(&mut self, event: DragEvent) -> Result<Outcome, BoardError> {
        let intent = self.drag.handle(event, &self.stages, &self.leads);
        match intent {
            Intent::None => Ok(Outcome::Noop),
            Intent::ReorderStages(next) => self.reorder_stages(next),
            Intent::MoveLead(mv) => self.move_lead(&mv),
        }
    }

    // ------------------------------------------------------------------
    // Lead moves
    // ------------------------------------------------------------------

    /// Apply a lead move locally. `None` when the lead is unknown or already there.
    pub fn begin_lead_move(&mut self, mv: &LeadMove) -> Option<PendingMove> {
        let lead = self.leads.lead(mv.lead_id)?;
        if lead.stage == mv.to {
            return None;
        }

        let next: Vec<Lead> = self
            .leads
            .leads()
            .iter()
            .map(|l| {
                if l.id == mv.lead_id {
                    Lead { stage: mv.to.clone(), ..l.clone() }
                } else {
                    l.clone()
                }
            })
            .collect();

        let tx = self.leads.store_mut().begin(next);
        log::debug!("Lead {} optimistically moved to {} ({})", mv.lead_id, mv.to, tx.token());
        self.emit_phase(mv.lead_id, MovePhase::OptimisticallyMoved);
        Some(PendingMove { mv: mv.clone(), tx })
    }

    pub fn settle_lead_move(
        &mut self,
        pending: PendingMove,
        result: Result<Lead, ApiError>,
    ) -> Result<Outcome, BoardError> {
        let PendingMove { mv, tx } = pending;
        match result {
            Ok(lead) => {
                self.leads.store_mut().commit(tx);
                self.leads.confirm_lead(lead);
                log::info!("Lead {} moved {} -> {}", mv.lead_id, mv.from, mv.to);
                self.emit_phase(mv.lead_id, MovePhase::Persisted);
                self.emit_phase(mv.lead_id, MovePhase::Idle);
                self.notifier.notify(Notice::success("Lead moved successfully"));
                self.refetch_leads_if_needed();
                Ok(Outcome::Persisted)
            }
            Err(err) => {
                let settled = self.leads.store_mut().rollback(tx);
                log::warn!("Lead {} move to {} failed: {}", mv.lead_id, mv.to, err);
                self.emit_phase(mv.lead_id, MovePhase::RolledBack);
                self.emit_phase(mv.lead_id, MovePhase::Idle);
                if settled == Settled::Superseded {
                    self.refetch_leads_if_needed();
                }
                self.report_failure(err)?;
                Ok(settled.into())
            }
        }
    }

    pub fn move_lead(&mut self, mv: &LeadMove) -> Result<Outcome, BoardError> {
        let Some(pending) = self.begin_lead_move(mv) else {
            return Ok(Outcome::Noop);
        };
        let result = self.api.update_lead_stage(mv.lead_id, &mv.to, Some(&mv.note));
        self.settle_lead_move(pending, result)
    }

    // ------------------------------------------------------------------
    // Stage reorders
    // ------------------------------------------------------------------

    /// Apply a new stage order locally. Positions are renumbered 0..N-1.
    pub fn begin_stage_reorder(&mut self, mut next: Vec<Stage>) -> PendingReorder {
        for (position, stage) in next.iter_mut().enumerate() {
            stage.position = position as i64;
        }
        let positions: Vec<StagePosition> = next.iter().map(StagePosition::from).collect();
        let tx = self.stages.store_mut().begin(next);
        log::debug!("Stages optimistically reordered ({})", tx.token());
        PendingReorder { positions, tx }
    }

    pub fn settle_stage_reorder(
        &mut self,
        pending: PendingReorder,
        result: Result<(), ApiError>,
    ) -> Result<Outcome, BoardError> {
        let PendingReorder { tx, .. } = pending;
        match result {
            Ok(()) => {
                self.stages.store_mut().commit(tx);
                log::info!("Stage order saved");
                self.notifier.notify(Notice::success("Stage order updated"));
                self.refetch_stages_if_needed();
                Ok(Outcome::Persisted)
            }
            Err(err) => {
                let settled = self.stages.store_mut().rollback(tx);
                log::warn!("Stage reorder failed: {}", err);
                if settled == Settled::Superseded {
                    self.refetch_stages_if_needed();
                }
                self.report_failure(err)?;
                Ok(settled.into())
            }
        }
    }

    pub fn reorder_stages(&mut self, next: Vec<Stage>) -> Result<Outcome, BoardError> {
        let pending = self.begin_stage_reorder(next);
        let result = self.api.update_stage_positions(pending.positions());
        self.settle_stage_reorder(pending, result)
    }

    // ------------------------------------------------------------------
    // Lead deletes
    // ------------------------------------------------------------------

    /// Hide a lead immediately. `None` when the lead is not on the board.
    pub fn begin_lead_delete(&mut self, lead_id: i64) -> Option<PendingDelete> {
        self.leads.lead(lead_id)?;
        self.leads.tombstone(lead_id);
        let next: Vec<Lead> = self
            .leads
            .leads()
            .iter()
            .filter(|l| l.id != lead_id)
            .cloned()
            .collect();
        let tx = self.leads.store_mut().begin(next);
        Some(PendingDelete { lead_id, tx })
    }

    pub fn settle_lead_delete(
        &mut self,
        pending: PendingDelete,
        result: Result<(), ApiError>,
    ) -> Result<Outcome, BoardError> {
        let PendingDelete { lead_id, tx } = pending;
        match result {
            Ok(()) => {
                self.leads.store_mut().commit(tx);
                self.leads.confirm_tombstone(lead_id);
                log::info!("Lead {} deleted", lead_id);
                self.notifier.notify(Notice::success("Lead deleted successfully"));
                self.refetch_leads_if_needed();
                Ok(Outcome::Persisted)
            }
            Err(err) => {
                self.leads.lift_tombstone(lead_id);
                let settled = self.leads.store_mut().rollback(tx);
                log::warn!("Delete of lead {} failed: {}", lead_id, err);
                if settled == Settled::Superseded {
                    self.refetch_leads_if_needed();
                }
                self.report_failure(err)?;
                Ok(settled.into())
            }
        }
    }

    pub fn delete_lead(&mut self, lead_id: i64) -> Result<Outcome, BoardError> {
        let Some(pending) = self.begin_lead_delete(lead_id) else {
            return Ok(Outcome::Noop);
        };
        let result = self.api.delete_lead(lead_id);
        self.settle_lead_delete(pending, result)
    }

    // ------------------------------------------------------------------
    // Server-confirmed CRUD
    // ------------------------------------------------------------------

    pub fn create_stage(&mut self, title: &str, is_default: bool) -> Result<Stage, BoardError> {
        let request = NewStage { title: title.to_string(), is_default };
        let stage = self.api.create_stage(&request).map_err(|e| self.reject(e))?;
        self.notifier.notify(Notice::success(format!("Stage '{}' created", stage.title)));
        self.fetch_stages()?;
        Ok(stage)
    }

    /// Update a stage by key. Unknown keys are a no-op.
    pub fn update_stage(&mut self, stage_id: &str, update: &StageUpdate) -> Result<Option<Stage>, BoardError> {
        let Some(id) = self.stages.stage_by_key(stage_id).map(|s| s.id) else {
            return Ok(None);
        };
        let stage = self.api.update_stage(id, update).map_err(|e| self.reject(e))?;
        self.notifier.notify(Notice::success(format!("Stage '{}' updated", stage.title)));
        self.fetch_stages()?;
        Ok(Some(stage))
    }

    pub fn rename_stage(&mut self, stage_id: &str, title: &str) -> Result<Option<Stage>, BoardError> {
        let update = StageUpdate { title: Some(title.to_string()), is_default: None };
        self.update_stage(stage_id, &update)
    }

    pub fn set_default_stage(&mut self, stage_id: &str) -> Result<Option<Stage>, BoardError> {
        let update = StageUpdate { title: None, is_default: Some(true) };
        self.update_stage(stage_id, &update)
    }

    /// Delete a stage by key. Returns `Noop` for unknown keys.
    pub fn delete_stage(&mut self, stage_id: &str) -> Result<Outcome, BoardError> {
        let Some((id, title)) = self
            .stages
            .stage_by_key(stage_id)
            .map(|s| (s.id, s.title.clone()))
        else {
            return Ok(Outcome::Noop);
        };
        self.api.delete_stage(id).map_err(|e| self.reject(e))?;
        self.notifier.notify(Notice::success(format!("Stage '{}' deleted", title)));
        self.fetch_stages()?;
        Ok(Outcome::Persisted)
    }

    pub fn create_lead(&mut self, lead: &NewLead) -> Result<Lead, BoardError> {
        let created = self.api.create_lead(lead).map_err(|e| self.reject(e))?;
        self.notifier.notify(Notice::success(format!("Lead '{}' created", created.full_name)));
        self.fetch_leads()?;
        Ok(created)
    }

    pub fn lead_history(&mut self, lead_id: i64) -> Result<Vec<LeadNote>, BoardError> {
        self.api.lead_notes(lead_id).map_err(|e| fetch_error("lead history", e))
    }

    // ------------------------------------------------------------------
    // Failure reporting
    // ------------------------------------------------------------------

    /// Toast a recoverable failure, or escalate a permission failure
    fn report_failure(&mut self, err: ApiError) -> Result<(), BoardError> {
        if let ApiError::PermissionDenied(message) = err {
            return Err(BoardError::PermissionDenied(message));
        }
        self.notifier.notify(Notice::error(err.user_message()));
        Ok(())
    }

    fn reject(&mut self, err: ApiError) -> BoardError {
        log::warn!("Request rejected: {}", err);
        match err {
            ApiError::PermissionDenied(message) => BoardError::PermissionDenied(message),
            err => {
                self.notifier.notify(Notice::error(err.user_message()));
                BoardError::Rejected(err)
            }
        }
    }
}

fn fetch_error(what: &'static str, err: ApiError) -> BoardError {
    match err {
        ApiError::PermissionDenied(message) => BoardError::PermissionDenied(message),
        source => BoardError::Fetch { what, source },
    }
}
