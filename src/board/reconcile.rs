//! Stage and lead caches and how server payloads land in them.
//!
//! Fetch results fully replace the cached lists; nothing is merged. Stages
//! are held sorted by position. Deleted leads are tracked as tombstones so a
//! fetch that was already in flight when the delete went out cannot bring
//! them back.

use crate::board::store::Store;
use crate::models::{Lead, Stage};
use serde::Serialize;
use std::collections::HashMap;

/// Ordered stage cache
#[derive(Debug, Default)]
pub struct StageStore {
    store: Store<Vec<Stage>>,
}

impl StageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &Store<Vec<Stage>> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<Vec<Stage>> {
        &mut self.store
    }

    pub fn stages(&self) -> &[Stage] {
        self.store.get()
    }

    /// Replace with a server payload, sorted ascending by position
    pub fn replace(&mut self, mut payload: Vec<Stage>) {
        payload.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
        self.store.replace(payload);
    }

    pub fn stage_by_key(&self, stage_id: &str) -> Option<&Stage> {
        self.stages().iter().find(|s| s.stage_id == stage_id)
    }

    pub fn index_of(&self, stage_id: &str) -> Option<usize> {
        self.stages().iter().position(|s| s.stage_id == stage_id)
    }

    pub fn default_stage(&self) -> Option<&Stage> {
        self.stages().iter().find(|s| s.is_default)
    }

    /// Display title for a stage key, falling back to the key itself
    pub fn title_of<'a>(&'a self, stage_id: &'a str) -> &'a str {
        self.stage_by_key(stage_id)
            .map(|s| s.title.as_str())
            .unwrap_or(stage_id)
    }
}

/// Marks when a fetch was issued, relative to tombstone confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    issued: u64,
}

#[derive(Debug, Clone, Copy)]
struct Tombstone {
    /// Fetch clock value when the delete was confirmed by the server
    confirmed_at: Option<u64>,
}

/// Lead cache with deleted-lead tombstones
#[derive(Debug, Default)]
pub struct LeadStore {
    store: Store<Vec<Lead>>,
    tombstones: HashMap<i64, Tombstone>,
    fetch_clock: u64,
    /// Ticket of the newest payload applied so far
    applied: u64,
}

impl LeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &Store<Vec<Lead>> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<Vec<Lead>> {
        &mut self.store
    }

    pub fn leads(&self) -> &[Lead] {
        self.store.get()
    }

    pub fn lead(&self, id: i64) -> Option<&Lead> {
        self.leads().iter().find(|l| l.id == id)
    }

    pub fn leads_in<'a>(&'a self, stage_id: &'a str) -> impl Iterator<Item = &'a Lead> + 'a {
        self.leads().iter().filter(move |l| l.stage == stage_id)
    }

    /// Call before issuing `GET leads`; pass the ticket to `replace`
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetch_clock += 1;
        FetchTicket { issued: self.fetch_clock }
    }

    /// Replace with a fetched payload.
    ///
    /// Confirmed tombstones older than the ticket are dropped first (the
    /// server has answered after the delete, so its payload is canonical).
    /// Every remaining tombstone hides its lead. A payload older than the
    /// last one applied is dropped.
    pub fn replace(&mut self, ticket: FetchTicket, payload: Vec<Lead>) {
        if ticket.issued < self.applied {
            log::debug!("Dropping out-of-order lead fetch {} (have {})", ticket.issued, self.applied);
            return;
        }
        self.applied = ticket.issued;

        self.tombstones.retain(|id, tombstone| match tombstone.confirmed_at {
            Some(confirmed_at) if ticket.issued > confirmed_at => {
                log::debug!("Clearing tombstone for lead {}", id);
                false
            }
            _ => true,
        });

        let hidden = payload.len();
        let visible: Vec<Lead> = payload
            .into_iter()
            .filter(|lead| !self.tombstones.contains_key(&lead.id))
            .collect();
        if visible.len() != hidden {
            log::debug!("Hid {} tombstoned lead(s) from fetch", hidden - visible.len());
        }

        self.store.replace(visible);
    }

    /// Swap in the server's copy of a lead that is still on the board.
    /// Returns false when the lead is gone or tombstoned.
    pub fn confirm_lead(&mut self, lead: Lead) -> bool {
        if self.is_tombstoned(lead.id) || self.lead(lead.id).is_none() {
            return false;
        }
        let next: Vec<Lead> = self
            .leads()
            .iter()
            .map(|l| if l.id == lead.id { lead.clone() } else { l.clone() })
            .collect();
        self.store.replace(next);
        true
    }

    /// Hide a lead locally until its delete is settled
    pub fn tombstone(&mut self, id: i64) {
        self.tombstones.insert(id, Tombstone { confirmed_at: None });
    }

    /// The server accepted the delete. Fetches issued from now on may clear it.
    pub fn confirm_tombstone(&mut self, id: i64) {
        if let Some(tombstone) = self.tombstones.get_mut(&id) {
            tombstone.confirmed_at = Some(self.fetch_clock);
        }
    }

    /// The delete failed; let the lead show again
    pub fn lift_tombstone(&mut self, id: i64) {
        self.tombstones.remove(&id);
    }

    pub fn is_tombstoned(&self, id: i64) -> bool {
        self.tombstones.contains_key(&id)
    }
}

/// One board column: a stage and the leads in it
#[derive(Debug, Clone, Serialize)]
pub struct Column<'a> {
    pub stage: &'a Stage,
    pub leads: Vec<&'a Lead>,
}

/// Project stages × leads into columns, in stage order
pub fn columns<'a>(stages: &'a StageStore, leads: &'a LeadStore) -> Vec<Column<'a>> {
    let columns: Vec<Column<'a>> = stages
        .stages()
        .iter()
        .map(|stage| Column {
            stage,
            leads: leads.leads_in(&stage.stage_id).collect(),
        })
        .collect();

    let placed: usize = columns.iter().map(|c| c.leads.len()).sum();
    if placed != leads.leads().len() {
        log::debug!(
            "{} lead(s) reference unknown stages and were not placed",
            leads.leads().len() - placed
        );
    }
    columns
}
