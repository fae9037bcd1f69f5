//! Drag coordinator: turns drag gestures into board intents.
//!
//! Draggable and droppable identifiers share one namespace. Stage columns
//! use `stage-<stageId>`; lead cards use the bare lead id. That prefix is
//! what tells a stage reorder apart from a lead move.

use crate::board::reconcile::{LeadStore, StageStore};
use crate::models::Stage;

const STAGE_PREFIX: &str = "stage-";

/// Parsed drag identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragId {
    Stage(String),
    Lead(i64),
}

impl DragId {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(key) = raw.strip_prefix(STAGE_PREFIX) {
            if key.is_empty() {
                return None;
            }
            return Some(DragId::Stage(key.to_string()));
        }
        raw.parse::<i64>().ok().map(DragId::Lead)
    }

    pub fn stage(stage_id: &str) -> String {
        format!("{}{}", STAGE_PREFIX, stage_id)
    }
}

/// Pointer/keyboard drag gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Start { active: String },
    End { active: String, over: Option<String> },
    Cancel,
}

impl DragEvent {
    pub fn start(active: &str) -> Self {
        DragEvent::Start { active: active.to_string() }
    }

    pub fn end(active: &str, over: Option<&str>) -> Self {
        DragEvent::End {
            active: active.to_string(),
            over: over.map(str::to_string),
        }
    }

    pub fn cancel() -> Self {
        DragEvent::Cancel
    }
}

/// Request to move a lead between stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadMove {
    pub lead_id: i64,
    pub from: String,
    pub to: String,
    pub note: String,
}

/// What a finished drag asks the board to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    None,
    /// Full stage list in its new order, positions already dense
    ReorderStages(Vec<Stage>),
    MoveLead(LeadMove),
}

/// Tracks the single active drag
#[derive(Debug, Default)]
pub struct DragCoordinator {
    active: Option<DragId>,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&DragId> {
        self.active.as_ref()
    }

    pub fn handle(&mut self, event: DragEvent, stages: &StageStore, leads: &LeadStore) -> Intent {
        match event {
            DragEvent::Start { active } => {
                self.active = DragId::parse(&active);
                log::debug!("Drag start: {:?}", self.active);
                Intent::None
            }
            DragEvent::Cancel => {
                let cancelled = self.active.take();
                log::debug!("Drag cancelled: {:?}", cancelled);
                Intent::None
            }
            DragEvent::End { active, over } => {
                self.active = None;
                let (Some(active), Some(over)) = (
                    DragId::parse(&active),
                    over.as_deref().and_then(DragId::parse),
                ) else {
                    log::debug!("Drag end without a usable target");
                    return Intent::None;
                };
                let intent = resolve(&active, &over, stages, leads);
                log::debug!("Drag {:?} over {:?} -> {:?}", active, over, intent);
                intent
            }
        }
    }
}

/// Resolve a completed drag against the current stores
pub fn resolve(active: &DragId, over: &DragId, stages: &StageStore, leads: &LeadStore) -> Intent {
    match (active, over) {
        (DragId::Stage(from_key), DragId::Stage(to_key)) => {
            let (Some(from), Some(to)) = (stages.index_of(from_key), stages.index_of(to_key)) else {
                return Intent::None;
            };
            if from == to {
                return Intent::None;
            }
            Intent::ReorderStages(reorder(stages.stages(), from, to))
        }
        (DragId::Lead(lead_id), target) => {
            let Some(lead) = leads.lead(*lead_id) else {
                return Intent::None;
            };
            let destination = match target {
                DragId::Stage(key) => stages.stage_by_key(key).map(|s| s.stage_id.clone()),
                DragId::Lead(other) => leads.lead(*other).map(|l| l.stage.clone()),
            };
            let Some(destination) = destination else {
                return Intent::None;
            };
            if destination == lead.stage {
                return Intent::None;
            }
            let note = format!(
                "Moved from {} to {}",
                stages.title_of(&lead.stage),
                stages.title_of(&destination)
            );
            Intent::MoveLead(LeadMove {
                lead_id: lead.id,
                from: lead.stage.clone(),
                to: destination,
                note,
            })
        }
        // Stages only reorder against other stages
        (DragId::Stage(_), DragId::Lead(_)) => Intent::None,
    }
}

/// Move the stage at `from` to `to` and renumber positions 0..N-1
pub fn reorder(stages: &[Stage], from: usize, to: usize) -> Vec<Stage> {
    let mut next = stages.to_vec();
    if from < next.len() && to < next.len() {
        let moved = next.remove(from);
        next.insert(to, moved);
    }
    for (position, stage) in next.iter_mut().enumerate() {
        stage.position = position as i64;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lead, LeadStatus};

    fn stage(id: i64, key: &str, title: &str, position: i64) -> Stage {
        Stage {
            id,
            title: title.to_string(),
            position,
            stage_id: key.to_string(),
            is_default: position == 0,
        }
    }

    fn lead(id: i64, stage: &str) -> Lead {
        Lead {
            id,
            stage: stage.to_string(),
            status: LeadStatus::Active,
            full_name: format!("Lead {}", id),
            email: None,
            phone: None,
            source: None,
            created_ts: 0,
            modified_ts: 0,
        }
    }

    fn fixtures() -> (StageStore, LeadStore) {
        let mut stages = StageStore::new();
        stages.replace(vec![
            stage(1, "a", "A", 0),
            stage(2, "b", "B", 1),
            stage(3, "c", "C", 2),
        ]);
        let mut leads = LeadStore::new();
        let ticket = leads.begin_fetch();
        leads.replace(ticket, vec![lead(10, "a"), lead(11, "b")]);
        (stages, leads)
    }

    fn summary(stages: &[Stage]) -> Vec<(String, i64)> {
        stages.iter().map(|s| (s.stage_id.clone(), s.position)).collect()
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(DragId::parse("stage-new"), Some(DragId::Stage("new".to_string())));
        assert_eq!(DragId::parse("42"), Some(DragId::Lead(42)));
        assert_eq!(DragId::parse("stage-"), None);
        assert_eq!(DragId::parse("column-x"), None);
        assert_eq!(DragId::stage("won"), "stage-won");
    }

    #[test]
    fn test_reorder_moves_last_stage_first() {
        let (stages, leads) = fixtures();
        let mut drag = DragCoordinator::new();
        drag.handle(DragEvent::start("stage-c"), &stages, &leads);
        assert_eq!(drag.active(), Some(&DragId::Stage("c".to_string())));

        let intent = drag.handle(DragEvent::end("stage-c", Some("stage-a")), &stages, &leads);
        let Intent::ReorderStages(next) = intent else {
            panic!("expected a reorder, got {:?}", intent);
        };
        assert_eq!(
            summary(&next),
            vec![("c".to_string(), 0), ("a".to_string(), 1), ("b".to_string(), 2)]
        );
        assert!(drag.active().is_none());
    }

    #[test]
    fn test_reorder_positions_are_dense_for_every_move() {
        let (stages, _) = fixtures();
        let n = stages.stages().len();
        for from in 0..n {
            for to in 0..n {
                let next = reorder(stages.stages(), from, to);
                let mut positions: Vec<i64> = next.iter().map(|s| s.position).collect();
                positions.sort_unstable();
                assert_eq!(positions, (0..n as i64).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_reorder_onto_itself_is_noop() {
        let (stages, leads) = fixtures();
        let mut drag = DragCoordinator::new();
        let intent = drag.handle(DragEvent::end("stage-b", Some("stage-b")), &stages, &leads);
        assert_eq!(intent, Intent::None);
    }

    #[test]
    fn test_lead_onto_stage_column() {
        let (stages, leads) = fixtures();
        let mut drag = DragCoordinator::new();
        let intent = drag.handle(DragEvent::end("10", Some("stage-c")), &stages, &leads);
        assert_eq!(
            intent,
            Intent::MoveLead(LeadMove {
                lead_id: 10,
                from: "a".to_string(),
                to: "c".to_string(),
                note: "Moved from A to C".to_string(),
            })
        );
    }

    #[test]
    fn test_lead_onto_other_lead_takes_its_stage() {
        let (stages, leads) = fixtures();
        let mut drag = DragCoordinator::new();
        let intent = drag.handle(DragEvent::end("10", Some("11")), &stages, &leads);
        let Intent::MoveLead(mv) = intent else {
            panic!("expected a move");
        };
        assert_eq!(mv.to, "b");
    }

    #[test]
    fn test_lead_onto_current_stage_is_noop() {
        let (stages, leads) = fixtures();
        let mut drag = DragCoordinator::new();
        assert_eq!(drag.handle(DragEvent::end("10", Some("stage-a")), &stages, &leads), Intent::None);
    }

    #[test]
    fn test_cancel_missing_and_stale_targets_are_noops() {
        let (stages, leads) = fixtures();
        let mut drag = DragCoordinator::new();

        drag.handle(DragEvent::start("10"), &stages, &leads);
        assert_eq!(drag.handle(DragEvent::cancel(), &stages, &leads), Intent::None);
        assert!(drag.active().is_none());

        assert_eq!(drag.handle(DragEvent::end("10", None), &stages, &leads), Intent::None);
        assert_eq!(drag.handle(DragEvent::end("10", Some("stage-zzz")), &stages, &leads), Intent::None);
        assert_eq!(drag.handle(DragEvent::end("99", Some("stage-b")), &stages, &leads), Intent::None);
        assert_eq!(drag.handle(DragEvent::end("stage-a", Some("11")), &stages, &leads), Intent::None);
    }
}
